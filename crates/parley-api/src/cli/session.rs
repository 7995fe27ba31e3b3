//! Session CLI commands: issue an id, print a transcript.

use anyhow::Result;
use console::style;

use parley_core::chat::session::issue_session_id;
use parley_core::repository::turn::TurnRepository;
use parley_infra::store::TurnStore;
use parley_types::llm::MessageRole;
use parley_types::session::SessionId;

/// Print a new session id.
pub fn new_session(json: bool) -> Result<()> {
    let session_id = issue_session_id();
    if json {
        println!("{}", serde_json::json!({ "session_id": session_id }));
    } else {
        println!("{session_id}");
    }
    Ok(())
}

/// Print every stored turn of a session, oldest first.
///
/// # Examples
///
/// ```bash
/// parley history 3f6c1e2a-...
/// parley history 3f6c1e2a-... --json
/// ```
pub async fn history(store: &TurnStore, raw_id: &str, json: bool) -> Result<()> {
    let session_id = SessionId::parse(raw_id)?;
    let turns = store.list_by_session(&session_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&turns)?);
        return Ok(());
    }

    if turns.is_empty() {
        println!();
        println!(
            "  {} No turns stored for session '{}'.",
            style("i").blue().bold(),
            style(&session_id).cyan()
        );
        println!();
        return Ok(());
    }

    println!();
    for turn in &turns {
        let role = match turn.role {
            MessageRole::System => style("system   ").dim(),
            MessageRole::User => style("user     ").green().bold(),
            MessageRole::Assistant => style("assistant").cyan().bold(),
        };
        let mood = turn
            .mood
            .as_deref()
            .map(|m| format!(" [{m}]"))
            .unwrap_or_default();
        println!(
            "  {} {}{}",
            style(turn.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
            role,
            style(mood).magenta()
        );
        for line in turn.content.lines() {
            println!("      {line}");
        }
    }
    println!();
    println!("  {} turn(s)", style(turns.len()).bold());
    println!();

    Ok(())
}
