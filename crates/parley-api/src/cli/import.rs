//! Legacy table import command.

use anyhow::{Context, Result};
use console::style;

use parley_infra::store::TurnStore;

/// Copy a legacy `(session_id, message, is_user)` table into the turn store.
pub async fn import_legacy(store: &TurnStore, table: &str, json: bool) -> Result<()> {
    let summary = store
        .import_legacy(table)
        .await
        .with_context(|| format!("failed to import legacy table '{table}'"))?;

    tracing::info!(
        table,
        imported = summary.imported,
        skipped = summary.skipped,
        backend = store.backend().as_str(),
        "Legacy import finished"
    );

    if json {
        println!(
            "{}",
            serde_json::json!({
                "table": table,
                "imported": summary.imported,
                "skipped": summary.skipped,
            })
        );
    } else {
        println!(
            "  {} Imported {} turn(s) from '{}'",
            style("✓").green(),
            style(summary.imported).bold(),
            style(table).cyan()
        );
        if summary.skipped > 0 {
            println!(
                "  {} Skipped {} row(s) with an unusable session id or NULL message",
                style("!").yellow(),
                style(summary.skipped).bold()
            );
        }
    }
    Ok(())
}
