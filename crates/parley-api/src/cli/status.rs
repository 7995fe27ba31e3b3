//! Store status command.

use anyhow::Result;
use console::style;

use parley_core::repository::turn::TurnRepository;
use parley_infra::store::TurnStore;
use parley_types::config::RelayConfig;

/// Display version, configured backend and model, and stored turn count.
pub async fn status(store: &TurnStore, config: &RelayConfig, json: bool) -> Result<()> {
    let turns = store.count_turns().await?;

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "backend": store.backend().as_str(),
            "turns": turns,
            "model": config.provider.model,
            "allowed_origin": config.server.allowed_origin,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Parley v{}",
        style("⚡").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  Backend:  {}", style(store.backend().as_str()).cyan());
    println!("  Turns:    {}", style(turns).bold());
    println!("  Model:    {}", config.provider.model);
    println!("  Origin:   {}", config.server.allowed_origin);
    println!();

    Ok(())
}
