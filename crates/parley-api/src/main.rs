//! Parley CLI and HTTP relay entry point.
//!
//! Binary name: `parley`
//!
//! Loads `.env` and configuration, initializes tracing, then dispatches to
//! the requested command or starts the HTTP server.

mod cli;
mod http;
mod state;

use clap::Parser;
use tracing::{debug, error, info};

use parley_infra::config::{load_config, load_dotenv};
use parley_infra::store::TurnStore;
use parley_observe::tracing_setup::{
    TracingOptions, init_tracing, shutdown_tracing, verbosity_filter,
};
use parley_types::config::RelayConfig;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dotenv_path = load_dotenv();

    init_tracing(&TracingOptions {
        default_filter: verbosity_filter(cli.verbose, cli.quiet).to_string(),
        json: cli.json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    if let Some(path) = dotenv_path {
        debug!(path = %path.display(), "Loaded .env");
    }

    let config = load_config(&cli.config).await?;
    let result = run(cli, config).await;

    shutdown_tracing();
    result
}

async fn run(cli: Cli, mut config: RelayConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Session => cli::session::new_session(cli.json)?,

        Commands::History { session_id } => {
            let store = TurnStore::connect(&config.database).await?;
            let result = cli::session::history(&store, &session_id, cli.json).await;
            store.close().await;
            result?;
        }

        Commands::ImportLegacy { table } => {
            let store = TurnStore::connect(&config.database).await?;
            let result = cli::import::import_legacy(&store, &table, cli.json).await;
            store.close().await;
            result?;
        }

        Commands::Status => {
            let store = TurnStore::connect(&config.database).await?;
            let result = cli::status::status(&store, &config, cli.json).await;
            store.close().await;
            result?;
        }

        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let origin = config.server.allowed_origin.clone();
            let model = config.provider.model.clone();

            let state = AppState::init(config).await?;
            let router = http::router::build_router(state.clone())?;
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            info!(%addr, %origin, %model, provider = state.relay.provider_name(), "Parley listening");
            if !cli.quiet && !cli.json {
                println!(
                    "  {} Parley listening on {}",
                    console::style("⚡").bold(),
                    console::style(format!("http://{addr}")).cyan()
                );
                println!("  {}", console::style("Press Ctrl+C to stop").dim());
            }

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            state.store.close().await;
            info!("Server stopped");
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
