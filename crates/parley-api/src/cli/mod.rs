//! CLI command definitions for the `parley` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod import;
pub mod session;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chat relay between a web front-end and an OpenAI-compatible model.
#[derive(Parser)]
#[command(name = "parley", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file (defaults apply when missing).
    #[arg(long, global = true, env = "PARLEY_CONFIG", default_value = "parley.toml")]
    pub config: PathBuf,

    /// Output machine-readable JSON (and JSON logs) instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP relay service.
    Serve {
        /// Port to listen on (overrides config).
        #[arg(long, short)]
        port: Option<u16>,

        /// Host to bind to (overrides config).
        #[arg(long)]
        host: Option<String>,
    },

    /// Print a freshly issued session id.
    Session,

    /// Print the stored transcript of a session.
    History {
        /// Session id to display.
        session_id: String,
    },

    /// Copy a legacy (session_id, message, is_user) table into the turn store.
    ImportLegacy {
        /// Name of the legacy table in the configured database.
        #[arg(long)]
        table: String,
    },

    /// Show version, store backend and stored turn count.
    Status,
}
