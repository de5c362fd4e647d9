//! CLI argument definitions for the `parlor` binary.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Realtime presence and conversation-messaging server.
#[derive(Debug, Parser)]
#[command(name = "parlor", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket server
    Serve {
        /// Port to listen on (overrides config.toml)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host interface to bind (overrides config.toml)
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
