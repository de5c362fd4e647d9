//! Server configuration for Parlor.
//!
//! `ServerConfig` represents the top-level `config.toml` in the data
//! directory. All fields have sensible defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Parlor server.
///
/// Loaded from `~/.parlor/config.toml` (or `$PARLOR_DATA_DIR/config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface the HTTP/WebSocket listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of messages returned for a history fetch.
    #[serde(default = "default_history_window")]
    pub history_window: i64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4860
}

fn default_history_window() -> i64 {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            history_window: default_history_window(),
        }
    }
}
