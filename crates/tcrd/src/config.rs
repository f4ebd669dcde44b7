//! Relay daemon configuration.
//!
//! Defaults suit a standalone deployment: listen on all interfaces at
//! the protocol's default port, chat log in the working directory.
//! A TOML file can override any field; CLI flags and the `TCRD_BIND`
//! environment variable are layered on top by the binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tcr_protocol::DEFAULT_PORT;

/// Configuration for the relay daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the listener binds.
    pub bind: SocketAddr,

    /// Path of the append-only chat event log.
    pub chat_log: PathBuf,

    /// Seconds a fresh connection gets to send its name chunk.
    pub handshake_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            chat_log: PathBuf::from("chat.log"),
            handshake_timeout_secs: 10,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Absent fields fall back to their defaults; unknown fields are
    /// rejected.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// The handshake timeout as a `Duration`.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

/// Errors from loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {error}")]
    Read { path: PathBuf, error: String },

    /// The file is not valid configuration TOML.
    #[error("failed to parse config {path}: {error}")]
    Parse { path: PathBuf, error: String },
}
