use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Well-known relay port on the loopback interface.
pub const DEFAULT_PORT: u16 = 8795;
/// How many subsequent ports to try when the default is taken.
pub const PORT_RETRY_RANGE: u16 = 9;

const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub port: u16,
    /// Upper bound on waiting for the request line of one connection. A
    /// client that connects and never sends would otherwise stall the
    /// accept loop indefinitely.
    pub read_timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl RelayConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("reader-relay").join("relay.json"))
    }

    /// Load from `path`, falling back to defaults on absence or parse
    /// failure. Misconfiguration must not keep the relay from starting.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!(error = %err, path = %path.display(), "invalid relay config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn load() -> Self {
        match Self::config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Self::default(),
        }
    }
}
