//! HTTP server settings.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use super::SettingsError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 8;
const DEFAULT_POOL_TIMEOUT_SECS: u64 = 10;

/// Settings for the HTTP server process, read from `GARAGE_*`.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GARAGE")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Upper bound on pooled database connections.
    #[ortho_config(default = 8)]
    pub pool_max_size: u32,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(default = 10)]
    pub pool_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: None,
            pool_max_size: DEFAULT_POOL_MAX_SIZE,
            pool_timeout_secs: DEFAULT_POOL_TIMEOUT_SECS,
        }
    }
}

impl ServerSettings {
    /// Parse the bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse()
            .map_err(|error: std::net::AddrParseError| SettingsError::Invalid {
                name: "GARAGE_BIND_ADDR",
                message: error.to_string(),
            })
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.max(1)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }
}
