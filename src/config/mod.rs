//! Configuration file support.
//!
//! Every section is optional; missing values fall back to defaults.
//!
//! ```toml
//! [collector]
//! driver_name = "mysql"
//!
//! [pool]
//! max_open = 10
//! max_idle = 2
//! wait_timeout_ms = 100
//!
//! [server]
//! port = 9090
//! ```

use crate::metrics::CollectorOpts;
use crate::pool::PoolConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Configuration loading errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub collector: CollectorOpts,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Scrape endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the `/metrics` endpoint.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 9090 }
    }
}

impl ServerConfig {
    /// Address to bind the server to.
    pub fn bind_addr(&self) -> SocketAddr {
        ([0, 0, 0, 0], self.port).into()
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
