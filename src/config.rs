//! Runtime configuration.
//!
//! Read once at startup from environment variables:
//!
//! - `BRIDGE_ADDR` - listen address (default `0.0.0.0:3000`)
//! - `BRIDGE_WEBHOOK_SECRET` - shared webhook secret (required)
//! - `BRIDGE_DATA_DIR` - data directory for the durable store; when unset the
//!   bridge runs on the in-memory store

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable names.
const ENV_ADDR: &str = "BRIDGE_ADDR";
const ENV_SECRET: &str = "BRIDGE_WEBHOOK_SECRET";
const ENV_DATA_DIR: &str = "BRIDGE_DATA_DIR";

/// Default listen address.
const DEFAULT_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 3000);

/// Errors reading the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The webhook secret is not configured.
    #[error("{ENV_SECRET} is not set")]
    MissingSecret,

    /// The listen address does not parse.
    #[error("invalid {ENV_ADDR}: {0}")]
    InvalidAddr(String),
}

/// Bridge runtime configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// Shared secret for webhook signature verification.
    pub webhook_secret: Vec<u8>,

    /// Data directory for the durable store; `None` selects the in-memory
    /// store.
    pub data_dir: Option<PathBuf>,
}

impl BridgeConfig {
    /// Creates a configuration with defaults and the given secret.
    pub fn new(webhook_secret: impl Into<Vec<u8>>) -> Self {
        BridgeConfig {
            bind_addr: SocketAddr::from(DEFAULT_ADDR),
            webhook_secret: webhook_secret.into(),
            data_dir: None,
        }
    }

    /// Sets a custom listen address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets a data directory, selecting the durable file store.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Reads the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var(ENV_SECRET).map_err(|_| ConfigError::MissingSecret)?;
        let mut config = BridgeConfig::new(secret.into_bytes());

        if let Ok(addr) = std::env::var(ENV_ADDR) {
            let parsed = addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?;
            config = config.with_bind_addr(parsed);
        }

        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            config = config.with_data_dir(dir);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = BridgeConfig::new(b"secret".to_vec());
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn builders_override_defaults() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = BridgeConfig::new(b"secret".to_vec())
            .with_bind_addr(addr)
            .with_data_dir("/var/lib/bridge");

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/bridge")));
    }
}
