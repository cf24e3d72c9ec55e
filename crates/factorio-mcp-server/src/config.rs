//! Server configuration from environment variables

use crate::error::{Result, ServerError};
use factorio_rcon::RconConfig;
use std::time::Duration;

pub const ENV_RCON_HOST: &str = "FACTORIO_RCON_HOST";
pub const ENV_RCON_PORT: &str = "FACTORIO_RCON_PORT";
pub const ENV_RCON_PASSWORD: &str = "FACTORIO_RCON_PASSWORD";
pub const ENV_RCON_TIMEOUT_MS: &str = "FACTORIO_RCON_TIMEOUT_MS";
pub const ENV_SERVER_NAME: &str = "MCP_SERVER_NAME";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

pub const DEFAULT_SERVER_NAME: &str = "factorio-mcp";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Everything the binary needs to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// RCON connection settings
    pub rcon: RconConfig,
    /// Name reported in the MCP handshake
    pub server_name: String,
    /// `tracing` filter directive
    pub log_level: String,
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. All missing required variables are
    /// reported together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = get(ENV_RCON_HOST);
        let port = get(ENV_RCON_PORT);
        let password = get(ENV_RCON_PASSWORD);

        let (Some(host), Some(port), Some(password)) = (host.clone(), port.clone(), password.clone())
        else {
            let missing: Vec<&str> = [
                (ENV_RCON_HOST, host.is_none()),
                (ENV_RCON_PORT, port.is_none()),
                (ENV_RCON_PASSWORD, password.is_none()),
            ]
            .into_iter()
            .filter(|(_, missing)| *missing)
            .map(|(key, _)| key)
            .collect();
            return Err(ServerError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        };

        let port = match port.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                return Err(ServerError::Config(format!(
                    "{} must be a port number between 1 and 65535, got {:?}",
                    ENV_RCON_PORT, port
                )));
            }
        };

        let mut rcon = RconConfig::new(host.trim(), port, password);

        if let Some(timeout) = get(ENV_RCON_TIMEOUT_MS) {
            match timeout.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => rcon = rcon.with_timeout(Duration::from_millis(ms)),
                _ => {
                    return Err(ServerError::Config(format!(
                        "{} must be a positive number of milliseconds, got {:?}",
                        ENV_RCON_TIMEOUT_MS, timeout
                    )));
                }
            }
        }

        Ok(Self {
            rcon,
            server_name: get(ENV_SERVER_NAME).unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}
