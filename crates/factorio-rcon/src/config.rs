//! RCON connection settings

use std::time::Duration;

/// Default RCON port of a Factorio headless server
pub const DEFAULT_PORT: u16 = 27015;

/// Default timeout for connect, handshake and each command round-trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for an [`RconClient`](crate::RconClient)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconConfig {
    /// Server host name or IP
    pub host: String,
    /// Server RCON port
    pub port: u16,
    /// RCON password (`--rcon-password`)
    pub password: String,
    /// Timeout for every suspension point
    pub timeout: Duration,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            password: String::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RconConfig {
    /// Create config for a server
    pub fn new(host: impl Into<String>, port: u16, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            password: password.into(),
            ..Default::default()
        }
    }

    /// Override the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port`, for logs
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
