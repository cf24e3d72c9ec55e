//! Error types for the RCON client

use thiserror::Error;

/// Result type for RCON operations
pub type Result<T> = std::result::Result<T, RconError>;

/// RCON error types
#[derive(Debug, Error)]
pub enum RconError {
    /// Establishing or keeping the connection failed (connect, auth, close)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single command round-trip failed (send, response, server error text)
    #[error("Command error: {0}")]
    Command(String),
}

impl RconError {
    /// Whether this is a connection-level failure
    pub fn is_connection(&self) -> bool {
        matches!(self, RconError::Connection(_))
    }

    /// Whether this is a command-level failure
    pub fn is_command(&self) -> bool {
        matches!(self, RconError::Command(_))
    }

    /// The bare message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            RconError::Connection(msg) | RconError::Command(msg) => msg,
        }
    }

    /// Re-tag as a connection failure.
    ///
    /// Everything that goes wrong before the handshake completes is reported
    /// to callers of `connect` as a connection error.
    pub(crate) fn into_connection(self) -> Self {
        match self {
            RconError::Command(msg) => RconError::Connection(msg),
            other => other,
        }
    }

    /// Prefix command-level failures with the command that caused them
    pub(crate) fn for_command(self, command: &str) -> Self {
        match self {
            RconError::Command(msg) => {
                RconError::Command(format!("Failed to execute command \"{}\": {}", command, msg))
            }
            other => other,
        }
    }
}
