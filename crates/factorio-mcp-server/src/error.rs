//! Error types for the MCP server

use factorio_rcon::RconError;
use thiserror::Error;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types
#[derive(Debug, Error)]
pub enum ServerError {
    /// The game server connection or a console command failed
    #[error(transparent)]
    Rcon(#[from] RconError),

    /// Tool arguments missing or of the wrong shape
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// No tool registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// stdio failure
    #[error("IO error: {0}")]
    Io(String),

    /// Bad or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::Serialization(err.to_string())
    }
}

/// JSON-RPC error codes
pub mod error_codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}
