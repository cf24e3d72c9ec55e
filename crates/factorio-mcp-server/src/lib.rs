//! # factorio-mcp-server
//!
//! MCP server that exposes a Factorio server console to AI agents.
//!
//! This crate provides:
//! - MCP JSON-RPC protocol types and the stdio transport
//! - A tool registry and the built-in Factorio tools
//! - Environment-driven server configuration

pub mod config;
pub mod error;
pub mod mcp;
pub mod registry;
pub mod tools;
pub mod transport;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use registry::{ToolDef, ToolHandler, ToolRegistry};

use factorio_rcon::CommandExecutor;
use mcp::ServerInfo;
use std::sync::Arc;

/// Factorio MCP server
pub struct FactorioMcpServer<X: CommandExecutor> {
    /// Console command executor, normally an `RconClient`
    executor: Arc<X>,
    /// Tools offered to the client
    registry: ToolRegistry,
    /// Name and version reported on initialize
    info: ServerInfo,
}

impl<X: CommandExecutor> FactorioMcpServer<X> {
    /// Create a server offering the built-in tools
    pub fn new(executor: Arc<X>, name: impl Into<String>) -> Self {
        Self {
            executor,
            registry: tools::default_registry(),
            info: ServerInfo {
                name: name.into(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Replace the tool set
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run the server on stdio transport until stdin closes
    pub async fn run_stdio(&self) -> Result<()> {
        transport::stdio::run(self).await
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &Arc<X> {
        &self.executor
    }
}
