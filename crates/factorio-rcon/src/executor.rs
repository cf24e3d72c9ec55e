//! Command execution seam
//!
//! Tool handlers talk to the game through this trait rather than to
//! [`RconClient`](crate::RconClient) directly, so they can be driven by a
//! scripted executor in tests.

use crate::error::Result;
use async_trait::async_trait;

/// Anything that can run a Factorio console command
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a console command and return its trimmed output
    async fn execute(&self, command: &str) -> Result<String>;

    /// Run a Lua chunk via `/c`.
    ///
    /// Output only comes back for code that calls `rcon.print`.
    async fn lua(&self, code: &str) -> Result<String> {
        self.execute(&format!("/c {}", code)).await
    }

    /// Release any connection held by the executor
    async fn shutdown(&self) {}
}
