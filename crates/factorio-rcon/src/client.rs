//! RCON client for Factorio headless servers
//!
//! One client owns at most one connection. The connection is opened lazily
//! by the first [`RconClient::execute`] (or explicitly by
//! [`RconClient::connect`]) and authenticated before any command is sent.
//!
//! Calls to `execute` are single-flight: the session lives behind an async
//! mutex that is held for the whole round-trip, so concurrent callers queue
//! in FIFO order and a response can never be handed to the wrong caller.

use crate::auth;
use crate::config::RconConfig;
use crate::error::{RconError, Result};
use crate::executor::CommandExecutor;
use crate::packet::{PacketType, RconPacket, packet_type};
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Server output that marks a failed command
const ERROR_MARKERS: [&str; 2] = ["Cannot execute command", "Error:"];

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Authenticating = 2,
    Ready = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Authenticating,
            3 => ConnectionState::Ready,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Allocates request ids for one connection.
///
/// Id 0 belongs to the auth packet; commands count up from 1 and wrap back
/// to 0 instead of reaching `i32::MAX`, since negative ids are reserved.
#[derive(Debug)]
pub struct CorrelationCounter {
    last: i32,
}

impl CorrelationCounter {
    pub fn new() -> Self {
        Self {
            last: auth::AUTH_ID,
        }
    }

    /// Id for the next command
    pub fn next_id(&mut self) -> i32 {
        // `last` never holds i32::MAX, so this cannot overflow
        let next = self.last + 1;
        self.last = if next >= i32::MAX { 0 } else { next };
        self.last
    }

    /// Most recently allocated id
    pub fn last(&self) -> i32 {
        self.last
    }
}

impl Default for CorrelationCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// An authenticated connection and its id space
struct Session {
    transport: Transport,
    ids: CorrelationCounter,
}

impl Session {
    /// Send one command and wait for its response, all within one timeout
    async fn round_trip(&mut self, command: &str) -> Result<String> {
        let deadline = self.transport.deadline();
        let id = self.ids.next_id();
        let request = RconPacket::new(id, PacketType::ExecCommand, command);
        self.transport.send_packet(&request, deadline).await?;

        let response = self.transport.recv_packet(deadline).await?;

        if response.id != id {
            return Err(RconError::Command(format!(
                "Response ID mismatch: expected {}, got {}",
                id, response.id
            )));
        }

        if response.packet_type != packet_type::RESPONSE_VALUE {
            return Err(RconError::Command(format!(
                "Invalid response type: {}",
                response.packet_type
            )));
        }

        Ok(response
            .body
            .trim_matches(|c: char| c.is_whitespace() || c == '\0')
            .to_string())
    }
}

/// RCON client for communicating with Factorio headless server
pub struct RconClient {
    config: RconConfig,
    /// Held across a whole round-trip; tokio's mutex queues waiters FIFO
    session: Mutex<Option<Session>>,
    state: AtomicU8,
}

impl RconClient {
    /// Create a new RCON client. No connection is made yet.
    pub fn new(config: RconConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    /// Client configuration
    pub fn config(&self) -> &RconConfig {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Check if connected and authenticated
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Connect and authenticate. Does nothing if already connected.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_session().await?);
        }
        Ok(())
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.take() {
            session.transport.close().await;
            info!("RCON disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Execute a command and return the response.
    ///
    /// Output matching Factorio's error text is returned as a command error.
    /// Failed commands are never retried: console commands are not
    /// idempotent.
    pub async fn execute(&self, command: &str) -> Result<String> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_session().await?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(RconError::Connection(
                "RCON client not initialized".to_string(),
            ));
        };

        debug!("RCON exec: {}", command);
        let result = session.round_trip(command).await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                // The stream may hold a late or foreign frame now; never reuse it
                error!(command, error = %e, "RCON command failed, dropping connection");
                if let Some(session) = guard.take() {
                    session.transport.close().await;
                }
                self.set_state(ConnectionState::Disconnected);
                return Err(e.for_command(command));
            }
        };
        drop(guard);

        debug!(
            "RCON response: {}",
            output.chars().take(100).collect::<String>()
        );
        classify_output(output)
    }

    /// Connect and authenticate. Both steps share one timeout.
    async fn open_session(&self) -> Result<Session> {
        self.set_state(ConnectionState::Connecting);

        let deadline = Instant::now() + self.config.timeout;
        let connected = Transport::connect(
            &self.config.host,
            self.config.port,
            self.config.timeout,
            deadline,
        )
        .await;
        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to connect to RCON server {}: {}", self.config.address(), e);
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        self.set_state(ConnectionState::Authenticating);
        if let Err(e) = auth::authenticate(&mut transport, &self.config.password, deadline).await {
            error!("RCON authentication with {} failed: {}", self.config.address(), e);
            transport.close().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        self.set_state(ConnectionState::Ready);
        Ok(Session {
            transport,
            ids: CorrelationCounter::new(),
        })
    }
}

#[async_trait]
impl CommandExecutor for RconClient {
    async fn execute(&self, command: &str) -> Result<String> {
        RconClient::execute(self, command).await
    }

    async fn shutdown(&self) {
        self.disconnect().await;
    }
}

/// Turn Factorio's error output into an error.
///
/// The protocol reports success for every command the server received, so
/// failures can only be recognised by their text.
pub fn classify_output(output: String) -> Result<String> {
    let failed = ERROR_MARKERS.iter().any(|marker| output.contains(marker))
        || output.lines().any(|line| line.starts_with("Error "));

    if failed {
        Err(RconError::Command(format!("Factorio error: {}", output)))
    } else {
        Ok(output)
    }
}
