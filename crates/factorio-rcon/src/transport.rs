//! Byte transport for the RCON client
//!
//! Owns the duplex stream (a `TcpStream` in production) together with the
//! frame reassembler for that stream. Every suspension point is bounded by
//! a deadline; all waits belonging to one exchange share the same deadline,
//! so the exchange as a whole never outlives the configured timeout.

use crate::error::{RconError, Result};
use crate::packet::RconPacket;
use crate::reassembler::Reassembler;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

/// Bytes reserved in the accumulation buffer before each read
const READ_CHUNK: usize = 4096;

/// A raw, unauthenticated connection
pub struct Transport<S = TcpStream> {
    stream: S,
    reassembler: Reassembler,
    timeout: Duration,
}

impl Transport<TcpStream> {
    /// Open a TCP connection to the RCON server.
    ///
    /// `deadline` bounds the connect; `timeout` is the per-exchange budget
    /// the transport keeps for later calls.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        deadline: Instant,
    ) -> Result<Self> {
        info!("Connecting to RCON at {}:{}", host, port);

        let stream = match timeout_at(deadline, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RconError::Connection(format!(
                    "Failed to connect to {}:{}: {}",
                    host, port, e
                )));
            }
            Err(_) => {
                return Err(RconError::Connection(format!(
                    "Connection timeout after {}ms",
                    timeout.as_millis()
                )));
            }
        };

        // Commands are tiny and latency bound
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        Ok(Self::new(stream, timeout))
    }
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open stream
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            stream,
            reassembler: Reassembler::new(),
            timeout,
        }
    }

    /// Deadline for an exchange starting now
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.timeout
    }

    /// Write one encoded frame
    pub async fn send(&mut self, frame: &[u8], deadline: Instant) -> Result<()> {
        let stream = &mut self.stream;
        let write = async {
            stream.write_all(frame).await?;
            stream.flush().await
        };

        match timeout_at(deadline, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RconError::Command(format!("Failed to send packet: {}", e))),
            Err(_) => Err(RconError::Command("Send timeout".to_string())),
        }
    }

    /// Encode and write a packet
    pub async fn send_packet(&mut self, packet: &RconPacket, deadline: Instant) -> Result<()> {
        self.send(&packet.to_bytes(), deadline).await
    }

    /// Wait for the next complete packet.
    ///
    /// Fails with a connection error if the peer closes or the socket errors
    /// before a full frame arrives, and with a command error on timeout or a
    /// malformed frame.
    pub async fn recv_packet(&mut self, deadline: Instant) -> Result<RconPacket> {
        match timeout_at(deadline, self.read_packet()).await {
            Ok(result) => result,
            Err(_) => Err(RconError::Command("Receive timeout".to_string())),
        }
    }

    async fn read_packet(&mut self) -> Result<RconPacket> {
        loop {
            if let Some(packet) = self.reassembler.next_packet()? {
                return Ok(packet);
            }

            let buf = self.reassembler.buffer_mut();
            buf.reserve(READ_CHUNK);
            let n = self
                .stream
                .read_buf(buf)
                .await
                .map_err(|e| RconError::Connection(format!("Socket error: {}", e)))?;

            if n == 0 {
                return Err(RconError::Connection("Connection closed".to_string()));
            }
        }
    }

    /// Shut the stream down. Errors are ignored.
    pub async fn close(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("RCON shutdown error ignored: {}", e);
        }
    }
}
