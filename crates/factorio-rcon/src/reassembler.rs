//! Reassembles RCON frames from a boundary-less byte stream
//!
//! TCP may split one frame across several reads or pack several frames into
//! a single read. Incoming bytes are appended to an accumulation buffer and
//! complete frames are drained off its front one at a time.

use crate::error::Result;
use crate::packet::{self, Decoded, RconPacket};
use bytes::{Buf, BytesMut};

/// Initial accumulation buffer capacity
const INITIAL_CAPACITY: usize = 4096;

/// Frame accumulator for one connection
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
}

impl Reassembler {
    /// Create an empty reassembler
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Append bytes received from the socket
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete packet, if one is buffered.
    ///
    /// Call repeatedly until it returns `Ok(None)`: a single read can carry
    /// more than one frame.
    pub fn next_packet(&mut self) -> Result<Option<RconPacket>> {
        match packet::decode(&self.buffer)? {
            Decoded::Packet { packet, consumed } => {
                self.buffer.advance(consumed);
                Ok(Some(packet))
            }
            Decoded::NeedMoreBytes => Ok(None),
        }
    }

    /// Number of bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Direct access for reading straight from the socket
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}
