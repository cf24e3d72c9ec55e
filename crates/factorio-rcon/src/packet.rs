//! RCON packet codec
//!
//! Pure encode/decode of the Source RCON wire format, no I/O.
//!
//! ```text
//! offset 0   i32 LE  length  (= 10 + body bytes, excludes this field)
//! offset 4   i32 LE  id
//! offset 8   i32 LE  type
//! offset 12  body    UTF-8, length - 10 bytes
//!            0x00    body terminator
//!            0x00    packet terminator
//! ```
//!
//! A body containing an interior NUL is encoded as-is. The server stops
//! reading the body at the first NUL, so such a frame is malformed from its
//! point of view; callers must not send one.

use crate::error::{RconError, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the length prefix
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Bytes of id and type that every frame carries
pub const HEADER_LEN: usize = 8;

/// Length field of a frame with an empty body: id + type + two terminators
pub const MIN_PACKET_LEN: usize = 10;

/// Largest accepted value of the length field (64MB)
pub const MAX_PACKET_LEN: usize = 64 * 1024 * 1024;

/// RCON packet type constants
///
/// `AUTH_RESPONSE` and `EXEC_COMMAND` share the value 2. Which one a packet
/// is depends on direction: the client only ever sends `EXEC_COMMAND` and
/// only ever receives `AUTH_RESPONSE` while it waits for the handshake.
pub mod packet_type {
    /// Command output (response only)
    pub const RESPONSE_VALUE: i32 = 0;
    /// Execute command (request only)
    pub const EXEC_COMMAND: i32 = 2;
    /// Authentication result (response only)
    pub const AUTH_RESPONSE: i32 = 2;
    /// Authenticate with password (request only)
    pub const AUTH: i32 = 3;
}

/// Packet types the client sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Execute a command
    ExecCommand,
    /// Authenticate with password
    Auth,
}

impl PacketType {
    /// Get the wire protocol value
    pub fn as_i32(self) -> i32 {
        match self {
            PacketType::ExecCommand => packet_type::EXEC_COMMAND,
            PacketType::Auth => packet_type::AUTH,
        }
    }
}

/// A single RCON packet
///
/// `packet_type` is kept as the raw wire value since its meaning depends on
/// what the receiver was waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconPacket {
    pub id: i32,
    pub packet_type: i32,
    pub body: String,
}

impl RconPacket {
    /// Create a new outgoing packet
    pub fn new(id: i32, packet_type: PacketType, body: impl Into<String>) -> Self {
        Self {
            id,
            packet_type: packet_type.as_i32(),
            body: body.into(),
        }
    }

    /// Serialize packet to a complete frame, length prefix included
    pub fn to_bytes(&self) -> Bytes {
        encode(self.id, self.packet_type, &self.body)
    }
}

/// Outcome of a decode attempt
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A full frame was available
    Packet {
        packet: RconPacket,
        /// Bytes the frame occupied, prefix included
        consumed: usize,
    },
    /// The buffer holds only part of a frame
    NeedMoreBytes,
}

/// Encode one frame
pub fn encode(id: i32, packet_type: i32, body: &str) -> Bytes {
    let body_bytes = body.as_bytes();
    let length = 4 + 4 + body_bytes.len() + 2;

    let mut buf = BytesMut::with_capacity(LENGTH_FIELD_SIZE + length);
    buf.put_i32_le(length as i32);
    buf.put_i32_le(id);
    buf.put_i32_le(packet_type);
    buf.put_slice(body_bytes);
    buf.put_u8(0);
    buf.put_u8(0);

    buf.freeze()
}

/// Decode the frame at the start of `buf`.
///
/// Only the bytes of the first frame are looked at; anything after it
/// belongs to the next frame and is left for the caller. A length field
/// of 8 or 9 leaves no room for a body and decodes with an empty one.
///
/// Invalid UTF-8 in the body is replaced with U+FFFD rather than rejected.
pub fn decode(buf: &[u8]) -> Result<Decoded> {
    if buf.len() < LENGTH_FIELD_SIZE {
        return Ok(Decoded::NeedMoreBytes);
    }

    let declared = (&buf[..LENGTH_FIELD_SIZE]).get_i32_le();
    let length = usize::try_from(declared)
        .ok()
        .filter(|len| *len >= HEADER_LEN)
        .ok_or_else(|| {
            RconError::Command(format!(
                "Malformed packet: declared length {} is below the minimum of {}",
                declared, HEADER_LEN
            ))
        })?;

    if length > MAX_PACKET_LEN {
        return Err(RconError::Command(format!(
            "RCON packet too large: {} bytes",
            length
        )));
    }

    let total = LENGTH_FIELD_SIZE + length;
    if buf.len() < total {
        return Ok(Decoded::NeedMoreBytes);
    }

    let mut frame = &buf[LENGTH_FIELD_SIZE..total];
    let id = frame.get_i32_le();
    let packet_type = frame.get_i32_le();

    let body_len = length.saturating_sub(MIN_PACKET_LEN);
    let body = if body_len == 0 {
        String::new()
    } else {
        String::from_utf8_lossy(&frame[..body_len]).into_owned()
    };

    Ok(Decoded::Packet {
        packet: RconPacket {
            id,
            packet_type,
            body,
        },
        consumed: total,
    })
}
