//! # factorio-rcon
//!
//! Source RCON protocol client for Factorio headless servers.
//!
//! Protocol reference: https://developer.valvesoftware.com/wiki/Source_RCON_Protocol
//!
//! This crate provides:
//! - A pure packet codec and a reassembler for frames split or merged by TCP
//! - A timeout-bounded transport and the authentication handshake
//! - `RconClient`, a lazily connecting, single-flight command executor that
//!   also recognises Factorio's error output

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod packet;
pub mod reassembler;
pub mod transport;

pub use client::{ConnectionState, CorrelationCounter, RconClient, classify_output};
pub use config::RconConfig;
pub use error::{RconError, Result};
pub use executor::CommandExecutor;
pub use packet::{PacketType, RconPacket};
