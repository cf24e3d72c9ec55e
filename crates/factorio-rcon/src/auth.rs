//! RCON authentication handshake

use crate::error::{RconError, Result};
use crate::packet::{PacketType, RconPacket, packet_type};
use crate::transport::Transport;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::{info, warn};

/// Id carried by the auth packet of every connection
pub const AUTH_ID: i32 = 0;

/// Id the server answers with when the password is wrong
pub const AUTH_FAILED_ID: i32 = -1;

/// Send the password and wait for the verdict.
///
/// The whole exchange must finish by `deadline`. Every failure is reported
/// as a connection error. The caller owns the transport and must close it
/// when this returns an error.
pub async fn authenticate<S>(
    transport: &mut Transport<S>,
    password: &str,
    deadline: Instant,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let auth_packet = RconPacket::new(AUTH_ID, PacketType::Auth, password);
    transport
        .send_packet(&auth_packet, deadline)
        .await
        .map_err(RconError::into_connection)?;

    let response = transport
        .recv_packet(deadline)
        .await
        .map_err(RconError::into_connection)?;

    check_auth_response(&response)?;
    info!("RCON authenticated successfully");
    Ok(())
}

/// Validate an auth response: type first, then rejection, then id
pub fn check_auth_response(response: &RconPacket) -> Result<()> {
    if response.packet_type != packet_type::AUTH_RESPONSE {
        return Err(RconError::Connection(
            "Invalid auth response type".to_string(),
        ));
    }

    if response.id == AUTH_FAILED_ID {
        warn!("RCON server rejected the password");
        return Err(RconError::Connection("Invalid password".to_string()));
    }

    if response.id != AUTH_ID {
        return Err(RconError::Connection("Invalid response ID".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::encode;
    use std::time::Duration;
    use tokio_test::io::Builder;

    fn response(id: i32, ptype: i32) -> RconPacket {
        RconPacket {
            id,
            packet_type: ptype,
            body: String::new(),
        }
    }

    #[test]
    fn test_accepts_matching_auth_response() {
        assert!(check_auth_response(&response(0, packet_type::AUTH_RESPONSE)).is_ok());
    }

    #[test]
    fn test_rejected_password() {
        let err = check_auth_response(&response(-1, packet_type::AUTH_RESPONSE)).unwrap_err();
        assert!(err.is_connection());
        assert_eq!(err.message(), "Invalid password");
    }

    #[test]
    fn test_type_is_checked_before_id() {
        let err = check_auth_response(&response(-1, packet_type::RESPONSE_VALUE)).unwrap_err();
        assert_eq!(err.message(), "Invalid auth response type");
    }

    #[test]
    fn test_unexpected_id() {
        let err = check_auth_response(&response(7, packet_type::AUTH_RESPONSE)).unwrap_err();
        assert_eq!(err.message(), "Invalid response ID");
    }

    #[tokio::test]
    async fn test_handshake_over_stream() {
        let mock = Builder::new()
            .write(&encode(AUTH_ID, packet_type::AUTH, "secret"))
            .read(&encode(AUTH_ID, packet_type::AUTH_RESPONSE, ""))
            .build();

        let mut transport = Transport::new(mock, Duration::from_secs(1));
        let deadline = transport.deadline();
        authenticate(&mut transport, "secret", deadline).await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_close_is_connection_error() {
        let mock = Builder::new()
            .write(&encode(AUTH_ID, packet_type::AUTH, "secret"))
            .build();

        let mut transport = Transport::new(mock, Duration::from_secs(1));
        let deadline = transport.deadline();
        let err = authenticate(&mut transport, "secret", deadline).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_handshake_malformed_frame_is_connection_error() {
        let mock = Builder::new()
            .write(&encode(AUTH_ID, packet_type::AUTH, "secret"))
            .read(&3i32.to_le_bytes())
            .build();

        let mut transport = Transport::new(mock, Duration::from_secs(1));
        let deadline = transport.deadline();
        let err = authenticate(&mut transport, "secret", deadline).await.unwrap_err();
        assert!(err.is_connection());
        assert!(err.message().contains("Malformed packet"));
    }

    #[tokio::test]
    async fn test_expired_deadline_is_connection_error() {
        let (client, _server) = tokio::io::duplex(64);
        let mut transport = Transport::new(client, Duration::from_secs(5));

        let err = authenticate(&mut transport, "secret", Instant::now())
            .await
            .unwrap_err();
        assert!(err.is_connection());
        assert!(err.message().ends_with("timeout"));
    }
}
