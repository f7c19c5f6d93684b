//! Top-level RTMP error type.

use crate::chunk::ChunkDecodeError;
use crate::command_messages::CommandError;
use crate::handshake::HandshakeError;
use crate::session::SessionError;

/// Any error that can terminate or be raised during an RTMP connection's lifetime.
#[derive(Debug, thiserror::Error)]
pub enum RtmpError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Handshake error.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
    /// Chunk decode error.
    #[error("chunk decode error: {0}")]
    ChunkDecode(#[from] ChunkDecodeError),
    /// Command message error.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl RtmpError {
    /// Returns true if this error represents an ordinary peer departure
    /// rather than a protocol fault.
    pub fn is_client_closed(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionAborted | std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::UnexpectedEof
            ),
            Self::Session(SessionError::Timeout(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn classifies_closed_connection_errors() {
        assert!(RtmpError::Io(std::io::Error::new(ErrorKind::ConnectionAborted, "x")).is_client_closed());
        assert!(RtmpError::Io(std::io::Error::new(ErrorKind::ConnectionReset, "x")).is_client_closed());
        assert!(RtmpError::Io(std::io::Error::new(ErrorKind::UnexpectedEof, "x")).is_client_closed());

        let elapsed = tokio::time::timeout(Duration::ZERO, std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(RtmpError::Session(SessionError::Timeout(elapsed)).is_client_closed());

        assert!(!RtmpError::Io(std::io::Error::other("x")).is_client_closed());
    }
}
