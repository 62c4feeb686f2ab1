//! General RTMP error type.

use crate::chunk::{ChunkReadError, ChunkWriteError};
use crate::command_messages::CommandError;
use crate::handshake::HandshakeError;
use crate::messages::MessageError;
use crate::session::client::ClientSessionError;
use crate::session::server::ServerSessionError;

/// RTMP error.
#[derive(Debug, thiserror::Error)]
pub enum RtmpError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Chunk read error.
    #[error("chunk read error: {0}")]
    ChunkRead(#[from] ChunkReadError),
    /// Chunk write error.
    #[error("chunk write error: {0}")]
    ChunkWrite(#[from] ChunkWriteError),
    /// Message error.
    #[error("message error: {0}")]
    Message(#[from] MessageError),
    /// Command error.
    #[error("command error: {0}")]
    Command(CommandError),
    /// AMF0 error.
    #[error("amf0 error: {0}")]
    Amf0(#[from] strom_amf0::Amf0Error),
    /// Handshake error.
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
    /// Server session error.
    #[error("session error: {0}")]
    Session(#[from] ServerSessionError),
    /// Client session error.
    #[error("client session error: {0}")]
    ClientSession(#[from] ClientSessionError),
}

impl RtmpError {
    /// Returns true if the error indicates that the peer has closed the
    /// connection.
    pub fn is_client_closed(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::UnexpectedEof
            ),
            Self::Session(ServerSessionError::Timeout(_)) => true,
            _ => false,
        }
    }
}
