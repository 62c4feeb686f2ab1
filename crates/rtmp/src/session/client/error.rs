//! Error type for client sessions.

use crate::command_messages::Command;

/// Errors that can occur during a client session.
#[derive(Debug, thiserror::Error)]
pub enum ClientSessionError {
    /// Timeout.
    #[error("timeout: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
    /// The peer answered with `_error` or an error-level `onStatus`; the
    /// failing command is carried along.
    #[error("remote command failed: {0:?}")]
    RemoteCommand(Command),
    /// The session closed while a command was awaiting its reply.
    #[error("session closed while awaiting")]
    Cancelled,
    /// A `createStream` result without a numeric stream id.
    #[error("create stream result carried no stream id")]
    NoStreamId,
    /// Invalid chunk size.
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),
}
