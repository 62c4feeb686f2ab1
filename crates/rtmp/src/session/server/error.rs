//! Error type for server sessions.

/// Errors that can occur during a server session.
#[derive(Debug, thiserror::Error)]
pub enum ServerSessionError {
    /// Timeout.
    #[error("timeout: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),
    /// Received publish command before connect command.
    #[error("received publish command before connect command")]
    PublishBeforeConnect,
    /// The handler refused a publish; answered with
    /// `NetStream.Publish.Failed` instead of tearing the session down.
    #[error("publish rejected: {0}")]
    PublishRejected(String),
    /// The handler refused a play; answered with `NetStream.Play.Failed`
    /// instead of tearing the session down.
    #[error("play rejected: {0}")]
    PlayRejected(String),
    /// A stream-level command arrived on a stream id this session never
    /// issued.
    #[error("stream {0} was not created by this session")]
    StreamNotCreated(u32),
    /// Invalid chunk size.
    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),
}
