/// Errors raised during the handshake.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The peer requested an RTMP version other than 3.
    #[error("unsupported rtmp version: {0}")]
    VersionMismatch(u8),
    /// The peer's S2/C2 did not echo our C1/S1 (strict transports only).
    #[error("handshake echo mismatch")]
    EchoMismatch,
    /// No valid digest was found in C1.
    #[error("no valid digest in c1")]
    DigestNotFound,
    /// A digest has the wrong length.
    #[error("digest length {0} is not 32")]
    DigestLength(usize),
}
