/// Errors that can occur when reading chunks.
#[derive(Debug, thiserror::Error)]
pub enum ChunkReadError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A compressed header arrived on a chunk stream with no prior state.
    #[error("missing previous chunk header: {0}")]
    MissingPreviousChunkHeader(u32),
    /// Too many chunk streams have partially assembled messages.
    #[error("too many partial chunks")]
    TooManyPartialChunks,
    /// Too many chunk streams have header state.
    #[error("too many previous chunk headers")]
    TooManyPreviousChunkHeaders,
    /// A message exceeds the size this reader is willing to assemble.
    #[error("partial chunk too large: {0}")]
    PartialChunkTooLarge(usize),
    /// Timestamp plus delta does not fit in 32 bits.
    #[error("timestamp overflow: timestamp: {0}, delta: {1}")]
    TimestampOverflow(u32, u32),
    /// An invalid chunk stream id.
    #[error("invalid chunk stream id: {0}")]
    InvalidChunkStreamId(u32),
}

/// Errors that can occur when writing chunks.
#[derive(Debug, thiserror::Error)]
pub enum ChunkWriteError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An invalid chunk stream id.
    #[error("invalid chunk stream id: {0}")]
    InvalidChunkStreamId(u32),
    /// The message payload exceeds the 24-bit length field.
    #[error("payload too large: {0}")]
    PayloadTooLarge(usize),
}
