//! FLV error type.

/// FLV error.
#[derive(Debug, thiserror::Error)]
pub enum FlvError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// AMF0 error while handling script data.
    #[error("amf0: {0}")]
    Amf0(#[from] strom_amf0::Amf0Error),
    /// Invalid FLV header signature.
    #[error("invalid signature in header: 0x{0:x}")]
    InvalidSignature(u32),
    /// The data offset of the FLV header points before its own end.
    #[error("invalid data offset: {0}")]
    InvalidDataOffset(u32),
    /// A tag body did not consume exactly its declared size.
    #[error("truncated tag: declared {declared} bytes, consumed {consumed}")]
    TruncatedTag {
        /// The declared body size.
        declared: usize,
        /// The number of bytes actually consumed.
        consumed: usize,
    },
    /// The first previous-tag-size field of a stream must be 0.
    #[error("first previous tag size is not 0: {0}")]
    InvalidFirstPreviousTagSize(u32),
    /// Nested multitracks are not allowed.
    #[error("nested multitracks are not allowed")]
    NestedMultitracks,
    /// A ModEx record is too small for its declared type.
    #[error("invalid modExData, expected at least {expected_bytes} bytes")]
    InvalidModExData {
        /// The minimum number of payload bytes for this ModEx type.
        expected_bytes: usize,
    },
    /// A ModEx record must carry at least one payload byte.
    #[error("empty modExData")]
    EmptyModExData,
    /// A many-track body needs at least two tracks.
    #[error("multitrack body needs at least 2 tracks, got {0}")]
    TooFewTracks(usize),
    /// A one-track body carries exactly one track.
    #[error("one-track body needs exactly 1 track, got {0}")]
    NotOneTrack(usize),
    /// A per-track body exceeds the 24-bit size field.
    #[error("track body too large for u24 size field: {0} bytes")]
    TrackSizeTooLarge(usize),
    /// A tag body exceeds the 24-bit size field.
    #[error("tag body too large for u24 size field: {0} bytes")]
    BodyTooLarge(usize),
    /// The tag body does not fit the tag header it was muxed with.
    #[error("tag header and body disagree: {0}")]
    HeaderBodyMismatch(&'static str),
    /// A composition time offset outside the signed 24-bit range.
    #[error("composition time offset out of range: {0}")]
    CompositionTimeOutOfRange(i32),
}
