/// Errors raised while interpreting a message payload.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A payload too short for its message type.
    #[error("truncated {0} payload")]
    Truncated(&'static str),
    /// An invalid enum value inside a payload.
    #[error("invalid {field} value: {value}")]
    InvalidValue {
        /// The field carrying the invalid value.
        field: &'static str,
        /// The value.
        value: u32,
    },
}
