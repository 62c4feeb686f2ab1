/// Errors raised while reading or writing command messages.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// AMF0 error.
    #[error("amf0: {0}")]
    Amf0(#[from] strom_amf0::Amf0Error),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The connect command object carries no string `app` field.
    #[error("no app name of type string in connect command")]
    NoAppName,
    /// The onStatus info object is not an object.
    #[error("invalid onStatus info object")]
    InvalidOnStatusInfoObject,
}
