//! The `onStatus` command.
//!
//! It is not very clear whether `onStatus` belongs to the NetConnection or
//! NetStream commands; in reality it is used as a response message to both,
//! which is why it lives in its own module.

use strom_amf0::{Amf0Encoder, Amf0Object, Amf0Value};

use super::{CommandError, CommandResultLevel};

/// The `onStatus` command, reporting stream lifecycle events.
///
/// Defined by:
/// - Legacy RTMP spec, 7.2.2
#[derive(Debug, Clone, PartialEq)]
pub struct OnStatus {
    /// The status code, e.g. `NetStream.Publish.Start`.
    pub code: String,
    /// The status level.
    pub level: CommandResultLevel,
    /// A human-readable description.
    pub description: Option<String>,
    /// Any other fields of the info object.
    pub others: Option<Amf0Object>,
}

/// Well-known `onStatus` codes.
pub mod codes {
    /// The connection attempt succeeded.
    pub const NET_CONNECTION_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";
    /// The connection attempt was rejected.
    pub const NET_CONNECTION_CONNECT_REJECTED: &str = "NetConnection.Connect.Rejected";
    /// The connection was closed.
    pub const NET_CONNECTION_CONNECT_CLOSED: &str = "NetConnection.Connect.Closed";
    /// The server asks the client to reconnect (E-RTMP).
    pub const NET_CONNECTION_CONNECT_RECONNECT_REQUEST: &str = "NetConnection.Connect.ReconnectRequest";

    /// Publishing has started.
    pub const NET_STREAM_PUBLISH_START: &str = "NetStream.Publish.Start";
    /// Publishing was refused.
    pub const NET_STREAM_PUBLISH_FAILED: &str = "NetStream.Publish.Failed";
    /// A stream was unpublished.
    pub const NET_STREAM_UNPUBLISH_SUCCESS: &str = "NetStream.Unpublish.Success";
    /// Playback has started.
    pub const NET_STREAM_PLAY_START: &str = "NetStream.Play.Start";
    /// Playback was refused.
    pub const NET_STREAM_PLAY_FAILED: &str = "NetStream.Play.Failed";
    /// A stream was deleted.
    pub const NET_STREAM_DELETE_STREAM_SUCCESS: &str = "NetStream.DeleteStream.Success";
}

impl OnStatus {
    /// A `status`-level event with the given code.
    pub fn status(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            level: CommandResultLevel::Status,
            description: None,
            others: None,
        }
    }

    /// An `error`-level event with the given code and description.
    pub fn error(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            level: CommandResultLevel::Error,
            description: Some(description.into()),
            others: None,
        }
    }

    /// Builds the event from a decoded info object.
    pub fn from_info_object(info: Amf0Object) -> Self {
        let mut code = String::new();
        let mut level = CommandResultLevel::Unknown(String::new());
        let mut description = None;
        let mut others = Amf0Object::new();

        for (key, value) in info {
            match (key.as_str(), &value) {
                ("code", Amf0Value::String(s)) => code = s.clone(),
                ("level", Amf0Value::String(s)) => level = s.parse().expect("infallible"),
                ("description", Amf0Value::String(s)) => description = Some(s.clone()),
                _ => others.push((key, value)),
            }
        }

        Self {
            code,
            level,
            description,
            others: (!others.is_empty()).then_some(others),
        }
    }

    /// Flattens the event into its info object.
    pub fn to_info_object(&self) -> Amf0Object {
        let mut info = Amf0Object::new();

        info.push(("level".into(), Amf0Value::String(self.level.to_string())));
        info.push(("code".into(), Amf0Value::String(self.code.clone())));
        if let Some(description) = &self.description {
            info.push(("description".into(), Amf0Value::String(description.clone())));
        }
        if let Some(others) = &self.others {
            info.extend(others.iter().cloned());
        }

        info
    }

    /// Writes the full `onStatus` command payload.
    pub(super) fn write(&self, encoder: &mut Amf0Encoder<&mut Vec<u8>>, transaction_id: f64) -> Result<(), CommandError> {
        encoder.encode_string("onStatus")?;
        encoder.encode_number(transaction_id)?;
        // command object is null
        encoder.encode_null()?;
        encoder.encode_object(&self.to_info_object())?;

        Ok(())
    }
}
