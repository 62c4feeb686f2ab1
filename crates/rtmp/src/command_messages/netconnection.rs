//! NetConnection command messages.

use bytes::Bytes;
use strom_amf0::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};

use super::CommandError;
use super::on_status::codes::NET_CONNECTION_CONNECT_SUCCESS;

/// Extended capabilities mask carried by the
/// [enhanced connect command](NetConnectionConnect).
#[bitmask_enum::bitmask(u8)]
pub enum CapsExMask {
    /// Support for reconnection
    Reconnect = 0x01,
    /// Support for multitrack
    Multitrack = 0x02,
    /// Can parse ModEx signal
    ModEx = 0x04,
    /// Support for nano offset
    TimestampNanoOffset = 0x08,
}

/// NetConnection command `connect`.
///
/// Defined by:
/// - Legacy RTMP spec, 7.2.1.1
/// - Enhanced RTMP spec, Enhancing NetConnection connect Command
#[derive(Debug, Clone, PartialEq)]
pub struct NetConnectionConnect {
    /// The server application name the client is connecting to.
    pub app: String,
    /// Flash Player (or encoder) version string.
    pub flash_ver: Option<String>,
    /// URL of the source SWF file.
    pub swf_url: Option<String>,
    /// URL of the server, up to but not including the stream key.
    pub tc_url: Option<String>,
    /// Whether a proxy is being used.
    pub fpad: Option<bool>,
    /// Bitmask of audio codecs the client supports.
    pub audio_codecs: Option<f64>,
    /// Bitmask of video codecs the client supports.
    pub video_codecs: Option<f64>,
    /// Bitmask of video functions the client supports.
    pub video_function: Option<f64>,
    /// URL of the page the SWF was loaded from.
    pub page_url: Option<String>,
    /// The AMF object encoding (0 or 3).
    pub object_encoding: Option<f64>,
    /// Extended (E-RTMP) capability flags.
    pub caps_ex: Option<CapsExMask>,
    /// Any other fields of the command object, in encoding order.
    pub others: Amf0Object,
}

impl NetConnectionConnect {
    /// A connect command for the given app with nothing else set.
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            flash_ver: None,
            swf_url: None,
            tc_url: None,
            fpad: None,
            audio_codecs: None,
            video_codecs: None,
            video_function: None,
            page_url: None,
            object_encoding: None,
            caps_ex: None,
            others: Amf0Object::new(),
        }
    }

    pub(super) fn from_object(object: Amf0Object) -> Result<Self, CommandError> {
        let mut app = None;
        let mut connect = Self::new(String::new());

        for (key, value) in object {
            match (key.as_str(), &value) {
                ("app", Amf0Value::String(s)) => app = Some(s.clone()),
                ("flashVer", Amf0Value::String(s)) => connect.flash_ver = Some(s.clone()),
                ("swfUrl", Amf0Value::String(s)) => connect.swf_url = Some(s.clone()),
                ("tcUrl", Amf0Value::String(s)) => connect.tc_url = Some(s.clone()),
                ("fpad", Amf0Value::Boolean(b)) => connect.fpad = Some(*b),
                ("audioCodecs", Amf0Value::Number(n)) => connect.audio_codecs = Some(*n),
                ("videoCodecs", Amf0Value::Number(n)) => connect.video_codecs = Some(*n),
                ("videoFunction", Amf0Value::Number(n)) => connect.video_function = Some(*n),
                ("pageUrl", Amf0Value::String(s)) => connect.page_url = Some(s.clone()),
                ("objectEncoding", Amf0Value::Number(n)) => connect.object_encoding = Some(*n),
                ("capsEx", Amf0Value::Number(n)) => connect.caps_ex = Some(CapsExMask::from(*n as u8)),
                _ => connect.others.push((key, value)),
            }
        }

        connect.app = app.ok_or(CommandError::NoAppName)?;

        Ok(connect)
    }

    pub(super) fn to_object(&self) -> Amf0Object {
        let mut object = Amf0Object::new();

        object.push(("app".into(), Amf0Value::String(self.app.clone())));
        if let Some(flash_ver) = &self.flash_ver {
            object.push(("flashVer".into(), Amf0Value::String(flash_ver.clone())));
        }
        if let Some(swf_url) = &self.swf_url {
            object.push(("swfUrl".into(), Amf0Value::String(swf_url.clone())));
        }
        if let Some(tc_url) = &self.tc_url {
            object.push(("tcUrl".into(), Amf0Value::String(tc_url.clone())));
        }
        if let Some(fpad) = self.fpad {
            object.push(("fpad".into(), Amf0Value::Boolean(fpad)));
        }
        if let Some(audio_codecs) = self.audio_codecs {
            object.push(("audioCodecs".into(), Amf0Value::Number(audio_codecs)));
        }
        if let Some(video_codecs) = self.video_codecs {
            object.push(("videoCodecs".into(), Amf0Value::Number(video_codecs)));
        }
        if let Some(video_function) = self.video_function {
            object.push(("videoFunction".into(), Amf0Value::Number(video_function)));
        }
        if let Some(page_url) = &self.page_url {
            object.push(("pageUrl".into(), Amf0Value::String(page_url.clone())));
        }
        if let Some(object_encoding) = self.object_encoding {
            object.push(("objectEncoding".into(), Amf0Value::Number(object_encoding)));
        }
        if let Some(caps_ex) = self.caps_ex {
            object.push(("capsEx".into(), Amf0Value::Number(u8::from(caps_ex) as f64)));
        }
        object.extend(self.others.iter().cloned());

        object
    }
}

/// NetConnection command `connect` result.
///
/// Defined by:
/// - Legacy RTMP spec, 7.2.1.1
#[derive(Debug, Clone, PartialEq)]
pub struct NetConnectionConnectResult {
    /// The properties object (fmsVer, capabilities).
    pub properties: Amf0Object,
    /// The information object (level, code, description, objectEncoding).
    pub information: Amf0Object,
}

impl Default for NetConnectionConnectResult {
    fn default() -> Self {
        Self {
            properties: vec![
                ("fmsVer".into(), Amf0Value::String("FMS/3,0,1,123".into())),
                ("capabilities".into(), Amf0Value::Number(31.0)),
            ],
            information: vec![
                ("level".into(), Amf0Value::String("status".into())),
                ("code".into(), Amf0Value::String(NET_CONNECTION_CONNECT_SUCCESS.into())),
                ("description".into(), Amf0Value::String("Connection Succeeded.".into())),
                ("objectEncoding".into(), Amf0Value::Number(0.0)),
            ],
        }
    }
}

impl NetConnectionConnectResult {
    /// The default success reply carrying the given object encoding.
    pub fn success(object_encoding: f64) -> Self {
        let mut result = Self::default();
        if let Some(encoding) = result.information.iter_mut().find(|(key, _)| key == "objectEncoding") {
            encoding.1 = Amf0Value::Number(object_encoding);
        }
        result
    }
}

/// NetConnection commands as defined in 7.2.1.
#[derive(Debug, Clone, PartialEq)]
pub enum NetConnectionCommand {
    /// Connect command.
    Connect(NetConnectionConnect),
    /// Connect result.
    ///
    /// Sent from server to client in response to [`NetConnectionCommand::Connect`].
    ConnectResult(NetConnectionConnectResult),
    /// Close command.
    Close,
    /// Create stream command.
    CreateStream,
    /// Create stream result.
    ///
    /// Sent from server to client in response to [`NetConnectionCommand::CreateStream`].
    CreateStreamResult {
        /// ID of the created stream.
        stream_id: f64,
    },
}

impl NetConnectionCommand {
    /// Reads a [`NetConnectionCommand`] if `command_name` names one.
    pub(super) fn read(command_name: &str, decoder: &mut Amf0Decoder<Bytes>) -> Result<Option<Self>, CommandError> {
        match command_name {
            "connect" => {
                let object = decoder.decode_object()?;
                Ok(Some(Self::Connect(NetConnectionConnect::from_object(object)?)))
            }
            "createStream" => {
                // the command object is null
                if decoder.has_remaining() {
                    decoder.decode_value()?;
                }
                Ok(Some(Self::CreateStream))
            }
            "close" => Ok(Some(Self::Close)),
            _ => Ok(None),
        }
    }

    /// Writes this command's payload after name and transaction id.
    pub(super) fn write(&self, encoder: &mut Amf0Encoder<&mut Vec<u8>>, transaction_id: f64) -> Result<(), CommandError> {
        match self {
            Self::Connect(connect) => {
                encoder.encode_string("connect")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_object(&connect.to_object())?;
            }
            Self::ConnectResult(NetConnectionConnectResult { properties, information }) => {
                encoder.encode_string("_result")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_object(properties)?;
                encoder.encode_object(information)?;
            }
            Self::Close => {
                encoder.encode_string("close")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_null()?;
            }
            Self::CreateStream => {
                encoder.encode_string("createStream")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_null()?;
            }
            Self::CreateStreamResult { stream_id } => {
                encoder.encode_string("_result")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_null()?;
                encoder.encode_number(*stream_id)?;
            }
        }

        Ok(())
    }
}
