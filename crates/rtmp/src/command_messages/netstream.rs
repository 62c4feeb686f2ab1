//! NetStream command messages.

use bytes::Bytes;
use strom_amf0::{Amf0Decoder, Amf0Encoder, Amf0Value};

use super::CommandError;

/// NetStream commands as defined in 7.2.2, plus the `FC*` stream-lifecycle
/// commands every deployed encoder sends.
#[derive(Debug, Clone, PartialEq)]
pub enum NetStreamCommand {
    /// Play command.
    Play {
        /// The name of the stream to play.
        stream_name: String,
        /// Any further arguments (start, duration, reset).
        args: Vec<Amf0Value>,
    },
    /// Play2 command.
    Play2 {
        /// The parameters object.
        parameters: Vec<Amf0Value>,
    },
    /// Release stream command; asks the server to drop an old publish of the
    /// stream key.
    ReleaseStream {
        /// The stream key.
        stream_key: String,
    },
    /// FCPublish command; announces an upcoming publish of the stream key.
    FcPublish {
        /// The stream key.
        stream_key: String,
    },
    /// FCUnpublish command; announces the end of a publish of the stream key.
    FcUnpublish {
        /// The stream key.
        stream_key: String,
    },
    /// Delete stream command.
    DeleteStream {
        /// ID of the stream to delete.
        stream_id: f64,
    },
    /// Close stream command.
    CloseStream,
    /// Receive audio command.
    ReceiveAudio {
        /// Whether to receive audio.
        receive_audio: bool,
    },
    /// Receive video command.
    ReceiveVideo {
        /// Whether to receive video.
        receive_video: bool,
    },
    /// Publish command.
    Publish {
        /// Name with which the stream is published (the stream key).
        publishing_name: String,
        /// Type of publishing.
        publishing_type: PublishingType,
    },
    /// Seek command.
    Seek {
        /// Number of milliseconds to seek into the playlist.
        milliseconds: f64,
    },
    /// Pause command.
    Pause {
        /// true to pause, false to resume.
        pause: bool,
        /// The stream time at which the stream is paused or resumed.
        milliseconds: f64,
    },
}

/// Type of publishing.
///
/// Appears as part of the [`NetStreamCommand::Publish`] command.
///
/// Defined by:
/// - Legacy RTMP spec, 7.2.2.6
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishingType {
    /// Live data is published without recording it in a file.
    Live,
    /// The stream is published and the data is recorded to a new file.
    Record,
    /// The stream is published and the data is appended to a file.
    Append,
    /// Any other value.
    Unknown(String),
}

impl PublishingType {
    fn parse(s: &str) -> Self {
        match s {
            "live" => Self::Live,
            "record" => Self::Record,
            "append" => Self::Append,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl AsRef<str> for PublishingType {
    fn as_ref(&self) -> &str {
        match self {
            Self::Live => "live",
            Self::Record => "record",
            Self::Append => "append",
            Self::Unknown(s) => s,
        }
    }
}

fn decode_command_object(decoder: &mut Amf0Decoder<Bytes>) -> Result<(), CommandError> {
    // NetStream commands carry a null command object before their arguments
    if decoder.has_remaining() {
        decoder.decode_value()?;
    }
    Ok(())
}

fn decode_string_arg(decoder: &mut Amf0Decoder<Bytes>) -> Result<String, CommandError> {
    decode_command_object(decoder)?;
    Ok(decoder.decode_string()?)
}

impl NetStreamCommand {
    /// Reads a [`NetStreamCommand`] if `command_name` names one.
    pub(super) fn read(command_name: &str, decoder: &mut Amf0Decoder<Bytes>) -> Result<Option<Self>, CommandError> {
        match command_name {
            "play" => {
                decode_command_object(decoder)?;
                let stream_name = decoder.decode_string()?;
                let args = decoder.decode_all()?;
                Ok(Some(Self::Play { stream_name, args }))
            }
            "play2" => {
                decode_command_object(decoder)?;
                let parameters = decoder.decode_all()?;
                Ok(Some(Self::Play2 { parameters }))
            }
            "releaseStream" => Ok(Some(Self::ReleaseStream {
                stream_key: decode_string_arg(decoder)?,
            })),
            "FCPublish" => Ok(Some(Self::FcPublish {
                stream_key: decode_string_arg(decoder)?,
            })),
            "FCUnpublish" => Ok(Some(Self::FcUnpublish {
                stream_key: decode_string_arg(decoder)?,
            })),
            "deleteStream" => {
                decode_command_object(decoder)?;
                let stream_id = decoder.decode_number()?;
                Ok(Some(Self::DeleteStream { stream_id }))
            }
            "closeStream" => {
                decode_command_object(decoder)?;
                Ok(Some(Self::CloseStream))
            }
            "receiveAudio" => {
                decode_command_object(decoder)?;
                let receive_audio = decoder.decode_boolean()?;
                Ok(Some(Self::ReceiveAudio { receive_audio }))
            }
            "receiveVideo" => {
                decode_command_object(decoder)?;
                let receive_video = decoder.decode_boolean()?;
                Ok(Some(Self::ReceiveVideo { receive_video }))
            }
            "publish" => {
                decode_command_object(decoder)?;
                let publishing_name = decoder.decode_string()?;
                // some encoders omit the publishing type; default to live
                let publishing_type = if decoder.has_remaining() {
                    PublishingType::parse(&decoder.decode_string()?)
                } else {
                    PublishingType::Live
                };
                Ok(Some(Self::Publish {
                    publishing_name,
                    publishing_type,
                }))
            }
            "seek" => {
                decode_command_object(decoder)?;
                let milliseconds = decoder.decode_number()?;
                Ok(Some(Self::Seek { milliseconds }))
            }
            "pause" => {
                decode_command_object(decoder)?;
                let pause = decoder.decode_boolean()?;
                let milliseconds = decoder.decode_number()?;
                Ok(Some(Self::Pause { pause, milliseconds }))
            }
            _ => Ok(None),
        }
    }

    /// Writes this command's payload after name and transaction id.
    pub(super) fn write(&self, encoder: &mut Amf0Encoder<&mut Vec<u8>>, transaction_id: f64) -> Result<(), CommandError> {
        let name = match self {
            Self::Play { .. } => "play",
            Self::Play2 { .. } => "play2",
            Self::ReleaseStream { .. } => "releaseStream",
            Self::FcPublish { .. } => "FCPublish",
            Self::FcUnpublish { .. } => "FCUnpublish",
            Self::DeleteStream { .. } => "deleteStream",
            Self::CloseStream => "closeStream",
            Self::ReceiveAudio { .. } => "receiveAudio",
            Self::ReceiveVideo { .. } => "receiveVideo",
            Self::Publish { .. } => "publish",
            Self::Seek { .. } => "seek",
            Self::Pause { .. } => "pause",
        };

        encoder.encode_string(name)?;
        encoder.encode_number(transaction_id)?;
        encoder.encode_null()?;

        match self {
            Self::Play { stream_name, args } => {
                encoder.encode_string(stream_name)?;
                for arg in args {
                    encoder.encode_value(arg)?;
                }
            }
            Self::Play2 { parameters } => {
                for parameter in parameters {
                    encoder.encode_value(parameter)?;
                }
            }
            Self::ReleaseStream { stream_key } | Self::FcPublish { stream_key } | Self::FcUnpublish { stream_key } => {
                encoder.encode_string(stream_key)?;
            }
            Self::DeleteStream { stream_id } => encoder.encode_number(*stream_id)?,
            Self::CloseStream => {}
            Self::ReceiveAudio { receive_audio } => encoder.encode_boolean(*receive_audio)?,
            Self::ReceiveVideo { receive_video } => encoder.encode_boolean(*receive_video)?,
            Self::Publish {
                publishing_name,
                publishing_type,
            } => {
                encoder.encode_string(publishing_name)?;
                encoder.encode_string(publishing_type.as_ref())?;
            }
            Self::Seek { milliseconds } => encoder.encode_number(*milliseconds)?,
            Self::Pause { pause, milliseconds } => {
                encoder.encode_boolean(*pause)?;
                encoder.encode_number(*milliseconds)?;
            }
        }

        Ok(())
    }
}
