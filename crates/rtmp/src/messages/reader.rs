//! Reading [`MessageData`].

use super::{MessageData, MessageType, UnknownMessage};
use crate::chunk::Chunk;
use crate::command_messages::Command;
use crate::protocol_control_messages::{
    ProtocolControlMessageAbort, ProtocolControlMessageAcknowledgement, ProtocolControlMessageSetChunkSize,
    ProtocolControlMessageSetPeerBandwidth, ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::user_control_messages::EventMessage;

impl MessageData {
    /// Reads [`MessageData`] from the given chunk.
    pub fn read(chunk: &Chunk) -> Result<Self, crate::error::RtmpError> {
        match chunk.message_header.msg_type_id {
            // Protocol Control Messages
            MessageType::SetChunkSize => {
                let data = ProtocolControlMessageSetChunkSize::read(&chunk.payload)?;
                Ok(Self::SetChunkSize(data))
            }
            MessageType::Abort => {
                let data = ProtocolControlMessageAbort::read(&chunk.payload)?;
                Ok(Self::Abort(data))
            }
            MessageType::Acknowledgement => {
                let data = ProtocolControlMessageAcknowledgement::read(&chunk.payload)?;
                Ok(Self::Acknowledgement(data))
            }
            MessageType::UserControlEvent => {
                let data = EventMessage::read(&chunk.payload)?;
                Ok(Self::UserControl(data))
            }
            MessageType::WindowAcknowledgementSize => {
                let data = ProtocolControlMessageWindowAcknowledgementSize::read(&chunk.payload)?;
                Ok(Self::SetAcknowledgementWindowSize(data))
            }
            MessageType::SetPeerBandwidth => {
                let data = ProtocolControlMessageSetPeerBandwidth::read(&chunk.payload)?;
                Ok(Self::SetPeerBandwidth(data))
            }
            // RTMP Command Messages
            MessageType::Audio => Ok(Self::AudioData {
                data: chunk.payload.clone(),
            }),
            MessageType::Video => Ok(Self::VideoData {
                data: chunk.payload.clone(),
            }),
            MessageType::CommandAMF0 => Ok(Self::Command(Command::read(chunk.payload.clone())?)),
            MessageType::CommandAMF3 => {
                // AMF3 command payloads open with a format byte; 0 demotes the
                // rest of the payload to plain AMF0, which is what every
                // deployed server emits.
                let payload = chunk.payload.clone();
                if payload.first() == Some(&0) {
                    Ok(Self::Command(Command::read(payload.slice(1..))?))
                } else {
                    Ok(Self::Unknown(UnknownMessage {
                        msg_type_id: MessageType::CommandAMF3,
                        data: payload,
                    }))
                }
            }
            MessageType::DataAMF0 => Ok(Self::DataAmf0 {
                data: chunk.payload.clone(),
            }),
            MessageType::DataAMF3 => Ok(Self::DataAmf3 {
                data: chunk.payload.clone(),
            }),
            MessageType::SharedObjAMF0 => Ok(Self::SharedObjAmf0 {
                data: chunk.payload.clone(),
            }),
            MessageType::SharedObjAMF3 => Ok(Self::SharedObjAmf3 {
                data: chunk.payload.clone(),
            }),
            MessageType::Aggregate => Ok(Self::Aggregate {
                data: chunk.payload.clone(),
            }),
            msg_type_id => Ok(Self::Unknown(UnknownMessage {
                msg_type_id,
                data: chunk.payload.clone(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use strom_amf0::{Amf0Encoder, Amf0Value};

    use super::*;
    use crate::command_messages::CommandType;
    use crate::command_messages::netconnection::NetConnectionCommand;

    #[test]
    fn parse_connect_command() {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        encoder.encode_string("connect").unwrap();
        encoder.encode_number(1.0).unwrap();
        encoder
            .encode_object(&vec![("app".to_string(), Amf0Value::String("testapp".into()))])
            .unwrap();

        let chunk = Chunk::new(3, 0, MessageType::CommandAMF0, 0, Bytes::from(buf));

        let message = MessageData::read(&chunk).expect("no errors");
        let MessageData::Command(Command {
            transaction_id,
            command_type,
        }) = message
        else {
            panic!("wrong message type");
        };

        assert_eq!(transaction_id, 1.0);

        let CommandType::NetConnection(NetConnectionCommand::Connect(connect)) = command_type else {
            panic!("wrong command");
        };

        assert_eq!(connect.app, "testapp");
    }

    #[test]
    fn parse_amf3_command_with_format_byte() {
        let mut buf = vec![0u8]; // amf0 format escape
        let mut encoder = Amf0Encoder::new(&mut buf);
        encoder.encode_string("createStream").unwrap();
        encoder.encode_number(2.0).unwrap();
        encoder.encode_null().unwrap();

        let chunk = Chunk::new(3, 0, MessageType::CommandAMF3, 0, Bytes::from(buf));

        let message = MessageData::read(&chunk).expect("no errors");
        assert!(matches!(
            message,
            MessageData::Command(Command {
                command_type: CommandType::NetConnection(NetConnectionCommand::CreateStream),
                ..
            })
        ));
    }

    #[test]
    fn parse_audio_packet() {
        let chunk = Chunk::new(4, 0, MessageType::Audio, 1, Bytes::from_static(&[0xAF, 0x01, 0x00]));

        let message = MessageData::read(&chunk).expect("no errors");
        let MessageData::AudioData { data } = message else {
            panic!("wrong message type");
        };
        assert_eq!(data, Bytes::from_static(&[0xAF, 0x01, 0x00]));
    }

    #[test]
    fn parse_set_chunk_size() {
        let chunk = Chunk::new(2, 0, MessageType::SetChunkSize, 0, Bytes::from_static(&[0x00, 0x00, 0x10, 0x00]));

        let message = MessageData::read(&chunk).expect("no errors");
        let MessageData::SetChunkSize(ProtocolControlMessageSetChunkSize { chunk_size }) = message else {
            panic!("wrong message type");
        };
        assert_eq!(chunk_size, 4096);
    }

    #[test]
    fn unknown_message_type_passes_through() {
        let chunk = Chunk::new(3, 0, MessageType(42), 0, Bytes::from_static(&[0x00]));

        assert!(matches!(
            MessageData::read(&chunk).expect("no errors"),
            MessageData::Unknown(UnknownMessage {
                msg_type_id: MessageType(42),
                ..
            })
        ));
    }
}
