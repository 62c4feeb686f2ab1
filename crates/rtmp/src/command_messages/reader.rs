//! Reading [`Command`].

use bytes::Bytes;
use strom_amf0::{Amf0Decoder, Amf0Value};

use super::netconnection::NetConnectionCommand;
use super::netstream::NetStreamCommand;
use super::on_status::OnStatus;
use super::{Command, CommandError, CommandResult, CommandType, UnknownCommand};

impl Command {
    /// Reads a [`Command`] from the given payload.
    pub fn read(payload: Bytes) -> Result<Self, CommandError> {
        let mut decoder = Amf0Decoder::new(payload);

        let command_name = decoder.decode_string()?;
        let transaction_id = decoder.decode_number()?;

        let command_type = CommandType::read(command_name, &mut decoder)?;

        Ok(Self {
            transaction_id,
            command_type,
        })
    }
}

impl CommandType {
    fn read(command_name: String, decoder: &mut Amf0Decoder<Bytes>) -> Result<Self, CommandError> {
        match command_name.as_str() {
            "_result" | "_error" => {
                return Ok(Self::Result(CommandResult {
                    success: command_name == "_result",
                    values: decoder.decode_all()?,
                }));
            }
            "onStatus" => {
                // the null command object precedes the info object
                let info = decoder
                    .decode_all()?
                    .into_iter()
                    .find_map(|value| match value {
                        Amf0Value::Object(object) | Amf0Value::EcmaArray(object) => Some(object),
                        _ => None,
                    })
                    .ok_or(CommandError::InvalidOnStatusInfoObject)?;

                return Ok(Self::OnStatus(OnStatus::from_info_object(info)));
            }
            "onFCPublish" => {
                let info = decoder.decode_all()?.into_iter().find(|value| !matches!(value, Amf0Value::Null));
                return Ok(Self::OnFcPublish { info });
            }
            _ => {}
        }

        if let Some(command) = NetConnectionCommand::read(&command_name, decoder)? {
            return Ok(Self::NetConnection(command));
        }

        if let Some(command) = NetStreamCommand::read(&command_name, decoder)? {
            return Ok(Self::NetStream(command));
        }

        let values = decoder.decode_all()?;
        Ok(Self::Unknown(UnknownCommand { command_name, values }))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use strom_amf0::Amf0Encoder;

    use super::*;
    use crate::command_messages::CommandResultLevel;
    use crate::command_messages::netstream::PublishingType;

    fn encode(f: impl FnOnce(&mut Amf0Encoder<&mut Vec<u8>>)) -> Bytes {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);
        f(&mut encoder);
        Bytes::from(buf)
    }

    #[test]
    fn read_result() {
        let payload = encode(|encoder| {
            encoder.encode_string("_result").unwrap();
            encoder.encode_number(2.0).unwrap();
            encoder.encode_null().unwrap();
            encoder.encode_number(3.0).unwrap();
        });

        let command = Command::read(payload).unwrap();
        assert_eq!(command.transaction_id, 2.0);

        let CommandType::Result(result) = command.command_type else {
            panic!("expected result");
        };
        assert!(result.success);
        assert_eq!(result.stream_id(), Some(3));
    }

    #[test]
    fn read_error_result() {
        let payload = encode(|encoder| {
            encoder.encode_string("_error").unwrap();
            encoder.encode_number(2.0).unwrap();
            encoder.encode_null().unwrap();
        });

        let command = Command::read(payload).unwrap();
        assert!(matches!(
            command.command_type,
            CommandType::Result(CommandResult { success: false, .. })
        ));
    }

    #[test]
    fn read_on_status() {
        let payload = encode(|encoder| {
            encoder.encode_string("onStatus").unwrap();
            encoder.encode_number(0.0).unwrap();
            encoder.encode_null().unwrap();
            encoder
                .encode_object(&vec![
                    ("level".to_string(), Amf0Value::String("status".into())),
                    ("code".to_string(), Amf0Value::String("NetStream.Publish.Start".into())),
                ])
                .unwrap();
        });

        let command = Command::read(payload).unwrap();
        let CommandType::OnStatus(status) = command.command_type else {
            panic!("expected onStatus");
        };

        assert_eq!(status.level, CommandResultLevel::Status);
        assert_eq!(status.code, "NetStream.Publish.Start");
    }

    #[test]
    fn read_publish() {
        let payload = encode(|encoder| {
            encoder.encode_string("publish").unwrap();
            encoder.encode_number(5.0).unwrap();
            encoder.encode_null().unwrap();
            encoder.encode_string("stream-key").unwrap();
            encoder.encode_string("live").unwrap();
        });

        let command = Command::read(payload).unwrap();
        assert_eq!(
            command.command_type,
            CommandType::NetStream(NetStreamCommand::Publish {
                publishing_name: "stream-key".into(),
                publishing_type: PublishingType::Live,
            })
        );
    }

    #[test]
    fn read_unknown_command() {
        let payload = encode(|encoder| {
            encoder.encode_string("onBWDone").unwrap();
            encoder.encode_number(0.0).unwrap();
            encoder.encode_null().unwrap();
        });

        let command = Command::read(payload).unwrap();
        let CommandType::Unknown(unknown) = command.command_type else {
            panic!("expected unknown command");
        };
        assert_eq!(unknown.command_name, "onBWDone");
    }

    #[test]
    fn extra_trailing_arguments_are_tolerated() {
        let payload = encode(|encoder| {
            encoder.encode_string("_result").unwrap();
            encoder.encode_number(1.0).unwrap();
            encoder.encode_null().unwrap();
            encoder.encode_number(1.0).unwrap();
            encoder.encode_string("extra").unwrap();
            encoder.encode_boolean(true).unwrap();
        });

        let command = Command::read(payload).unwrap();
        let CommandType::Result(result) = command.command_type else {
            panic!("expected result");
        };
        assert_eq!(result.values.len(), 4);
    }
}
