//! Writing [`Command`].

use std::io;

use bytes::Bytes;
use strom_amf0::Amf0Encoder;

use super::{Command, CommandError, CommandType};
use crate::chunk::{CHUNK_STREAM_ID_COMMAND, Chunk, ChunkWriter};
use crate::error::RtmpError;
use crate::messages::MessageType;

impl Command {
    /// Writes a [`Command`] to the given writer, on the given message stream.
    ///
    /// Connection-level commands travel on message stream 0; stream-level
    /// commands (publish, play, closeStream and their replies) travel on the
    /// stream they concern. Unknown commands are skipped.
    pub fn write(self, io: &mut impl io::Write, writer: &mut ChunkWriter, msg_stream_id: u32) -> Result<(), RtmpError> {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        match &self.command_type {
            CommandType::NetConnection(command) => command.write(&mut encoder, self.transaction_id)?,
            CommandType::NetStream(command) => command.write(&mut encoder, self.transaction_id)?,
            CommandType::OnStatus(command) => command.write(&mut encoder, self.transaction_id)?,
            CommandType::Result(result) => {
                encoder.encode_string(if result.success { "_result" } else { "_error" })?;
                encoder.encode_number(self.transaction_id)?;
                if result.values.is_empty() {
                    encoder.encode_null()?;
                }
                for value in &result.values {
                    encoder.encode_value(value)?;
                }
            }
            CommandType::OnFcPublish { info } => {
                encoder.encode_string("onFCPublish")?;
                encoder.encode_number(self.transaction_id)?;
                encoder.encode_null()?;
                if let Some(info) = info {
                    encoder.encode_value(info)?;
                }
            }
            // don't write unknown commands
            CommandType::Unknown { .. } => return Ok(()),
        }

        writer.write_chunk(
            io,
            Chunk::new(CHUNK_STREAM_ID_COMMAND, 0, MessageType::CommandAMF0, msg_stream_id, Bytes::from(buf)),
        )?;

        Ok(())
    }
}

impl From<CommandError> for RtmpError {
    fn from(error: CommandError) -> Self {
        RtmpError::Command(error)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::chunk::ChunkReader;
    use crate::command_messages::CommandResult;
    use crate::command_messages::netstream::NetStreamCommand;

    fn write_and_read_back(command: Command, msg_stream_id: u32) -> (Command, u32) {
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();
        command.write(&mut buf, &mut writer, msg_stream_id).unwrap();

        let mut reader = ChunkReader::default();
        let mut read_buf = BytesMut::from(&buf[..]);
        let chunk = reader.read_chunk(&mut read_buf).unwrap().unwrap();

        assert_eq!(chunk.basic_header.chunk_stream_id, CHUNK_STREAM_ID_COMMAND);
        assert_eq!(chunk.message_header.msg_type_id, MessageType::CommandAMF0);

        (Command::read(chunk.payload).unwrap(), chunk.message_header.msg_stream_id)
    }

    #[test]
    fn command_round_trips_through_chunks() {
        let command = Command {
            transaction_id: 4.0,
            command_type: CommandType::NetStream(NetStreamCommand::CloseStream),
        };

        let (decoded, msg_stream_id) = write_and_read_back(command.clone(), 1);
        assert_eq!(decoded, command);
        assert_eq!(msg_stream_id, 1);
    }

    #[test]
    fn empty_result_gets_null_command_object() {
        let command = Command {
            transaction_id: 2.0,
            command_type: CommandType::Result(CommandResult {
                success: true,
                values: vec![],
            }),
        };

        let (decoded, _) = write_and_read_back(command, 0);
        let CommandType::Result(result) = decoded.command_type else {
            panic!("expected result");
        };
        // the null placeholder is read back as a value
        assert_eq!(result.values.len(), 1);
    }
}
