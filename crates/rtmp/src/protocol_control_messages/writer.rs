//! Writing protocol control messages.

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

use super::{
    ProtocolControlMessageAbort, ProtocolControlMessageAcknowledgement, ProtocolControlMessageSetChunkSize,
    ProtocolControlMessageSetPeerBandwidth, ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::chunk::{CHUNK_STREAM_ID_PROTOCOL_CONTROL, Chunk, ChunkWriter};
use crate::messages::MessageType;

// Protocol control messages always travel on chunk stream 2, message stream
// 0, with ignored timestamps.
fn write_protocol_control(
    io: &mut impl io::Write,
    writer: &mut ChunkWriter,
    msg_type_id: MessageType,
    payload: Vec<u8>,
) -> Result<(), crate::error::RtmpError> {
    writer.write_chunk(
        io,
        Chunk::new(CHUNK_STREAM_ID_PROTOCOL_CONTROL, 0, msg_type_id, 0, Bytes::from(payload)),
    )?;

    Ok(())
}

impl ProtocolControlMessageSetChunkSize {
    /// Writes the [`ProtocolControlMessageSetChunkSize`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, writer: &mut ChunkWriter) -> Result<(), crate::error::RtmpError> {
        // the first bit must be 0
        let chunk_size = self.chunk_size & 0x7FFF_FFFF;

        write_protocol_control(io, writer, MessageType::SetChunkSize, chunk_size.to_be_bytes().to_vec())
    }
}

impl ProtocolControlMessageAbort {
    /// Writes the [`ProtocolControlMessageAbort`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, writer: &mut ChunkWriter) -> Result<(), crate::error::RtmpError> {
        write_protocol_control(io, writer, MessageType::Abort, self.chunk_stream_id.to_be_bytes().to_vec())
    }
}

impl ProtocolControlMessageAcknowledgement {
    /// Writes the [`ProtocolControlMessageAcknowledgement`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, writer: &mut ChunkWriter) -> Result<(), crate::error::RtmpError> {
        write_protocol_control(
            io,
            writer,
            MessageType::Acknowledgement,
            self.sequence_number.to_be_bytes().to_vec(),
        )
    }
}

impl ProtocolControlMessageWindowAcknowledgementSize {
    /// Writes the [`ProtocolControlMessageWindowAcknowledgementSize`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, writer: &mut ChunkWriter) -> Result<(), crate::error::RtmpError> {
        write_protocol_control(
            io,
            writer,
            MessageType::WindowAcknowledgementSize,
            self.acknowledgement_window_size.to_be_bytes().to_vec(),
        )
    }
}

impl ProtocolControlMessageSetPeerBandwidth {
    /// Writes the [`ProtocolControlMessageSetPeerBandwidth`] to the given writer.
    pub fn write(&self, io: &mut impl io::Write, writer: &mut ChunkWriter) -> Result<(), crate::error::RtmpError> {
        let mut data = Vec::with_capacity(5);
        data.write_u32::<BigEndian>(self.acknowledgement_window_size)?;
        data.write_u8(self.limit_type as u8)?;

        write_protocol_control(io, writer, MessageType::SetPeerBandwidth, data)
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::chunk::ChunkReader;
    use crate::protocol_control_messages::ProtocolControlMessageSetPeerBandwidthLimitType;

    fn round_trip(write: impl FnOnce(&mut Vec<u8>, &mut ChunkWriter)) -> Chunk {
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();
        write(&mut buf, &mut writer);

        let mut reader = ChunkReader::default();
        let mut read_buf = BytesMut::from(&buf[..]);
        reader.read_chunk(&mut read_buf).expect("read chunk").expect("chunk")
    }

    #[test]
    fn write_set_chunk_size() {
        let chunk = round_trip(|buf, writer| {
            ProtocolControlMessageSetChunkSize { chunk_size: 1 }.write(buf, writer).unwrap();
        });

        assert_eq!(chunk.basic_header.chunk_stream_id, 0x02);
        assert_eq!(chunk.message_header.msg_type_id.0, 0x01);
        assert_eq!(chunk.message_header.msg_stream_id, 0);
        assert_eq!(chunk.payload, vec![0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn write_acknowledgement() {
        let chunk = round_trip(|buf, writer| {
            ProtocolControlMessageAcknowledgement { sequence_number: 1 }
                .write(buf, writer)
                .unwrap();
        });

        assert_eq!(chunk.basic_header.chunk_stream_id, 0x02);
        assert_eq!(chunk.message_header.msg_type_id.0, 0x03);
        assert_eq!(chunk.payload, vec![0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn write_window_acknowledgement_size() {
        let chunk = round_trip(|buf, writer| {
            ProtocolControlMessageWindowAcknowledgementSize {
                acknowledgement_window_size: 1,
            }
            .write(buf, writer)
            .unwrap();
        });

        assert_eq!(chunk.message_header.msg_type_id.0, 0x05);
        assert_eq!(chunk.payload, vec![0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn write_set_peer_bandwidth() {
        let chunk = round_trip(|buf, writer| {
            ProtocolControlMessageSetPeerBandwidth {
                acknowledgement_window_size: 1,
                limit_type: ProtocolControlMessageSetPeerBandwidthLimitType::Dynamic,
            }
            .write(buf, writer)
            .unwrap();
        });

        assert_eq!(chunk.message_header.msg_type_id.0, 0x06);
        assert_eq!(chunk.payload, vec![0x00, 0x00, 0x00, 0x01, 0x02]);
    }

    #[test]
    fn write_abort() {
        let chunk = round_trip(|buf, writer| {
            ProtocolControlMessageAbort { chunk_stream_id: 4 }.write(buf, writer).unwrap();
        });

        assert_eq!(chunk.message_header.msg_type_id.0, 0x02);
        assert_eq!(chunk.payload, vec![0x00, 0x00, 0x00, 0x04]);
    }
}
