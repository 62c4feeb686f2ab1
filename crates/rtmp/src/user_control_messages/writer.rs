//! Writing user control messages.

use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

use super::{EventMessage, EventType};
use crate::chunk::{CHUNK_STREAM_ID_PROTOCOL_CONTROL, Chunk, ChunkWriter};
use crate::messages::MessageType;

impl EventMessage {
    fn event_type(&self) -> EventType {
        match self {
            Self::StreamBegin { .. } => EventType::StreamBegin,
            Self::StreamEof { .. } => EventType::StreamEOF,
            Self::StreamDry { .. } => EventType::StreamDry,
            Self::SetBufferLength { .. } => EventType::SetBufferLength,
            Self::StreamIsRecorded { .. } => EventType::StreamIsRecorded,
            Self::PingRequest { .. } => EventType::PingRequest,
            Self::PingResponse { .. } => EventType::PingResponse,
            Self::Unknown { event_type, .. } => *event_type,
        }
    }

    /// Writes the event message to the given writer.
    pub fn write(&self, io: &mut impl io::Write, writer: &mut ChunkWriter) -> Result<(), crate::error::RtmpError> {
        let mut data = Vec::with_capacity(10);
        data.write_u16::<BigEndian>(self.event_type().0)?;

        match self {
            Self::StreamBegin { stream_id }
            | Self::StreamEof { stream_id }
            | Self::StreamDry { stream_id }
            | Self::StreamIsRecorded { stream_id } => data.write_u32::<BigEndian>(*stream_id)?,
            Self::SetBufferLength {
                stream_id,
                buffer_length,
            } => {
                data.write_u32::<BigEndian>(*stream_id)?;
                data.write_u32::<BigEndian>(*buffer_length)?;
            }
            Self::PingRequest { timestamp } | Self::PingResponse { timestamp } => {
                data.write_u32::<BigEndian>(*timestamp)?
            }
            Self::Unknown { data: payload, .. } => data.extend_from_slice(payload),
        }

        writer.write_chunk(
            io,
            Chunk::new(
                CHUNK_STREAM_ID_PROTOCOL_CONTROL,
                0,
                MessageType::UserControlEvent,
                0,
                Bytes::from(data),
            ),
        )?;

        Ok(())
    }
}
