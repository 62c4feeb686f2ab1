//! Reading user control messages.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;

use super::{EventMessage, EventType};
use crate::messages::MessageError;

impl EventMessage {
    /// Reads an [`EventMessage`] from the given data.
    pub fn read(data: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor::new(data);
        let event_type = EventType::from(cursor.read_u16::<BigEndian>()?);

        let event = match event_type {
            EventType::StreamBegin => Self::StreamBegin {
                stream_id: cursor.read_u32::<BigEndian>()?,
            },
            EventType::StreamEOF => Self::StreamEof {
                stream_id: cursor.read_u32::<BigEndian>()?,
            },
            EventType::StreamDry => Self::StreamDry {
                stream_id: cursor.read_u32::<BigEndian>()?,
            },
            EventType::SetBufferLength => Self::SetBufferLength {
                stream_id: cursor.read_u32::<BigEndian>()?,
                buffer_length: cursor.read_u32::<BigEndian>()?,
            },
            EventType::StreamIsRecorded => Self::StreamIsRecorded {
                stream_id: cursor.read_u32::<BigEndian>()?,
            },
            EventType::PingRequest => Self::PingRequest {
                timestamp: cursor.read_u32::<BigEndian>()?,
            },
            EventType::PingResponse => Self::PingResponse {
                timestamp: cursor.read_u32::<BigEndian>()?,
            },
            event_type => Self::Unknown {
                event_type,
                data: Bytes::copy_from_slice(&data[cursor.position() as usize..]),
            },
        };

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn read_stream_begin() {
        let event = EventMessage::read(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(event, EventMessage::StreamBegin { stream_id: 1 });
    }

    #[test]
    fn read_set_buffer_length() {
        let event = EventMessage::read(&[0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x0B, 0xB8]).unwrap();
        assert_eq!(
            event,
            EventMessage::SetBufferLength {
                stream_id: 1,
                buffer_length: 3000
            }
        );
    }

    #[test]
    fn read_ping_request() {
        let event = EventMessage::read(&[0x00, 0x06, 0x12, 0x34, 0x56, 0x78]).unwrap();
        assert_eq!(event, EventMessage::PingRequest { timestamp: 0x12345678 });
    }

    #[test]
    fn read_unknown_event() {
        let event = EventMessage::read(&[0x00, 0x20, 0xAA, 0xBB]).unwrap();
        assert_eq!(
            event,
            EventMessage::Unknown {
                event_type: EventType(0x20),
                data: Bytes::from_static(&[0xAA, 0xBB])
            }
        );
    }
}
