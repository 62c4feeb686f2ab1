//! Writing messages as chunk sequences.

use std::collections::HashMap;
use std::io;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use super::define::{Chunk, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE};
use super::error::ChunkWriteError;

#[derive(Debug)]
struct WriteContext {
    timestamp: u32,
    timestamp_delta: u32,
    msg_length: u32,
    msg_type_id: u8,
    msg_stream_id: u32,
    extended_timestamp: bool,
}

/// A chunk writer.
///
/// Splits messages into chunks at the negotiated chunk size and compresses
/// chunk headers against the previous message on the same chunk stream:
/// a fresh stream (or a timestamp regression) gets a full type-0 header, a
/// changed length or type a type-1 header, a changed delta a type-2 header,
/// and an exact repeat a type-3 header. Continuation chunks of a split
/// message are always type 3.
#[derive(Debug)]
pub struct ChunkWriter {
    contexts: HashMap<u32, WriteContext>,
    chunk_size: usize,
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self {
            contexts: HashMap::new(),
            chunk_size: INIT_CHUNK_SIZE,
        }
    }
}

impl ChunkWriter {
    /// Set the chunk size.
    ///
    /// The caller is responsible for also announcing the new size to the peer
    /// with a SetChunkSize message before writing anything else.
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    fn write_basic_header(io: &mut impl io::Write, fmt: ChunkType, csid: u32) -> Result<(), ChunkWriteError> {
        let fmt = fmt as u8;

        if csid >= 64 + 256 {
            if csid > 65599 {
                return Err(ChunkWriteError::InvalidChunkStreamId(csid));
            }

            io.write_u8((fmt << 6) | 1)?;
            let csid = csid - 64;

            io.write_u8((csid % 256) as u8)?;
            io.write_u8((csid / 256) as u8)?;
        } else if csid >= 64 {
            io.write_u8(fmt << 6)?;
            io.write_u8((csid - 64) as u8)?;
        } else if csid >= 2 {
            io.write_u8((fmt << 6) | csid as u8)?;
        } else {
            return Err(ChunkWriteError::InvalidChunkStreamId(csid));
        }

        Ok(())
    }

    /// Picks the most compressed header form the previous state allows.
    fn select_fmt(&self, header: &ChunkMessageHeader, csid: u32) -> (ChunkType, u32) {
        let Some(context) = self.contexts.get(&csid) else {
            return (ChunkType::Type0, 0);
        };

        // a different message stream or a timestamp going backwards always
        // resets to a full header
        if header.msg_stream_id != context.msg_stream_id || header.timestamp < context.timestamp {
            return (ChunkType::Type0, 0);
        }

        let delta = header.timestamp - context.timestamp;

        if header.msg_length == context.msg_length && header.msg_type_id.0 == context.msg_type_id {
            if delta == context.timestamp_delta {
                (ChunkType::Type3, delta)
            } else {
                (ChunkType::Type2, delta)
            }
        } else {
            (ChunkType::Type1, delta)
        }
    }

    /// Write a message into some writer as one or more chunks.
    pub fn write_chunk(&mut self, io: &mut impl io::Write, chunk: Chunk) -> Result<(), ChunkWriteError> {
        if chunk.payload.len() > 0xFF_FFFF {
            return Err(ChunkWriteError::PayloadTooLarge(chunk.payload.len()));
        }

        let csid = chunk.basic_header.chunk_stream_id;
        let header = &chunk.message_header;

        let (fmt, delta) = self.select_fmt(header, csid);

        Self::write_basic_header(io, fmt, csid)?;

        // the 24-bit field of the first chunk and whether it escaped to the
        // 4-byte extended form
        let (field, extended) = match fmt {
            ChunkType::Type0 => (header.timestamp, header.timestamp >= 0xFFFFFF),
            _ => (delta, delta >= 0xFFFFFF),
        };

        match fmt {
            ChunkType::Type0 => {
                io.write_u24::<BigEndian>(field.min(0xFFFFFF))?;
                io.write_u24::<BigEndian>(header.msg_length)?;
                io.write_u8(header.msg_type_id.0)?;
                io.write_u32::<LittleEndian>(header.msg_stream_id)?;
            }
            ChunkType::Type1 => {
                io.write_u24::<BigEndian>(field.min(0xFFFFFF))?;
                io.write_u24::<BigEndian>(header.msg_length)?;
                io.write_u8(header.msg_type_id.0)?;
            }
            ChunkType::Type2 => {
                io.write_u24::<BigEndian>(field.min(0xFFFFFF))?;
            }
            ChunkType::Type3 => {}
        }

        if extended {
            io.write_u32::<BigEndian>(field)?;
        }

        // update the per-stream state for the next message
        self.contexts.insert(
            csid,
            WriteContext {
                timestamp: header.timestamp,
                timestamp_delta: if fmt == ChunkType::Type0 { 0 } else { delta },
                msg_length: header.msg_length,
                msg_type_id: header.msg_type_id.0,
                msg_stream_id: header.msg_stream_id,
                extended_timestamp: extended,
            },
        );

        // payload, split at the chunk size with type-3 continuations
        let mut payload = chunk.payload;
        loop {
            let take = payload.len().min(self.chunk_size);
            let piece = payload.split_to(take);
            io.write_all(&piece)?;

            if payload.is_empty() {
                break;
            }

            Self::write_basic_header(io, ChunkType::Type3, csid)?;
            if extended {
                // continuation chunks repeat the extended timestamp field
                io.write_u32::<BigEndian>(field)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::chunk::reader::ChunkReader;
    use crate::messages::MessageType;

    #[test]
    fn write_small_chunk() {
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();

        let chunk = Chunk::new(
            3,
            0,
            MessageType::Abort,
            0,
            Bytes::from(vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]),
        );

        writer.write_chunk(&mut buf, chunk).unwrap();

        #[rustfmt::skip]
        assert_eq!(
            buf,
            vec![
                0x03, // chunk basic header - fmt: 0, csid: 3
                0x00, 0x00, 0x00, // timestamp (0)
                0x00, 0x00, 0x08, // message length (8 bytes)
                0x02, // message type id (abort)
                0x00, 0x00, 0x00, 0x00, // message stream id (0)
                0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, // message payload
            ]
        );
    }

    #[test]
    fn large_message_splits_with_type3_continuations() {
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();

        let payload: Vec<u8> = (0..400u32).map(|i| i as u8).collect();
        let chunk = Chunk::new(4, 0, MessageType::Audio, 1, Bytes::from(payload.clone()));

        writer.write_chunk(&mut buf, chunk).unwrap();

        // header forms 0, 3, 3, 3 with payload sizes 128, 128, 128, 16
        assert_eq!(buf[0] >> 6, 0);
        assert_eq!(buf[12 + 128] >> 6, 3);
        assert_eq!(buf[12 + 128 + 1 + 128] >> 6, 3);
        assert_eq!(buf[12 + 128 + 1 + 128 + 1 + 128] >> 6, 3);
        assert_eq!(buf.len(), 12 + 400 + 3);

        // the receiver reassembles the original payload
        let mut read_buf = BytesMut::from(&buf[..]);
        let mut reader = ChunkReader::default();
        let message = reader.read_chunk(&mut read_buf).unwrap().unwrap();
        assert_eq!(message.payload, Bytes::from(payload));
    }

    #[test]
    fn header_compression_ladder() {
        let mut writer = ChunkWriter::default();

        // first message: full header
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 0, MessageType::Audio, 1, Bytes::from_static(&[0; 4])))
            .unwrap();
        assert_eq!(buf[0] >> 6, 0);

        // same length and type, new delta: type 2
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 20, MessageType::Audio, 1, Bytes::from_static(&[0; 4])))
            .unwrap();
        assert_eq!(buf[0] >> 6, 2);

        // same delta again: type 3
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 40, MessageType::Audio, 1, Bytes::from_static(&[0; 4])))
            .unwrap();
        assert_eq!(buf[0] >> 6, 3);

        // new length: type 1
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 60, MessageType::Audio, 1, Bytes::from_static(&[0; 8])))
            .unwrap();
        assert_eq!(buf[0] >> 6, 1);

        // new message stream id: back to type 0
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 80, MessageType::Audio, 2, Bytes::from_static(&[0; 8])))
            .unwrap();
        assert_eq!(buf[0] >> 6, 0);
    }

    #[test]
    fn timestamp_regression_resets_to_type0() {
        let mut writer = ChunkWriter::default();

        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 100, MessageType::Audio, 1, Bytes::from_static(&[0; 4])))
            .unwrap();

        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(4, 50, MessageType::Audio, 1, Bytes::from_static(&[0; 4])))
            .unwrap();
        assert_eq!(buf[0] >> 6, 0);
    }

    #[test]
    fn extended_timestamp_boundary() {
        let mut writer = ChunkWriter::default();

        // exactly 0xFFFFFF must use the escape
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(3, 0xFFFFFF, MessageType::Abort, 0, Bytes::from_static(&[0])))
            .unwrap();
        assert_eq!(&buf[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&buf[12..16], &[0x00, 0xFF, 0xFF, 0xFF]);

        // one less must not
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(3, 0xFFFFFE, MessageType::Abort, 0, Bytes::from_static(&[0])))
            .unwrap();
        assert_eq!(&buf[1..4], &[0xFF, 0xFF, 0xFE]);
        // header (12 bytes) followed directly by the payload
        assert_eq!(buf.len(), 13);
    }

    #[test]
    fn extended_timestamp_repeats_on_continuations() {
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();

        let chunk = Chunk::new(3, 0xFFFFFFFF, MessageType::Abort, 0, Bytes::from(vec![0u8; 129]));
        writer.write_chunk(&mut buf, chunk).unwrap();

        #[rustfmt::skip]
        let mut expected = vec![
            0x03, // fmt 0, csid 3
            0xFF, 0xFF, 0xFF, // timestamp escape
            0x00, 0x00, 0x81, // message length (129 bytes)
            0x02, // message type id (abort)
            0x00, 0x00, 0x00, 0x00, // message stream id (0)
            0xFF, 0xFF, 0xFF, 0xFF, // extended timestamp
        ];
        expected.extend([0u8; 128]);
        expected.push(0b11_000011); // fmt 3, csid 3
        expected.extend([0xFF, 0xFF, 0xFF, 0xFF]); // extended timestamp repeat
        expected.push(0);

        assert_eq!(buf, expected);
    }

    #[test]
    fn extended_csid_forms() {
        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(64, 0, MessageType::Abort, 0, Bytes::from_static(&[0])))
            .unwrap();
        assert_eq!(&buf[..2], &[0x00, 0x00]);

        let mut writer = ChunkWriter::default();
        let mut buf = Vec::new();
        writer
            .write_chunk(&mut buf, Chunk::new(320, 0, MessageType::Abort, 0, Bytes::from_static(&[0])))
            .unwrap();
        assert_eq!(&buf[..3], &[0x01, 0x00, 0x01]);
    }

    #[test]
    fn invalid_csid() {
        let mut writer = ChunkWriter::default();
        let err = writer
            .write_chunk(&mut Vec::new(), Chunk::new(1, 0, MessageType::Abort, 0, Bytes::new()))
            .unwrap_err();
        assert!(matches!(err, ChunkWriteError::InvalidChunkStreamId(1)));

        let err = writer
            .write_chunk(&mut Vec::new(), Chunk::new(65600, 0, MessageType::Abort, 0, Bytes::new()))
            .unwrap_err();
        assert!(matches!(err, ChunkWriteError::InvalidChunkStreamId(65600)));
    }
}
