use bytes::Bytes;

use crate::messages::MessageType;

/// The chunk size both peers start with, before any `SetChunkSize`.
pub const INIT_CHUNK_SIZE: usize = 128;

/// The smallest chunk size a peer may negotiate.
pub const MIN_CHUNK_SIZE: usize = 128;

/// The largest chunk size a peer may negotiate.
pub const MAX_CHUNK_SIZE: usize = 65536;

/// The chunk size this implementation announces for its write direction.
pub const OUT_CHUNK_SIZE: usize = 4096;

/// Chunk stream id used for protocol control messages.
pub const CHUNK_STREAM_ID_PROTOCOL_CONTROL: u32 = 2;
/// Chunk stream id used for command messages.
pub const CHUNK_STREAM_ID_COMMAND: u32 = 3;
/// Chunk stream id used for audio messages.
pub const CHUNK_STREAM_ID_AUDIO: u32 = 4;
/// Chunk stream id used for video messages.
pub const CHUNK_STREAM_ID_VIDEO: u32 = 5;
/// Chunk stream id used for data (metadata) messages.
pub const CHUNK_STREAM_ID_DATA: u32 = 6;

/// The four chunk message header forms.
///
/// Defined by:
/// - Legacy RTMP spec, 5.3.1.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkType {
    /// Full header: absolute timestamp, length, type and stream id.
    Type0 = 0,
    /// Timestamp delta, length and type; stream id inherited.
    Type1 = 1,
    /// Timestamp delta only; everything else inherited.
    Type2 = 2,
    /// Empty header; everything inherited.
    Type3 = 3,
}

/// Chunk basic header.
///
/// Defined by:
/// - Legacy RTMP spec, 5.3.1.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBasicHeader {
    /// The chunk stream id this chunk belongs to. Valid ids are 2..=65599;
    /// the wire form grows from one to three bytes with the id.
    pub chunk_stream_id: u32,
}

/// Chunk message header.
///
/// Always stored in its full (type 0) form; the compressed forms are a wire
/// concern of the reader and writer.
///
/// Defined by:
/// - Legacy RTMP spec, 5.3.1.2
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkMessageHeader {
    /// The absolute timestamp of the message, in milliseconds.
    pub timestamp: u32,
    /// The length of the message payload in bytes.
    pub msg_length: u32,
    /// The message type id.
    pub msg_type_id: MessageType,
    /// The message stream id. Little-endian on the wire in type 0 headers.
    pub msg_stream_id: u32,
}

impl ChunkMessageHeader {
    /// Whether this header needs the 4-byte extended timestamp field.
    #[inline]
    pub fn is_extended_timestamp(&self) -> bool {
        self.timestamp >= 0xFFFFFF
    }
}

/// A complete RTMP message as carried by one or more chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// The basic header of the chunk.
    pub basic_header: ChunkBasicHeader,
    /// The message header of the chunk.
    pub message_header: ChunkMessageHeader,
    /// The payload of the chunk.
    pub payload: Bytes,
}

impl Chunk {
    /// Create a new chunk.
    pub fn new(chunk_stream_id: u32, timestamp: u32, msg_type_id: MessageType, msg_stream_id: u32, payload: Bytes) -> Self {
        Self {
            basic_header: ChunkBasicHeader { chunk_stream_id },
            message_header: ChunkMessageHeader {
                timestamp,
                msg_length: payload.len() as u32,
                msg_type_id,
                msg_stream_id,
            },
            payload,
        }
    }
}
