//! Reading chunks and assembling them back into messages.

use std::collections::HashMap;
use std::io::{self, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use bytes::{Buf, BytesMut};

use super::define::{Chunk, ChunkBasicHeader, ChunkMessageHeader, INIT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use super::error::ChunkReadError;
use crate::messages::MessageType;

// Bounds on per-connection state so a misbehaving peer cannot grow our
// tables or buffers without limit.
const MAX_CHUNK_STREAMS: usize = 64;
const MAX_PARTIAL_CHUNKS: usize = 8;
// The message length field is 24 bits, so this is the hard ceiling anyway.
const MAX_MESSAGE_LENGTH: usize = 0xFF_FFFF;

#[derive(Debug, Default)]
struct ReadContext {
    timestamp: u32,
    timestamp_delta: u32,
    msg_length: u32,
    msg_type_id: u8,
    msg_stream_id: u32,
    extended_timestamp: bool,
    partial: Option<BytesMut>,
}

/// The fully decoded effect of one chunk header, before it is committed to
/// the per-stream state. Keeping the parse free of side effects makes a
/// partial read (not enough buffered bytes) safely retryable.
struct PendingHeader {
    timestamp: u32,
    timestamp_delta: u32,
    msg_length: u32,
    msg_type_id: u8,
    msg_stream_id: u32,
    extended_timestamp: bool,
    /// Whether this chunk continues the in-flight message instead of
    /// starting a new one.
    continuation: bool,
}

/// A chunk reader.
///
/// Parses incoming bytes into chunks, fills compressed headers in from the
/// per-chunk-stream state and reassembles message payloads split across
/// multiple chunks.
#[derive(Debug)]
pub struct ChunkReader {
    contexts: HashMap<u32, ReadContext>,
    max_chunk_size: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self {
            contexts: HashMap::new(),
            max_chunk_size: INIT_CHUNK_SIZE,
        }
    }
}

enum ParseOutcome {
    /// A full message was assembled.
    Message(Chunk),
    /// A chunk was consumed but its message is not complete yet.
    Partial,
    /// Not enough buffered bytes for the next chunk.
    NeedMore,
}

impl ChunkReader {
    /// Adopts a new read chunk size announced by the peer.
    ///
    /// Returns false (and keeps the old size) when the size is outside the
    /// valid 128..=65536 range.
    pub fn update_max_chunk_size(&mut self, chunk_size: usize) -> bool {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            tracing::warn!(chunk_size, "ignoring invalid chunk size");
            return false;
        }

        self.max_chunk_size = chunk_size;
        true
    }

    /// Drops the partially assembled message of a chunk stream.
    ///
    /// This is what an Abort Message (type 2) asks for.
    pub fn abort(&mut self, chunk_stream_id: u32) {
        if let Some(context) = self.contexts.get_mut(&chunk_stream_id) {
            context.partial = None;
        }
    }

    /// Reads one complete message from the buffer, if enough bytes arrived.
    ///
    /// Consumes any number of chunks from `buf`; bytes of an incomplete chunk
    /// are left untouched so the caller can retry after reading more. Returns
    /// `Ok(None)` when more bytes are needed.
    pub fn read_chunk(&mut self, buf: &mut BytesMut) -> Result<Option<Chunk>, ChunkReadError> {
        loop {
            match self.parse_chunk(buf)? {
                ParseOutcome::Message(chunk) => return Ok(Some(chunk)),
                ParseOutcome::Partial => continue,
                ParseOutcome::NeedMore => return Ok(None),
            }
        }
    }

    /// Reads all complete messages currently in `buf`.
    pub fn read_all(&mut self, buf: &mut BytesMut) -> Result<Vec<Chunk>, ChunkReadError> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.read_chunk(buf)? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    fn parse_chunk(&mut self, buf: &mut BytesMut) -> Result<ParseOutcome, ChunkReadError> {
        let mut cursor = io::Cursor::new(&buf[..]);

        let Some((fmt, chunk_stream_id)) = read_basic_header(&mut cursor)? else {
            return Ok(ParseOutcome::NeedMore);
        };

        if chunk_stream_id < 2 {
            return Err(ChunkReadError::InvalidChunkStreamId(chunk_stream_id));
        }

        let fresh_context = ReadContext::default();
        let context = match self.contexts.get(&chunk_stream_id) {
            Some(context) => context,
            None if fmt != 0 => return Err(ChunkReadError::MissingPreviousChunkHeader(chunk_stream_id)),
            None if self.contexts.len() >= MAX_CHUNK_STREAMS => return Err(ChunkReadError::TooManyPreviousChunkHeaders),
            None => &fresh_context,
        };

        // Parse the message header into a pending view of the new state; the
        // context is only written once the whole chunk is known to be
        // buffered, so a short read can simply be retried.
        let Some(pending) = parse_message_header(&mut cursor, fmt, context)? else {
            return Ok(ParseOutcome::NeedMore);
        };

        let msg_length = pending.msg_length as usize;
        if msg_length > MAX_MESSAGE_LENGTH {
            return Err(ChunkReadError::PartialChunkTooLarge(msg_length));
        }

        let assembled = if pending.continuation {
            context.partial.as_ref().map(|p| p.len()).unwrap_or(0)
        } else {
            0
        };

        let need = self.max_chunk_size.min(msg_length - assembled);
        if cursor.remaining() < need {
            return Ok(ParseOutcome::NeedMore);
        }

        if !pending.continuation {
            let partial_count = self.contexts.values().filter(|c| c.partial.is_some()).count();
            if partial_count >= MAX_PARTIAL_CHUNKS {
                return Err(ChunkReadError::TooManyPartialChunks);
            }
        }

        // The whole chunk is buffered: commit the state, take the payload
        // bytes and consume it from the buffer.
        let context = self.contexts.entry(chunk_stream_id).or_default();

        if !pending.continuation && context.partial.is_some() {
            tracing::warn!(chunk_stream_id, "discarding incomplete message");
            context.partial = None;
        }

        context.timestamp = pending.timestamp;
        context.timestamp_delta = pending.timestamp_delta;
        context.msg_length = pending.msg_length;
        context.msg_type_id = pending.msg_type_id;
        context.msg_stream_id = pending.msg_stream_id;
        context.extended_timestamp = pending.extended_timestamp;

        let payload_start = cursor.position() as usize;
        let partial = context.partial.get_or_insert_with(|| BytesMut::with_capacity(msg_length));
        partial.extend_from_slice(&buf[payload_start..payload_start + need]);

        buf.advance(payload_start + need);

        if partial.len() == msg_length {
            let payload = context.partial.take().expect("partial inserted above").freeze();

            return Ok(ParseOutcome::Message(Chunk {
                basic_header: ChunkBasicHeader { chunk_stream_id },
                message_header: ChunkMessageHeader {
                    timestamp: context.timestamp,
                    msg_length: context.msg_length,
                    msg_type_id: MessageType::from(context.msg_type_id),
                    msg_stream_id: context.msg_stream_id,
                },
                payload,
            }));
        }

        Ok(ParseOutcome::Partial)
    }
}

/// Decodes the message header of format `fmt` against the previous state,
/// without touching it. `None` means the header is not fully buffered yet.
fn parse_message_header(
    cursor: &mut io::Cursor<&[u8]>,
    fmt: u8,
    context: &ReadContext,
) -> Result<Option<PendingHeader>, ChunkReadError> {
    match fmt {
        0 => {
            if cursor.remaining() < 11 {
                return Ok(None);
            }

            let timestamp = cursor.read_u24::<BigEndian>()?;
            let msg_length = cursor.read_u24::<BigEndian>()?;
            let msg_type_id = cursor.read_u8()?;
            let msg_stream_id = cursor.read_u32::<LittleEndian>()?;

            let extended_timestamp = timestamp == 0xFFFFFF;
            let timestamp = if extended_timestamp {
                if cursor.remaining() < 4 {
                    return Ok(None);
                }
                cursor.read_u32::<BigEndian>()?
            } else {
                timestamp
            };

            Ok(Some(PendingHeader {
                timestamp,
                timestamp_delta: 0,
                msg_length,
                msg_type_id,
                msg_stream_id,
                extended_timestamp,
                continuation: false,
            }))
        }
        1 | 2 => {
            let header_size = if fmt == 1 { 7 } else { 3 };
            if cursor.remaining() < header_size {
                return Ok(None);
            }

            let delta = cursor.read_u24::<BigEndian>()?;
            let (msg_length, msg_type_id) = if fmt == 1 {
                (cursor.read_u24::<BigEndian>()?, cursor.read_u8()?)
            } else {
                (context.msg_length, context.msg_type_id)
            };

            let extended_timestamp = delta == 0xFFFFFF;
            let delta = if extended_timestamp {
                if cursor.remaining() < 4 {
                    return Ok(None);
                }
                cursor.read_u32::<BigEndian>()?
            } else {
                delta
            };

            let timestamp = context
                .timestamp
                .checked_add(delta)
                .ok_or(ChunkReadError::TimestampOverflow(context.timestamp, delta))?;

            Ok(Some(PendingHeader {
                timestamp,
                timestamp_delta: delta,
                msg_length,
                msg_type_id,
                msg_stream_id: context.msg_stream_id,
                extended_timestamp,
                continuation: false,
            }))
        }
        3 => {
            let continuation = context.partial.is_some();

            // An extended timestamp in effect is repeated after every
            // type-3 basic header (RTMP clarification >= 1.1).
            let mut delta = context.timestamp_delta;
            if context.extended_timestamp {
                if cursor.remaining() < 4 {
                    return Ok(None);
                }
                let repeated = cursor.read_u32::<BigEndian>()?;
                if !continuation {
                    delta = repeated;
                }
            }

            // Continuation chunks of an in-flight message do not advance the
            // timestamp; a fresh message repeats the previous delta.
            let timestamp = if continuation {
                context.timestamp
            } else {
                context
                    .timestamp
                    .checked_add(delta)
                    .ok_or(ChunkReadError::TimestampOverflow(context.timestamp, delta))?
            };

            Ok(Some(PendingHeader {
                timestamp,
                timestamp_delta: delta,
                msg_length: context.msg_length,
                msg_type_id: context.msg_type_id,
                msg_stream_id: context.msg_stream_id,
                extended_timestamp: context.extended_timestamp,
                continuation,
            }))
        }
        _ => unreachable!("fmt is two bits"),
    }
}

/// Reads the 1..=3 byte basic header, returning `(fmt, chunk_stream_id)`.
fn read_basic_header(cursor: &mut io::Cursor<&[u8]>) -> Result<Option<(u8, u32)>, ChunkReadError> {
    if !cursor.has_remaining() {
        return Ok(None);
    }

    let first = cursor.read_u8()?;
    let fmt = first >> 6;

    let chunk_stream_id = match first & 0b0011_1111 {
        0 => {
            if !cursor.has_remaining() {
                return Ok(None);
            }
            64 + cursor.read_u8()? as u32
        }
        1 => {
            if cursor.remaining() < 2 {
                return Ok(None);
            }
            let mut bytes = [0u8; 2];
            cursor.read_exact(&mut bytes)?;
            64 + bytes[0] as u32 + bytes[1] as u32 * 256
        }
        csid => csid as u32,
    };

    Ok(Some((fmt, chunk_stream_id)))
}
