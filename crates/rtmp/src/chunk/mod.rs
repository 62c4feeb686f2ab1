//! RTMP chunk stream framing.
//!
//! Messages are carried as sequences of chunks; chunk headers come in four
//! forms of decreasing size, filled in from per-chunk-stream state on both
//! sides.

mod define;
mod error;

pub mod reader;
pub mod writer;

pub use self::define::{
    CHUNK_STREAM_ID_AUDIO, CHUNK_STREAM_ID_COMMAND, CHUNK_STREAM_ID_DATA, CHUNK_STREAM_ID_PROTOCOL_CONTROL,
    CHUNK_STREAM_ID_VIDEO, Chunk, ChunkBasicHeader, ChunkMessageHeader, ChunkType, INIT_CHUNK_SIZE, MAX_CHUNK_SIZE,
    MIN_CHUNK_SIZE, OUT_CHUNK_SIZE,
};
pub use self::error::{ChunkReadError, ChunkWriteError};
pub use self::reader::ChunkReader;
pub use self::writer::ChunkWriter;
