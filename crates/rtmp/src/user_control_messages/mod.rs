//! User control messages.
//!
//! Defined by:
//! - Legacy RTMP spec, 6.2

mod reader;
mod writer;

use bytes::Bytes;

nutype_enum::nutype_enum! {
    /// The type of user control message event.
    pub enum EventType(u16) {
        /// The server sends this event to notify the client that a stream has
        /// become functional. The 4 bytes of event data represent the stream
        /// id of the functional stream.
        StreamBegin = 0,
        /// The server sends this event to notify the client that the playback
        /// of data on the stream is over. The 4 bytes of event data represent
        /// the stream id.
        StreamEOF = 1,
        /// The server sends this event to notify the client that there is no
        /// more data on the stream. The 4 bytes of event data represent the
        /// stream id.
        StreamDry = 2,
        /// The client sends this event to inform the server of the buffer
        /// size in milliseconds used to buffer data on a stream. The first
        /// 4 bytes of event data represent the stream id, the next 4 the
        /// buffer length.
        SetBufferLength = 3,
        /// The server sends this event to notify the client that the stream
        /// is a recorded stream. The 4 bytes of event data represent the
        /// stream id.
        StreamIsRecorded = 4,
        /// The server sends this event to test whether the client is
        /// reachable. Event data is a 4-byte timestamp.
        PingRequest = 6,
        /// The client sends this event in response to a ping request,
        /// echoing the 4-byte timestamp.
        PingResponse = 7,
    }
}

/// A typed user control message.
#[derive(Debug, Clone, PartialEq)]
pub enum EventMessage {
    /// A stream has become functional.
    StreamBegin {
        /// The stream id.
        stream_id: u32,
    },
    /// Playback on a stream has ended.
    StreamEof {
        /// The stream id.
        stream_id: u32,
    },
    /// A stream has no more data for now.
    StreamDry {
        /// The stream id.
        stream_id: u32,
    },
    /// The client's buffer length for a stream.
    SetBufferLength {
        /// The stream id.
        stream_id: u32,
        /// The buffer length in milliseconds.
        buffer_length: u32,
    },
    /// A stream is recorded.
    StreamIsRecorded {
        /// The stream id.
        stream_id: u32,
    },
    /// A liveness probe.
    PingRequest {
        /// The sender's timestamp.
        timestamp: u32,
    },
    /// The reply to a liveness probe.
    PingResponse {
        /// The echoed timestamp.
        timestamp: u32,
    },
    /// Any other event, passed through opaque.
    Unknown {
        /// The event type.
        event_type: EventType,
        /// The event data.
        data: Bytes,
    },
}
