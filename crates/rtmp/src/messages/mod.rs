//! RTMP messages.
//!
//! Typed view of a reassembled chunk payload, dispatched on the message type
//! id.

mod define;
mod error;
mod reader;

pub use self::define::{MessageData, MessageType, UnknownMessage};
pub use self::error::MessageError;
