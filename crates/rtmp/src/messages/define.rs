use bytes::Bytes;

use crate::command_messages::Command;
use crate::protocol_control_messages::{
    ProtocolControlMessageAbort, ProtocolControlMessageAcknowledgement, ProtocolControlMessageSetChunkSize,
    ProtocolControlMessageSetPeerBandwidth, ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::user_control_messages::EventMessage;

/// A message of a type this implementation does not interpret.
#[derive(Debug, Clone)]
pub struct UnknownMessage {
    /// The message type id.
    pub msg_type_id: MessageType,
    /// The raw payload.
    pub data: Bytes,
}

/// A typed RTMP message.
#[derive(Debug)]
pub enum MessageData {
    // Protocol Control Messages
    /// Set Chunk Size (1)
    SetChunkSize(ProtocolControlMessageSetChunkSize),
    /// Abort Message (2)
    Abort(ProtocolControlMessageAbort),
    /// Acknowledgement (3)
    Acknowledgement(ProtocolControlMessageAcknowledgement),
    /// User Control (4)
    UserControl(EventMessage),
    /// Window Acknowledgement Size (5)
    SetAcknowledgementWindowSize(ProtocolControlMessageWindowAcknowledgementSize),
    /// Set Peer Bandwidth (6)
    SetPeerBandwidth(ProtocolControlMessageSetPeerBandwidth),

    // RTMP Command Messages
    /// An AMF0 (or demoted AMF3) command message (20 / 17)
    Command(Command),
    /// AMF0 data message (18)
    DataAmf0 {
        /// The raw AMF payload.
        data: Bytes,
    },
    /// AMF3 data message (15)
    DataAmf3 {
        /// The raw AMF payload.
        data: Bytes,
    },
    /// AMF0 shared object message (19), passed through opaque.
    SharedObjAmf0 {
        /// The raw payload.
        data: Bytes,
    },
    /// AMF3 shared object message (16), passed through opaque.
    SharedObjAmf3 {
        /// The raw payload.
        data: Bytes,
    },
    /// Audio message (8)
    AudioData {
        /// The FLV audio tag body.
        data: Bytes,
    },
    /// Video message (9)
    VideoData {
        /// The FLV video tag body.
        data: Bytes,
    },
    /// Aggregate message (22), passed through opaque.
    Aggregate {
        /// The raw payload.
        data: Bytes,
    },
    /// Anything else.
    Unknown(UnknownMessage),
}

nutype_enum::nutype_enum! {
    /// RTMP message type ids.
    pub enum MessageType(u8) {
        // Protocol Control Messages
        /// Set Chunk Size
        SetChunkSize = 1,
        /// Abort Message
        Abort = 2,
        /// Acknowledgement
        Acknowledgement = 3,
        /// User Control
        UserControlEvent = 4,
        /// Window Acknowledgement Size
        WindowAcknowledgementSize = 5,
        /// Set Peer Bandwidth
        SetPeerBandwidth = 6,
        // RTMP Command Messages
        /// Audio
        Audio = 8,
        /// Video
        Video = 9,
        /// AMF3 data
        DataAMF3 = 15,
        /// AMF3 shared object
        SharedObjAMF3 = 16,
        /// AMF3 command
        CommandAMF3 = 17,
        /// AMF0 data
        DataAMF0 = 18,
        /// AMF0 shared object
        SharedObjAMF0 = 19,
        /// AMF0 command
        CommandAMF0 = 20,
        /// Aggregate
        Aggregate = 22,
    }
}
