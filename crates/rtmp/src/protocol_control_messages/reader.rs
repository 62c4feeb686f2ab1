//! Reading protocol control messages.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use super::{
    ProtocolControlMessageAbort, ProtocolControlMessageAcknowledgement, ProtocolControlMessageSetChunkSize,
    ProtocolControlMessageSetPeerBandwidth, ProtocolControlMessageSetPeerBandwidthLimitType,
    ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::messages::MessageError;

impl ProtocolControlMessageSetChunkSize {
    /// Reads a [`ProtocolControlMessageSetChunkSize`] from the given data.
    pub fn read(data: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor::new(data);
        // the high bit is reserved and must be ignored
        let chunk_size = cursor.read_u32::<BigEndian>()? & 0x7FFF_FFFF;

        Ok(Self { chunk_size })
    }
}

impl ProtocolControlMessageAbort {
    /// Reads a [`ProtocolControlMessageAbort`] from the given data.
    pub fn read(data: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor::new(data);
        let chunk_stream_id = cursor.read_u32::<BigEndian>()?;

        Ok(Self { chunk_stream_id })
    }
}

impl ProtocolControlMessageAcknowledgement {
    /// Reads a [`ProtocolControlMessageAcknowledgement`] from the given data.
    pub fn read(data: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor::new(data);
        let sequence_number = cursor.read_u32::<BigEndian>()?;

        Ok(Self { sequence_number })
    }
}

impl ProtocolControlMessageWindowAcknowledgementSize {
    /// Reads a [`ProtocolControlMessageWindowAcknowledgementSize`] from the given data.
    pub fn read(data: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor::new(data);
        let acknowledgement_window_size = cursor.read_u32::<BigEndian>()?;

        Ok(Self {
            acknowledgement_window_size,
        })
    }
}

impl ProtocolControlMessageSetPeerBandwidth {
    /// Reads a [`ProtocolControlMessageSetPeerBandwidth`] from the given data.
    pub fn read(data: &[u8]) -> Result<Self, MessageError> {
        let mut cursor = Cursor::new(data);
        let acknowledgement_window_size = cursor.read_u32::<BigEndian>()?;
        let limit_type = cursor.read_u8()?;

        let limit_type = match limit_type {
            0 => ProtocolControlMessageSetPeerBandwidthLimitType::Hard,
            1 => ProtocolControlMessageSetPeerBandwidthLimitType::Soft,
            2 => ProtocolControlMessageSetPeerBandwidthLimitType::Dynamic,
            value => {
                return Err(MessageError::InvalidValue {
                    field: "limit type",
                    value: value as u32,
                });
            }
        };

        Ok(Self {
            acknowledgement_window_size,
            limit_type,
        })
    }
}
