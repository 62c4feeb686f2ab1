//! FLV video tag bodies.

use std::io;

use bytes::Bytes;

use crate::error::FlvError;
use crate::video::header::{VideoTagHeader, VideoTagHeaderData};

pub mod enhanced;
pub mod legacy;

/// FLV `VideoTagBody`
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.3.1
/// - Enhanced RTMP spec, ExVideoTagBody
#[derive(Debug, Clone, PartialEq)]
pub enum VideoTagBody {
    /// Legacy video tag body.
    Legacy(legacy::LegacyVideoTagBody),
    /// Enhanced video tag body.
    Enhanced(enhanced::ExVideoTagBody),
}

impl VideoTagBody {
    /// Demux the video tag body from the given reader.
    ///
    /// The header determines which of the two layouts applies.
    pub fn demux(header: &VideoTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        match &header.data {
            VideoTagHeaderData::Legacy(header) => legacy::LegacyVideoTagBody::demux(header, reader).map(Self::Legacy),
            VideoTagHeaderData::Enhanced(header) => enhanced::ExVideoTagBody::demux(header, reader).map(Self::Enhanced),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write for the given header.
    pub fn size(&self, header: &VideoTagHeader) -> Result<usize, FlvError> {
        match (self, &header.data) {
            (VideoTagBody::Legacy(body), VideoTagHeaderData::Legacy(_)) => Ok(body.size()),
            (VideoTagBody::Enhanced(body), VideoTagHeaderData::Enhanced(header)) => Ok(body.size(header)),
            _ => Err(FlvError::HeaderBodyMismatch("legacy/enhanced video header and body mixed")),
        }
    }

    /// Mux the body into the given writer.
    pub fn mux<W: io::Write>(&self, header: &VideoTagHeader, writer: &mut W) -> Result<(), FlvError> {
        match (self, &header.data) {
            (VideoTagBody::Legacy(body), VideoTagHeaderData::Legacy(_)) => body.mux(writer),
            (VideoTagBody::Enhanced(body), VideoTagHeaderData::Enhanced(header)) => body.mux(header, writer),
            _ => Err(FlvError::HeaderBodyMismatch("legacy/enhanced video header and body mixed")),
        }
    }
}
