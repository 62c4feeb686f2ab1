//! FLV audio tag bodies.

use std::io;

use bytes::Bytes;

use crate::audio::header::AudioTagHeader;
use crate::error::FlvError;

pub mod enhanced;
pub mod legacy;

/// FLV `AudioTagBody`
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.2.1
/// - Enhanced RTMP spec, ExAudioTagBody
#[derive(Debug, Clone, PartialEq)]
pub enum AudioTagBody {
    /// Legacy audio tag body.
    Legacy(legacy::LegacyAudioTagBody),
    /// Enhanced audio tag body.
    Enhanced(enhanced::ExAudioTagBody),
}

impl AudioTagBody {
    /// Demux the audio tag body from the given reader.
    ///
    /// The header determines which of the two layouts applies.
    pub fn demux(header: &AudioTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        match header {
            AudioTagHeader::Legacy(header) => legacy::LegacyAudioTagBody::demux(header, reader).map(Self::Legacy),
            AudioTagHeader::Enhanced(header) => enhanced::ExAudioTagBody::demux(header, reader).map(Self::Enhanced),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write for the given header.
    pub fn size(&self, header: &AudioTagHeader) -> Result<usize, FlvError> {
        match (self, header) {
            (AudioTagBody::Legacy(body), AudioTagHeader::Legacy(_)) => Ok(body.size()),
            (AudioTagBody::Enhanced(body), AudioTagHeader::Enhanced(header)) => Ok(body.size(header)),
            _ => Err(FlvError::HeaderBodyMismatch("legacy/enhanced audio header and body mixed")),
        }
    }

    /// Mux the body into the given writer.
    pub fn mux<W: io::Write>(&self, header: &AudioTagHeader, writer: &mut W) -> Result<(), FlvError> {
        match (self, header) {
            (AudioTagBody::Legacy(body), AudioTagHeader::Legacy(_)) => body.mux(writer),
            (AudioTagBody::Enhanced(body), AudioTagHeader::Enhanced(header)) => body.mux(header, writer),
            _ => Err(FlvError::HeaderBodyMismatch("legacy/enhanced audio header and body mixed")),
        }
    }
}
