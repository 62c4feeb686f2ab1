//! FLV audio processing
//!
//! Use [`AudioData`] to demux and mux audio data contained in an RTMP audio
//! message or FLV audio tag.

use std::io;

use body::AudioTagBody;
use bytes::Bytes;
use header::AudioTagHeader;

use crate::error::FlvError;

pub mod body;
pub mod header;

/// FLV `AUDIODATA` tag
///
/// This is a container for legacy as well as enhanced audio data.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.2.1
/// - Enhanced RTMP spec, Enhanced Audio section
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// The header of the audio data.
    pub header: AudioTagHeader,
    /// The body of the audio data.
    pub body: AudioTagBody,
}

impl AudioData {
    /// Demux audio data from a given reader.
    ///
    /// Determines automatically whether the given data represents legacy or
    /// enhanced audio data and demuxes it accordingly.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let header = AudioTagHeader::demux(reader)?;
        let body = AudioTagBody::demux(&header, reader)?;

        Ok(AudioData { header, body })
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> Result<usize, FlvError> {
        Ok(self.header.size() + self.body.size(&self.header)?)
    }

    /// Mux the audio data into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        self.header.mux(writer)?;
        self.body.mux(&self.header, writer)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::AudioData;
    use crate::audio::body::AudioTagBody;
    use crate::audio::body::legacy::{AacAudioData, LegacyAudioTagBody};
    use crate::audio::header::AudioTagHeader;
    use crate::audio::header::legacy::LegacyAudioTagHeader;

    #[test]
    fn legacy_aac_tag_round_trip() {
        let data = AudioData {
            header: AudioTagHeader::Legacy(LegacyAudioTagHeader::aac()),
            body: AudioTagBody::Legacy(LegacyAudioTagBody::Aac(AacAudioData::Raw(Bytes::from_static(&[1, 2, 3])))),
        };

        let mut buf = Vec::new();
        data.mux(&mut buf).unwrap();
        assert_eq!(buf, vec![0xAF, 0x01, 1, 2, 3]);
        assert_eq!(data.size().unwrap(), buf.len());

        let decoded = AudioData::demux(&mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, data);
    }
}
