//! Legacy video tag bodies.

use std::io;

use bytes::Bytes;
use strom_bytes_util::BytesCursorExt;
use strom_h264::AVCDecoderConfigurationRecord;

use crate::error::FlvError;
use crate::video::header::legacy::{LegacyVideoTagHeader, LegacyVideoTagHeaderAvcPacket};

/// The body of a legacy FLV video tag.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.3.1
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyVideoTagBody {
    /// An empty body; command frames carry their command code in the header.
    Empty,
    /// An AVC sequence header, the decoder configuration record.
    AvcSequenceHeader(AVCDecoderConfigurationRecord),
    /// Any other video data.
    Other {
        /// The video data.
        data: Bytes,
    },
}

impl LegacyVideoTagBody {
    /// Demux the body from the given reader, consuming everything remaining.
    pub fn demux(header: &LegacyVideoTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        match header {
            LegacyVideoTagHeader::VideoCommand(_) => Ok(Self::Empty),
            LegacyVideoTagHeader::AvcPacket(LegacyVideoTagHeaderAvcPacket::SequenceHeader) => {
                let record = AVCDecoderConfigurationRecord::demux(reader)?;
                Ok(Self::AvcSequenceHeader(record))
            }
            _ => Ok(Self::Other {
                data: reader.extract_remaining(),
            }),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        match self {
            LegacyVideoTagBody::Empty => 0,
            LegacyVideoTagBody::AvcSequenceHeader(record) => record.size(),
            LegacyVideoTagBody::Other { data } => data.len(),
        }
    }

    /// Mux the body into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        match self {
            LegacyVideoTagBody::Empty => {}
            LegacyVideoTagBody::AvcSequenceHeader(record) => record.mux(writer)?,
            LegacyVideoTagBody::Other { data } => writer.write_all(data)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::video::header::VideoCommand;

    #[test]
    fn command_frame_body_is_empty() {
        let header = LegacyVideoTagHeader::VideoCommand(VideoCommand::StartSeek);
        let body =
            LegacyVideoTagBody::demux(&header, &mut std::io::Cursor::new(Bytes::from_static(&[42]))).unwrap();

        assert_eq!(body, LegacyVideoTagBody::Empty);
        assert_eq!(body.size(), 0);
    }

    #[test]
    fn avc_sequence_header_parses_into_record() {
        let record_bytes = Bytes::from(b"\x01d\0\x1f\xff\xe1\0\x1dgd\0\x1f\xac\xd9A\xe0m\xf9\xe6\xa0  (\0\0\x03\0\x08\0\0\x03\x01\xe0x\xc1\x8c\xb0\x01\0\x06h\xeb\xe3\xcb\"\xc0\xfd\xf8\xf8\0".to_vec());

        let header = LegacyVideoTagHeader::AvcPacket(LegacyVideoTagHeaderAvcPacket::SequenceHeader);
        let body = LegacyVideoTagBody::demux(&header, &mut std::io::Cursor::new(record_bytes.clone())).unwrap();

        let LegacyVideoTagBody::AvcSequenceHeader(record) = &body else {
            panic!("expected avc sequence header");
        };
        assert_eq!(record.profile_indication, 100);

        // re-muxing emits the original record bytes
        let mut buf = Vec::new();
        body.mux(&mut buf).unwrap();
        assert_eq!(buf, record_bytes.to_vec());
        assert_eq!(body.size(), buf.len());
    }

    #[test]
    fn nalu_body_is_opaque() {
        let header = LegacyVideoTagHeader::AvcPacket(LegacyVideoTagHeaderAvcPacket::Nalu {
            composition_time_offset: 0,
        });
        let data = Bytes::from_static(&[0, 0, 0, 1, 0x65, 1, 2, 3]);
        let body = LegacyVideoTagBody::demux(&header, &mut std::io::Cursor::new(data.clone())).unwrap();

        assert_eq!(body, LegacyVideoTagBody::Other { data });
    }
}
