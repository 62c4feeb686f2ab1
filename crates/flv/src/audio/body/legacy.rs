//! Legacy audio tag bodies.

use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use nutype_enum::nutype_enum;
use strom_bytes_util::BytesCursorExt;

use crate::audio::header::legacy::{LegacyAudioTagHeader, SoundFormat};
use crate::error::FlvError;

nutype_enum! {
    /// FLV `AACPacketType`
    ///
    /// Signals whether AAC data is a sequence header or raw frames.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 - AUDIODATA
    pub enum AacPacketType(u8) {
        /// AAC sequence header (AudioSpecificConfig)
        SequenceHeader = 0,
        /// Raw AAC frame data
        Raw = 1,
    }
}

/// AAC audio data, split by packet type.
#[derive(Debug, Clone, PartialEq)]
pub enum AacAudioData {
    /// AAC sequence header (AudioSpecificConfig), opaque bytes.
    SequenceHeader(Bytes),
    /// Raw AAC frame data.
    Raw(Bytes),
    /// Any other packet type.
    Unknown {
        /// The AAC packet type.
        aac_packet_type: AacPacketType,
        /// The data.
        data: Bytes,
    },
}

impl AacAudioData {
    fn packet_type(&self) -> AacPacketType {
        match self {
            AacAudioData::SequenceHeader(_) => AacPacketType::SequenceHeader,
            AacAudioData::Raw(_) => AacPacketType::Raw,
            AacAudioData::Unknown { aac_packet_type, .. } => *aac_packet_type,
        }
    }

    fn data(&self) -> &Bytes {
        match self {
            AacAudioData::SequenceHeader(data) | AacAudioData::Raw(data) | AacAudioData::Unknown { data, .. } => data,
        }
    }
}

/// The body of a legacy FLV audio tag.
///
/// AAC carries one extra packet-type byte before the payload; every other
/// sound format is opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacyAudioTagBody {
    /// AAC body with its packet-type byte.
    Aac(AacAudioData),
    /// Opaque body of any other sound format.
    Other {
        /// The sound data.
        sound_data: Bytes,
    },
}

impl LegacyAudioTagBody {
    /// Demux the body from the given reader, consuming everything remaining.
    pub fn demux(header: &LegacyAudioTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        if header.sound_format == SoundFormat::Aac {
            let aac_packet_type = AacPacketType::from(reader.read_u8()?);
            let data = reader.extract_remaining();

            let body = match aac_packet_type {
                AacPacketType::SequenceHeader => AacAudioData::SequenceHeader(data),
                AacPacketType::Raw => AacAudioData::Raw(data),
                _ => AacAudioData::Unknown { aac_packet_type, data },
            };

            Ok(Self::Aac(body))
        } else {
            Ok(Self::Other {
                sound_data: reader.extract_remaining(),
            })
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        match self {
            LegacyAudioTagBody::Aac(aac) => 1 + aac.data().len(),
            LegacyAudioTagBody::Other { sound_data } => sound_data.len(),
        }
    }

    /// Mux the body into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        match self {
            LegacyAudioTagBody::Aac(aac) => {
                writer.write_u8(aac.packet_type().0)?;
                writer.write_all(aac.data())?;
            }
            LegacyAudioTagBody::Other { sound_data } => writer.write_all(sound_data)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::audio::header::legacy::LegacyAudioTagHeader;

    #[test]
    fn aac_sequence_header_round_trip() {
        let body = LegacyAudioTagBody::Aac(AacAudioData::SequenceHeader(Bytes::from_static(&[0x12, 0x10])));

        let mut buf = Vec::new();
        body.mux(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00, 0x12, 0x10]);
        assert_eq!(body.size(), 3);

        let decoded =
            LegacyAudioTagBody::demux(&LegacyAudioTagHeader::aac(), &mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn aac_raw_round_trip() {
        let body = LegacyAudioTagBody::Aac(AacAudioData::Raw(Bytes::from_static(&[1, 2, 3, 4])));

        let mut buf = Vec::new();
        body.mux(&mut buf).unwrap();
        assert_eq!(buf[0], 0x01);

        let decoded =
            LegacyAudioTagBody::demux(&LegacyAudioTagHeader::aac(), &mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn non_aac_is_opaque() {
        let header = LegacyAudioTagHeader {
            sound_format: SoundFormat::Mp3,
            ..LegacyAudioTagHeader::aac()
        };

        let data = Bytes::from_static(&[0xFF, 0xFB, 0x90]);
        let decoded = LegacyAudioTagBody::demux(&header, &mut std::io::Cursor::new(data.clone())).unwrap();

        assert_eq!(decoded, LegacyAudioTagBody::Other { sound_data: data });
    }
}
