//! FLV Tag processing

use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use nutype_enum::nutype_enum;
use strom_bytes_util::BytesCursorExt;

use crate::audio::AudioData;
use crate::error::FlvError;
use crate::script::ScriptData;
use crate::video::VideoData;

nutype_enum! {
    /// FLV Tag Type
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.1
    pub enum FlvTagType(u8) {
        /// Audio tag.
        Audio = 8,
        /// Video tag.
        Video = 9,
        /// Script data, AMF3-encoded.
        ScriptDataAmf3 = 15,
        /// Script data, AMF0-encoded.
        ScriptData = 18,
    }
}

/// An FLV tag: an 11-byte header followed by a typed body.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.1
#[derive(Debug, Clone, PartialEq)]
pub struct FlvTag {
    /// The timestamp of this tag in milliseconds, composed from the 24-bit
    /// low part and the 8-bit extension.
    pub timestamp_ms: u32,
    /// The stream id of this tag; always 0 on the wire.
    pub stream_id: u32,
    /// The body of this tag.
    pub data: FlvTagData,
}

impl FlvTag {
    /// Demux a tag (header plus body) from the given reader.
    ///
    /// The body consumes exactly the declared size; a body that decodes short
    /// is a [`FlvError::TruncatedTag`].
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let tag_type = FlvTagType::from(reader.read_u8()?);

        let data_size = reader.read_u24::<BigEndian>()? as usize;
        // the timestamp is 24 bits with an 8-bit extension on top
        let timestamp_ms = reader.read_u24::<BigEndian>()? | ((reader.read_u8()? as u32) << 24);
        let stream_id = reader.read_u24::<BigEndian>()?;

        let body = reader.extract_bytes(data_size)?;
        let mut body_reader = io::Cursor::new(body);

        let data = FlvTagData::demux(tag_type, &mut body_reader)?;

        let consumed = body_reader.position() as usize;
        if consumed != data_size {
            return Err(FlvError::TruncatedTag {
                declared: data_size,
                consumed,
            });
        }

        Ok(FlvTag {
            timestamp_ms,
            stream_id,
            data,
        })
    }

    /// The number of bytes [`mux`](Self::mux) will write, header included.
    pub fn size(&self) -> Result<usize, FlvError> {
        Ok(11 + self.data.size()?)
    }

    /// Mux the tag (header plus body) into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        let body_size = self.data.size()?;
        if body_size > 0xFF_FFFF {
            return Err(FlvError::BodyTooLarge(body_size));
        }

        writer.write_u8(self.data.tag_type().0)?;
        writer.write_u24::<BigEndian>(body_size as u32)?;
        writer.write_u24::<BigEndian>(self.timestamp_ms & 0xFF_FFFF)?;
        writer.write_u8((self.timestamp_ms >> 24) as u8)?;
        writer.write_u24::<BigEndian>(self.stream_id)?;

        self.data.mux(writer)
    }
}

/// FLV Tag Data
///
/// The typed body of an [`FlvTag`], dispatched on the tag type.
#[derive(Debug, Clone, PartialEq)]
pub enum FlvTagData {
    /// Audio data.
    Audio(AudioData),
    /// Video data.
    Video(VideoData),
    /// AMF0 script data.
    ScriptData(ScriptData),
    /// Any other tag type; AMF3 script data also lands here and is passed
    /// through opaque.
    Unknown {
        /// The tag type.
        tag_type: FlvTagType,
        /// The raw body.
        data: Bytes,
    },
}

impl FlvTagData {
    /// Demux tag data of the given type from the given reader.
    pub fn demux(tag_type: FlvTagType, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        match tag_type {
            FlvTagType::Audio => AudioData::demux(reader).map(FlvTagData::Audio),
            FlvTagType::Video => VideoData::demux(reader).map(FlvTagData::Video),
            FlvTagType::ScriptData => ScriptData::demux(reader).map(FlvTagData::ScriptData),
            _ => Ok(FlvTagData::Unknown {
                tag_type,
                data: reader.extract_remaining(),
            }),
        }
    }

    /// The tag type this data muxes as.
    pub fn tag_type(&self) -> FlvTagType {
        match self {
            FlvTagData::Audio(_) => FlvTagType::Audio,
            FlvTagData::Video(_) => FlvTagType::Video,
            FlvTagData::ScriptData(_) => FlvTagType::ScriptData,
            FlvTagData::Unknown { tag_type, .. } => *tag_type,
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> Result<usize, FlvError> {
        match self {
            FlvTagData::Audio(audio) => audio.size(),
            FlvTagData::Video(video) => video.size(),
            FlvTagData::ScriptData(script) => script.size(),
            FlvTagData::Unknown { data, .. } => Ok(data.len()),
        }
    }

    /// Mux the tag data into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        match self {
            FlvTagData::Audio(audio) => audio.mux(writer),
            FlvTagData::Video(video) => video.mux(writer),
            FlvTagData::ScriptData(script) => script.mux(writer),
            FlvTagData::Unknown { data, .. } => {
                writer.write_all(data)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::audio::body::AudioTagBody;
    use crate::audio::body::legacy::{AacAudioData, LegacyAudioTagBody};
    use crate::audio::header::AudioTagHeader;
    use crate::audio::header::legacy::LegacyAudioTagHeader;

    fn audio_tag(timestamp_ms: u32, payload: &'static [u8]) -> FlvTag {
        FlvTag {
            timestamp_ms,
            stream_id: 0,
            data: FlvTagData::Audio(AudioData {
                header: AudioTagHeader::Legacy(LegacyAudioTagHeader::aac()),
                body: AudioTagBody::Legacy(LegacyAudioTagBody::Aac(AacAudioData::Raw(Bytes::from_static(payload)))),
            }),
        }
    }

    #[test]
    fn tag_round_trip() {
        let tag = audio_tag(33, &[1, 2, 3, 4]);

        let mut buf = Vec::new();
        tag.mux(&mut buf).unwrap();
        assert_eq!(tag.size().unwrap(), buf.len());

        // 11-byte header: type 8, size 6, ts 33, ext 0, stream id 0
        assert_eq!(&buf[..11], &[8, 0, 0, 6, 0, 0, 33, 0, 0, 0, 0]);

        let decoded = FlvTag::demux(&mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, tag);
    }

    #[test]
    fn extended_timestamp_composition() {
        let tag = audio_tag(0x1234_5678, &[0]);

        let mut buf = Vec::new();
        tag.mux(&mut buf).unwrap();

        // low 24 bits first, then the high 8 bits
        assert_eq!(&buf[4..8], &[0x34, 0x56, 0x78, 0x12]);

        let decoded = FlvTag::demux(&mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded.timestamp_ms, 0x1234_5678);
    }

    #[test]
    fn unknown_tag_type_passes_through() {
        // type 12, 2-byte body
        let data = Bytes::from_static(&[12, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0xAA, 0xBB]);

        let tag = FlvTag::demux(&mut std::io::Cursor::new(data.clone())).unwrap();
        assert!(matches!(
            tag.data,
            FlvTagData::Unknown {
                tag_type: FlvTagType(12),
                ..
            }
        ));

        let mut buf = Vec::new();
        tag.mux(&mut buf).unwrap();
        assert_eq!(buf, data.to_vec());
    }

    #[test]
    fn declared_size_too_large_is_eof() {
        // declared size 5 but only 2 bytes of body present
        let data = Bytes::from_static(&[8, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 0xAF, 0x01]);

        assert!(FlvTag::demux(&mut std::io::Cursor::new(data)).is_err());
    }
}
