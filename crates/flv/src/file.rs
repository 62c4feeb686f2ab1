//! FLV file and stream processing

use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::{Buf, Bytes};
use strom_bytes_util::zero_copy::ZeroCopyReader;

use crate::error::FlvError;
use crate::header::FlvHeader;
use crate::tag::{FlvTag, FlvTagData, FlvTagType};

/// An FLV file is a combination of a [`FlvHeader`] followed by the
/// FLV File Body (a series of [`FlvTag`]s, each framed by previous-tag-size
/// fields).
///
/// Defined by:
/// - Legacy FLV spec, Annex E.3
#[derive(Debug, Clone, PartialEq)]
pub struct FlvFile {
    /// The header of the FLV file.
    pub header: FlvHeader,
    /// The tags in the FLV file.
    pub tags: Vec<FlvTag>,
}

impl FlvFile {
    /// Demux an FLV file from a reader.
    ///
    /// The reader needs to be a [`io::Cursor`] with a [`Bytes`] buffer so
    /// bodies can be sliced without copying.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let header = FlvHeader::demux(reader)?;

        let mut tags = Vec::new();
        let mut first = true;
        while reader.has_remaining() {
            // the trailer before the first tag must be 0; later ones are only
            // used for seeking backwards and are not validated
            let previous_tag_size = reader.read_u32::<BigEndian>()?;
            if first && previous_tag_size != 0 {
                return Err(FlvError::InvalidFirstPreviousTagSize(previous_tag_size));
            }
            first = false;

            // a trailing previous-tag-size with no subsequent header ends the file
            if !reader.has_remaining() {
                break;
            }

            tags.push(FlvTag::demux(reader)?);
        }

        Ok(FlvFile { header, tags })
    }

    /// Mux an FLV file (header, tags and framing) into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        self.header.mux(writer)?;

        let mut previous_tag_size = 0u32;
        for tag in &self.tags {
            writer.write_u32::<BigEndian>(previous_tag_size)?;
            tag.mux(writer)?;
            previous_tag_size = tag.size()? as u32;
        }
        writer.write_u32::<BigEndian>(previous_tag_size)?;

        Ok(())
    }
}

/// A lazy FLV tag reader over any [`ZeroCopyReader`].
///
/// Yields one tag at a time instead of materializing the whole file; the
/// source only needs to hand out sequential byte runs. The stream ends when
/// the source is exhausted after a previous-tag-size field (the trailing
/// trailer carries no subsequent tag header).
pub struct FlvStream<R> {
    reader: R,
    read_file_header: bool,
    first_tag: bool,
}

impl<R: ZeroCopyReader> FlvStream<R> {
    /// Creates a stream that expects the 9-byte FLV file header first.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            read_file_header: true,
            first_tag: true,
        }
    }

    /// Creates a stream positioned directly at the tag framing, with no FLV
    /// file header in front.
    pub fn without_file_header(reader: R) -> Self {
        Self {
            reader,
            read_file_header: false,
            first_tag: true,
        }
    }

    /// Reads the next tag, or `None` when the source is exhausted.
    pub fn next_tag(&mut self) -> Result<Option<FlvTag>, FlvError> {
        if self.read_file_header {
            self.read_file_header = false;
            let header = self.reader.try_read(9)?;
            FlvHeader::demux(&mut io::Cursor::new(header))?;
        }

        // previous-tag-size trailer; eof here is a clean end of stream
        let trailer = match self.reader.try_read(4) {
            Ok(trailer) => trailer,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if self.first_tag {
            self.first_tag = false;
            let previous_tag_size = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
            if previous_tag_size != 0 {
                return Err(FlvError::InvalidFirstPreviousTagSize(previous_tag_size));
            }
        }

        // fewer bytes than a tag header after the trailer also ends the stream
        let header = match self.reader.try_read(11) {
            Ok(header) => header,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut header_reader = io::Cursor::new(header);
        let tag_type = FlvTagType::from(header_reader.read_u8()?);
        let data_size = header_reader.read_u24::<BigEndian>()? as usize;
        let timestamp_ms = header_reader.read_u24::<BigEndian>()? | ((header_reader.read_u8()? as u32) << 24);
        let stream_id = header_reader.read_u24::<BigEndian>()?;

        let body = self.reader.try_read(data_size)?;
        let mut body_reader = io::Cursor::new(body);
        let data = FlvTagData::demux(tag_type, &mut body_reader)?;

        let consumed = body_reader.position() as usize;
        if consumed != data_size {
            return Err(FlvError::TruncatedTag {
                declared: data_size,
                consumed,
            });
        }

        Ok(Some(FlvTag {
            timestamp_ms,
            stream_id,
            data,
        }))
    }
}

impl<R: ZeroCopyReader> Iterator for FlvStream<R> {
    type Item = Result<FlvTag, FlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tag().transpose()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use strom_bytes_util::zero_copy::BytesBuf;

    use super::{FlvFile, FlvStream};
    use crate::audio::AudioData;
    use crate::audio::body::AudioTagBody;
    use crate::audio::body::legacy::{AacAudioData, LegacyAudioTagBody};
    use crate::audio::header::AudioTagHeader;
    use crate::audio::header::legacy::LegacyAudioTagHeader;
    use crate::error::FlvError;
    use crate::header::FlvHeader;
    use crate::tag::{FlvTag, FlvTagData};

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

    fn sample_file() -> FlvFile {
        FlvFile {
            header: FlvHeader::new(true, false),
            tags: vec![audio_tag(0, &[1, 2, 3, 4]), audio_tag(23, &[5, 6]), audio_tag(46, &[7])],
        }
    }

    #[test]
    fn file_round_trip() {
        let file = sample_file();

        let mut buf = Vec::new();
        file.mux(&mut buf).unwrap();

        let decoded = FlvFile::demux(&mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn stream_yields_tags_lazily() {
        let file = sample_file();

        let mut buf = Vec::new();
        file.mux(&mut buf).unwrap();

        let mut stream = FlvStream::new(BytesBuf::from(Bytes::from(buf)));

        let mut tags = Vec::new();
        while let Some(tag) = stream.next_tag().unwrap() {
            tags.push(tag);
        }

        assert_eq!(tags, file.tags);
    }

    #[test]
    fn stream_without_file_header() {
        let file = sample_file();

        let mut buf = Vec::new();
        file.mux(&mut buf).unwrap();

        // strip the 9-byte file header
        let stream = FlvStream::without_file_header(BytesBuf::from(Bytes::from(buf).slice(9..)));
        let tags: Vec<_> = stream.collect::<Result<_, _>>().unwrap();

        assert_eq!(tags, file.tags);
    }

    #[test]
    fn first_previous_tag_size_must_be_zero() {
        let file = sample_file();

        let mut buf = Vec::new();
        file.mux(&mut buf).unwrap();

        // corrupt the first trailer (bytes 9..13)
        buf[12] = 1;

        let mut stream = FlvStream::new(BytesBuf::from(Bytes::from(buf)));
        let err = stream.next_tag().unwrap_err();
        assert!(matches!(err, FlvError::InvalidFirstPreviousTagSize(1)));
    }

    #[test]
    fn trailing_trailer_ends_the_stream() {
        let file = FlvFile {
            header: FlvHeader::new(true, false),
            tags: vec![audio_tag(0, &[1])],
        };

        let mut buf = Vec::new();
        file.mux(&mut buf).unwrap();

        let mut stream = FlvStream::new(BytesBuf::from(Bytes::from(buf)));
        assert!(stream.next_tag().unwrap().is_some());
        assert!(stream.next_tag().unwrap().is_none());
        // stays exhausted
        assert!(stream.next_tag().unwrap().is_none());
    }
}
