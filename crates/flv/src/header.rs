use std::io;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use strom_bytes_util::BytesCursorExt;

use crate::error::FlvError;

/// The FLV header
/// Whenever a FLV file is read these are the first 9 bytes of the file.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.2 - The FLV Header
#[derive(Debug, Clone, PartialEq)]
pub struct FlvHeader {
    /// The version of the FLV file.
    pub version: u8,
    /// Whether the FLV file contains audio tags.
    pub is_audio_present: bool,
    /// Whether the FLV file contains video tags.
    pub is_video_present: bool,
    /// The remaining bytes between the DataOffset field and the end of the
    /// header. Empty for the standard 9-byte header.
    pub extra: Bytes,
}

impl FlvHeader {
    /// A standard version-1 header with no extra bytes.
    pub fn new(is_audio_present: bool, is_video_present: bool) -> Self {
        Self {
            version: 1,
            is_audio_present,
            is_video_present,
            extra: Bytes::new(),
        }
    }

    /// Demux the FLV header from the given reader.
    ///
    /// The reader is left at the start of the tag stream.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let start = reader.position() as usize;

        let signature = reader.read_u24::<BigEndian>()?;

        // 0 byte at the beginning because we are only reading 3 bytes not 4.
        if signature != u32::from_be_bytes([0, b'F', b'L', b'V']) {
            return Err(FlvError::InvalidSignature(signature));
        }

        let version = reader.read_u8()?;
        let flags = reader.read_u8()?;
        let is_audio_present = (flags & 0b00000100) != 0;
        let is_video_present = (flags & 0b00000001) != 0;

        let data_offset = reader.read_u32::<BigEndian>()?;
        let end = reader.position() as usize;
        let size = end - start;

        let remaining = (data_offset as usize)
            .checked_sub(size)
            .ok_or(FlvError::InvalidDataOffset(data_offset))?;

        let extra = reader.extract_bytes(remaining)?;

        Ok(FlvHeader {
            version,
            is_audio_present,
            is_video_present,
            extra,
        })
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        9 + self.extra.len()
    }

    /// Mux the FLV header into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        writer.write_all(b"FLV")?;
        writer.write_u8(self.version)?;

        let mut flags = 0u8;
        if self.is_audio_present {
            flags |= 0b00000100;
        }
        if self.is_video_present {
            flags |= 0b00000001;
        }
        writer.write_u8(flags)?;

        writer.write_u32::<BigEndian>((9 + self.extra.len()) as u32)?;
        writer.write_all(&self.extra)?;

        Ok(())
    }
}
