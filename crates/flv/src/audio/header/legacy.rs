//! Legacy audio header types and functions.

use std::io;

use byteorder::{ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use nutype_enum::nutype_enum;

use crate::error::FlvError;

nutype_enum! {
    /// FLV Sound Format
    ///
    /// Denotes the type of the underlying data packet
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 - AUDIODATA
    pub enum SoundFormat(u8) {
        /// Linear PCM, platform endian
        LinearPcmPlatformEndian = 0,
        /// ADPCM
        Adpcm = 1,
        /// MP3
        Mp3 = 2,
        /// Linear PCM, little endian
        LinearPcmLittleEndian = 3,
        /// Nellymoser 16Khz Mono
        Nellymoser16KhzMono = 4,
        /// Nellymoser 8Khz Mono
        Nellymoser8KhzMono = 5,
        /// Nellymoser
        Nellymoser = 6,
        /// G.711 A-Law logarithmic PCM
        G711ALaw = 7,
        /// G.711 Mu-Law logarithmic PCM
        G711MuLaw = 8,
        /// The `ExAudioTagHeader` is present
        ///
        /// Defined by: Enhanced RTMP spec, Enhanced Audio section
        ExHeader = 9,
        /// AAC
        Aac = 10,
        /// Speex
        Speex = 11,
        /// Mp3 8Khz
        Mp38Khz = 14,
        /// Device specific sound
        DeviceSpecificSound = 15,
    }
}

nutype_enum! {
    /// FLV Sound Rate
    ///
    /// Denotes the sampling rate of the audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 - AUDIODATA
    pub enum SoundRate(u8) {
        /// 5.5 KHz
        Hz5500 = 0,
        /// 11 KHz
        Hz11000 = 1,
        /// 22 KHz
        Hz22000 = 2,
        /// 44 KHz
        Hz44000 = 3,
    }
}

nutype_enum! {
    /// FLV Sound Size
    ///
    /// Denotes the size of each sample in the audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 - AUDIODATA
    pub enum SoundSize(u8) {
        /// 8 bit
        Bit8 = 0,
        /// 16 bit
        Bit16 = 1,
    }
}

nutype_enum! {
    /// FLV Sound Type
    ///
    /// Denotes the number of channels in the audio data.
    ///
    /// Defined by:
    /// - Legacy FLV spec, Annex E.4.2.1 - AUDIODATA
    pub enum SoundType(u8) {
        /// Mono
        Mono = 0,
        /// Stereo
        Stereo = 1,
    }
}

/// The legacy FLV `AudioTagHeader`.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.2.1 - AUDIODATA
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyAudioTagHeader {
    /// The sound format of the audio data. (4 bits)
    pub sound_format: SoundFormat,
    /// The sound rate of the audio data. (2 bits)
    pub sound_rate: SoundRate,
    /// The sound size of the audio data. (1 bit)
    pub sound_size: SoundSize,
    /// The sound type of the audio data. (1 bit)
    pub sound_type: SoundType,
}

impl LegacyAudioTagHeader {
    /// The header AAC data is always tagged with. The real rate and channel
    /// layout live in the AudioSpecificConfig.
    pub fn aac() -> Self {
        Self {
            sound_format: SoundFormat::Aac,
            sound_rate: SoundRate::Hz44000,
            sound_size: SoundSize::Bit16,
            sound_type: SoundType::Stereo,
        }
    }

    /// Demux a [`LegacyAudioTagHeader`] from the given reader.
    #[allow(clippy::unusual_byte_groupings)]
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let byte = reader.read_u8()?;

        Ok(Self {
            sound_format: SoundFormat::from(byte >> 4), // 0b1111_00_0_0
            sound_rate: SoundRate::from((byte & 0b0000_11_0_0) >> 2),
            sound_size: SoundSize::from((byte & 0b0000_00_1_0) >> 1),
            sound_type: SoundType::from(byte & 0b0000_00_0_1),
        })
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        1
    }

    /// Mux the header into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        let byte = (self.sound_format.0 << 4) | ((self.sound_rate.0 & 0b11) << 2) | ((self.sound_size.0 & 1) << 1) | (self.sound_type.0 & 1);
        writer.write_u8(byte)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn demux_aac_header_byte() {
        let mut reader = io::Cursor::new(Bytes::from_static(&[0xAF]));
        let header = LegacyAudioTagHeader::demux(&mut reader).unwrap();

        assert_eq!(header, LegacyAudioTagHeader::aac());
    }

    #[test]
    fn mux_round_trip() {
        let header = LegacyAudioTagHeader {
            sound_format: SoundFormat::Mp3,
            sound_rate: SoundRate::Hz22000,
            sound_size: SoundSize::Bit8,
            sound_type: SoundType::Mono,
        };

        let mut buf = Vec::new();
        header.mux(&mut buf).unwrap();
        assert_eq!(buf, vec![0b0010_10_0_0]);
        assert_eq!(header.size(), 1);

        let decoded = LegacyAudioTagHeader::demux(&mut io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn unknown_sound_format_round_trips() {
        let mut reader = io::Cursor::new(Bytes::from_static(&[0xC0]));
        let header = LegacyAudioTagHeader::demux(&mut reader).unwrap();
        assert_eq!(header.sound_format, SoundFormat(12));

        let mut buf = Vec::new();
        header.mux(&mut buf).unwrap();
        assert_eq!(buf, vec![0xC0]);
    }
}
