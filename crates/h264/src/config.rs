use std::io;
use std::io::Write as _;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::{Buf, Bytes};
use strom_bytes_util::{BitWriter, BytesCursorExt};

use crate::nal::strip_nal_prefix;

/// Errors building a configuration record from parameter sets.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// At least one SPS is required.
    #[error("at least one sequence parameter set is required")]
    MissingSps,
    /// The first SPS is too short to carry profile and level bytes.
    #[error("sequence parameter set too short: {0} bytes")]
    SpsTooShort(usize),
    /// A parameter set exceeds the 16-bit length field.
    #[error("parameter set too large: {0} bytes")]
    ParameterSetTooLarge(usize),
}

/// The AVC (H.264) Decoder Configuration Record.
/// ISO/IEC 14496-15:2022(E) - 5.3.2.1.2
#[derive(Debug, Clone, PartialEq)]
pub struct AVCDecoderConfigurationRecord {
    /// Always 1 for this profile of the record.
    pub configuration_version: u8,
    /// `AVCProfileIndication`: the `profile_idc` byte of the first SPS.
    pub profile_indication: u8,
    /// The constraint-set flags byte of the first SPS.
    pub profile_compatibility: u8,
    /// `AVCLevelIndication`: the `level_idc` byte of the first SPS.
    pub level_indication: u8,
    /// NAL-unit length field size minus one; 3 means 4-byte AVCC lengths.
    pub length_size_minus_one: u8,
    /// Sequence parameter sets, bare NAL units.
    pub sps: Vec<Bytes>,
    /// Picture parameter sets, bare NAL units, ascending PPS id.
    pub pps: Vec<Bytes>,
    /// Chroma/bit-depth extension, present for the high profiles.
    pub extended_config: Option<AvccExtendedConfig>,
}

/// The AVC (H.264) Extended Configuration.
/// ISO/IEC 14496-15:2022(E) - 5.3.2.1.2
#[derive(Debug, Clone, PartialEq)]
pub struct AvccExtendedConfig {
    /// `chroma_format_idc`, 2 bits on the wire.
    pub chroma_format_idc: u8,
    /// `bit_depth_luma_minus8`, 3 bits on the wire.
    pub bit_depth_luma_minus8: u8,
    /// `bit_depth_chroma_minus8`, 3 bits on the wire.
    pub bit_depth_chroma_minus8: u8,
    /// SPS extension NAL units.
    pub sequence_parameter_set_ext: Vec<Bytes>,
}

/// Profiles that carry the extended config block.
const HIGH_PROFILES: [u8; 4] = [100, 110, 122, 144];

impl AVCDecoderConfigurationRecord {
    /// Builds a record from raw SPS/PPS NAL units.
    ///
    /// Input parameter sets may carry AnnexB start codes or AVCC length
    /// prefixes; they are stripped before the sets are embedded. Profile,
    /// compatibility and level are taken from the three bytes right past the
    /// NAL header of the first SPS, and the exact same SPS bytes are embedded
    /// in the record.
    pub fn from_parameter_sets(sps: Vec<Bytes>, pps: Vec<Bytes>) -> Result<Self, ConfigError> {
        let sps: Vec<Bytes> = sps.into_iter().map(|nal| strip_nal_prefix(nal).0).collect();
        let pps: Vec<Bytes> = pps.into_iter().map(|nal| strip_nal_prefix(nal).0).collect();

        let first_sps = sps.first().ok_or(ConfigError::MissingSps)?;
        if first_sps.len() < 4 {
            return Err(ConfigError::SpsTooShort(first_sps.len()));
        }

        for set in sps.iter().chain(pps.iter()) {
            if set.len() > u16::MAX as usize {
                return Err(ConfigError::ParameterSetTooLarge(set.len()));
            }
        }

        let profile_indication = first_sps[1];
        let profile_compatibility = first_sps[2];
        let level_indication = first_sps[3];

        // The high profiles always serialize the chroma/bit-depth block.
        // 4:2:0 8-bit is what every FLV-carried stream uses in practice; a
        // caller with deeper knowledge of the bitstream can overwrite it.
        let extended_config = HIGH_PROFILES.contains(&profile_indication).then(|| AvccExtendedConfig {
            chroma_format_idc: 1,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            sequence_parameter_set_ext: Vec::new(),
        });

        Ok(Self {
            configuration_version: 1,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one: 3,
            sps,
            pps,
            extended_config,
        })
    }

    /// Demuxes an `AVCDecoderConfigurationRecord` from a byte stream.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let configuration_version = reader.read_u8()?;
        let profile_indication = reader.read_u8()?;
        let profile_compatibility = reader.read_u8()?;
        let level_indication = reader.read_u8()?;
        let length_size_minus_one = reader.read_u8()? & 0b00000011;
        let num_of_sequence_parameter_sets = reader.read_u8()? & 0b00011111;

        let mut sps = Vec::with_capacity(num_of_sequence_parameter_sets as usize);
        for _ in 0..num_of_sequence_parameter_sets {
            let sps_length = reader.read_u16::<BigEndian>()?;
            sps.push(reader.extract_bytes(sps_length as usize)?);
        }

        let num_of_picture_parameter_sets = reader.read_u8()?;
        let mut pps = Vec::with_capacity(num_of_picture_parameter_sets as usize);
        for _ in 0..num_of_picture_parameter_sets {
            let pps_length = reader.read_u16::<BigEndian>()?;
            pps.push(reader.extract_bytes(pps_length as usize)?);
        }

        // Some muxers omit the extended config even for high profiles, so be
        // lenient on decode.
        let extended_config = match profile_indication {
            profile if !HIGH_PROFILES.contains(&profile) => None,
            _ if !reader.has_remaining() => None,
            _ => {
                let chroma_format_idc = reader.read_u8()? & 0b00000011; // 2 bits (6 bits reserved)
                let bit_depth_luma_minus8 = reader.read_u8()? & 0b00000111; // 3 bits (5 bits reserved)
                let bit_depth_chroma_minus8 = reader.read_u8()? & 0b00000111; // 3 bits (5 bits reserved)
                let number_of_sequence_parameter_set_ext = reader.read_u8()?;

                let mut sequence_parameter_set_ext = Vec::with_capacity(number_of_sequence_parameter_set_ext as usize);
                for _ in 0..number_of_sequence_parameter_set_ext {
                    let sps_ext_length = reader.read_u16::<BigEndian>()?;
                    sequence_parameter_set_ext.push(reader.extract_bytes(sps_ext_length as usize)?);
                }

                Some(AvccExtendedConfig {
                    chroma_format_idc,
                    bit_depth_luma_minus8,
                    bit_depth_chroma_minus8,
                    sequence_parameter_set_ext,
                })
            }
        };

        Ok(Self {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            length_size_minus_one,
            sps,
            pps,
            extended_config,
        })
    }

    /// Returns the total byte size of the record when muxed.
    pub fn size(&self) -> usize {
        1 // configuration_version
        + 1 // profile_indication
        + 1 // profile_compatibility
        + 1 // level_indication
        + 1 // reserved + length_size_minus_one
        + 1 // reserved + num_of_sequence_parameter_sets
        + self.sps.iter().map(|sps| 2 + sps.len()).sum::<usize>()
        + 1 // num_of_picture_parameter_sets
        + self.pps.iter().map(|pps| 2 + pps.len()).sum::<usize>()
        + match &self.extended_config {
            Some(config) => {
                4 + config.sequence_parameter_set_ext.iter().map(|ext| 2 + ext.len()).sum::<usize>()
            }
            None => 0,
        }
    }

    /// Muxes the record into a byte stream, writing exactly [`size()`](Self::size) bytes.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut bit_writer = BitWriter::new(writer);

        bit_writer.write_u8(self.configuration_version)?;
        bit_writer.write_u8(self.profile_indication)?;
        bit_writer.write_u8(self.profile_compatibility)?;
        bit_writer.write_u8(self.level_indication)?;
        bit_writer.write_bits(0b111111, 6)?; // reserved
        bit_writer.write_bits(self.length_size_minus_one as u64, 2)?;
        bit_writer.write_bits(0b111, 3)?; // reserved

        bit_writer.write_bits(self.sps.len() as u64, 5)?;
        for sps in &self.sps {
            bit_writer.write_u16::<BigEndian>(sps.len() as u16)?;
            bit_writer.write_all(sps)?;
        }

        bit_writer.write_bits(self.pps.len() as u64, 8)?;
        for pps in &self.pps {
            bit_writer.write_u16::<BigEndian>(pps.len() as u16)?;
            bit_writer.write_all(pps)?;
        }

        if let Some(config) = &self.extended_config {
            bit_writer.write_bits(0b111111, 6)?; // reserved
            bit_writer.write_bits(config.chroma_format_idc as u64, 2)?;
            bit_writer.write_bits(0b11111, 5)?; // reserved
            bit_writer.write_bits(config.bit_depth_luma_minus8 as u64, 3)?;
            bit_writer.write_bits(0b11111, 5)?; // reserved
            bit_writer.write_bits(config.bit_depth_chroma_minus8 as u64, 3)?;

            bit_writer.write_bits(config.sequence_parameter_set_ext.len() as u64, 8)?;
            for sps_ext in &config.sequence_parameter_set_ext {
                bit_writer.write_u16::<BigEndian>(sps_ext.len() as u16)?;
                bit_writer.write_all(sps_ext)?;
            }
        }

        bit_writer.finish()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::{AVCDecoderConfigurationRecord, AvccExtendedConfig, ConfigError};

    #[test]
    fn config_demux() {
        let data = Bytes::from(b"\x01d\0\x1f\xff\xe1\0\x1dgd\0\x1f\xac\xd9A\xe0m\xf9\xe6\xa0  (\0\0\x03\0\x08\0\0\x03\x01\xe0x\xc1\x8c\xb0\x01\0\x06h\xeb\xe3\xcb\"\xc0\xfd\xf8\xf8\0".to_vec());

        let config = AVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data)).unwrap();

        assert_eq!(config.configuration_version, 1);
        assert_eq!(config.profile_indication, 100);
        assert_eq!(config.profile_compatibility, 0);
        assert_eq!(config.level_indication, 31);
        assert_eq!(config.length_size_minus_one, 3);
        assert_eq!(config.sps.len(), 1);
        assert_eq!(config.pps.len(), 1);
        assert_eq!(
            config.extended_config,
            Some(AvccExtendedConfig {
                chroma_format_idc: 1,
                bit_depth_luma_minus8: 0,
                bit_depth_chroma_minus8: 0,
                sequence_parameter_set_ext: vec![],
            })
        );
    }

    #[test]
    fn config_mux_round_trip() {
        let data = Bytes::from(b"\x01d\0\x1f\xff\xe1\0\x1dgd\0\x1f\xac\xd9A\xe0m\xf9\xe6\xa0  (\0\0\x03\0\x08\0\0\x03\x01\xe0x\xc1\x8c\xb0\x01\0\x06h\xeb\xe3\xcb\"\xc0\xfd\xf8\xf8\0".to_vec());

        let config = AVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data.clone())).unwrap();

        assert_eq!(config.size(), data.len());

        let mut buf = Vec::new();
        config.mux(&mut buf).unwrap();

        assert_eq!(buf, data.to_vec());
    }

    #[test]
    fn no_extended_config_for_baseline_main_extended() {
        let data = Bytes::from(b"\x01B\x00\x1F\xFF\xE1\x00\x1Dgd\x00\x1F\xAC\xD9A\xE0m\xF9\xE6\xA0  (\x00\x00\x03\x00\x08\x00\x00\x03\x01\xE0x\xC1\x8C\xB0\x01\x00\x06h\xEB\xE3\xCB\"\xC0\xFD\xF8\xF8\x00".to_vec());
        let config = AVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data)).unwrap();

        assert_eq!(config.extended_config, None);
    }

    #[test]
    fn build_from_parameter_sets() {
        // annexb-framed sps with profile 100, compat 0, level 31
        let sps = Bytes::from_static(&[0, 0, 0, 1, 0x67, 100, 0, 31, 0xAC, 0xD9]);
        let pps = Bytes::from_static(&[0, 0, 0, 1, 0x68, 0xEB, 0xE3]);

        let config = AVCDecoderConfigurationRecord::from_parameter_sets(vec![sps], vec![pps]).unwrap();

        assert_eq!(config.profile_indication, 100);
        assert_eq!(config.profile_compatibility, 0);
        assert_eq!(config.level_indication, 31);
        assert_eq!(config.length_size_minus_one, 3);
        // the embedded sps must be the same bytes, minus framing
        assert_eq!(config.sps[0], Bytes::from_static(&[0x67, 100, 0, 31, 0xAC, 0xD9]));
        assert_eq!(config.pps[0], Bytes::from_static(&[0x68, 0xEB, 0xE3]));
        assert!(config.extended_config.is_some());

        // and the record must round-trip
        let mut buf = Vec::new();
        config.mux(&mut buf).unwrap();
        let decoded = AVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn build_requires_sps() {
        let err = AVCDecoderConfigurationRecord::from_parameter_sets(vec![], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSps));

        let err =
            AVCDecoderConfigurationRecord::from_parameter_sets(vec![Bytes::from_static(&[0x67])], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::SpsTooShort(1)));
    }

    #[test]
    fn baseline_profile_has_no_extended_config() {
        let sps = Bytes::from_static(&[0x67, 66, 0xC0, 30, 0xAC]);
        let config = AVCDecoderConfigurationRecord::from_parameter_sets(vec![sps], vec![]).unwrap();
        assert_eq!(config.extended_config, None);
    }
}
