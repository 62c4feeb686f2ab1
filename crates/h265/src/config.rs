use std::io::{self, Read, Write as _};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use strom_bytes_util::{BitReader, BitWriter};
use strom_h264::strip_nal_prefix;

/// Errors building a configuration record from parameter sets.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// At least one SPS is required.
    #[error("at least one sequence parameter set is required")]
    MissingSps,
    /// A parameter set exceeds the 16-bit length field.
    #[error("parameter set too large: {0} bytes")]
    ParameterSetTooLarge(usize),
}

/// HEVC Decoder Configuration Record
/// ISO/IEC 14496-15:2022(E) - 8.3.2.1
#[derive(Debug, Clone, PartialEq)]
pub struct HEVCDecoderConfigurationRecord {
    /// Always 1 for this profile of the record.
    pub configuration_version: u8,
    /// `general_profile_space`, 2 bits.
    pub general_profile_space: u8,
    /// `general_tier_flag`.
    pub general_tier_flag: bool,
    /// `general_profile_idc`, 5 bits.
    pub general_profile_idc: u8,
    /// `general_profile_compatibility_flags`.
    pub general_profile_compatibility_flags: u32,
    /// `general_constraint_indicator_flags`, 48 bits.
    pub general_constraint_indicator_flags: u64,
    /// `general_level_idc`.
    pub general_level_idc: u8,
    /// `min_spatial_segmentation_idc`, 12 bits.
    pub min_spatial_segmentation_idc: u16,
    /// `parallelism_type`, 2 bits.
    pub parallelism_type: u8,
    /// `chroma_format_idc`, 2 bits.
    pub chroma_format_idc: u8,
    /// `bit_depth_luma_minus8`, 3 bits.
    pub bit_depth_luma_minus8: u8,
    /// `bit_depth_chroma_minus8`, 3 bits.
    pub bit_depth_chroma_minus8: u8,
    /// `avg_frame_rate` in units of frames/(256 seconds); 0 = unspecified.
    pub avg_frame_rate: u16,
    /// `constant_frame_rate`, 2 bits.
    pub constant_frame_rate: u8,
    /// `num_temporal_layers`, 3 bits.
    pub num_temporal_layers: u8,
    /// `temporal_id_nested`.
    pub temporal_id_nested: bool,
    /// NAL-unit length field size minus one; 3 means 4-byte lengths.
    pub length_size_minus_one: u8,
    /// The NAL-unit arrays (VPS, SPS, PPS, SEI, ...).
    pub arrays: Vec<NaluArray>,
}

/// One NAL-unit array of the configuration record.
/// ISO/IEC 14496-15:2022(E) - 8.3.2.1
#[derive(Debug, Clone, PartialEq)]
pub struct NaluArray {
    /// Set when all NAL units of this type are in the array and none are in
    /// the stream.
    pub array_completeness: bool,
    /// The type of the NAL units in `nalus`.
    pub nal_unit_type: NaluType,
    /// The NAL units, bare (with their 2-byte HEVC NAL headers, no framing).
    pub nalus: Vec<Bytes>,
}

/// HEVC NAL unit types carried in configuration records.
/// ISO/IEC 23008-2:2020(E) - 7.4.2.2 (Table 7-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Video parameter set.
    Vps,
    /// Sequence parameter set.
    Sps,
    /// Picture parameter set.
    Pps,
    /// Any other NAL unit type.
    Other(u8),
}

impl From<u8> for NaluType {
    fn from(value: u8) -> Self {
        match value {
            32 => NaluType::Vps,
            33 => NaluType::Sps,
            34 => NaluType::Pps,
            _ => NaluType::Other(value),
        }
    }
}

impl From<NaluType> for u8 {
    fn from(value: NaluType) -> Self {
        match value {
            NaluType::Vps => 32,
            NaluType::Sps => 33,
            NaluType::Pps => 34,
            NaluType::Other(value) => value,
        }
    }
}

impl HEVCDecoderConfigurationRecord {
    /// Builds a record from raw VPS/SPS/PPS NAL units.
    ///
    /// Input NAL units may carry AnnexB start codes or length prefixes; they
    /// are stripped before being embedded. General profile/tier/level fields
    /// are taken from the profile_tier_level block of the first SPS
    /// (bytes 3..15 past the 2-byte NAL header).
    pub fn from_parameter_sets(vps: Vec<Bytes>, sps: Vec<Bytes>, pps: Vec<Bytes>) -> Result<Self, ConfigError> {
        let vps: Vec<Bytes> = vps.into_iter().map(|nal| strip_nal_prefix(nal).0).collect();
        let sps: Vec<Bytes> = sps.into_iter().map(|nal| strip_nal_prefix(nal).0).collect();
        let pps: Vec<Bytes> = pps.into_iter().map(|nal| strip_nal_prefix(nal).0).collect();

        let first_sps = sps.first().ok_or(ConfigError::MissingSps)?;

        for set in vps.iter().chain(sps.iter()).chain(pps.iter()) {
            if set.len() > u16::MAX as usize {
                return Err(ConfigError::ParameterSetTooLarge(set.len()));
            }
        }

        // profile_tier_level starts after the 2-byte NAL header and the
        // sps_video_parameter_set_id / max_sub_layers / nesting byte.
        let ptl = first_sps.get(3..15);

        let (profile_space, tier_flag, profile_idc) = match ptl {
            Some(ptl) => ((ptl[0] >> 6) & 0b11, (ptl[0] >> 5) & 1 == 1, ptl[0] & 0b11111),
            None => (0, false, 1),
        };
        // the record muxes both flag fields least-significant byte first, so
        // pack the SPS wire bytes in that order for mux to re-emit them
        let compatibility_flags = ptl
            .map(|ptl| u32::from_le_bytes([ptl[1], ptl[2], ptl[3], ptl[4]]))
            .unwrap_or(0);
        let constraint_flags = ptl
            .map(|ptl| {
                ((ptl[10] as u64) << 40)
                    | ((ptl[9] as u64) << 32)
                    | ((ptl[8] as u64) << 24)
                    | ((ptl[7] as u64) << 16)
                    | ((ptl[6] as u64) << 8)
                    | (ptl[5] as u64)
            })
            .unwrap_or(0);
        let level_idc = ptl.map(|ptl| ptl[11]).unwrap_or(0);

        let mut arrays = Vec::new();
        for (nal_unit_type, nalus) in [(NaluType::Vps, vps), (NaluType::Sps, sps), (NaluType::Pps, pps)] {
            if !nalus.is_empty() {
                arrays.push(NaluArray {
                    array_completeness: false,
                    nal_unit_type,
                    nalus,
                });
            }
        }

        Ok(Self {
            configuration_version: 1,
            general_profile_space: profile_space,
            general_tier_flag: tier_flag,
            general_profile_idc: profile_idc,
            general_profile_compatibility_flags: compatibility_flags,
            general_constraint_indicator_flags: constraint_flags,
            general_level_idc: level_idc,
            min_spatial_segmentation_idc: 0,
            parallelism_type: 0,
            chroma_format_idc: 1,
            bit_depth_luma_minus8: 0,
            bit_depth_chroma_minus8: 0,
            avg_frame_rate: 0,
            constant_frame_rate: 0,
            num_temporal_layers: 1,
            temporal_id_nested: true,
            length_size_minus_one: 3,
            arrays,
        })
    }

    /// Demuxes an `HEVCDecoderConfigurationRecord` from a byte stream.
    pub fn demux(data: &mut io::Cursor<Bytes>) -> io::Result<Self> {
        let mut bit_reader = BitReader::new(data);

        let configuration_version = bit_reader.read_u8()?;
        let general_profile_space = bit_reader.read_bits(2)? as u8;
        let general_tier_flag = bit_reader.read_bit()?;
        let general_profile_idc = bit_reader.read_bits(5)? as u8;
        let general_profile_compatibility_flags = bit_reader.read_u32::<LittleEndian>()?;
        let general_constraint_indicator_flags = bit_reader.read_u48::<LittleEndian>()?;
        let general_level_idc = bit_reader.read_u8()?;

        bit_reader.seek_bits(4)?; // reserved_4bits
        let min_spatial_segmentation_idc = bit_reader.read_bits(12)? as u16;

        bit_reader.seek_bits(6)?; // reserved_6bits
        let parallelism_type = bit_reader.read_bits(2)? as u8;

        bit_reader.seek_bits(6)?; // reserved_6bits
        let chroma_format_idc = bit_reader.read_bits(2)? as u8;

        bit_reader.seek_bits(5)?; // reserved_5bits
        let bit_depth_luma_minus8 = bit_reader.read_bits(3)? as u8;

        bit_reader.seek_bits(5)?; // reserved_5bits
        let bit_depth_chroma_minus8 = bit_reader.read_bits(3)? as u8;

        let avg_frame_rate = bit_reader.read_u16::<BigEndian>()?;
        let constant_frame_rate = bit_reader.read_bits(2)? as u8;
        let num_temporal_layers = bit_reader.read_bits(3)? as u8;
        let temporal_id_nested = bit_reader.read_bit()?;
        let length_size_minus_one = bit_reader.read_bits(2)? as u8;

        let num_of_arrays = bit_reader.read_u8()?;

        let mut arrays = Vec::with_capacity(num_of_arrays as usize);

        for _ in 0..num_of_arrays {
            let array_completeness = bit_reader.read_bit()?;
            bit_reader.seek_bits(1)?; // reserved

            let nal_unit_type = bit_reader.read_bits(6)? as u8;

            let num_nalus = bit_reader.read_u16::<BigEndian>()?;

            let mut nalus = Vec::with_capacity(num_nalus as usize);

            for _ in 0..num_nalus {
                let nal_unit_length = bit_reader.read_u16::<BigEndian>()?;
                let mut data = vec![0; nal_unit_length as usize];
                bit_reader.read_exact(&mut data)?;
                nalus.push(data.into());
            }

            arrays.push(NaluArray {
                array_completeness,
                nal_unit_type: nal_unit_type.into(),
                nalus,
            });
        }

        Ok(HEVCDecoderConfigurationRecord {
            configuration_version,
            general_profile_space,
            general_tier_flag,
            general_profile_idc,
            general_profile_compatibility_flags,
            general_constraint_indicator_flags,
            general_level_idc,
            min_spatial_segmentation_idc,
            parallelism_type,
            chroma_format_idc,
            bit_depth_luma_minus8,
            bit_depth_chroma_minus8,
            avg_frame_rate,
            constant_frame_rate,
            num_temporal_layers,
            temporal_id_nested,
            length_size_minus_one,
            arrays,
        })
    }

    /// Returns the total byte size of the record when muxed.
    pub fn size(&self) -> usize {
        23 // fixed-layout head
        + self.arrays.iter().map(|array| {
            3 // array_completeness + reserved + nal_unit_type, num_nalus
            + array.nalus.iter().map(|nalu| 2 + nalu.len()).sum::<usize>()
        }).sum::<usize>()
    }

    /// Muxes the record into a byte stream, writing exactly [`size()`](Self::size) bytes.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut bit_writer = BitWriter::new(writer);

        bit_writer.write_u8(self.configuration_version)?;
        bit_writer.write_bits(self.general_profile_space as u64, 2)?;
        bit_writer.write_bit(self.general_tier_flag)?;
        bit_writer.write_bits(self.general_profile_idc as u64, 5)?;
        bit_writer.write_u32::<LittleEndian>(self.general_profile_compatibility_flags)?;
        bit_writer.write_u48::<LittleEndian>(self.general_constraint_indicator_flags)?;
        bit_writer.write_u8(self.general_level_idc)?;

        bit_writer.write_bits(0b1111, 4)?; // reserved_4bits
        bit_writer.write_bits(self.min_spatial_segmentation_idc as u64, 12)?;

        bit_writer.write_bits(0b111111, 6)?; // reserved_6bits
        bit_writer.write_bits(self.parallelism_type as u64, 2)?;

        bit_writer.write_bits(0b111111, 6)?; // reserved_6bits
        bit_writer.write_bits(self.chroma_format_idc as u64, 2)?;

        bit_writer.write_bits(0b11111, 5)?; // reserved_5bits
        bit_writer.write_bits(self.bit_depth_luma_minus8 as u64, 3)?;

        bit_writer.write_bits(0b11111, 5)?; // reserved_5bits
        bit_writer.write_bits(self.bit_depth_chroma_minus8 as u64, 3)?;

        bit_writer.write_u16::<BigEndian>(self.avg_frame_rate)?;
        bit_writer.write_bits(self.constant_frame_rate as u64, 2)?;
        bit_writer.write_bits(self.num_temporal_layers as u64, 3)?;
        bit_writer.write_bit(self.temporal_id_nested)?;
        bit_writer.write_bits(self.length_size_minus_one as u64, 2)?;

        bit_writer.write_u8(self.arrays.len() as u8)?;
        for array in &self.arrays {
            bit_writer.write_bit(array.array_completeness)?;
            bit_writer.write_bits(0b0, 1)?; // reserved
            bit_writer.write_bits(u8::from(array.nal_unit_type) as u64, 6)?;

            bit_writer.write_u16::<BigEndian>(array.nalus.len() as u16)?;

            for nalu in &array.nalus {
                bit_writer.write_u16::<BigEndian>(nalu.len() as u16)?;
                bit_writer.write_all(nalu)?;
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

    use super::{ConfigError, HEVCDecoderConfigurationRecord, NaluType};

    #[test]
    fn config_demux() {
        let data = Bytes::from(b"\x01\x01@\0\0\0\x90\0\0\0\0\0\x99\xf0\0\xfc\xfd\xf8\xf8\0\0\x0f\x03 \0\x01\0\x18@\x01\x0c\x01\xff\xff\x01@\0\0\x03\0\x90\0\0\x03\0\0\x03\0\x99\x95@\x90!\0\x01\0=B\x01\x01\x01@\0\0\x03\0\x90\0\0\x03\0\0\x03\0\x99\xa0\x01@ \x05\xa1e\x95R\x90\x84d_\xf8\xc0Z\x80\x80\x80\x82\0\0\x03\0\x02\0\0\x03\x01 \xc0\x0b\xbc\xa2\0\x02bX\0\x011-\x08\"\0\x01\0\x07D\x01\xc0\x93|\x0c\xc9".to_vec());

        let config = HEVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data)).unwrap();

        assert_eq!(config.configuration_version, 1);
        assert_eq!(config.general_profile_space, 0);
        assert!(!config.general_tier_flag);
        assert_eq!(config.general_profile_idc, 1);
        assert_eq!(config.general_profile_compatibility_flags, 64);
        assert_eq!(config.general_constraint_indicator_flags, 144);
        assert_eq!(config.general_level_idc, 153);
        assert_eq!(config.min_spatial_segmentation_idc, 0);
        assert_eq!(config.parallelism_type, 0);
        assert_eq!(config.chroma_format_idc, 1);
        assert_eq!(config.bit_depth_luma_minus8, 0);
        assert_eq!(config.bit_depth_chroma_minus8, 0);
        assert_eq!(config.avg_frame_rate, 0);
        assert_eq!(config.constant_frame_rate, 0);
        assert_eq!(config.num_temporal_layers, 1);
        assert!(config.temporal_id_nested);
        assert_eq!(config.length_size_minus_one, 3);
        assert_eq!(config.arrays.len(), 3);

        assert_eq!(config.arrays[0].nal_unit_type, NaluType::Vps);
        assert_eq!(config.arrays[1].nal_unit_type, NaluType::Sps);
        assert_eq!(config.arrays[2].nal_unit_type, NaluType::Pps);
        assert_eq!(config.arrays[1].nalus.len(), 1);
    }

    #[test]
    fn config_mux_round_trip() {
        let data = Bytes::from(b"\x01\x01@\0\0\0\x90\0\0\0\0\0\x99\xf0\0\xfc\xfd\xf8\xf8\0\0\x0f\x03 \0\x01\0\x18@\x01\x0c\x01\xff\xff\x01@\0\0\x03\0\x90\0\0\x03\0\0\x03\0\x99\x95@\x90!\0\x01\0=B\x01\x01\x01@\0\0\x03\0\x90\0\0\x03\0\0\x03\0\x99\xa0\x01@ \x05\xa1e\x95R\x90\x84d_\xf8\xc0Z\x80\x80\x80\x82\0\0\x03\0\x02\0\0\x03\x01 \xc0\x0b\xbc\xa2\0\x02bX\0\x011-\x08\"\0\x01\0\x07D\x01\xc0\x93|\x0c\xc9".to_vec());

        let config = HEVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data.clone())).unwrap();

        assert_eq!(config.size(), data.len());

        let mut buf = Vec::new();
        config.mux(&mut buf).unwrap();

        assert_eq!(buf, data.to_vec());
    }

    #[test]
    fn build_from_parameter_sets() {
        let vps = Bytes::from_static(&[0, 0, 0, 1, 0x40, 0x01, 0x0C, 0x01, 0xFF, 0xFF, 0x01, 0x40, 0, 0, 3, 0]);
        // nal header (2) + sps_vps_id/max_sub_layers byte, then a 12-byte ptl
        let sps = Bytes::from_static(&[
            0x42, 0x01, 0x01, // nal header + byte 2
            0x01, 0x40, 0, 0, 3, 0, 0x90, 0, 0, 3, 0, 0x99, // profile_tier_level
            0xA0, 0x01,
        ]);
        let pps = Bytes::from_static(&[0x44, 0x01, 0xC0, 0x93]);

        let config =
            HEVCDecoderConfigurationRecord::from_parameter_sets(vec![vps], vec![sps.clone()], vec![pps]).unwrap();

        assert_eq!(config.general_profile_space, 0);
        assert_eq!(config.general_profile_idc, 1);
        assert_eq!(config.general_level_idc, 0x99);
        assert_eq!(config.arrays.len(), 3);
        // the embedded sps must be the exact input bytes
        assert_eq!(config.arrays[1].nalus[0], sps);

        let mut buf = Vec::new();
        config.mux(&mut buf).unwrap();
        let decoded = HEVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn build_requires_sps() {
        let err = HEVCDecoderConfigurationRecord::from_parameter_sets(vec![], vec![], vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSps));
    }
}
