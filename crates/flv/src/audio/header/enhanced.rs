//! Enhanced audio header types and functions.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use nutype_enum::nutype_enum;
use strom_bytes_util::BytesCursorExt;

use crate::common::AvMultitrackType;
use crate::error::FlvError;

nutype_enum! {
    /// Different types of audio packets.
    ///
    /// Defined by:
    /// - Enhanced RTMP spec, Enhanced Audio section
    pub enum AudioPacketType(u8) {
        /// Sequence start.
        SequenceStart = 0,
        /// Coded frames.
        CodedFrames = 1,
        /// Sequence end.
        SequenceEnd = 2,
        /// Multichannel configuration.
        MultichannelConfig = 4,
        /// Turns on audio multitrack mode.
        Multitrack = 5,
        /// Modifier extension.
        ModEx = 7,
    }
}

nutype_enum! {
    /// Different types of audio packet modifier extensions.
    pub enum AudioPacketModExType(u8) {
        /// Timestamp offset in nanoseconds.
        TimestampOffsetNano = 0,
    }
}

/// A modifier extension prefixed to the effective audio packet type.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPacketModEx {
    /// Timestamp offset in nanoseconds.
    TimestampOffsetNano {
        /// The timestamp offset in nanoseconds.
        audio_timestamp_nano_offset: u32,
    },
    /// Any other modifier extension.
    Other {
        /// The type of the modifier extension.
        audio_packet_mod_ex_type: AudioPacketModExType,
        /// The data of the modifier extension.
        mod_ex_data: Bytes,
    },
}

impl AudioPacketModEx {
    /// Demux a [`AudioPacketModEx`] from the given reader.
    ///
    /// Returns the demuxed [`AudioPacketModEx`] and the next [`AudioPacketType`], if successful.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<(Self, AudioPacketType), FlvError> {
        let mut mod_ex_data_size = reader.read_u8()? as usize + 1;
        if mod_ex_data_size == 256 {
            mod_ex_data_size = reader.read_u16::<BigEndian>()? as usize + 1;
        }

        let mod_ex_data = reader.extract_bytes(mod_ex_data_size)?;

        let next_byte = reader.read_u8()?;
        let audio_packet_mod_ex_type = AudioPacketModExType::from(next_byte >> 4); // 0b1111_0000
        let audio_packet_type = AudioPacketType::from(next_byte & 0b0000_1111);

        if audio_packet_mod_ex_type == AudioPacketModExType::TimestampOffsetNano {
            if mod_ex_data_size < 3 {
                // too few data bytes for the timestamp offset
                return Err(FlvError::InvalidModExData { expected_bytes: 3 });
            }

            let mod_ex_data = &mut io::Cursor::new(mod_ex_data);

            Ok((
                Self::TimestampOffsetNano {
                    audio_timestamp_nano_offset: mod_ex_data.read_u24::<BigEndian>()?,
                },
                audio_packet_type,
            ))
        } else {
            Ok((
                Self::Other {
                    audio_packet_mod_ex_type,
                    mod_ex_data,
                },
                audio_packet_type,
            ))
        }
    }

    fn data_len(&self) -> usize {
        match self {
            AudioPacketModEx::TimestampOffsetNano { .. } => 3,
            AudioPacketModEx::Other { mod_ex_data, .. } => mod_ex_data.len(),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        let data_len = self.data_len();
        let size_field = if data_len >= 256 { 3 } else { 1 };
        size_field + data_len + 1
    }

    /// Mux the record, terminated by `next_packet_type`.
    pub fn mux<W: io::Write>(&self, writer: &mut W, next_packet_type: AudioPacketType) -> Result<(), FlvError> {
        let data_len = self.data_len();
        if data_len == 0 {
            return Err(FlvError::EmptyModExData);
        }

        // the size field is stored minus one, with an escape to u16
        if data_len >= 256 {
            writer.write_u8(0xFF)?;
            writer.write_u16::<BigEndian>((data_len - 1) as u16)?;
        } else {
            writer.write_u8((data_len - 1) as u8)?;
        }

        let mod_ex_type = match self {
            AudioPacketModEx::TimestampOffsetNano {
                audio_timestamp_nano_offset,
            } => {
                writer.write_u24::<BigEndian>(*audio_timestamp_nano_offset)?;
                AudioPacketModExType::TimestampOffsetNano
            }
            AudioPacketModEx::Other {
                audio_packet_mod_ex_type,
                mod_ex_data,
            } => {
                writer.write_all(mod_ex_data)?;
                *audio_packet_mod_ex_type
            }
        };

        writer.write_u8((mod_ex_type.0 << 4) | (next_packet_type.0 & 0b0000_1111))?;

        Ok(())
    }
}

nutype_enum! {
    /// Valid FOURCC values for signaling support of audio codecs in the
    /// enhanced FourCC pipeline.
    ///
    /// Defined by:
    /// - Enhanced RTMP spec, Enhanced Audio section
    pub enum AudioFourCc([u8; 4]) {
        /// Dolby AC-3
        Ac3 = *b"ac-3",
        /// Dolby Digital Plus (E-AC-3)
        Eac3 = *b"ec-3",
        /// Opus audio
        Opus = *b"Opus",
        /// Mp3 audio
        Mp3 = *b".mp3",
        /// Free Lossless Audio Codec
        Flac = *b"fLaC",
        /// Advanced Audio Coding
        Aac = *b"mp4a",
    }
}

/// The multitrack configuration of an enhanced audio tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ExAudioTagHeaderContent {
    /// Not multitrack.
    NoMultiTrack(AudioFourCc),
    /// Multitrack with one track.
    OneTrack(AudioFourCc),
    /// Multitrack with many tracks of the same codec.
    ManyTracks(AudioFourCc),
    /// Multitrack with many tracks of different codecs.
    ManyTracksManyCodecs,
    /// Unknown multitrack type.
    Unknown {
        /// The type of the multitrack audio.
        audio_multitrack_type: AvMultitrackType,
        /// The FOURCC of the audio codec.
        audio_four_cc: AudioFourCc,
    },
}

impl ExAudioTagHeaderContent {
    fn is_multitrack(&self) -> bool {
        !matches!(self, ExAudioTagHeaderContent::NoMultiTrack(_))
    }

    fn multitrack_type(&self) -> Option<AvMultitrackType> {
        match self {
            ExAudioTagHeaderContent::NoMultiTrack(_) => None,
            ExAudioTagHeaderContent::OneTrack(_) => Some(AvMultitrackType::OneTrack),
            ExAudioTagHeaderContent::ManyTracks(_) => Some(AvMultitrackType::ManyTracks),
            ExAudioTagHeaderContent::ManyTracksManyCodecs => Some(AvMultitrackType::ManyTracksManyCodecs),
            ExAudioTagHeaderContent::Unknown {
                audio_multitrack_type, ..
            } => Some(*audio_multitrack_type),
        }
    }

    fn four_cc(&self) -> Option<AudioFourCc> {
        match self {
            ExAudioTagHeaderContent::NoMultiTrack(four_cc)
            | ExAudioTagHeaderContent::OneTrack(four_cc)
            | ExAudioTagHeaderContent::ManyTracks(four_cc)
            | ExAudioTagHeaderContent::Unknown {
                audio_four_cc: four_cc, ..
            } => Some(*four_cc),
            ExAudioTagHeaderContent::ManyTracksManyCodecs => None,
        }
    }
}

/// `ExAudioTagHeader`
///
/// Defined by:
/// - Enhanced RTMP spec, Enhanced Audio section
#[derive(Debug, Clone, PartialEq)]
pub struct ExAudioTagHeader {
    /// The modifier extensions of the audio packet.
    ///
    /// This can be empty if there are no modifier extensions.
    pub audio_packet_mod_exs: Vec<AudioPacketModEx>,
    /// The effective type of the audio packet.
    pub audio_packet_type: AudioPacketType,
    /// The multitrack configuration of the audio packet.
    pub content: ExAudioTagHeaderContent,
}

impl ExAudioTagHeader {
    /// Demux an [`ExAudioTagHeader`] from the given reader.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let mut audio_packet_type = AudioPacketType::from(reader.read_u8()? & 0b0000_1111);

        let mut audio_packet_mod_exs = Vec::new();

        while audio_packet_type == AudioPacketType::ModEx {
            let (mod_ex, next_audio_packet_type) = AudioPacketModEx::demux(reader)?;
            audio_packet_mod_exs.push(mod_ex);
            audio_packet_type = next_audio_packet_type;
        }

        if audio_packet_type == AudioPacketType::Multitrack {
            let byte = reader.read_u8()?;
            let audio_multitrack_type = AvMultitrackType::from(byte >> 4); // 0b1111_0000
            audio_packet_type = AudioPacketType::from(byte & 0b0000_1111);

            if audio_packet_type == AudioPacketType::Multitrack {
                // nested multitracks are not allowed
                return Err(FlvError::NestedMultitracks);
            }

            let mut audio_four_cc = [0; 4];
            // Only read the FOURCC if it's not ManyTracksManyCodecs
            if audio_multitrack_type != AvMultitrackType::ManyTracksManyCodecs {
                reader.read_exact(&mut audio_four_cc)?;
            }

            let content = match audio_multitrack_type {
                AvMultitrackType::OneTrack => ExAudioTagHeaderContent::OneTrack(AudioFourCc::from(audio_four_cc)),
                AvMultitrackType::ManyTracks => ExAudioTagHeaderContent::ManyTracks(AudioFourCc::from(audio_four_cc)),
                AvMultitrackType::ManyTracksManyCodecs => ExAudioTagHeaderContent::ManyTracksManyCodecs,
                _ => ExAudioTagHeaderContent::Unknown {
                    audio_multitrack_type,
                    audio_four_cc: AudioFourCc::from(audio_four_cc),
                },
            };

            Ok(Self {
                audio_packet_mod_exs,
                audio_packet_type,
                content,
            })
        } else {
            let mut audio_four_cc = [0; 4];
            reader.read_exact(&mut audio_four_cc)?;

            Ok(Self {
                audio_packet_mod_exs,
                audio_packet_type,
                content: ExAudioTagHeaderContent::NoMultiTrack(AudioFourCc::from(audio_four_cc)),
            })
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        let mut size = 1; // sound format + first packet type nibble
        size += self.audio_packet_mod_exs.iter().map(AudioPacketModEx::size).sum::<usize>();

        if self.content.is_multitrack() {
            size += 1; // multitrack type + packet type
        }
        if self.content.four_cc().is_some() {
            size += 4;
        }

        size
    }

    /// Mux the header into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        use super::legacy::SoundFormat;

        if self.audio_packet_type == AudioPacketType::Multitrack || self.audio_packet_type == AudioPacketType::ModEx {
            // the effective packet type is always a payload-bearing one
            return Err(FlvError::NestedMultitracks);
        }

        // the packet type that follows the ModEx chain
        let chained_packet_type = if self.content.is_multitrack() {
            AudioPacketType::Multitrack
        } else {
            self.audio_packet_type
        };

        let first_packet_type = if self.audio_packet_mod_exs.is_empty() {
            chained_packet_type
        } else {
            AudioPacketType::ModEx
        };

        writer.write_u8((SoundFormat::ExHeader.0 << 4) | (first_packet_type.0 & 0b0000_1111))?;

        for (i, mod_ex) in self.audio_packet_mod_exs.iter().enumerate() {
            let next = if i + 1 == self.audio_packet_mod_exs.len() {
                chained_packet_type
            } else {
                AudioPacketType::ModEx
            };
            mod_ex.mux(writer, next)?;
        }

        if let Some(multitrack_type) = self.content.multitrack_type() {
            writer.write_u8((multitrack_type.0 << 4) | (self.audio_packet_type.0 & 0b0000_1111))?;
        }

        if let Some(four_cc) = self.content.four_cc() {
            writer.write_all(&four_cc.0)?;
        }

        Ok(())
    }
}
