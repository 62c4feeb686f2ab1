//! Enhanced video header types and functions.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use nutype_enum::nutype_enum;
use strom_bytes_util::BytesCursorExt;

use super::{VideoCommand, VideoFrameType};
use crate::common::AvMultitrackType;
use crate::error::FlvError;

nutype_enum! {
    /// Different types of video packets.
    ///
    /// Defined by:
    /// - Enhanced RTMP spec, Enhanced Video section
    pub enum VideoPacketType(u8) {
        /// Sequence start.
        SequenceStart = 0,
        /// Coded frames.
        CodedFrames = 1,
        /// Sequence end.
        SequenceEnd = 2,
        /// Coded frames without extra data.
        CodedFramesX = 3,
        /// Metadata.
        Metadata = 4,
        /// MPEG-2 TS sequence start.
        Mpeg2TsSequenceStart = 5,
        /// Turns on video multitrack mode.
        Multitrack = 6,
        /// Modifier extension.
        ModEx = 7,
    }
}

nutype_enum! {
    /// Different types of video packet modifier extensions.
    pub enum VideoPacketModExType(u8) {
        /// Timestamp offset in nanoseconds.
        TimestampOffsetNano = 0,
    }
}

/// A modifier extension prefixed to the effective video packet type.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoPacketModEx {
    /// Timestamp offset in nanoseconds.
    TimestampOffsetNano {
        /// The timestamp offset in nanoseconds.
        video_timestamp_nano_offset: u32,
    },
    /// Any other modifier extension.
    Other {
        /// The type of the modifier extension.
        video_packet_mod_ex_type: VideoPacketModExType,
        /// The data of the modifier extension.
        mod_ex_data: Bytes,
    },
}

impl VideoPacketModEx {
    /// Demux a [`VideoPacketModEx`] from the given reader.
    ///
    /// Returns the demuxed [`VideoPacketModEx`] and the next [`VideoPacketType`], if successful.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<(Self, VideoPacketType), FlvError> {
        let mut mod_ex_data_size = reader.read_u8()? as usize + 1;
        if mod_ex_data_size == 256 {
            mod_ex_data_size = reader.read_u16::<BigEndian>()? as usize + 1;
        }

        let mod_ex_data = reader.extract_bytes(mod_ex_data_size)?;

        let next_byte = reader.read_u8()?;
        let video_packet_mod_ex_type = VideoPacketModExType::from(next_byte >> 4); // 0b1111_0000
        let video_packet_type = VideoPacketType::from(next_byte & 0b0000_1111);

        if video_packet_mod_ex_type == VideoPacketModExType::TimestampOffsetNano {
            if mod_ex_data_size < 3 {
                // too few data bytes for the timestamp offset
                return Err(FlvError::InvalidModExData { expected_bytes: 3 });
            }

            let mod_ex_data = &mut io::Cursor::new(mod_ex_data);

            Ok((
                VideoPacketModEx::TimestampOffsetNano {
                    video_timestamp_nano_offset: mod_ex_data.read_u24::<BigEndian>()?,
                },
                video_packet_type,
            ))
        } else {
            Ok((
                VideoPacketModEx::Other {
                    video_packet_mod_ex_type,
                    mod_ex_data,
                },
                video_packet_type,
            ))
        }
    }

    fn data_len(&self) -> usize {
        match self {
            VideoPacketModEx::TimestampOffsetNano { .. } => 3,
            VideoPacketModEx::Other { mod_ex_data, .. } => mod_ex_data.len(),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        let data_len = self.data_len();
        let size_field = if data_len >= 256 { 3 } else { 1 };
        size_field + data_len + 1
    }

    /// Mux the record, terminated by `next_packet_type`.
    pub fn mux<W: io::Write>(&self, writer: &mut W, next_packet_type: VideoPacketType) -> Result<(), FlvError> {
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
            VideoPacketModEx::TimestampOffsetNano {
                video_timestamp_nano_offset,
            } => {
                writer.write_u24::<BigEndian>(*video_timestamp_nano_offset)?;
                VideoPacketModExType::TimestampOffsetNano
            }
            VideoPacketModEx::Other {
                video_packet_mod_ex_type,
                mod_ex_data,
            } => {
                writer.write_all(mod_ex_data)?;
                *video_packet_mod_ex_type
            }
        };

        writer.write_u8((mod_ex_type.0 << 4) | (next_packet_type.0 & 0b0000_1111))?;

        Ok(())
    }
}

nutype_enum! {
    /// Valid FOURCC values for signaling support of video codecs
    /// in the enhanced FourCC pipeline.
    ///
    /// Defined by:
    /// - Enhanced RTMP spec, Enhanced Video section
    pub enum VideoFourCc([u8; 4]) {
        /// VP8
        Vp8 = *b"vp08",
        /// VP9
        Vp9 = *b"vp09",
        /// AV1
        Av1 = *b"av01",
        /// AVC (H.264)
        Avc = *b"avc1",
        /// HEVC (H.265)
        Hevc = *b"hvc1",
    }
}

/// The multitrack (or command) configuration of an enhanced video tag.
#[derive(Debug, Clone, PartialEq)]
pub enum ExVideoTagHeaderContent {
    /// Video command.
    VideoCommand(VideoCommand),
    /// Not multitrack.
    NoMultiTrack(VideoFourCc),
    /// Multitrack with one track.
    OneTrack(VideoFourCc),
    /// Multitrack with many tracks of the same codec.
    ManyTracks(VideoFourCc),
    /// Multitrack with many tracks of different codecs.
    ManyTracksManyCodecs,
    /// Unknown multitrack type.
    Unknown {
        /// The type of the multitrack video.
        video_multitrack_type: AvMultitrackType,
        /// The FOURCC of the video codec.
        video_four_cc: VideoFourCc,
    },
}

impl ExVideoTagHeaderContent {
    fn is_multitrack(&self) -> bool {
        !matches!(
            self,
            ExVideoTagHeaderContent::NoMultiTrack(_) | ExVideoTagHeaderContent::VideoCommand(_)
        )
    }

    fn multitrack_type(&self) -> Option<AvMultitrackType> {
        match self {
            ExVideoTagHeaderContent::OneTrack(_) => Some(AvMultitrackType::OneTrack),
            ExVideoTagHeaderContent::ManyTracks(_) => Some(AvMultitrackType::ManyTracks),
            ExVideoTagHeaderContent::ManyTracksManyCodecs => Some(AvMultitrackType::ManyTracksManyCodecs),
            ExVideoTagHeaderContent::Unknown {
                video_multitrack_type, ..
            } => Some(*video_multitrack_type),
            _ => None,
        }
    }

    fn four_cc(&self) -> Option<VideoFourCc> {
        match self {
            ExVideoTagHeaderContent::NoMultiTrack(four_cc)
            | ExVideoTagHeaderContent::OneTrack(four_cc)
            | ExVideoTagHeaderContent::ManyTracks(four_cc)
            | ExVideoTagHeaderContent::Unknown {
                video_four_cc: four_cc, ..
            } => Some(*four_cc),
            ExVideoTagHeaderContent::ManyTracksManyCodecs | ExVideoTagHeaderContent::VideoCommand(_) => None,
        }
    }
}

/// `ExVideoTagHeader`
///
/// Defined by:
/// - Enhanced RTMP spec, Enhanced Video section
#[derive(Debug, Clone, PartialEq)]
pub struct ExVideoTagHeader {
    /// The modifier extensions of the video packet.
    ///
    /// This can be empty if there are no modifier extensions.
    pub video_packet_mod_exs: Vec<VideoPacketModEx>,
    /// The effective type of the video packet.
    pub video_packet_type: VideoPacketType,
    /// The multitrack (or command) configuration of the video packet.
    pub content: ExVideoTagHeaderContent,
}

impl ExVideoTagHeader {
    /// Demux an [`ExVideoTagHeader`] from the given reader.
    #[allow(clippy::unusual_byte_groupings)]
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let byte = reader.read_u8()?;
        let video_frame_type = VideoFrameType::from((byte & 0b0_111_0000) >> 4);
        let mut video_packet_type = VideoPacketType::from(byte & 0b0000_1111);

        let mut video_packet_mod_exs = Vec::new();

        // Read all modifier extensions
        while video_packet_type == VideoPacketType::ModEx {
            let (mod_ex, next_video_packet_type) = VideoPacketModEx::demux(reader)?;
            video_packet_mod_exs.push(mod_ex);
            video_packet_type = next_video_packet_type;
        }

        let content = if video_packet_type != VideoPacketType::Metadata && video_frame_type == VideoFrameType::Command {
            let video_command = VideoCommand::from(reader.read_u8()?);
            ExVideoTagHeaderContent::VideoCommand(video_command)
        } else if video_packet_type == VideoPacketType::Multitrack {
            let next_byte = reader.read_u8()?;
            let video_multitrack_type = AvMultitrackType::from(next_byte >> 4); // 0b1111_0000
            video_packet_type = VideoPacketType::from(next_byte & 0b0000_1111);

            if video_packet_type == VideoPacketType::Multitrack {
                // nested multitracks are not allowed
                return Err(FlvError::NestedMultitracks);
            }

            let mut video_four_cc = [0; 4];
            // Only read the FOURCC if it's not ManyTracksManyCodecs
            if video_multitrack_type != AvMultitrackType::ManyTracksManyCodecs {
                reader.read_exact(&mut video_four_cc)?;
            }

            match video_multitrack_type {
                AvMultitrackType::OneTrack => ExVideoTagHeaderContent::OneTrack(VideoFourCc::from(video_four_cc)),
                AvMultitrackType::ManyTracks => ExVideoTagHeaderContent::ManyTracks(VideoFourCc::from(video_four_cc)),
                AvMultitrackType::ManyTracksManyCodecs => ExVideoTagHeaderContent::ManyTracksManyCodecs,
                _ => ExVideoTagHeaderContent::Unknown {
                    video_multitrack_type,
                    video_four_cc: VideoFourCc::from(video_four_cc),
                },
            }
        } else {
            let mut video_four_cc = [0; 4];
            reader.read_exact(&mut video_four_cc)?;

            ExVideoTagHeaderContent::NoMultiTrack(VideoFourCc::from(video_four_cc))
        };

        Ok(Self {
            video_packet_type,
            video_packet_mod_exs,
            content,
        })
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        let mut size = 1; // ex header bit + frame type + first packet type nibble
        size += self.video_packet_mod_exs.iter().map(VideoPacketModEx::size).sum::<usize>();

        match &self.content {
            ExVideoTagHeaderContent::VideoCommand(_) => size += 1,
            content => {
                if content.is_multitrack() {
                    size += 1; // multitrack type + packet type
                }
                if content.four_cc().is_some() {
                    size += 4;
                }
            }
        }

        size
    }

    /// Mux the header into the given writer, packing `frame_type` into the
    /// first byte.
    pub fn mux<W: io::Write>(&self, frame_type: VideoFrameType, writer: &mut W) -> Result<(), FlvError> {
        if self.video_packet_type == VideoPacketType::Multitrack || self.video_packet_type == VideoPacketType::ModEx {
            // the effective packet type is always a payload-bearing one
            return Err(FlvError::NestedMultitracks);
        }

        if matches!(self.content, ExVideoTagHeaderContent::VideoCommand(_))
            && (frame_type != VideoFrameType::Command || self.video_packet_type == VideoPacketType::Metadata)
        {
            return Err(FlvError::HeaderBodyMismatch("video command needs a command frame type"));
        }

        // the packet type that follows the ModEx chain
        let chained_packet_type = if self.content.is_multitrack() {
            VideoPacketType::Multitrack
        } else {
            self.video_packet_type
        };

        let first_packet_type = if self.video_packet_mod_exs.is_empty() {
            chained_packet_type
        } else {
            VideoPacketType::ModEx
        };

        writer.write_u8(0b1000_0000 | ((frame_type.0 & 0b0111) << 4) | (first_packet_type.0 & 0b0000_1111))?;

        for (i, mod_ex) in self.video_packet_mod_exs.iter().enumerate() {
            let next = if i + 1 == self.video_packet_mod_exs.len() {
                chained_packet_type
            } else {
                VideoPacketType::ModEx
            };
            mod_ex.mux(writer, next)?;
        }

        if let ExVideoTagHeaderContent::VideoCommand(command) = &self.content {
            writer.write_u8(command.0)?;
            return Ok(());
        }

        if let Some(multitrack_type) = self.content.multitrack_type() {
            writer.write_u8((multitrack_type.0 << 4) | (self.video_packet_type.0 & 0b0000_1111))?;
        }

        if let Some(four_cc) = self.content.four_cc() {
            writer.write_all(&four_cc.0)?;
        }

        Ok(())
    }
}
