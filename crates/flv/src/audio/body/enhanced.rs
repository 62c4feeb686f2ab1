//! Enhanced audio tag body
//!
//! Types and functions defined by the enhanced RTMP spec, ExAudioTagBody.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::{Buf, Bytes};
use nutype_enum::nutype_enum;
use strom_bytes_util::BytesCursorExt;

use crate::audio::header::enhanced::{AudioFourCc, AudioPacketType, ExAudioTagHeader, ExAudioTagHeaderContent};
use crate::error::FlvError;

nutype_enum! {
    /// Audio channel order
    ///
    /// Defined by:
    /// - Enhanced RTMP spec, ExAudioTagBody
    pub enum AudioChannelOrder(u8) {
        /// Only the channel count is specified, without any further information about the channel order.
        Unspecified = 0,
        /// The native channel order (the channels are in the same order as defined in the [`AudioChannel`] enum).
        Native = 1,
        /// The channel order does not correspond to any predefined order and is stored as an explicit map.
        Custom = 2,
    }
}

nutype_enum! {
    /// Channel mappings enum
    ///
    /// See <https://en.wikipedia.org/wiki/Surround_sound#Standard_speaker_channels> and
    /// <https://en.wikipedia.org/wiki/22.2_surround_sound> for more information.
    pub enum AudioChannel(u8) {
        /// Front left
        FrontLeft = 0,
        /// Front right
        FrontRight = 1,
        /// Front center
        FrontCenter = 2,
        /// Low frequency
        LowFrequency1 = 3,
        /// Back left
        BackLeft = 4,
        /// Back right
        BackRight = 5,
        /// Front left of center
        FrontLeftCenter = 6,
        /// Front right of center
        FrontRightCenter = 7,
        /// Back center
        BackCenter = 8,
        /// Side left
        SideLeft = 9,
        /// Side right
        SideRight = 10,
        /// Top center
        TopCenter = 11,
        /// Front left height
        TopFrontLeft = 12,
        /// Front center height
        TopFrontCenter = 13,
        /// Front right height
        TopFrontRight = 14,
        /// Rear left height
        TopBackLeft = 15,
        /// Rear center height
        TopBackCenter = 16,
        /// Rear right height
        TopBackRight = 17,
        /// Low frequency 2
        LowFrequency2 = 18,
        /// Top side left
        TopSideLeft = 19,
        /// Top side right
        TopSideRight = 20,
        /// Bottom front center
        BottomFrontCenter = 21,
        /// Bottom front left
        BottomFrontLeft = 22,
        /// Bottom front right
        BottomFrontRight = 23,
        /// Channel is empty and can be safely skipped.
        Unused = 0xfe,
        /// Channel contains data, but its speaker configuration is unknown.
        Unknown = 0xff,
    }
}

/// Mask used to indicate which channels are present in the stream.
///
/// See <https://en.wikipedia.org/wiki/Surround_sound#Standard_speaker_channels> and
/// <https://en.wikipedia.org/wiki/22.2_surround_sound> for more information.
#[bitmask_enum::bitmask(u32)]
pub enum AudioChannelMask {
    /// Front left
    FrontLeft = 0x000001,
    /// Front right
    FrontRight = 0x000002,
    /// Front center
    FrontCenter = 0x000004,
    /// Low frequency
    LowFrequency1 = 0x000008,
    /// Back left
    BackLeft = 0x000010,
    /// Back right
    BackRight = 0x000020,
    /// Front left of center
    FrontLeftCenter = 0x000040,
    /// Front right of center
    FrontRightCenter = 0x000080,
    /// Back center
    BackCenter = 0x000100,
    /// Side left
    SideLeft = 0x000200,
    /// Side right
    SideRight = 0x000400,
    /// Top center
    TopCenter = 0x000800,
    /// Front left height
    TopFrontLeft = 0x001000,
    /// Front center height
    TopFrontCenter = 0x002000,
    /// Front right height
    TopFrontRight = 0x004000,
    /// Rear left height
    TopBackLeft = 0x008000,
    /// Rear center height
    TopBackCenter = 0x010000,
    /// Rear right height
    TopBackRight = 0x020000,
    /// Low frequency 2
    LowFrequency2 = 0x040000,
    /// Top side left
    TopSideLeft = 0x080000,
    /// Top side right
    TopSideRight = 0x100000,
    /// Bottom front center
    BottomFrontCenter = 0x200000,
    /// Bottom front left
    BottomFrontLeft = 0x400000,
    /// Bottom front right
    BottomFrontRight = 0x800000,
}

/// The channel layout carried by an [`AudioPacket::MultichannelConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum MultichannelConfigOrder {
    /// The channels have a custom order that is explicitly defined by this packet.
    Custom(Vec<AudioChannel>),
    /// Only the channels flagged in this packet are present in the stream,
    /// in the order they are defined by the [`AudioChannelMask`].
    Native(AudioChannelMask),
    /// The channel order is unspecified, only the channel count is known.
    Unspecified,
    /// An unknown channel order.
    Unknown(AudioChannelOrder),
}

/// Audio packet
///
/// Appears as part of the [`ExAudioTagBody`].
///
/// Defined by:
/// - Enhanced RTMP spec, ExAudioTagBody
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPacket {
    /// Multichannel configuration
    ///
    /// Specifies a speaker for a channel as it appears in the bitstream.
    /// This is needed if the codec is not self-describing for channel mapping.
    MultichannelConfig {
        /// The number of channels in the audio stream.
        channel_count: u8,
        /// The order of the channels in the audio stream.
        multichannel_config: MultichannelConfigOrder,
    },
    /// Indicates the end of a sequence of audio packets.
    SequenceEnd,
    /// Indicates the start of a sequence of audio packets.
    SequenceStart {
        /// The header data for the sequence.
        header_data: Bytes,
    },
    /// Coded audio frames.
    CodedFrames {
        /// The audio data.
        data: Bytes,
    },
    /// An unknown [`AudioPacketType`].
    Unknown {
        /// The unknown packet type.
        audio_packet_type: AudioPacketType,
        /// The data.
        data: Bytes,
    },
}

impl AudioPacket {
    /// Demux an [`AudioPacket`] from the given reader.
    pub fn demux(header: &ExAudioTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let has_multiple_tracks = !matches!(
            header.content,
            ExAudioTagHeaderContent::NoMultiTrack(_) | ExAudioTagHeaderContent::OneTrack(_)
        );

        let size_of_audio_track = if has_multiple_tracks {
            Some(reader.read_u24::<BigEndian>()? as usize)
        } else {
            None
        };

        match header.audio_packet_type {
            AudioPacketType::MultichannelConfig => {
                let audio_channel_order = AudioChannelOrder::from(reader.read_u8()?);
                let channel_count = reader.read_u8()?;

                let multichannel_config = match audio_channel_order {
                    AudioChannelOrder::Custom => {
                        let channels = reader.extract_bytes(channel_count as usize)?;

                        MultichannelConfigOrder::Custom(channels.into_iter().map(AudioChannel::from).collect())
                    }
                    AudioChannelOrder::Native => {
                        let audio_channel_flags = AudioChannelMask::from(reader.read_u32::<BigEndian>()?);

                        MultichannelConfigOrder::Native(audio_channel_flags)
                    }
                    AudioChannelOrder::Unspecified => MultichannelConfigOrder::Unspecified,
                    _ => MultichannelConfigOrder::Unknown(audio_channel_order),
                };

                Ok(Self::MultichannelConfig {
                    channel_count,
                    multichannel_config,
                })
            }
            AudioPacketType::SequenceEnd => Ok(Self::SequenceEnd),
            AudioPacketType::SequenceStart => {
                let header_data = reader.extract_bytes(size_of_audio_track.unwrap_or(reader.remaining()))?;

                Ok(Self::SequenceStart { header_data })
            }
            AudioPacketType::CodedFrames => {
                let data = reader.extract_bytes(size_of_audio_track.unwrap_or(reader.remaining()))?;

                Ok(Self::CodedFrames { data })
            }
            _ => {
                let data = reader.extract_bytes(size_of_audio_track.unwrap_or(reader.remaining()))?;

                Ok(Self::Unknown {
                    audio_packet_type: header.audio_packet_type,
                    data,
                })
            }
        }
    }

    /// The effective packet type of this packet.
    pub fn packet_type(&self) -> Option<AudioPacketType> {
        match self {
            AudioPacket::MultichannelConfig { .. } => Some(AudioPacketType::MultichannelConfig),
            AudioPacket::SequenceEnd => Some(AudioPacketType::SequenceEnd),
            AudioPacket::SequenceStart { .. } => Some(AudioPacketType::SequenceStart),
            AudioPacket::CodedFrames { .. } => Some(AudioPacketType::CodedFrames),
            AudioPacket::Unknown { audio_packet_type, .. } => Some(*audio_packet_type),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        match self {
            AudioPacket::MultichannelConfig {
                multichannel_config, ..
            } => {
                2 + match multichannel_config {
                    MultichannelConfigOrder::Custom(channels) => channels.len(),
                    MultichannelConfigOrder::Native(_) => 4,
                    MultichannelConfigOrder::Unspecified | MultichannelConfigOrder::Unknown(_) => 0,
                }
            }
            AudioPacket::SequenceEnd => 0,
            AudioPacket::SequenceStart { header_data } => header_data.len(),
            AudioPacket::CodedFrames { data } => data.len(),
            AudioPacket::Unknown { data, .. } => data.len(),
        }
    }

    /// Mux the packet payload into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        match self {
            AudioPacket::MultichannelConfig {
                channel_count,
                multichannel_config,
            } => {
                let order = match multichannel_config {
                    MultichannelConfigOrder::Custom(_) => AudioChannelOrder::Custom,
                    MultichannelConfigOrder::Native(_) => AudioChannelOrder::Native,
                    MultichannelConfigOrder::Unspecified => AudioChannelOrder::Unspecified,
                    MultichannelConfigOrder::Unknown(order) => *order,
                };

                writer.write_u8(order.0)?;
                writer.write_u8(*channel_count)?;

                match multichannel_config {
                    MultichannelConfigOrder::Custom(channels) => {
                        if channels.len() != *channel_count as usize {
                            return Err(FlvError::HeaderBodyMismatch("custom channel map length != channel count"));
                        }
                        for channel in channels {
                            writer.write_u8(channel.0)?;
                        }
                    }
                    MultichannelConfigOrder::Native(mask) => writer.write_u32::<BigEndian>(u32::from(*mask))?,
                    MultichannelConfigOrder::Unspecified | MultichannelConfigOrder::Unknown(_) => {}
                }
            }
            AudioPacket::SequenceEnd => {}
            AudioPacket::SequenceStart { header_data } => writer.write_all(header_data)?,
            AudioPacket::CodedFrames { data } => writer.write_all(data)?,
            AudioPacket::Unknown { data, .. } => writer.write_all(data)?,
        }

        Ok(())
    }
}

/// One audio track contained in a multitrack audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// The audio FOURCC of this track.
    pub audio_four_cc: AudioFourCc,
    /// The audio track ID.
    ///
    /// Track id 0 is the default (highest priority or quality) track; lesser
    /// tracks use ascending ids.
    pub audio_track_id: u8,
    /// The audio packet contained in this track.
    pub packet: AudioPacket,
}

/// `ExAudioTagBody`
///
/// Defined by:
/// - Enhanced RTMP spec, ExAudioTagBody
#[derive(Debug, Clone, PartialEq)]
pub enum ExAudioTagBody {
    /// The body is not a multitrack body.
    NoMultitrack {
        /// The audio FOURCC of this body.
        audio_four_cc: AudioFourCc,
        /// The audio packet contained in this body.
        packet: AudioPacket,
    },
    /// The body is a multitrack body carrying one or more tracks.
    ManyTracks(Vec<AudioTrack>),
}

impl ExAudioTagBody {
    /// Builds a many-track body, enforcing the two-track minimum of the
    /// many-track layouts.
    pub fn many_tracks(tracks: Vec<AudioTrack>) -> Result<Self, FlvError> {
        if tracks.len() < 2 {
            return Err(FlvError::TooFewTracks(tracks.len()));
        }

        Ok(Self::ManyTracks(tracks))
    }

    /// Builds a one-track body.
    pub fn one_track(track: AudioTrack) -> Self {
        Self::ManyTracks(vec![track])
    }

    /// Demux an [`ExAudioTagBody`] from the given reader.
    pub fn demux(header: &ExAudioTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let mut tracks = Vec::new();

        loop {
            let audio_four_cc = match header.content {
                ExAudioTagHeaderContent::ManyTracksManyCodecs => {
                    let mut audio_four_cc = [0; 4];
                    reader.read_exact(&mut audio_four_cc)?;
                    AudioFourCc::from(audio_four_cc)
                }
                ExAudioTagHeaderContent::OneTrack(audio_four_cc) => audio_four_cc,
                ExAudioTagHeaderContent::ManyTracks(audio_four_cc) => audio_four_cc,
                ExAudioTagHeaderContent::NoMultiTrack(audio_four_cc) => audio_four_cc,
                ExAudioTagHeaderContent::Unknown { audio_four_cc, .. } => audio_four_cc,
            };

            // the track id is only present when this is a multitrack audio
            let audio_track_id = if !matches!(header.content, ExAudioTagHeaderContent::NoMultiTrack(_)) {
                Some(reader.read_u8()?)
            } else {
                None
            };

            let packet = AudioPacket::demux(header, reader)?;

            if let Some(audio_track_id) = audio_track_id {
                tracks.push(AudioTrack {
                    audio_four_cc,
                    audio_track_id,
                    packet,
                });

                // the loop only continues if there is still data to read and
                // this is an audio with multiple tracks
                if !matches!(header.content, ExAudioTagHeaderContent::OneTrack(_)) && reader.has_remaining() {
                    continue;
                }

                break;
            } else {
                // a single-track audio completes after one loop iteration
                return Ok(Self::NoMultitrack { audio_four_cc, packet });
            }
        }

        Ok(Self::ManyTracks(tracks))
    }

    /// The number of bytes [`mux`](Self::mux) will write for the given header.
    pub fn size(&self, header: &ExAudioTagHeader) -> usize {
        let per_track_size_field = !matches!(
            header.content,
            ExAudioTagHeaderContent::NoMultiTrack(_) | ExAudioTagHeaderContent::OneTrack(_)
        );
        let per_track_four_cc = matches!(header.content, ExAudioTagHeaderContent::ManyTracksManyCodecs);

        match self {
            ExAudioTagBody::NoMultitrack { packet, .. } => packet.size(),
            ExAudioTagBody::ManyTracks(tracks) => tracks
                .iter()
                .map(|track| {
                    (per_track_four_cc as usize * 4) + 1 + (per_track_size_field as usize * 3) + track.packet.size()
                })
                .sum(),
        }
    }

    /// Mux the body into the given writer.
    ///
    /// The header decides the layout (track ids, per-track sizes, per-track
    /// FourCCs), so it must be the header this body will be muxed under.
    pub fn mux<W: io::Write>(&self, header: &ExAudioTagHeader, writer: &mut W) -> Result<(), FlvError> {
        match self {
            ExAudioTagBody::NoMultitrack { audio_four_cc, packet } => {
                match header.content {
                    ExAudioTagHeaderContent::NoMultiTrack(header_four_cc) => {
                        if header_four_cc != *audio_four_cc {
                            return Err(FlvError::HeaderBodyMismatch("body codec differs from header codec"));
                        }
                    }
                    _ => return Err(FlvError::HeaderBodyMismatch("single-track body under multitrack header")),
                }

                packet.mux(writer)?;
            }
            ExAudioTagBody::ManyTracks(tracks) => {
                match header.content {
                    ExAudioTagHeaderContent::OneTrack(_) => {
                        if tracks.len() != 1 {
                            return Err(FlvError::NotOneTrack(tracks.len()));
                        }
                    }
                    ExAudioTagHeaderContent::ManyTracks(_) | ExAudioTagHeaderContent::ManyTracksManyCodecs => {
                        if tracks.len() < 2 {
                            return Err(FlvError::TooFewTracks(tracks.len()));
                        }
                    }
                    ExAudioTagHeaderContent::Unknown { .. } => {}
                    ExAudioTagHeaderContent::NoMultiTrack(_) => {
                        return Err(FlvError::HeaderBodyMismatch("multitrack body under single-track header"));
                    }
                }

                let per_track_size_field = !matches!(
                    header.content,
                    ExAudioTagHeaderContent::NoMultiTrack(_) | ExAudioTagHeaderContent::OneTrack(_)
                );

                for track in tracks {
                    if matches!(header.content, ExAudioTagHeaderContent::ManyTracksManyCodecs) {
                        writer.write_all(&track.audio_four_cc.0)?;
                    }

                    writer.write_u8(track.audio_track_id)?;

                    if per_track_size_field {
                        let size = track.packet.size();
                        if size > 0xFF_FFFF {
                            return Err(FlvError::TrackSizeTooLarge(size));
                        }
                        writer.write_u24::<BigEndian>(size as u32)?;
                    }

                    track.packet.mux(writer)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::common::AvMultitrackType;

    fn mux_round_trip(header: &ExAudioTagHeader, body: &ExAudioTagBody) {
        let mut buf = Vec::new();
        body.mux(header, &mut buf).unwrap();
        assert_eq!(body.size(header), buf.len());

        let decoded = ExAudioTagBody::demux(header, &mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(&decoded, body);
    }

    fn coded_frames_header(content: ExAudioTagHeaderContent) -> ExAudioTagHeader {
        ExAudioTagHeader {
            audio_packet_mod_exs: vec![],
            audio_packet_type: AudioPacketType::CodedFrames,
            content,
        }
    }

    #[test]
    fn simple_body_round_trip() {
        mux_round_trip(
            &coded_frames_header(ExAudioTagHeaderContent::NoMultiTrack(AudioFourCc::Aac)),
            &ExAudioTagBody::NoMultitrack {
                audio_four_cc: AudioFourCc::Aac,
                packet: AudioPacket::CodedFrames {
                    data: Bytes::from_static(&[42, 42]),
                },
            },
        );
    }

    #[test]
    fn packet_with_size_ignores_trailing_bytes() {
        let data = &[
            0, 0, 2, // size
            42, 42, // data
            13, 37, // belongs to the next track
        ];

        let header = coded_frames_header(ExAudioTagHeaderContent::ManyTracks(AudioFourCc::Aac));
        let packet = AudioPacket::demux(&header, &mut std::io::Cursor::new(Bytes::from_static(data))).unwrap();

        assert_eq!(
            packet,
            AudioPacket::CodedFrames {
                data: Bytes::from_static(&[42, 42])
            },
        );
    }

    #[test]
    fn multichannel_config_round_trips() {
        let header = ExAudioTagHeader {
            audio_packet_mod_exs: vec![],
            audio_packet_type: AudioPacketType::MultichannelConfig,
            content: ExAudioTagHeaderContent::NoMultiTrack(AudioFourCc::Aac),
        };

        mux_round_trip(
            &header,
            &ExAudioTagBody::NoMultitrack {
                audio_four_cc: AudioFourCc::Aac,
                packet: AudioPacket::MultichannelConfig {
                    channel_count: 2,
                    multichannel_config: MultichannelConfigOrder::Custom(vec![
                        AudioChannel::FrontLeft,
                        AudioChannel::FrontRight,
                    ]),
                },
            },
        );

        mux_round_trip(
            &header,
            &ExAudioTagBody::NoMultitrack {
                audio_four_cc: AudioFourCc::Aac,
                packet: AudioPacket::MultichannelConfig {
                    channel_count: 2,
                    multichannel_config: MultichannelConfigOrder::Native(
                        AudioChannelMask::FrontLeft | AudioChannelMask::FrontRight,
                    ),
                },
            },
        );

        mux_round_trip(
            &header,
            &ExAudioTagBody::NoMultitrack {
                audio_four_cc: AudioFourCc::Aac,
                packet: AudioPacket::MultichannelConfig {
                    channel_count: 2,
                    multichannel_config: MultichannelConfigOrder::Unspecified,
                },
            },
        );
    }

    #[test]
    fn multitrack_many_codecs_round_trip() {
        mux_round_trip(
            &coded_frames_header(ExAudioTagHeaderContent::ManyTracksManyCodecs),
            &ExAudioTagBody::many_tracks(vec![
                AudioTrack {
                    audio_four_cc: AudioFourCc::Aac,
                    audio_track_id: 1,
                    packet: AudioPacket::CodedFrames {
                        data: Bytes::from_static(&[42, 42]),
                    },
                },
                AudioTrack {
                    audio_four_cc: AudioFourCc::Opus,
                    audio_track_id: 2,
                    packet: AudioPacket::CodedFrames {
                        data: Bytes::from_static(&[13, 37]),
                    },
                },
            ])
            .unwrap(),
        );
    }

    #[test]
    fn multitrack_one_codec_round_trip() {
        mux_round_trip(
            &coded_frames_header(ExAudioTagHeaderContent::ManyTracks(AudioFourCc::Aac)),
            &ExAudioTagBody::many_tracks(vec![
                AudioTrack {
                    audio_four_cc: AudioFourCc::Aac,
                    audio_track_id: 1,
                    packet: AudioPacket::CodedFrames {
                        data: Bytes::from_static(&[42, 42]),
                    },
                },
                AudioTrack {
                    audio_four_cc: AudioFourCc::Aac,
                    audio_track_id: 2,
                    packet: AudioPacket::CodedFrames {
                        data: Bytes::from_static(&[13, 37]),
                    },
                },
            ])
            .unwrap(),
        );
    }

    #[test]
    fn one_track_round_trip() {
        mux_round_trip(
            &coded_frames_header(ExAudioTagHeaderContent::OneTrack(AudioFourCc::Aac)),
            &ExAudioTagBody::one_track(AudioTrack {
                audio_four_cc: AudioFourCc::Aac,
                audio_track_id: 1,
                packet: AudioPacket::CodedFrames {
                    data: Bytes::from_static(&[42, 42]),
                },
            }),
        );
    }

    #[test]
    fn many_tracks_needs_two() {
        let err = ExAudioTagBody::many_tracks(vec![AudioTrack {
            audio_four_cc: AudioFourCc::Aac,
            audio_track_id: 1,
            packet: AudioPacket::SequenceEnd,
        }])
        .unwrap_err();
        assert!(matches!(err, FlvError::TooFewTracks(1)));

        // muxing a hand-built single-entry body under a many-track header
        // fails the same way
        let header = coded_frames_header(ExAudioTagHeaderContent::ManyTracks(AudioFourCc::Aac));
        let body = ExAudioTagBody::ManyTracks(vec![AudioTrack {
            audio_four_cc: AudioFourCc::Aac,
            audio_track_id: 1,
            packet: AudioPacket::SequenceEnd,
        }]);

        let err = body.mux(&header, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FlvError::TooFewTracks(1)));
    }

    #[test]
    fn unknown_multitrack_type_demux() {
        let data = &[
            1, // audio track id
            0, 0, 2, // size
            42, 42, // data
        ];

        let header = coded_frames_header(ExAudioTagHeaderContent::Unknown {
            audio_four_cc: AudioFourCc::Aac,
            audio_multitrack_type: AvMultitrackType(4),
        });

        let packet = ExAudioTagBody::demux(&header, &mut std::io::Cursor::new(Bytes::from_static(data))).unwrap();

        assert_eq!(
            packet,
            ExAudioTagBody::ManyTracks(vec![AudioTrack {
                audio_track_id: 1,
                audio_four_cc: AudioFourCc::Aac,
                packet: AudioPacket::CodedFrames {
                    data: Bytes::from_static(&[42, 42])
                }
            }]),
        );
    }
}
