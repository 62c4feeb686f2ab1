//! Enhanced video tag body
//!
//! Types and functions defined by the enhanced RTMP spec, ExVideoTagBody.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::{Buf, Bytes};
use strom_amf0::{Amf0Decoder, Amf0Value};
use strom_bytes_util::BytesCursorExt;
use strom_h264::AVCDecoderConfigurationRecord;
use strom_h265::HEVCDecoderConfigurationRecord;

use crate::error::FlvError;
use crate::video::header::enhanced::{ExVideoTagHeader, ExVideoTagHeaderContent, VideoFourCc, VideoPacketType};

/// Sequence start video packet
#[derive(Debug, Clone, PartialEq)]
pub enum VideoPacketSequenceStart {
    /// H.264/AVC codec configuration record
    Avc(AVCDecoderConfigurationRecord),
    /// H.265/HEVC codec configuration record
    Hevc(HEVCDecoderConfigurationRecord),
    /// Other codecs like AV1, VP8 and VP9; the configuration payload is
    /// passed through opaque.
    Other(Bytes),
}

/// Coded frames video packet
#[derive(Debug, Clone, PartialEq)]
pub enum VideoPacketCodedFrames {
    /// H.264/AVC coded frames
    Avc {
        /// Composition time offset
        composition_time_offset: i32,
        /// Data
        data: Bytes,
    },
    /// H.265/HEVC coded frames
    Hevc {
        /// Composition time offset
        composition_time_offset: i32,
        /// Data
        data: Bytes,
    },
    /// Coded frames of any other codec
    Other(Bytes),
}

/// Video packet
///
/// Appears as part of the [`ExVideoTagBody`].
///
/// Defined by:
/// - Enhanced RTMP spec, ExVideoTagBody
#[derive(Debug, Clone, PartialEq)]
pub enum VideoPacket {
    /// Metadata, raw AMF0 bytes.
    ///
    /// Use [`decode_metadata`](Self::decode_metadata) for the element tree.
    Metadata {
        /// The AMF0-encoded metadata.
        data: Bytes,
    },
    /// Indicates the end of a sequence of video packets.
    SequenceEnd,
    /// Indicates the start of a sequence of video packets.
    SequenceStart(VideoPacketSequenceStart),
    /// Indicates the start of a sequence of video packets in MPEG2-TS format.
    ///
    /// No body format is documented for this packet type; the payload is
    /// passed through opaque.
    Mpeg2TsSequenceStart {
        /// The data.
        data: Bytes,
    },
    /// Coded video frames.
    CodedFrames(VideoPacketCodedFrames),
    /// Coded video frames without extra data.
    CodedFramesX {
        /// The video data.
        data: Bytes,
    },
    /// An unknown [`VideoPacketType`].
    Unknown {
        /// The unknown packet type.
        video_packet_type: VideoPacketType,
        /// The data.
        data: Bytes,
    },
}

/// The valid range of a 24-bit composition time offset.
const COMPOSITION_TIME_RANGE: std::ops::RangeInclusive<i32> = -(1 << 23)..=(1 << 23) - 1;

impl VideoPacket {
    /// Demux a [`VideoPacket`] from the given reader.
    pub fn demux(
        header: &ExVideoTagHeader,
        video_four_cc: VideoFourCc,
        reader: &mut io::Cursor<Bytes>,
    ) -> Result<Self, FlvError> {
        let size_of_video_track = if !matches!(
            header.content,
            ExVideoTagHeaderContent::NoMultiTrack(_) | ExVideoTagHeaderContent::OneTrack(_)
        ) {
            Some(reader.read_u24::<BigEndian>()? as usize)
        } else {
            None
        };

        match header.video_packet_type {
            VideoPacketType::Metadata => {
                let data = reader.extract_bytes(size_of_video_track.unwrap_or(reader.remaining()))?;

                Ok(Self::Metadata { data })
            }
            VideoPacketType::SequenceEnd => Ok(Self::SequenceEnd),
            VideoPacketType::SequenceStart => {
                let data = reader.extract_bytes(size_of_video_track.unwrap_or(reader.remaining()))?;

                let seq_start = match video_four_cc {
                    VideoFourCc::Avc => {
                        let record = AVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data))?;
                        VideoPacketSequenceStart::Avc(record)
                    }
                    VideoFourCc::Hevc => {
                        let record = HEVCDecoderConfigurationRecord::demux(&mut io::Cursor::new(data))?;
                        VideoPacketSequenceStart::Hevc(record)
                    }
                    _ => VideoPacketSequenceStart::Other(data),
                };

                Ok(Self::SequenceStart(seq_start))
            }
            VideoPacketType::Mpeg2TsSequenceStart => {
                let data = reader.extract_bytes(size_of_video_track.unwrap_or(reader.remaining()))?;

                Ok(Self::Mpeg2TsSequenceStart { data })
            }
            VideoPacketType::CodedFrames => {
                // only avc1 and hvc1 carry a composition time before the payload
                let coded_frames = match video_four_cc {
                    VideoFourCc::Avc => {
                        let composition_time_offset = reader.read_i24::<BigEndian>()?;
                        let data = reader
                            .extract_bytes(size_of_video_track.map(|s| s.saturating_sub(3)).unwrap_or(reader.remaining()))?;

                        VideoPacketCodedFrames::Avc {
                            composition_time_offset,
                            data,
                        }
                    }
                    VideoFourCc::Hevc => {
                        let composition_time_offset = reader.read_i24::<BigEndian>()?;
                        let data = reader
                            .extract_bytes(size_of_video_track.map(|s| s.saturating_sub(3)).unwrap_or(reader.remaining()))?;

                        VideoPacketCodedFrames::Hevc {
                            composition_time_offset,
                            data,
                        }
                    }
                    _ => {
                        let data = reader.extract_bytes(size_of_video_track.unwrap_or(reader.remaining()))?;

                        VideoPacketCodedFrames::Other(data)
                    }
                };

                Ok(Self::CodedFrames(coded_frames))
            }
            VideoPacketType::CodedFramesX => {
                let data = reader.extract_bytes(size_of_video_track.unwrap_or(reader.remaining()))?;

                Ok(Self::CodedFramesX { data })
            }
            _ => {
                let data = reader.extract_bytes(size_of_video_track.unwrap_or(reader.remaining()))?;

                Ok(Self::Unknown {
                    video_packet_type: header.video_packet_type,
                    data,
                })
            }
        }
    }

    /// Decodes [`Metadata`](Self::Metadata) bytes into its AMF element list.
    pub fn decode_metadata(&self) -> Result<Vec<Amf0Value>, FlvError> {
        match self {
            Self::Metadata { data } => Ok(Amf0Decoder::new(data.clone()).decode_all()?),
            _ => Ok(Vec::new()),
        }
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> usize {
        match self {
            VideoPacket::Metadata { data } => data.len(),
            VideoPacket::SequenceEnd => 0,
            VideoPacket::SequenceStart(VideoPacketSequenceStart::Avc(record)) => record.size(),
            VideoPacket::SequenceStart(VideoPacketSequenceStart::Hevc(record)) => record.size(),
            VideoPacket::SequenceStart(VideoPacketSequenceStart::Other(data)) => data.len(),
            VideoPacket::Mpeg2TsSequenceStart { data } => data.len(),
            VideoPacket::CodedFrames(VideoPacketCodedFrames::Avc { data, .. })
            | VideoPacket::CodedFrames(VideoPacketCodedFrames::Hevc { data, .. }) => 3 + data.len(),
            VideoPacket::CodedFrames(VideoPacketCodedFrames::Other(data)) => data.len(),
            VideoPacket::CodedFramesX { data } => data.len(),
            VideoPacket::Unknown { data, .. } => data.len(),
        }
    }

    /// Mux the packet payload into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        match self {
            VideoPacket::Metadata { data } => writer.write_all(data)?,
            VideoPacket::SequenceEnd => {}
            VideoPacket::SequenceStart(VideoPacketSequenceStart::Avc(record)) => record.mux(writer)?,
            VideoPacket::SequenceStart(VideoPacketSequenceStart::Hevc(record)) => record.mux(writer)?,
            VideoPacket::SequenceStart(VideoPacketSequenceStart::Other(data)) => writer.write_all(data)?,
            VideoPacket::Mpeg2TsSequenceStart { data } => writer.write_all(data)?,
            VideoPacket::CodedFrames(VideoPacketCodedFrames::Avc {
                composition_time_offset,
                data,
            })
            | VideoPacket::CodedFrames(VideoPacketCodedFrames::Hevc {
                composition_time_offset,
                data,
            }) => {
                if !COMPOSITION_TIME_RANGE.contains(composition_time_offset) {
                    return Err(FlvError::CompositionTimeOutOfRange(*composition_time_offset));
                }

                writer.write_i24::<BigEndian>(*composition_time_offset)?;
                writer.write_all(data)?;
            }
            VideoPacket::CodedFrames(VideoPacketCodedFrames::Other(data)) => writer.write_all(data)?,
            VideoPacket::CodedFramesX { data } => writer.write_all(data)?,
            VideoPacket::Unknown { data, .. } => writer.write_all(data)?,
        }

        Ok(())
    }
}

/// One video track contained in a multitrack video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTrack {
    /// The video FOURCC of this track.
    pub video_four_cc: VideoFourCc,
    /// The video track ID.
    ///
    /// Track id 0 is the default (highest priority or quality) track; lesser
    /// tracks use ascending ids.
    pub video_track_id: u8,
    /// The video packet contained in this track.
    pub packet: VideoPacket,
}

/// `ExVideoTagBody`
///
/// Defined by:
/// - Enhanced RTMP spec, ExVideoTagBody
#[derive(Debug, Clone, PartialEq)]
pub enum ExVideoTagBody {
    /// Empty body because the header contains a [`VideoCommand`](crate::video::header::VideoCommand).
    Command,
    /// The body is not a multitrack body.
    NoMultitrack {
        /// The video FOURCC of this body.
        video_four_cc: VideoFourCc,
        /// The video packet contained in this body.
        packet: VideoPacket,
    },
    /// The body is a multitrack body carrying one or more tracks.
    ManyTracks(Vec<VideoTrack>),
}

impl ExVideoTagBody {
    /// Builds a many-track body, enforcing the two-track minimum of the
    /// many-track layouts.
    pub fn many_tracks(tracks: Vec<VideoTrack>) -> Result<Self, FlvError> {
        if tracks.len() < 2 {
            return Err(FlvError::TooFewTracks(tracks.len()));
        }

        Ok(Self::ManyTracks(tracks))
    }

    /// Builds a one-track body.
    pub fn one_track(track: VideoTrack) -> Self {
        Self::ManyTracks(vec![track])
    }

    /// Demux an [`ExVideoTagBody`] from the given reader.
    pub fn demux(header: &ExVideoTagHeader, reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let mut tracks = Vec::new();

        loop {
            let video_four_cc = match header.content {
                ExVideoTagHeaderContent::VideoCommand(_) => return Ok(ExVideoTagBody::Command),
                ExVideoTagHeaderContent::ManyTracksManyCodecs => {
                    let mut video_four_cc = [0; 4];
                    reader.read_exact(&mut video_four_cc)?;
                    VideoFourCc::from(video_four_cc)
                }
                ExVideoTagHeaderContent::OneTrack(video_four_cc) => video_four_cc,
                ExVideoTagHeaderContent::ManyTracks(video_four_cc) => video_four_cc,
                ExVideoTagHeaderContent::NoMultiTrack(video_four_cc) => video_four_cc,
                ExVideoTagHeaderContent::Unknown { video_four_cc, .. } => video_four_cc,
            };

            // the track id is only present when this is a multitrack video
            let video_track_id = if !matches!(header.content, ExVideoTagHeaderContent::NoMultiTrack(_)) {
                Some(reader.read_u8()?)
            } else {
                None
            };

            let packet = VideoPacket::demux(header, video_four_cc, reader)?;

            if let Some(video_track_id) = video_track_id {
                tracks.push(VideoTrack {
                    video_four_cc,
                    video_track_id,
                    packet,
                });

                // the loop only continues if there is still data to read and
                // this is a video with multiple tracks
                if !matches!(header.content, ExVideoTagHeaderContent::OneTrack(_)) && reader.has_remaining() {
                    continue;
                }

                break;
            } else {
                // a single-track video completes after one loop iteration
                return Ok(Self::NoMultitrack { video_four_cc, packet });
            }
        }

        Ok(Self::ManyTracks(tracks))
    }

    /// The number of bytes [`mux`](Self::mux) will write for the given header.
    pub fn size(&self, header: &ExVideoTagHeader) -> usize {
        let per_track_size_field = !matches!(
            header.content,
            ExVideoTagHeaderContent::NoMultiTrack(_) | ExVideoTagHeaderContent::OneTrack(_)
        );
        let per_track_four_cc = matches!(header.content, ExVideoTagHeaderContent::ManyTracksManyCodecs);

        match self {
            ExVideoTagBody::Command => 0,
            ExVideoTagBody::NoMultitrack { packet, .. } => packet.size(),
            ExVideoTagBody::ManyTracks(tracks) => tracks
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
    pub fn mux<W: io::Write>(&self, header: &ExVideoTagHeader, writer: &mut W) -> Result<(), FlvError> {
        match self {
            ExVideoTagBody::Command => {
                if !matches!(header.content, ExVideoTagHeaderContent::VideoCommand(_)) {
                    return Err(FlvError::HeaderBodyMismatch("command body without command header"));
                }
            }
            ExVideoTagBody::NoMultitrack { video_four_cc, packet } => {
                match header.content {
                    ExVideoTagHeaderContent::NoMultiTrack(header_four_cc) => {
                        if header_four_cc != *video_four_cc {
                            return Err(FlvError::HeaderBodyMismatch("body codec differs from header codec"));
                        }
                    }
                    _ => return Err(FlvError::HeaderBodyMismatch("single-track body under multitrack header")),
                }

                packet.mux(writer)?;
            }
            ExVideoTagBody::ManyTracks(tracks) => {
                match header.content {
                    ExVideoTagHeaderContent::OneTrack(_) => {
                        if tracks.len() != 1 {
                            return Err(FlvError::NotOneTrack(tracks.len()));
                        }
                    }
                    ExVideoTagHeaderContent::ManyTracks(_) | ExVideoTagHeaderContent::ManyTracksManyCodecs => {
                        if tracks.len() < 2 {
                            return Err(FlvError::TooFewTracks(tracks.len()));
                        }
                    }
                    ExVideoTagHeaderContent::Unknown { .. } => {}
                    ExVideoTagHeaderContent::NoMultiTrack(_) | ExVideoTagHeaderContent::VideoCommand(_) => {
                        return Err(FlvError::HeaderBodyMismatch("multitrack body under single-track header"));
                    }
                }

                let per_track_size_field = !matches!(
                    header.content,
                    ExVideoTagHeaderContent::NoMultiTrack(_) | ExVideoTagHeaderContent::OneTrack(_)
                );

                for track in tracks {
                    if matches!(header.content, ExVideoTagHeaderContent::ManyTracksManyCodecs) {
                        writer.write_all(&track.video_four_cc.0)?;
                    }

                    writer.write_u8(track.video_track_id)?;

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
    use crate::video::header::VideoCommand;

    fn mux_round_trip(header: &ExVideoTagHeader, body: &ExVideoTagBody) {
        let mut buf = Vec::new();
        body.mux(header, &mut buf).unwrap();
        assert_eq!(body.size(header), buf.len());

        let decoded = ExVideoTagBody::demux(header, &mut std::io::Cursor::new(Bytes::from(buf))).unwrap();
        assert_eq!(&decoded, body);
    }

    fn header(video_packet_type: VideoPacketType, content: ExVideoTagHeaderContent) -> ExVideoTagHeader {
        ExVideoTagHeader {
            video_packet_mod_exs: vec![],
            video_packet_type,
            content,
        }
    }

    #[test]
    fn hevc_coded_frames_with_composition_time() {
        // first byte 0x91: ex header, key frame, packet type 1 (coded frames)
        let tag = &[
            b'h', b'v', b'c', b'1', // four cc
            0x00, 0x00, 0x20, // composition time 32
            1, 2, 3, 4, 5, // payload
        ];

        let header = header(
            VideoPacketType::CodedFrames,
            ExVideoTagHeaderContent::NoMultiTrack(VideoFourCc::Hevc),
        );

        // skip the four cc, the header demuxer consumed it already
        let body = ExVideoTagBody::demux(&header, &mut std::io::Cursor::new(Bytes::from_static(&tag[4..]))).unwrap();

        assert_eq!(
            body,
            ExVideoTagBody::NoMultitrack {
                video_four_cc: VideoFourCc::Hevc,
                packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Hevc {
                    composition_time_offset: 32,
                    data: Bytes::from_static(&[1, 2, 3, 4, 5]),
                }),
            },
        );

        mux_round_trip(&header, &body);
    }

    #[test]
    fn coded_frames_x_has_no_composition_time() {
        let header = header(
            VideoPacketType::CodedFramesX,
            ExVideoTagHeaderContent::NoMultiTrack(VideoFourCc::Hevc),
        );

        mux_round_trip(
            &header,
            &ExVideoTagBody::NoMultitrack {
                video_four_cc: VideoFourCc::Hevc,
                packet: VideoPacket::CodedFramesX {
                    data: Bytes::from_static(&[1, 2, 3]),
                },
            },
        );
    }

    #[test]
    fn composition_time_out_of_range() {
        let header = header(
            VideoPacketType::CodedFrames,
            ExVideoTagHeaderContent::NoMultiTrack(VideoFourCc::Avc),
        );

        let body = ExVideoTagBody::NoMultitrack {
            video_four_cc: VideoFourCc::Avc,
            packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Avc {
                composition_time_offset: 1 << 23,
                data: Bytes::new(),
            }),
        };

        let err = body.mux(&header, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, FlvError::CompositionTimeOutOfRange(_)));
    }

    #[test]
    fn command_body_round_trip() {
        mux_round_trip(
            &header(
                VideoPacketType::SequenceStart,
                ExVideoTagHeaderContent::VideoCommand(VideoCommand::StartSeek),
            ),
            &ExVideoTagBody::Command,
        );
    }

    #[test]
    fn multitrack_many_codecs_round_trip() {
        mux_round_trip(
            &header(VideoPacketType::CodedFrames, ExVideoTagHeaderContent::ManyTracksManyCodecs),
            &ExVideoTagBody::many_tracks(vec![
                VideoTrack {
                    video_four_cc: VideoFourCc::Vp9,
                    video_track_id: 1,
                    packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Other(Bytes::from_static(&[42, 42]))),
                },
                VideoTrack {
                    video_four_cc: VideoFourCc::Av1,
                    video_track_id: 2,
                    packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Other(Bytes::from_static(&[13, 37]))),
                },
            ])
            .unwrap(),
        );
    }

    #[test]
    fn multitrack_one_codec_round_trip() {
        mux_round_trip(
            &header(
                VideoPacketType::CodedFrames,
                ExVideoTagHeaderContent::ManyTracks(VideoFourCc::Avc),
            ),
            &ExVideoTagBody::many_tracks(vec![
                VideoTrack {
                    video_four_cc: VideoFourCc::Avc,
                    video_track_id: 1,
                    packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Avc {
                        composition_time_offset: 1,
                        data: Bytes::from_static(&[42, 42]),
                    }),
                },
                VideoTrack {
                    video_four_cc: VideoFourCc::Avc,
                    video_track_id: 2,
                    packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Avc {
                        composition_time_offset: 2,
                        data: Bytes::from_static(&[13, 37]),
                    }),
                },
            ])
            .unwrap(),
        );
    }

    #[test]
    fn one_track_round_trip() {
        mux_round_trip(
            &header(
                VideoPacketType::CodedFrames,
                ExVideoTagHeaderContent::OneTrack(VideoFourCc::Av1),
            ),
            &ExVideoTagBody::one_track(VideoTrack {
                video_four_cc: VideoFourCc::Av1,
                video_track_id: 0,
                packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Other(Bytes::from_static(&[9, 9]))),
            }),
        );
    }

    #[test]
    fn many_tracks_needs_two() {
        let err = ExVideoTagBody::many_tracks(vec![]).unwrap_err();
        assert!(matches!(err, FlvError::TooFewTracks(0)));
    }

    #[test]
    fn metadata_round_trip() {
        let mut amf = Vec::new();
        let mut encoder = strom_amf0::Amf0Encoder::new(&mut amf);
        encoder.encode_string("colorInfo").unwrap();
        encoder
            .encode_object(&vec![("colorConfig".to_string(), Amf0Value::Object(vec![]))])
            .unwrap();

        let header = header(
            VideoPacketType::Metadata,
            ExVideoTagHeaderContent::NoMultiTrack(VideoFourCc::Hevc),
        );
        let body = ExVideoTagBody::NoMultitrack {
            video_four_cc: VideoFourCc::Hevc,
            packet: VideoPacket::Metadata {
                data: Bytes::from(amf),
            },
        };

        mux_round_trip(&header, &body);

        let ExVideoTagBody::NoMultitrack { packet, .. } = &body else {
            unreachable!()
        };
        let values = packet.decode_metadata().unwrap();
        assert_eq!(values[0], Amf0Value::String("colorInfo".into()));
    }
}
