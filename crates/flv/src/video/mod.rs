//! FLV video processing
//!
//! Use [`VideoData`] to demux and mux video data contained in an RTMP video
//! message or FLV video tag.

use std::io;

use body::VideoTagBody;
use bytes::Bytes;
use header::VideoTagHeader;

use crate::error::FlvError;

pub mod body;
pub mod header;

/// FLV `VIDEODATA` tag
///
/// This is a container for legacy as well as enhanced video data.
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.3.1
/// - Enhanced RTMP spec, Enhanced Video section
#[derive(Debug, Clone, PartialEq)]
pub struct VideoData {
    /// The header of the video data.
    pub header: VideoTagHeader,
    /// The body of the video data.
    pub body: VideoTagBody,
}

impl VideoData {
    /// Demux video data from a given reader.
    ///
    /// Determines automatically whether the given data represents legacy or
    /// enhanced video data and demuxes it accordingly.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let header = VideoTagHeader::demux(reader)?;
        let body = VideoTagBody::demux(&header, reader)?;

        Ok(VideoData { header, body })
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> Result<usize, FlvError> {
        Ok(self.header.size() + self.body.size(&self.header)?)
    }

    /// Mux the video data into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        self.header.mux(writer)?;
        self.body.mux(&self.header, writer)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::VideoData;
    use crate::video::body::VideoTagBody;
    use crate::video::body::enhanced::{ExVideoTagBody, VideoPacket, VideoPacketCodedFrames};
    use crate::video::header::enhanced::{ExVideoTagHeader, ExVideoTagHeaderContent, VideoFourCc, VideoPacketType};
    use crate::video::header::{VideoFrameType, VideoTagHeader, VideoTagHeaderData};

    #[test]
    fn enhanced_hevc_coded_frame_byte_exact() {
        // 0x91: ex header, key frame, coded frames; then hvc1, ct 32, 5 payload bytes
        let data = Bytes::from_static(&[
            0x91, b'h', b'v', b'c', b'1', 0x00, 0x00, 0x20, 1, 2, 3, 4, 5,
        ]);

        let video = VideoData::demux(&mut std::io::Cursor::new(data.clone())).unwrap();

        assert_eq!(
            video,
            VideoData {
                header: VideoTagHeader {
                    frame_type: VideoFrameType::KeyFrame,
                    data: VideoTagHeaderData::Enhanced(ExVideoTagHeader {
                        video_packet_mod_exs: vec![],
                        video_packet_type: VideoPacketType::CodedFrames,
                        content: ExVideoTagHeaderContent::NoMultiTrack(VideoFourCc::Hevc),
                    }),
                },
                body: VideoTagBody::Enhanced(ExVideoTagBody::NoMultitrack {
                    video_four_cc: VideoFourCc::Hevc,
                    packet: VideoPacket::CodedFrames(VideoPacketCodedFrames::Hevc {
                        composition_time_offset: 32,
                        data: Bytes::from_static(&[1, 2, 3, 4, 5]),
                    }),
                }),
            }
        );

        // re-encoding is byte-identical
        let mut buf = Vec::new();
        video.mux(&mut buf).unwrap();
        assert_eq!(buf, data.to_vec());
        assert_eq!(video.size().unwrap(), data.len());
    }
}
