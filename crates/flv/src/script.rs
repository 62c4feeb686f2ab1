//! Script data structures
//!
//! The `onMetaData` script tag and its typed fields.

use std::io;

use bytes::Bytes;
use strom_amf0::{Amf0Decoder, Amf0Encoder, Amf0Object, Amf0Value};

use crate::audio::header::enhanced::AudioFourCc;
use crate::audio::header::legacy::SoundFormat;
use crate::common::{four_cc_from_u32, four_cc_to_u32};
use crate::error::FlvError;
use crate::video::header::enhanced::VideoFourCc;
use crate::video::header::legacy::VideoCodecId;

/// FLV `onMetaData` audio codec ID.
///
/// Either a legacy [`SoundFormat`] or an enhanced [`AudioFourCc`].
/// Appears as `audiocodecid` in the [`OnMetaData`] script data.
#[derive(Debug, Clone, PartialEq)]
pub enum OnMetaDataAudioCodecId {
    /// Legacy audio codec ID.
    Legacy(SoundFormat),
    /// Enhanced audio codec ID, the FourCC packed as a number.
    Enhanced(AudioFourCc),
}

impl OnMetaDataAudioCodecId {
    fn from_number(n: f64) -> Self {
        let n = n as u32;

        // A SoundFormat is a u8 and the smallest possible FourCC (4 spaces)
        // is far above u8::MAX, so the ranges cannot collide.
        if n > u8::MAX as u32 {
            Self::Enhanced(AudioFourCc::from(four_cc_from_u32(n)))
        } else {
            Self::Legacy(SoundFormat::from(n as u8))
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Self::Legacy(sound_format) => sound_format.0 as f64,
            Self::Enhanced(four_cc) => four_cc_to_u32(four_cc.0) as f64,
        }
    }
}

/// FLV `onMetaData` video codec ID.
///
/// Either a legacy [`VideoCodecId`] or an enhanced [`VideoFourCc`].
/// Appears as `videocodecid` in the [`OnMetaData`] script data.
#[derive(Debug, Clone, PartialEq)]
pub enum OnMetaDataVideoCodecId {
    /// Legacy video codec ID.
    Legacy(VideoCodecId),
    /// Enhanced video codec ID, the FourCC packed as a number.
    Enhanced(VideoFourCc),
}

impl OnMetaDataVideoCodecId {
    fn from_number(n: f64) -> Self {
        let n = n as u32;

        if n > u8::MAX as u32 {
            Self::Enhanced(VideoFourCc::from(four_cc_from_u32(n)))
        } else {
            Self::Legacy(VideoCodecId::from(n as u8))
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            Self::Legacy(codec_id) => codec_id.0 as f64,
            Self::Enhanced(four_cc) => four_cc_to_u32(four_cc.0) as f64,
        }
    }
}

/// FLV `onMetaData` script data
///
/// Defined by:
/// - Legacy FLV spec, Annex E.5
/// - Enhanced RTMP spec, Enhancing onMetaData section
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OnMetaData {
    /// Audio codec ID used in the file.
    pub audiocodecid: Option<OnMetaDataAudioCodecId>,
    /// Audio bitrate, in kilobits per second.
    pub audiodatarate: Option<f64>,
    /// Delay introduced by the audio codec, in seconds.
    pub audiodelay: Option<f64>,
    /// Frequency at which the audio stream is replayed.
    pub audiosamplerate: Option<f64>,
    /// Resolution of a single audio sample.
    pub audiosamplesize: Option<f64>,
    /// Whether the last video frame is a key frame.
    pub can_seek_to_end: Option<bool>,
    /// Total duration of the file, in seconds.
    pub duration: Option<f64>,
    /// Total size of the file, in bytes.
    pub filesize: Option<f64>,
    /// Number of frames per second.
    pub framerate: Option<f64>,
    /// Height of the video, in pixels.
    pub height: Option<f64>,
    /// Whether the audio is stereo.
    pub stereo: Option<bool>,
    /// Video codec ID used in the file.
    pub videocodecid: Option<OnMetaDataVideoCodecId>,
    /// Video bitrate, in kilobits per second.
    pub videodatarate: Option<f64>,
    /// Width of the video, in pixels.
    pub width: Option<f64>,
    /// Per-track audio info, keyed by string track id.
    ///
    /// Defined by the Enhanced RTMP spec for multitrack streams.
    pub audio_track_id_info_map: Option<Amf0Object>,
    /// Per-track video info, keyed by string track id.
    ///
    /// Defined by the Enhanced RTMP spec for multitrack streams.
    pub video_track_id_info_map: Option<Amf0Object>,
    /// Any other metadata fields, in encoding order.
    pub other: Amf0Object,
}

impl OnMetaData {
    /// Builds the typed metadata from a decoded AMF object or ECMA array.
    pub fn from_object(object: Amf0Object) -> Self {
        let mut meta = OnMetaData::default();

        for (key, value) in object {
            match (key.as_str(), &value) {
                ("audiocodecid", Amf0Value::Number(n)) => meta.audiocodecid = Some(OnMetaDataAudioCodecId::from_number(*n)),
                ("audiodatarate", Amf0Value::Number(n)) => meta.audiodatarate = Some(*n),
                ("audiodelay", Amf0Value::Number(n)) => meta.audiodelay = Some(*n),
                ("audiosamplerate", Amf0Value::Number(n)) => meta.audiosamplerate = Some(*n),
                ("audiosamplesize", Amf0Value::Number(n)) => meta.audiosamplesize = Some(*n),
                ("canSeekToEnd", Amf0Value::Boolean(b)) => meta.can_seek_to_end = Some(*b),
                ("duration", Amf0Value::Number(n)) => meta.duration = Some(*n),
                ("filesize", Amf0Value::Number(n)) => meta.filesize = Some(*n),
                ("framerate", Amf0Value::Number(n)) => meta.framerate = Some(*n),
                ("height", Amf0Value::Number(n)) => meta.height = Some(*n),
                ("stereo", Amf0Value::Boolean(b)) => meta.stereo = Some(*b),
                ("videocodecid", Amf0Value::Number(n)) => meta.videocodecid = Some(OnMetaDataVideoCodecId::from_number(*n)),
                ("videodatarate", Amf0Value::Number(n)) => meta.videodatarate = Some(*n),
                ("width", Amf0Value::Number(n)) => meta.width = Some(*n),
                ("audioTrackIdInfoMap", _) => meta.audio_track_id_info_map = value.as_object().cloned(),
                ("videoTrackIdInfoMap", _) => meta.video_track_id_info_map = value.as_object().cloned(),
                _ => meta.other.push((key, value)),
            }
        }

        meta
    }

    /// Flattens the typed metadata back into an AMF object.
    pub fn to_object(&self) -> Amf0Object {
        let mut object = Amf0Object::new();

        if let Some(duration) = self.duration {
            object.push(("duration".into(), Amf0Value::Number(duration)));
        }
        if let Some(width) = self.width {
            object.push(("width".into(), Amf0Value::Number(width)));
        }
        if let Some(height) = self.height {
            object.push(("height".into(), Amf0Value::Number(height)));
        }
        if let Some(framerate) = self.framerate {
            object.push(("framerate".into(), Amf0Value::Number(framerate)));
        }
        if let Some(videocodecid) = &self.videocodecid {
            object.push(("videocodecid".into(), Amf0Value::Number(videocodecid.to_number())));
        }
        if let Some(videodatarate) = self.videodatarate {
            object.push(("videodatarate".into(), Amf0Value::Number(videodatarate)));
        }
        if let Some(audiocodecid) = &self.audiocodecid {
            object.push(("audiocodecid".into(), Amf0Value::Number(audiocodecid.to_number())));
        }
        if let Some(audiodatarate) = self.audiodatarate {
            object.push(("audiodatarate".into(), Amf0Value::Number(audiodatarate)));
        }
        if let Some(audiosamplerate) = self.audiosamplerate {
            object.push(("audiosamplerate".into(), Amf0Value::Number(audiosamplerate)));
        }
        if let Some(audiosamplesize) = self.audiosamplesize {
            object.push(("audiosamplesize".into(), Amf0Value::Number(audiosamplesize)));
        }
        if let Some(audiodelay) = self.audiodelay {
            object.push(("audiodelay".into(), Amf0Value::Number(audiodelay)));
        }
        if let Some(stereo) = self.stereo {
            object.push(("stereo".into(), Amf0Value::Boolean(stereo)));
        }
        if let Some(can_seek_to_end) = self.can_seek_to_end {
            object.push(("canSeekToEnd".into(), Amf0Value::Boolean(can_seek_to_end)));
        }
        if let Some(filesize) = self.filesize {
            object.push(("filesize".into(), Amf0Value::Number(filesize)));
        }
        if let Some(map) = &self.audio_track_id_info_map {
            object.push(("audioTrackIdInfoMap".into(), Amf0Value::Object(map.clone())));
        }
        if let Some(map) = &self.video_track_id_info_map {
            object.push(("videoTrackIdInfoMap".into(), Amf0Value::Object(map.clone())));
        }

        object.extend(self.other.iter().cloned());

        object
    }
}

/// FLV `SCRIPTDATA` tag
///
/// Defined by:
/// - Legacy FLV spec, Annex E.4.4.1
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptData {
    /// `onMetaData` script data.
    OnMetaData(Box<OnMetaData>),
    /// Any other script data.
    Other {
        /// The name of the script data.
        name: String,
        /// The elements of the script data.
        data: Vec<Amf0Value>,
    },
}

impl ScriptData {
    /// Demux script data from the given reader.
    pub fn demux(reader: &mut io::Cursor<Bytes>) -> Result<Self, FlvError> {
        let buf = reader.get_ref().slice(reader.position() as usize..);
        let mut decoder = Amf0Decoder::new(buf);

        let name = decoder.decode_string()?;
        let script = if name == "onMetaData" {
            let object = decoder.decode_object()?;
            Self::OnMetaData(Box::new(OnMetaData::from_object(object)))
        } else {
            Self::Other {
                name,
                data: decoder.decode_all()?,
            }
        };

        // the amf decoder consumed the rest of the cursor
        reader.set_position(reader.get_ref().len() as u64);

        Ok(script)
    }

    fn encode(&self) -> Result<Vec<u8>, FlvError> {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        match self {
            Self::OnMetaData(meta) => {
                encoder.encode_string("onMetaData")?;
                // metadata is conventionally an ECMA array
                encoder.encode_ecma_array(&meta.to_object())?;
            }
            Self::Other { name, data } => {
                encoder.encode_string(name)?;
                for value in data {
                    encoder.encode_value(value)?;
                }
            }
        }

        Ok(buf)
    }

    /// The number of bytes [`mux`](Self::mux) will write.
    pub fn size(&self) -> Result<usize, FlvError> {
        Ok(self.encode()?.len())
    }

    /// Mux the script data into the given writer.
    pub fn mux<W: io::Write>(&self, writer: &mut W) -> Result<(), FlvError> {
        writer.write_all(&self.encode()?)?;
        Ok(())
    }
}
