//! Common types used in the FLV format.

use nutype_enum::nutype_enum;

nutype_enum! {
    /// Type of multitrack.
    ///
    /// Used by both audio and video pipeline.
    pub enum AvMultitrackType(u8) {
        /// One track.
        OneTrack = 0,
        /// Many tracks with one codec.
        ManyTracks = 1,
        /// Many tracks with many codecs.
        ManyTracksManyCodecs = 2,
    }
}

/// Packs a FourCC word into its big-endian 32-bit code.
pub fn four_cc_to_u32(four_cc: [u8; 4]) -> u32 {
    u32::from_be_bytes(four_cc)
}

/// Unpacks a big-endian 32-bit code into its FourCC word.
pub fn four_cc_from_u32(code: u32) -> [u8; 4] {
    code.to_be_bytes()
}
