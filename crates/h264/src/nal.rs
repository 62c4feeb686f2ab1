//! NAL-unit framing detection and conversion.
//!
//! H.264/H.265 NAL units arrive either AnnexB framed (3- or 4-byte start
//! codes) or AVCC framed (4-byte big-endian length prefix), or bare. FLV
//! carries AVCC framing, encoders usually emit AnnexB.

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

/// The framing detected in front of a NAL unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalPrefix {
    /// `00 00 00 01`
    AnnexB4,
    /// `00 00 01`
    AnnexB3,
    /// 4-byte big-endian length that matches the remaining input.
    AvccLength,
    /// No recognizable framing; the buffer is the NAL unit itself.
    None,
}

impl NalPrefix {
    /// Detects the framing at the start of `data`.
    ///
    /// A 4-byte AVCC length prefix is only accepted when the encoded length
    /// equals the number of bytes that follow it; anything else falls through
    /// to start-code detection.
    pub fn detect(data: &[u8]) -> NalPrefix {
        if data.len() >= 4 {
            let length = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
            if length == data.len() - 4 {
                return NalPrefix::AvccLength;
            }
        }

        if data.starts_with(&[0, 0, 0, 1]) {
            NalPrefix::AnnexB4
        } else if data.starts_with(&[0, 0, 1]) {
            NalPrefix::AnnexB3
        } else {
            NalPrefix::None
        }
    }

    /// The number of prefix bytes this framing occupies.
    pub fn len(&self) -> usize {
        match self {
            NalPrefix::AnnexB4 | NalPrefix::AvccLength => 4,
            NalPrefix::AnnexB3 => 3,
            NalPrefix::None => 0,
        }
    }

    /// Whether the framing occupies no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strips the detected framing from `data`, returning the bare NAL unit and
/// its size.
pub fn strip_nal_prefix(data: Bytes) -> (Bytes, usize) {
    let prefix = NalPrefix::detect(&data);
    let nal = data.slice(prefix.len()..);
    let size = nal.len();
    (nal, size)
}

/// Re-frames a NAL unit (in any input framing) with a 4-byte AVCC length
/// prefix.
pub fn to_avcc(data: Bytes) -> Vec<u8> {
    let (nal, size) = strip_nal_prefix(data);

    let mut out = Vec::with_capacity(size + 4);
    out.write_u32::<BigEndian>(size as u32).expect("vec write");
    out.extend_from_slice(&nal);
    out
}

/// Splits an AnnexB elementary stream into its bare NAL units.
///
/// Both 3- and 4-byte start codes are accepted; bytes before the first start
/// code are discarded. An input without any start code is returned whole.
pub fn split_annex_b(data: Bytes) -> Vec<Bytes> {
    let mut starts = Vec::new();

    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                starts.push((i, i + 3));
                i += 3;
                continue;
            }
            if i + 4 <= data.len() && data[i + 2] == 0 && data[i + 3] == 1 {
                starts.push((i, i + 4));
                i += 4;
                continue;
            }
        }
        i += 1;
    }

    if starts.is_empty() {
        return vec![data];
    }

    let mut nals = Vec::with_capacity(starts.len());
    for (idx, (_, begin)) in starts.iter().enumerate() {
        let end = starts.get(idx + 1).map(|(next_start, _)| *next_start).unwrap_or(data.len());
        if end > *begin {
            nals.push(data.slice(*begin..end));
        }
    }

    nals
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{NalPrefix, split_annex_b, strip_nal_prefix, to_avcc};

    #[test]
    fn detect_annex_b() {
        assert_eq!(NalPrefix::detect(&[0, 0, 0, 1, 0x67, 0x42]), NalPrefix::AnnexB4);
        assert_eq!(NalPrefix::detect(&[0, 0, 1, 0x67, 0x42]), NalPrefix::AnnexB3);
        assert_eq!(NalPrefix::detect(&[0x67, 0x42]), NalPrefix::None);
    }

    #[test]
    fn detect_avcc_only_when_length_matches() {
        // length 2 followed by exactly 2 bytes
        assert_eq!(NalPrefix::detect(&[0, 0, 0, 2, 0x67, 0x42]), NalPrefix::AvccLength);
        // length 2 followed by 3 bytes is not avcc; also not a start code
        assert_eq!(NalPrefix::detect(&[0, 0, 0, 2, 0x67, 0x42, 0x00]), NalPrefix::None);
    }

    #[test]
    fn annex_b4_wins_over_mismatched_length() {
        // would decode as avcc length 1 but 2 bytes follow, so start code wins
        assert_eq!(NalPrefix::detect(&[0, 0, 0, 1, 0x67, 0x42]), NalPrefix::AnnexB4);
    }

    #[test]
    fn strip_and_reframe() {
        let (nal, size) = strip_nal_prefix(Bytes::from_static(&[0, 0, 1, 0x67, 0x42]));
        assert_eq!(nal, Bytes::from_static(&[0x67, 0x42]));
        assert_eq!(size, 2);

        assert_eq!(to_avcc(Bytes::from_static(&[0, 0, 1, 0x67, 0x42])), vec![0, 0, 0, 2, 0x67, 0x42]);
        assert_eq!(to_avcc(Bytes::from_static(&[0x67, 0x42])), vec![0, 0, 0, 2, 0x67, 0x42]);
    }

    #[test]
    fn split_annex_b_stream() {
        let stream = Bytes::from_static(&[0, 0, 0, 1, 0x67, 0x42, 0, 0, 1, 0x68, 0xCE, 0x3C]);
        let nals = split_annex_b(stream);

        assert_eq!(nals.len(), 2);
        assert_eq!(nals[0], Bytes::from_static(&[0x67, 0x42]));
        assert_eq!(nals[1], Bytes::from_static(&[0x68, 0xCE, 0x3C]));
    }

    #[test]
    fn split_without_start_codes_returns_whole() {
        let nals = split_annex_b(Bytes::from_static(&[0x67, 0x42]));
        assert_eq!(nals.len(), 1);
    }
}
