use std::collections::VecDeque;

use bytes::{Buf, Bytes};

/// A single-consumer, sequential byte source.
///
/// Sources are consumed in one pass: every read advances the source and there
/// is no seeking. A source either wraps an in-memory buffer or chains a
/// finite, ordered list of sub-sources which are drained front to back.
/// Reading from an exhausted source yields 0 bytes and is not an error.
///
/// Chaining is how an encoder prepends a header to a caller-supplied payload
/// without copying either buffer.
#[derive(Debug, Clone)]
pub enum ByteSource {
    /// No bytes at all.
    Empty,
    /// An in-memory buffer. A start offset is expressed by slicing the
    /// [`Bytes`] handle before construction.
    Bytes(Bytes),
    /// An ordered concatenation of sub-sources.
    Chain(VecDeque<ByteSource>),
}

impl ByteSource {
    /// Reads up to `max` bytes into `dst`, returning how many were read.
    ///
    /// A return of 0 means the source is exhausted.
    pub fn read_at_most(&mut self, dst: &mut Vec<u8>, max: usize) -> usize {
        match self {
            ByteSource::Empty => 0,
            ByteSource::Bytes(bytes) => {
                let n = max.min(bytes.len());
                dst.extend_from_slice(&bytes[..n]);
                bytes.advance(n);
                n
            }
            ByteSource::Chain(parts) => {
                let mut read = 0;
                while read < max {
                    let Some(front) = parts.front_mut() else {
                        break;
                    };

                    let n = front.read_at_most(dst, max - read);
                    if n == 0 {
                        parts.pop_front();
                        continue;
                    }

                    read += n;
                }
                read
            }
        }
    }

    /// Drains the whole source into a single contiguous buffer.
    pub fn into_bytes(mut self) -> Bytes {
        // common case: a single buffer needs no copy
        if let ByteSource::Bytes(bytes) = self {
            return bytes;
        }

        let mut out = Vec::with_capacity(self.remaining().unwrap_or(0) as usize);
        while self.read_at_most(&mut out, usize::MAX) > 0 {}
        Bytes::from(out)
    }

    /// The number of bytes left in the source.
    pub fn remaining(&self) -> Option<u64> {
        match self {
            ByteSource::Empty => Some(0),
            ByteSource::Bytes(bytes) => Some(bytes.len() as u64),
            ByteSource::Chain(parts) => {
                let mut total = 0u64;
                for part in parts {
                    total = total.checked_add(part.remaining()?)?;
                }
                Some(total)
            }
        }
    }

    /// Whether the source has no bytes left.
    pub fn is_empty(&self) -> bool {
        self.remaining() == Some(0)
    }

    /// Concatenates `other` after `self`.
    pub fn chain(self, other: ByteSource) -> ByteSource {
        match self {
            ByteSource::Chain(mut parts) => {
                parts.push_back(other);
                ByteSource::Chain(parts)
            }
            first => ByteSource::Chain(VecDeque::from([first, other])),
        }
    }
}

impl From<Bytes> for ByteSource {
    fn from(bytes: Bytes) -> Self {
        ByteSource::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSource::Bytes(Bytes::from(bytes))
    }
}

/// A [`ByteSource`] paired with a declared byte count.
///
/// The declared count is authoritative when the underlying source cannot
/// report its own length.
#[derive(Debug, Clone)]
pub struct SizedSource {
    /// The source itself.
    pub source: ByteSource,
    /// The number of bytes the source is declared to hold.
    pub size: u64,
}

impl SizedSource {
    /// Pairs a source with a declared byte count.
    pub fn new(source: ByteSource, size: u64) -> Self {
        Self { source, size }
    }
}

impl From<Bytes> for SizedSource {
    fn from(bytes: Bytes) -> Self {
        let size = bytes.len() as u64;
        Self {
            source: ByteSource::Bytes(bytes),
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::ByteSource;

    #[test]
    fn bytes_source_reads_in_steps() {
        let mut source = ByteSource::from(Bytes::from_static(&[1, 2, 3, 4, 5]));
        assert_eq!(source.remaining(), Some(5));

        let mut dst = Vec::new();
        assert_eq!(source.read_at_most(&mut dst, 2), 2);
        assert_eq!(source.read_at_most(&mut dst, 10), 3);
        assert_eq!(source.read_at_most(&mut dst, 10), 0); // eof, no error
        assert_eq!(dst, [1, 2, 3, 4, 5]);
        assert!(source.is_empty());
    }

    #[test]
    fn chain_drains_front_to_back() {
        let source = ByteSource::from(Bytes::from_static(&[1, 2]))
            .chain(ByteSource::Empty)
            .chain(ByteSource::from(Bytes::from_static(&[3])));

        assert_eq!(source.remaining(), Some(3));

        let mut source = source;
        let mut dst = Vec::new();
        assert_eq!(source.read_at_most(&mut dst, 4), 3);
        assert_eq!(dst, [1, 2, 3]);
    }

    #[test]
    fn offset_is_a_slice() {
        let backing = Bytes::from_static(&[0, 1, 2, 3]);
        let mut source = ByteSource::from(backing.slice(2..));

        let mut dst = Vec::new();
        assert_eq!(source.read_at_most(&mut dst, 4), 2);
        assert_eq!(dst, [2, 3]);
    }

    #[test]
    fn into_bytes_flattens_chains() {
        let source = ByteSource::from(Bytes::from_static(b"he")).chain(ByteSource::from(Bytes::from_static(b"llo")));
        assert_eq!(source.into_bytes(), Bytes::from_static(b"hello"));
    }
}
