//! Zero-copy reader types.

use std::io;

use bytes::Bytes;

/// A trait for zero-copy readers.
pub trait ZeroCopyReader {
    /// Attempts to read a specified number of bytes from the reader without copying.
    ///
    /// This function does not guarantee that no copying will occur.
    /// Some implementations can't avoid copying.
    fn try_read(&mut self, size: usize) -> io::Result<Bytes>;

    /// Returns a standard [`io::Read`] interface for the reader.
    fn as_std(&mut self) -> impl io::Read;
}

/// A zero-copy reader that wraps a [`bytes::Buf`].
pub struct BytesBuf<B>(B);

impl<B: bytes::Buf> From<B> for BytesBuf<B> {
    fn from(buf: B) -> Self {
        Self(buf)
    }
}

impl<B: bytes::Buf> ZeroCopyReader for BytesBuf<B> {
    fn try_read(&mut self, size: usize) -> io::Result<Bytes> {
        if self.0.remaining() < size {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough data"));
        }

        Ok(self.0.copy_to_bytes(size))
    }

    fn as_std(&mut self) -> impl io::Read {
        bytes::Buf::reader(&mut self.0)
    }
}

/// A zero-copy reader that wraps a [`std::io::Read`].
///
/// This implementation is not zero-copy and will always copy the data into a
/// new buffer. [`std::io::Read`] does not provide a way to access the
/// underlying buffer directly.
pub struct IoRead<R>(R);

impl<R: io::Read> From<R> for IoRead<R> {
    fn from(reader: R) -> Self {
        Self(reader)
    }
}

impl<R: io::Read> ZeroCopyReader for IoRead<R> {
    fn try_read(&mut self, size: usize) -> io::Result<Bytes> {
        let mut buf = vec![0; size];
        self.0.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn as_std(&mut self) -> impl io::Read {
        &mut self.0
    }
}

/// A zero-copy reader that wraps a byte slice (`&[u8]`).
pub struct Slice<'a>(io::Cursor<&'a [u8]>);

impl<'a> From<&'a [u8]> for Slice<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Self(io::Cursor::new(slice))
    }
}

impl ZeroCopyReader for Slice<'_> {
    fn try_read(&mut self, size: usize) -> io::Result<Bytes> {
        let start = self.0.position() as usize;
        let end = start + size;

        if end > self.0.get_ref().len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough data"));
        }

        let slice = &self.0.get_ref()[start..end];
        self.0.set_position(end as u64);
        Ok(Bytes::copy_from_slice(slice))
    }

    fn as_std(&mut self) -> impl io::Read {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn bytes_buf_reads() {
        let mut reader = BytesBuf::from(Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(reader.try_read(2).unwrap(), Bytes::from_static(&[1, 2]));
        assert_eq!(reader.try_read(2).unwrap(), Bytes::from_static(&[3, 4]));
        assert!(reader.try_read(1).is_err());
    }

    #[test]
    fn io_read_reads() {
        let mut reader = IoRead::from(&[1u8, 2, 3][..]);
        assert_eq!(reader.try_read(3).unwrap(), Bytes::from_static(&[1, 2, 3]));
        assert!(reader.try_read(1).is_err());
    }

    #[test]
    fn slice_reads() {
        let data = [9u8, 8, 7];
        let mut reader = Slice::from(&data[..]);
        assert_eq!(reader.try_read(1).unwrap(), Bytes::from_static(&[9]));
        assert_eq!(reader.try_read(2).unwrap(), Bytes::from_static(&[8, 7]));
        assert!(reader.try_read(1).is_err());
    }
}
