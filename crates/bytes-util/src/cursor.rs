use std::io;

use bytes::Bytes;

/// Zero-copy extraction helpers for cursors over [`Bytes`].
pub trait BytesCursorExt {
    /// Extracts the next `size` bytes as a [`Bytes`] slice of the underlying
    /// buffer, advancing the cursor.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] when fewer than `size`
    /// bytes remain; the cursor is left untouched in that case.
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes>;

    /// Extracts everything from the cursor position to the end of the buffer.
    fn extract_remaining(&mut self) -> Bytes;
}

impl BytesCursorExt for io::Cursor<Bytes> {
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes> {
        let position = self.position() as usize;

        let end = position
            .checked_add(size)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "size overflows buffer"))?;

        if end > self.get_ref().len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "not enough data"));
        }

        let bytes = self.get_ref().slice(position..end);
        self.set_position(end as u64);

        Ok(bytes)
    }

    fn extract_remaining(&mut self) -> Bytes {
        let position = (self.position() as usize).min(self.get_ref().len());
        let bytes = self.get_ref().slice(position..);
        self.set_position(self.get_ref().len() as u64);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use bytes::Bytes;

    use super::BytesCursorExt;

    #[test]
    fn extract_bytes_is_zero_copy_slice() {
        let mut cursor = io::Cursor::new(Bytes::from_static(&[1, 2, 3, 4, 5]));

        let first = cursor.extract_bytes(2).unwrap();
        assert_eq!(first, Bytes::from_static(&[1, 2]));
        assert_eq!(cursor.position(), 2);

        let rest = cursor.extract_remaining();
        assert_eq!(rest, Bytes::from_static(&[3, 4, 5]));
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn extract_bytes_eof() {
        let mut cursor = io::Cursor::new(Bytes::from_static(&[1, 2]));

        let err = cursor.extract_bytes(3).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        // cursor must not move on failure
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn extract_remaining_when_empty() {
        let mut cursor = io::Cursor::new(Bytes::new());
        assert!(cursor.extract_remaining().is_empty());
    }
}
