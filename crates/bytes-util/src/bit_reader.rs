use std::io;

/// An MSB-first bit reader over any [`io::Read`].
///
/// Implements [`io::Read`] itself, so the `byteorder` extension methods work
/// on it directly; byte-sized reads go through the bit queue so they stay
/// correct even when the reader is not byte-aligned.
#[derive(Debug)]
pub struct BitReader<R> {
    inner: R,
    bit_pos: u8,
    current: u8,
}

impl<R: io::Read> BitReader<R> {
    /// Creates a new bit reader around `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bit_pos: 0,
            current: 0,
        }
    }

    /// Reads a single bit.
    pub fn read_bit(&mut self) -> io::Result<bool> {
        if self.bit_pos == 0 {
            let mut byte = [0u8; 1];
            self.inner.read_exact(&mut byte)?;
            self.current = byte[0];
        }

        let bit = (self.current >> (7 - self.bit_pos)) & 1 == 1;
        self.bit_pos = (self.bit_pos + 1) % 8;

        Ok(bit)
    }

    /// Reads `count` bits, most significant first.
    pub fn read_bits(&mut self, count: u8) -> io::Result<u64> {
        debug_assert!(count <= 64);

        let mut bits = 0u64;
        for _ in 0..count {
            bits = (bits << 1) | (self.read_bit()? as u64);
        }

        Ok(bits)
    }

    /// Discards `count` bits.
    pub fn seek_bits(&mut self, count: u8) -> io::Result<()> {
        for _ in 0..count {
            self.read_bit()?;
        }

        Ok(())
    }

    /// Whether the reader is currently at a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }
}

impl<R: io::Read> io::Read for BitReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.is_aligned() {
            return self.inner.read(buf);
        }

        for slot in buf.iter_mut() {
            *slot = self.read_bits(8)? as u8;
        }

        Ok(buf.len())
    }
}
