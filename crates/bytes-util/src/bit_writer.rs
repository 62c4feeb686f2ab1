use std::io;

/// An MSB-first bit writer over any [`io::Write`].
///
/// Implements [`io::Write`] itself, so the `byteorder` extension methods work
/// on it directly; byte-sized writes go through the bit queue so they stay
/// correct even when the writer is not byte-aligned.
#[derive(Debug)]
pub struct BitWriter<W> {
    inner: W,
    bit_pos: u8,
    current: u8,
}

impl<W: io::Write> BitWriter<W> {
    /// Creates a new bit writer around `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bit_pos: 0,
            current: 0,
        }
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        self.current |= (bit as u8) << (7 - self.bit_pos);
        self.bit_pos += 1;

        if self.bit_pos == 8 {
            self.inner.write_all(&[self.current])?;
            self.current = 0;
            self.bit_pos = 0;
        }

        Ok(())
    }

    /// Writes the lowest `count` bits of `bits`, most significant first.
    pub fn write_bits(&mut self, bits: u64, count: u8) -> io::Result<()> {
        debug_assert!(count <= 64);

        for i in (0..count).rev() {
            self.write_bit((bits >> i) & 1 == 1)?;
        }

        Ok(())
    }

    /// Pads the current byte with zero bits and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        while self.bit_pos != 0 {
            self.write_bit(false)?;
        }

        Ok(self.inner)
    }

    /// Whether the writer is currently at a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.bit_pos == 0
    }
}

impl<W: io::Write> io::Write for BitWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_aligned() {
            return self.inner.write(buf);
        }

        for byte in buf {
            self.write_bits(*byte as u64, 8)?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
