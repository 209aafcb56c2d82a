use super::*;

/// Pulls bits, least significant first, out of a byte stream.
///
/// Reading past the end of the stream is allowed exactly once, and gives 16
/// zero bits. Deflate streams are allowed to end with a final Huffman code that
/// doesn't fill out a whole 16 bit decode window, so we have to be able to
/// pretend there's a little more data. A second trip past the end is an
/// error.
pub(crate) struct BitReader<'b> {
  cursor: ByteCursor<'b>,
  bits_buffer: u32,
  bits_buffered: u32,
  hit_eof_once: bool,
}

impl core::fmt::Debug for BitReader<'_> {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    struct Bits(u32, u32);
    impl core::fmt::Debug for Bits {
      fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.1 == 0 {
          f.write_str("\"\"")
        } else {
          write!(f, "\"{bits:0width$b}\"", bits = self.0, width = self.1.min(32) as usize)
        }
      }
    }
    f.debug_struct("BitReader")
      .field("position", &self.cursor.position())
      .field("remaining", &self.cursor.remaining())
      .field("bits_buffer", &Bits(self.bits_buffer, self.bits_buffered))
      .field("bits_buffered", &self.bits_buffered)
      .field("hit_eof_once", &self.hit_eof_once)
      .finish()
  }
}

impl<'b> BitReader<'b> {
  #[inline]
  #[must_use]
  pub const fn new(cursor: ByteCursor<'b>) -> Self {
    Self { cursor, bits_buffer: 0, bits_buffered: 0, hit_eof_once: false }
  }

  #[inline]
  #[must_use]
  pub const fn bits_buffered(&self) -> u32 {
    self.bits_buffered
  }

  #[inline]
  #[must_use]
  pub const fn hit_eof_once(&self) -> bool {
    self.hit_eof_once
  }

  #[inline]
  #[must_use]
  pub const fn is_exhausted(&self) -> bool {
    self.cursor.is_at_end()
  }

  /// The next raw byte, ignoring the bit buffer.
  ///
  /// Gives `0xFF` when there's no more data. That's not an error here, so
  /// check [`is_exhausted`](Self::is_exhausted) when it matters.
  #[inline]
  pub fn get_byte(&mut self) -> u8 {
    self.cursor.get_u8().unwrap_or(0xFF)
  }

  /// Tops up the bit buffer one byte at a time until more than 24 bits are
  /// held, or the data runs out.
  pub fn fill_bits(&mut self) {
    loop {
      if self.cursor.is_at_end() {
        return;
      }
      // bits above the buffered count must always be clear.
      if u64::from(self.bits_buffer) >= (1_u64 << self.bits_buffered) {
        self.cursor.set_to_end();
        return;
      }
      self.bits_buffer |= u32::from(self.get_byte()) << self.bits_buffered;
      self.bits_buffered += 8;
      if self.bits_buffered > 24 {
        return;
      }
    }
  }

  /// Makes sure at least `n` bits are buffered, using up the one allowed trip
  /// past the end of the data if necessary.
  pub fn ensure_bits(&mut self, n: u32) -> DecodeResult<()> {
    debug_assert!(n <= 16);
    if self.bits_buffered < n {
      self.fill_bits();
      if self.bits_buffered < n {
        if self.hit_eof_once {
          return Err(DecodeError::CorruptZlib);
        }
        trace!("bit reader padded past end of stream");
        self.hit_eof_once = true;
        self.bits_buffered += 16;
      }
    }
    Ok(())
  }

  /// The whole bit buffer, without consuming anything.
  #[inline]
  #[must_use]
  pub const fn peek_buffer(&self) -> u32 {
    self.bits_buffer
  }

  /// Drops `n` bits off the bottom of the buffer.
  #[inline]
  pub fn consume(&mut self, n: u32) {
    debug_assert!(n <= self.bits_buffered);
    self.bits_buffer = self.bits_buffer.checked_shr(n).unwrap_or(0);
    self.bits_buffered -= n;
  }

  /// Reads `n` bits as a little-endian number.
  pub fn read_bits(&mut self, n: u32) -> DecodeResult<u32> {
    if n == 0 {
      return Ok(0);
    }
    self.ensure_bits(n)?;
    let k = self.bits_buffer & ((1_u32 << n) - 1);
    self.consume(n);
    Ok(k)
  }

  /// Throws away bits to get to the next byte boundary.
  #[inline]
  pub fn align_to_byte(&mut self) {
    let extra = self.bits_buffered & 7;
    self.consume(extra);
  }

  /// Takes one whole byte back out of the bit buffer, if there is one.
  #[inline]
  pub fn unbuffer_byte(&mut self) -> Option<u8> {
    if self.bits_buffered >= 8 {
      let b = self.bits_buffer as u8;
      self.consume(8);
      Some(b)
    } else {
      None
    }
  }

  /// Takes `n` whole bytes directly from the data, bypassing the bit buffer.
  #[inline]
  pub fn take_bytes(&mut self, n: usize) -> Option<&'b [u8]> {
    debug_assert_eq!(self.bits_buffered, 0);
    self.cursor.take(n)
  }

  /// Total bits pulled out of the stream so far.
  #[cfg(test)]
  pub fn bits_consumed(&self) -> usize {
    self.cursor.position() * 8 - self.bits_buffered as usize
  }
}
