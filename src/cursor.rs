//! Forward-only reading over an immutable byte slice.

/// A read position within a byte slice.
///
/// The position only ever moves forward, and never past the end of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ByteCursor<'b> {
  data: &'b [u8],
  pos: usize,
}
impl<'b> ByteCursor<'b> {
  #[inline]
  #[must_use]
  pub const fn new(data: &'b [u8]) -> Self {
    Self { data, pos: 0 }
  }

  #[inline]
  #[must_use]
  pub const fn position(&self) -> usize {
    self.pos
  }

  #[inline]
  #[must_use]
  pub const fn remaining(&self) -> usize {
    self.data.len() - self.pos
  }

  #[inline]
  #[must_use]
  pub const fn is_at_end(&self) -> bool {
    self.pos >= self.data.len()
  }

  #[inline]
  pub fn set_to_end(&mut self) {
    self.pos = self.data.len();
  }

  #[inline]
  pub fn get_u8(&mut self) -> Option<u8> {
    let b = *self.data.get(self.pos)?;
    self.pos += 1;
    Some(b)
  }

  #[inline]
  pub fn get_array<const N: usize>(&mut self) -> Option<[u8; N]> {
    let a: [u8; N] = self.data.get(self.pos..self.pos.checked_add(N)?)?.try_into().ok()?;
    self.pos += N;
    Some(a)
  }

  #[inline]
  pub fn get_u32_be(&mut self) -> Option<u32> {
    self.get_array().map(u32::from_be_bytes)
  }

  /// Takes the next `n` bytes, or nothing at all if fewer than `n` remain.
  #[inline]
  pub fn take(&mut self, n: usize) -> Option<&'b [u8]> {
    let out = self.data.get(self.pos..self.pos.checked_add(n)?)?;
    self.pos += n;
    Some(out)
  }

  /// Skips `n` bytes, stopping at the end of the data.
  #[inline]
  pub fn skip(&mut self, n: usize) {
    self.pos = self.pos.saturating_add(n).min(self.data.len());
  }
}

#[test]
fn test_byte_cursor_reads_forward() {
  let mut c = ByteCursor::new(&[0, 0, 1, 2, 9, 8, 7]);
  assert_eq!(c.get_u32_be(), Some(0x0102));
  assert_eq!(c.remaining(), 3);
  assert_eq!(c.take(4), None);
  assert_eq!(c.position(), 4);
  assert_eq!(c.take(2), Some(&[9, 8][..]));
  assert_eq!(c.get_u8(), Some(7));
  assert_eq!(c.get_u8(), None);
  assert!(c.is_at_end());
}

#[test]
fn test_byte_cursor_skip_clamps() {
  let mut c = ByteCursor::new(&[1, 2, 3]);
  c.skip(usize::MAX);
  assert!(c.is_at_end());
  assert_eq!(c.remaining(), 0);
  assert_eq!(c.get_u32_be(), None);
}
