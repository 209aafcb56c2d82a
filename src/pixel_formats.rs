//! Pixel types for the decoder's output.
//!
//! All decoded images come out as [`RGBA8`]. The other types exist so that
//! source scanlines can be viewed as pixels (with `bytemuck`) rather than as
//! loose bytes.

use bytemuck::{Pod, Zeroable};

/// An RGB value, 8-bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGB8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
}

/// An RGBA value, 8-bits per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Zeroable, Pod)]
#[repr(C)]
#[allow(missing_docs)]
pub struct RGBA8 {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}
impl RGBA8 {
  /// Makes a new value.
  #[inline]
  #[must_use]
  pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self { r, g, b, a }
  }
}
impl From<RGB8> for RGBA8 {
  /// Opaque, so the alpha is 255.
  #[inline]
  fn from(RGB8 { r, g, b }: RGB8) -> Self {
    Self { r, g, b, a: 255 }
  }
}

#[test]
fn test_pixel_sizes() {
  use core::mem::size_of;
  // Note: the decoder casts byte slices to these, so there can't be padding.
  assert_eq!(size_of::<RGB8>(), 3);
  assert_eq!(size_of::<RGBA8>(), 4);
}
