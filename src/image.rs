#![forbid(unsafe_code)]

//! Provides the heap-allocated output image.

use alloc::vec::Vec;

use crate::pixel_formats::RGBA8;

/// Converts an `(x,y)` position within a given `width` 2D space into a linear
/// pixel index.
#[inline]
#[must_use]
pub const fn xy_width_to_index(x: u32, y: u32, width: u32) -> usize {
  (y as usize) * (width as usize) + (x as usize)
}

/// A decoded image, 8-bits per channel RGBA.
///
/// Pixels are row-major, and the top row comes first. The byte buffer is always
/// exactly `width * height * 4` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ImageRGBA8 {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  pub(crate) pixels: Vec<u8>,
}
impl ImageRGBA8 {
  /// A 2x2 magenta and black checkerboard.
  ///
  /// For use in place of an image that failed to decode.
  #[must_use]
  pub fn error_image() -> Self {
    const M: RGBA8 = RGBA8::new(0xF3, 0x00, 0xF3, 0xFF);
    const K: RGBA8 = RGBA8::new(0x00, 0x00, 0x00, 0xFF);
    let pixels: &[RGBA8] = &[M, K, K, M];
    Self { width: 2, height: 2, pixels: bytemuck::cast_slice(pixels).to_vec() }
  }

  /// The raw channel bytes, `[r, g, b, a, r, g, b, a, ...]`.
  #[inline]
  #[must_use]
  pub fn as_bytes(&self) -> &[u8] {
    &self.pixels
  }

  /// Views the bytes as pixels.
  #[inline]
  #[must_use]
  pub fn as_rgba8(&self) -> &[RGBA8] {
    bytemuck::cast_slice(&self.pixels)
  }

  /// Unwraps the image into its byte buffer, for handing off to a texture
  /// upload or similar.
  #[inline]
  #[must_use]
  pub fn into_bytes(self) -> Vec<u8> {
    self.pixels
  }

  /// Gets the pixel at the position, or `None` if the position is out of
  /// bounds.
  #[inline]
  #[must_use]
  pub fn get(&self, x: u32, y: u32) -> Option<RGBA8> {
    if x < self.width && y < self.height {
      self.as_rgba8().get(xy_width_to_index(x, y, self.width)).copied()
    } else {
      None
    }
  }

  /// Flips the image top to bottom.
  ///
  /// OpenGL style texture uploads expect the bottom row first.
  #[inline]
  pub fn vertical_flip(&mut self) {
    let stride = self.width as usize * 4;
    let mut data: &mut [u8] = self.pixels.as_mut_slice();
    let mut temp_height = self.height;
    while temp_height > 1 {
      let (low, mid) = data.split_at_mut(stride);
      let (mid, high) = mid.split_at_mut(mid.len() - stride);
      low.swap_with_slice(high);
      data = mid;
      temp_height -= 2;
    }
  }
}

#[test]
fn test_error_image() {
  let magenta = RGBA8::new(0xF3, 0, 0xF3, 0xFF);
  let black = RGBA8::new(0, 0, 0, 0xFF);
  let image = ImageRGBA8::error_image();
  assert_eq!((image.width, image.height), (2, 2));
  assert_eq!(image.as_bytes().len(), 16);
  assert_eq!(image.get(0, 0), Some(magenta));
  assert_eq!(image.get(1, 0), Some(black));
  assert_eq!(image.get(0, 1), Some(black));
  assert_eq!(image.get(1, 1), Some(magenta));
  // flipping swaps the two rows
  let mut flipped = image.clone();
  flipped.vertical_flip();
  assert_eq!(flipped.get(0, 0), Some(black));
  assert_eq!(flipped.get(1, 0), Some(magenta));
}

#[test]
fn test_vertical_flip() {
  use alloc::vec;
  let mut image = ImageRGBA8 {
    width: 1,
    height: 3,
    pixels: vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3],
  };
  image.vertical_flip();
  assert_eq!(image.as_bytes(), &[3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 1, 1]);
  assert_eq!(image.get(0, 0), Some(RGBA8::new(3, 3, 3, 3)));
  assert_eq!(image.get(0, 3), None);
  assert_eq!(image.get(1, 0), None);
}
