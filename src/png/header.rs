use super::*;

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PngColorType {
  /// Greyscale
  Grayscale = 0,
  /// Red, Green, Blue
  RGB = 2,
  /// Index into a palette.
  Palette = 3,
  /// Greyscale + Alpha
  GrayscaleAlpha = 4,
  /// Red, Green, Blue, Alpha
  RGBA = 6,
}
impl PngColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Grayscale => 1,
      Self::RGB => 3,
      Self::Palette => 1,
      Self::GrayscaleAlpha => 2,
      Self::RGBA => 4,
    }
  }
}
impl TryFrom<u8> for PngColorType {
  type Error = DecodeError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Grayscale,
      2 => Self::RGB,
      3 => Self::Palette,
      4 => Self::GrayscaleAlpha,
      6 => Self::RGBA,
      _ => return Err(DecodeError::InvalidIHDR),
    })
  }
}

/// Image Header, the decode-wide facts about an image.
///
/// This is only ever made from a validated `IHDR` chunk, so the dimensions are
/// non-zero and under the limit, and the bit depth is `1..=16`. The bit depth
/// and color type are not checked against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PngHeader {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  /// bits per channel
  pub bit_depth: u8,
  /// pixel color type
  pub color_type: PngColorType,
  /// if the image data is stored interlaced.
  pub is_interlaced: bool,
}
impl PngHeader {
  /// Parses the 13 data bytes of an `IHDR` chunk.
  ///
  /// ## Failure
  /// * [`DecodeError::InvalidIHDR`] if the length is wrong, either dimension is
  ///   0 or not below `limits.max_dimension`, the bit depth is outside
  ///   `1..=16`, the color type is unknown, the compression or filter method
  ///   isn't 0, or the interlace method isn't 0 or 1.
  pub fn from_ihdr_bytes(data: &[u8], limits: &DecodeLimits) -> DecodeResult<Self> {
    let [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression, filter, interlace] =
      *data
    else {
      return Err(DecodeError::InvalidIHDR);
    };
    let width = u32::from_be_bytes([w0, w1, w2, w3]);
    let height = u32::from_be_bytes([h0, h1, h2, h3]);
    let dimension_ok = |d: u32| d > 0 && d < limits.max_dimension;
    if !dimension_ok(width) || !dimension_ok(height) {
      return Err(DecodeError::InvalidIHDR);
    }
    if !(1..=16).contains(&bit_depth) {
      return Err(DecodeError::InvalidIHDR);
    }
    let color_type = PngColorType::try_from(color_type)?;
    if compression != 0 || filter != 0 {
      return Err(DecodeError::InvalidIHDR);
    }
    let is_interlaced = match interlace {
      0 => false,
      1 => true,
      _ => return Err(DecodeError::InvalidIHDR),
    };
    Ok(Self { width, height, bit_depth, color_type, is_interlaced })
  }

  /// The number of channels per pixel.
  #[inline]
  #[must_use]
  pub const fn channel_count(&self) -> usize {
    self.color_type.channel_count()
  }

  /// The distance, in bytes, between a byte and the same byte of the previous
  /// pixel. This is what the scanline filters use.
  ///
  /// Pixels smaller than a byte count as 1.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(&self) -> usize {
    if self.bit_depth < 8 {
      1
    } else {
      let byte_depth = if self.bit_depth == 16 { 2 } else { 1 };
      self.channel_count() * byte_depth
    }
  }

  /// Bytes of pixel data per scanline, not counting the filter byte.
  #[inline]
  #[must_use]
  pub const fn bytes_per_scanline(&self) -> usize {
    // round up, sub-byte pixels can leave a partial byte at the end.
    ((self.width as usize) * self.channel_count() * (self.bit_depth as usize) + 7) / 8
  }

  /// The size of the decompressed (still filtered) image data: one filter byte
  /// plus one scanline, for each row.
  ///
  /// `None` on overflow.
  #[inline]
  #[must_use]
  pub fn filtered_len(&self) -> Option<usize> {
    self.bytes_per_scanline().checked_add(1)?.checked_mul(self.height as usize)
  }

  /// Checks that the image is something this decoder can actually turn into
  /// pixels.
  pub fn check_supported(&self) -> Result<(), Unsupported> {
    if self.is_interlaced {
      return Err(Unsupported::Interlaced);
    }
    if self.color_type == PngColorType::Palette {
      return Err(Unsupported::Palette);
    }
    if self.bit_depth != 8 {
      return Err(Unsupported::BitDepth(self.bit_depth));
    }
    match self.color_type {
      PngColorType::RGB | PngColorType::RGBA => Ok(()),
      PngColorType::Grayscale => Err(Unsupported::Grayscale),
      PngColorType::GrayscaleAlpha => Err(Unsupported::GrayscaleAlpha),
      PngColorType::Palette => Err(Unsupported::Palette),
    }
  }
}
impl TryFrom<&[u8]> for PngHeader {
  type Error = DecodeError;
  /// Parses with the default limits.
  #[inline]
  fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
    Self::from_ihdr_bytes(data, &DecodeLimits::default())
  }
}
impl<'b> TryFrom<PngRawChunk<'b>> for PngHeader {
  type Error = DecodeError;
  #[inline]
  fn try_from(raw: PngRawChunk<'b>) -> Result<Self, Self::Error> {
    if raw.type_ == PngChunkType::IHDR {
      Self::try_from(raw.data)
    } else {
      Err(DecodeError::IhdrNotFirst)
    }
  }
}
