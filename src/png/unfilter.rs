use super::*;

/// The filter applied to a scanline before compression.
///
/// The first five are the filter types a PNG can name. `AverageFirstLine` is
/// what `Average` becomes on the first line of an image, when there's no
/// previous line to average with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMethod {
  /// The bytes are stored as-is.
  None,
  /// Each byte is stored relative to the same byte of the pixel to the left.
  Sub,
  /// Each byte is stored relative to the same byte of the pixel above.
  Up,
  /// Each byte is stored relative to the mean of the left and above bytes.
  Average,
  /// Each byte is stored relative to the Paeth predictor of left, above, and
  /// upper-left.
  Paeth,
  /// `Average` with an all-zero previous line: each byte is stored relative to
  /// half the byte to its left.
  AverageFirstLine,
}
impl TryFrom<u8> for FilterMethod {
  type Error = DecodeError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      _ => return Err(DecodeError::InvalidFilter),
    })
  }
}
impl FilterMethod {
  /// Rewrites a filter for use on the first line of an image.
  ///
  /// With an all-zero previous line, `Up` does nothing and `Paeth` always
  /// picks the left byte, so the cheaper equivalent filter is used.
  #[inline]
  #[must_use]
  pub const fn for_first_line(self) -> Self {
    match self {
      Self::Up => Self::None,
      Self::Average => Self::AverageFirstLine,
      Self::Paeth => Self::Sub,
      other => other,
    }
  }
}

/// The Paeth predictor: whichever of `a` (left), `b` (above), or `c` (upper
/// left) is closest to `a + b - c`.
#[inline]
#[must_use]
pub const fn paeth_predict(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note: ties must go to a, then b, then c. Changing the order of these
  // tests changes the output.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

/// Reverses one scanline's filter.
///
/// * `data` is the filtered scanline (without its filter byte).
/// * `prev` is the previous line, already unfiltered. It's ignored by the
///   filters that don't look upward.
/// * `curr` gets the unfiltered bytes.
/// * `bpp` is the filter distance from [`PngHeader::bytes_per_pixel`].
///
/// Bytes to the left of the line count as 0.
///
/// ## Panics
/// * If `data`, `prev`, and `curr` aren't all the same length.
pub fn unfilter_line(
  filter: FilterMethod, data: &[u8], prev: &[u8], curr: &mut [u8], bpp: usize,
) {
  assert_eq!(data.len(), curr.len());
  assert_eq!(prev.len(), curr.len());
  let bpp = bpp.min(curr.len());
  match filter {
    FilterMethod::None => curr.copy_from_slice(data),
    FilterMethod::Sub => {
      curr[..bpp].copy_from_slice(&data[..bpp]);
      for i in bpp..curr.len() {
        curr[i] = data[i].wrapping_add(curr[i - bpp]);
      }
    }
    FilterMethod::Up => {
      for ((c, d), b) in curr.iter_mut().zip(data).zip(prev) {
        *c = d.wrapping_add(*b);
      }
    }
    FilterMethod::Average => {
      for i in 0..bpp {
        curr[i] = data[i].wrapping_add(prev[i] / 2);
      }
      for i in bpp..curr.len() {
        let avg = ((u32::from(curr[i - bpp]) + u32::from(prev[i])) / 2) as u8;
        curr[i] = data[i].wrapping_add(avg);
      }
    }
    FilterMethod::Paeth => {
      for i in 0..bpp {
        curr[i] = data[i].wrapping_add(paeth_predict(0, prev[i], 0));
      }
      for i in bpp..curr.len() {
        let p = paeth_predict(curr[i - bpp], prev[i], prev[i - bpp]);
        curr[i] = data[i].wrapping_add(p);
      }
    }
    FilterMethod::AverageFirstLine => {
      // not the same as Sub: the left byte is halved.
      curr[..bpp].copy_from_slice(&data[..bpp]);
      for i in bpp..curr.len() {
        curr[i] = data[i].wrapping_add(curr[i - bpp] / 2);
      }
    }
  }
}

/// Unfilters every scanline of `filtered` and writes the pixels out as RGBA8.
///
/// * `filtered` must hold at least `height` lines of `1 + bytes_per_scanline`
///   bytes. Anything after that is ignored.
/// * `lines` is scratch space, it's resized to two scanlines.
/// * `pixels` must be exactly `width * height * 4` bytes.
///
/// ## Failure
/// * [`DecodeError::UnexpectedEnd`] if `filtered` is too short.
/// * [`DecodeError::InvalidFilter`] on a filter byte over 4.
/// * [`DecodeError::Unsupported`] if the header isn't 8-bit RGB or RGBA.
#[cfg(feature = "alloc")]
pub fn unfilter_to_rgba8(
  header: &PngHeader, filtered: &[u8], lines: &mut Vec<u8>, pixels: &mut [u8],
) -> DecodeResult<()> {
  header.check_supported()?;
  let line_len = header.bytes_per_scanline();
  let bpp = header.bytes_per_pixel();
  let out_line_len = (header.width as usize) * 4;
  let needed = header.filtered_len().ok_or(DecodeError::ImageTooLarge)?;
  if filtered.len() < needed {
    return Err(DecodeError::UnexpectedEnd);
  }
  debug_assert_eq!(pixels.len(), out_line_len * (header.height as usize));

  lines.clear();
  lines.try_reserve(line_len * 2)?;
  lines.resize(line_len * 2, 0);
  let (mut prev, mut curr) = lines.split_at_mut(line_len);

  let mut first = true;
  for (row, out_row) in
    filtered[..needed].chunks_exact(line_len + 1).zip(pixels.chunks_exact_mut(out_line_len))
  {
    let (filter_byte, data) = match row.split_first() {
      Some((f, d)) => (*f, d),
      None => return Err(DecodeError::UnexpectedEnd),
    };
    let mut filter = FilterMethod::try_from(filter_byte)?;
    if first {
      filter = filter.for_first_line();
      first = false;
    }
    unfilter_line(filter, data, prev, curr, bpp);
    expand_line_to_rgba8(header.color_type, curr, out_row)?;
    core::mem::swap(&mut prev, &mut curr);
  }
  Ok(())
}

/// Converts one unfiltered 8-bit scanline into RGBA8 pixels.
///
/// RGB gets an alpha of 255.
pub fn expand_line_to_rgba8(
  color_type: PngColorType, line: &[u8], out: &mut [u8],
) -> DecodeResult<()> {
  match color_type {
    PngColorType::RGBA => {
      if line.len() != out.len() {
        return Err(DecodeError::UnexpectedEnd);
      }
      out.copy_from_slice(line);
    }
    PngColorType::RGB => {
      let src: &[RGB8] = bytemuck::try_cast_slice(line).map_err(|_| DecodeError::UnexpectedEnd)?;
      let dst: &mut [RGBA8] =
        bytemuck::try_cast_slice_mut(out).map_err(|_| DecodeError::UnexpectedEnd)?;
      if src.len() != dst.len() {
        return Err(DecodeError::UnexpectedEnd);
      }
      for (d, s) in dst.iter_mut().zip(src) {
        *d = RGBA8::from(*s);
      }
    }
    PngColorType::Grayscale => return Err(Unsupported::Grayscale.into()),
    PngColorType::GrayscaleAlpha => return Err(Unsupported::GrayscaleAlpha.into()),
    PngColorType::Palette => return Err(Unsupported::Palette.into()),
  }
  Ok(())
}
