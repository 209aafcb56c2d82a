#![forbid(unsafe_code)]

//! Module for decoding PNG data.
//!
//! * [PNG Spec](https://www.w3.org/TR/png/)
//!
//! ## Decoding
//!
//! * [`decode`] takes the bytes of a whole PNG file and gives back an
//!   [`ImageRGBA8`](crate::ImageRGBA8).
//! * [`decode_with_limits`] is the same, but with a caller picked
//!   [`DecodeLimits`].
//! * [`decode_with_scratch`] also takes a [`PngScratch`], so that a program
//!   decoding many images can reuse the temporary buffers.
//!
//! Decoding goes in three stages: the chunks are walked and the `IDAT` payloads
//! collected, the collected zlib stream is inflated, then each scanline is
//! unfiltered and expanded to RGBA8.
//!
//! Chunk CRCs are not checked. Unknown chunks are skipped. The image data
//! may not inflate to more bytes than the header says the image needs.
//!
//! ## Inspecting
//!
//! * [`PngRawChunkIter`] walks the raw chunks of a file.
//! * [`png_get_header`] parses just the `IHDR`.

use core::fmt::{Debug, Write};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::{pixel_formats::*, ByteCursor, DecodeError, DecodeResult, Unsupported};

#[cfg(feature = "alloc")]
use crate::{inflate::zlib_decompress_into_limited, ImageRGBA8};

mod chunk;
pub use chunk::*;

mod header;
pub use header::*;

mod unfilter;
pub use unfilter::*;


/// The first eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the PNG's initial 8 bytes are correct.
#[inline]
#[must_use]
pub fn is_png_header_correct(bytes: &[u8]) -> bool {
  bytes.get(..8) == Some(&PNG_SIGNATURE[..])
}

/// Size bounds applied while decoding.
///
/// The defaults accept any image a sane encoder would produce. Tighter values
/// only ever reject more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodeLimits {
  /// Width and height must both be *less than* this.
  pub max_dimension: u32,
  /// The largest single `IDAT` chunk accepted.
  pub max_idat_chunk_len: u32,
  /// The largest `width * height` accepted.
  pub max_pixels: u64,
}
impl Default for DecodeLimits {
  #[inline]
  fn default() -> Self {
    Self { max_dimension: 1 << 24, max_idat_chunk_len: 1 << 30, max_pixels: u32::MAX as u64 }
  }
}

/// Temporary buffers used during a decode.
///
/// Everything is cleared at the start of each decode, so the only thing that
/// carries over between uses is the allocated capacity.
#[cfg(feature = "alloc")]
#[derive(Debug, Clone, Default)]
pub struct PngScratch {
  idat: Vec<u8>,
  inflated: Vec<u8>,
  lines: Vec<u8>,
}
#[cfg(feature = "alloc")]
impl PngScratch {
  /// Makes a scratch space with no capacity yet.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { idat: Vec::new(), inflated: Vec::new(), lines: Vec::new() }
  }

  /// Empties all the buffers, keeping their capacity.
  #[inline]
  pub fn clear(&mut self) {
    self.idat.clear();
    self.inflated.clear();
    self.lines.clear();
  }
}

/// Decodes PNG bytes into RGBA8 pixels, using the default limits.
///
/// ## Failure
/// Any [`DecodeError`]. There's no partial output on failure.
#[cfg(feature = "alloc")]
#[inline]
pub fn decode(bytes: &[u8]) -> DecodeResult<ImageRGBA8> {
  decode_with_scratch(bytes, &DecodeLimits::default(), &mut PngScratch::new())
}

/// Decodes PNG bytes into RGBA8 pixels, using the limits given.
#[cfg(feature = "alloc")]
#[inline]
pub fn decode_with_limits(bytes: &[u8], limits: &DecodeLimits) -> DecodeResult<ImageRGBA8> {
  decode_with_scratch(bytes, limits, &mut PngScratch::new())
}

/// Decodes PNG bytes into RGBA8 pixels, using the limits and scratch space
/// given.
#[cfg(feature = "alloc")]
pub fn decode_with_scratch(
  bytes: &[u8], limits: &DecodeLimits, scratch: &mut PngScratch,
) -> DecodeResult<ImageRGBA8> {
  scratch.clear();
  let result = decode_inner(bytes, limits, scratch);
  if let Err(e) = &result {
    debug!("png decode failed: {e:?}");
  }
  result
}

#[cfg(feature = "alloc")]
fn decode_inner(
  bytes: &[u8], limits: &DecodeLimits, scratch: &mut PngScratch,
) -> DecodeResult<ImageRGBA8> {
  if !is_png_header_correct(bytes) {
    return Err(DecodeError::InvalidHeader);
  }
  let mut cursor = ByteCursor::new(&bytes[PNG_SIGNATURE.len()..]);
  let mut header: Option<PngHeader> = None;

  // A stream that runs out before `IEND` is treated as if it had one.
  while let (Some(chunk_len), Some(type_)) =
    (cursor.get_u32_be(), cursor.get_array::<4>().map(PngChunkType))
  {
    trace!("chunk {type_:?}, {chunk_len} bytes");
    let chunk_len_usize = chunk_len as usize;
    match type_ {
      PngChunkType::IHDR => {
        if header.is_some() {
          return Err(DecodeError::IhdrNotFirst);
        }
        let data = cursor.take(chunk_len_usize).ok_or(DecodeError::InvalidIHDR)?;
        let h = PngHeader::from_ihdr_bytes(data, limits)?;
        debug!("png header: {h:?}");
        header = Some(h);
      }
      _ if header.is_none() => return Err(DecodeError::IhdrNotFirst),
      PngChunkType::PLTE => return Err(Unsupported::Palette.into()),
      PngChunkType::IDAT => {
        if chunk_len > limits.max_idat_chunk_len {
          return Err(DecodeError::InvalidIDAT);
        }
        let data = cursor.take(chunk_len_usize).ok_or(DecodeError::UnexpectedEnd)?;
        scratch.idat.try_reserve(data.len())?;
        scratch.idat.extend_from_slice(data);
      }
      PngChunkType::IEND => break,
      _ => cursor.skip(chunk_len_usize),
    }
    // CRC
    cursor.skip(4);
  }

  let header = header.ok_or(DecodeError::IhdrNotFirst)?;
  finish(&header, limits, scratch)
}

/// Inflates the collected image data and turns it into pixels.
#[cfg(feature = "alloc")]
fn finish(
  header: &PngHeader, limits: &DecodeLimits, scratch: &mut PngScratch,
) -> DecodeResult<ImageRGBA8> {
  if scratch.idat.is_empty() {
    return Err(DecodeError::InvalidIDAT);
  }
  header.check_supported()?;
  let pixel_count = u64::from(header.width) * u64::from(header.height);
  if pixel_count > limits.max_pixels {
    return Err(DecodeError::ImageTooLarge);
  }
  let byte_count = usize::try_from(pixel_count)
    .ok()
    .and_then(|p| p.checked_mul(4))
    .ok_or(DecodeError::ImageTooLarge)?;

  let filtered_len = header.filtered_len().ok_or(DecodeError::ImageTooLarge)?;
  scratch.inflated.try_reserve(filtered_len)?;
  zlib_decompress_into_limited(&scratch.idat, &mut scratch.inflated, filtered_len)?;
  trace!("{} idat bytes inflated to {}", scratch.idat.len(), scratch.inflated.len());

  let mut pixels = Vec::new();
  pixels.try_reserve_exact(byte_count)?;
  pixels.resize(byte_count, 0);
  unfilter_to_rgba8(header, &scratch.inflated, &mut scratch.lines, &mut pixels)?;
  Ok(ImageRGBA8 { width: header.width, height: header.height, pixels })
}

/// Gets the header of a PNG, without decoding anything else.
///
/// ## Failure
/// * [`DecodeError::InvalidHeader`] if the signature is wrong.
/// * [`DecodeError::IhdrNotFirst`] if the first chunk isn't an `IHDR` (or
///   there are no chunks).
/// * [`DecodeError::InvalidIHDR`] if the `IHDR` doesn't parse.
pub fn png_get_header(bytes: &[u8]) -> DecodeResult<PngHeader> {
  if !is_png_header_correct(bytes) {
    return Err(DecodeError::InvalidHeader);
  }
  let first = PngRawChunkIter::new(bytes).next().ok_or(DecodeError::IhdrNotFirst)?;
  PngHeader::try_from(first)
}
