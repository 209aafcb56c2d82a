#[cfg(feature = "alloc")]
use alloc::collections::TryReserveError;

/// A PNG feature that is legal but that this decoder doesn't handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unsupported {
  /// Indexed color, or any `PLTE` chunk at all.
  Palette,
  /// Adam7 interlaced image data.
  Interlaced,
  /// Single channel greyscale.
  Grayscale,
  /// Greyscale + alpha.
  GrayscaleAlpha,
  /// Any bit depth other than 8.
  BitDepth(u8),
}

/// An error from decoding PNG data.
///
/// Every error is fatal: the decoder never hands back a partial image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[allow(clippy::upper_case_acronyms)]
pub enum DecodeError {
  /// The first 8 bytes aren't the PNG signature.
  InvalidHeader,
  /// Some other chunk showed up before the `IHDR`, or there was a second
  /// `IHDR`.
  IhdrNotFirst,
  /// The `IHDR` has the wrong length or an illegal field value.
  InvalidIHDR,
  /// An `IDAT` chunk is over the size bound, or no image data was found at
  /// all.
  InvalidIDAT,
  /// Bad zlib header, an impossible Huffman code, or the bit stream ran dry
  /// twice.
  CorruptZlib,
  /// More codes of one length than that length can hold.
  BadSizes,
  /// The code lengths over-subscribe the code space, or a run-length escape
  /// runs past the end of the length list.
  BadCodeLengths,
  /// A literal/length or distance symbol outside the legal range.
  BadHuffmanCode,
  /// A back-reference points before the start of the output.
  BadDistance,
  /// A deflate block with `BTYPE` 3.
  IllegalCompressionType,
  /// The data ended in the middle of something.
  UnexpectedEnd,
  /// A stored block claims more bytes than remain in the input.
  ReadPastBuffer,
  /// The image data inflates to more bytes than the image header calls for.
  OutputLimit,
  /// A scanline filter byte greater than 4.
  InvalidFilter,
  /// The image is valid PNG, but uses a feature this decoder doesn't support.
  Unsupported(Unsupported),
  /// The image is larger than the [`DecodeLimits`](crate::png::DecodeLimits)
  /// in use allow.
  ImageTooLarge,
  /// The allocator couldn't give us enough space.
  #[cfg(feature = "alloc")]
  Alloc,
}

/// Shorthand for results with a [`DecodeError`].
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(feature = "alloc")]
impl From<TryReserveError> for DecodeError {
  #[inline]
  fn from(_: TryReserveError) -> Self {
    Self::Alloc
  }
}

impl From<Unsupported> for DecodeError {
  #[inline]
  fn from(u: Unsupported) -> Self {
    Self::Unsupported(u)
  }
}

impl core::fmt::Display for DecodeError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    match self {
      Self::InvalidHeader => f.write_str("not PNG data: bad signature"),
      Self::IhdrNotFirst => f.write_str("IHDR chunk is not first"),
      Self::InvalidIHDR => f.write_str("invalid IHDR chunk"),
      Self::InvalidIDAT => f.write_str("invalid IDAT data"),
      Self::CorruptZlib => f.write_str("corrupt zlib stream"),
      Self::BadSizes => f.write_str("bad huffman code sizes"),
      Self::BadCodeLengths => f.write_str("bad huffman code lengths"),
      Self::BadHuffmanCode => f.write_str("bad huffman code"),
      Self::BadDistance => f.write_str("back-reference distance too far"),
      Self::IllegalCompressionType => f.write_str("illegal deflate block type"),
      Self::UnexpectedEnd => f.write_str("unexpected end of data"),
      Self::ReadPastBuffer => f.write_str("stored block reads past end of data"),
      Self::OutputLimit => f.write_str("inflated data exceeds expected size"),
      Self::InvalidFilter => f.write_str("invalid scanline filter"),
      Self::Unsupported(u) => write!(f, "unsupported PNG feature: {u:?}"),
      Self::ImageTooLarge => f.write_str("image exceeds decode limits"),
      #[cfg(feature = "alloc")]
      Self::Alloc => f.write_str("allocation failed"),
    }
  }
}

impl core::error::Error for DecodeError {}
