use pngdec::{
  png::{
    decode, decode_with_limits, decode_with_scratch, paeth_predict, png_get_header,
    unfilter_line, DecodeLimits, FilterMethod, PngChunkType, PngColorType, PngRawChunk,
    PngRawChunkIter, PngScratch, PNG_SIGNATURE,
  },
  DecodeError, Unsupported, RGBA8,
};
use proptest::prelude::*;

/// Builds up a PNG file one chunk at a time.
struct PngWriter {
  bytes: Vec<u8>,
}
impl PngWriter {
  fn new() -> Self {
    Self { bytes: PNG_SIGNATURE.to_vec() }
  }

  fn chunk(mut self, type_: &[u8; 4], data: &[u8]) -> Self {
    let crc = PngRawChunk { type_: PngChunkType(*type_), data, declared_crc: 0 }
      .compute_actual_crc();
    self.bytes.extend_from_slice(&(data.len() as u32).to_be_bytes());
    self.bytes.extend_from_slice(type_);
    self.bytes.extend_from_slice(data);
    self.bytes.extend_from_slice(&crc.to_be_bytes());
    self
  }

  fn ihdr(self, width: u32, height: u32, bit_depth: u8, color_type: u8, interlace: u8) -> Self {
    let mut data = Vec::new();
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[bit_depth, color_type, 0, 0, interlace]);
    self.chunk(b"IHDR", &data)
  }

  fn idat(self, data: &[u8]) -> Self {
    self.chunk(b"IDAT", data)
  }

  fn iend(self) -> Self {
    self.chunk(b"IEND", &[])
  }

  fn finish(self) -> Vec<u8> {
    self.bytes
  }
}

fn adler32(data: &[u8]) -> u32 {
  let mut a = 1_u32;
  let mut b = 0_u32;
  for &x in data {
    a = (a + u32::from(x)) % 65521;
    b = (b + a) % 65521;
  }
  (b << 16) | a
}

/// Wraps the bytes as a zlib stream of a single stored block.
fn zlib_stored(data: &[u8]) -> Vec<u8> {
  assert!(data.len() <= 0xFFFF);
  let len = data.len() as u16;
  let mut out = vec![0x78, 0x01, 0b001];
  out.extend_from_slice(&len.to_le_bytes());
  out.extend_from_slice(&(!len).to_le_bytes());
  out.extend_from_slice(data);
  out.extend_from_slice(&adler32(data).to_be_bytes());
  out
}

/// Applies the filter to one line, the way an encoder would.
fn filter_line(filter: u8, line: &[u8], prev: &[u8], bpp: usize) -> Vec<u8> {
  let left = |i: usize| if i >= bpp { line[i - bpp] } else { 0 };
  let up_left = |i: usize| if i >= bpp { prev[i - bpp] } else { 0 };
  (0..line.len())
    .map(|i| {
      let predicted = match filter {
        0 => 0,
        1 => left(i),
        2 => prev[i],
        3 => ((u32::from(left(i)) + u32::from(prev[i])) / 2) as u8,
        4 => paeth_predict(left(i), prev[i], up_left(i)),
        _ => unreachable!(),
      };
      line[i].wrapping_sub(predicted)
    })
    .collect()
}

/// Filters the image rows (cycling through `filters`) and zlib compresses
/// them.
fn encode_image_data(
  pixels: &[u8], width: u32, channels: usize, filters: &[u8], level: u8,
) -> Vec<u8> {
  let line_len = width as usize * channels;
  let mut raw = Vec::new();
  let mut prev = vec![0_u8; line_len];
  for (y, line) in pixels.chunks_exact(line_len).enumerate() {
    let filter = filters[y % filters.len()];
    raw.push(filter);
    raw.extend(filter_line(filter, line, &prev, channels));
    prev.copy_from_slice(line);
  }
  miniz_oxide::deflate::compress_to_vec_zlib(&raw, level)
}

fn encode_png(
  pixels: &[u8], width: u32, height: u32, color_type: u8, filters: &[u8], level: u8,
) -> Vec<u8> {
  let channels = if color_type == 6 { 4 } else { 3 };
  let zlib = encode_image_data(pixels, width, channels, filters, level);
  PngWriter::new().ihdr(width, height, 8, color_type, 0).idat(&zlib).iend().finish()
}

fn to_rgba(rgb: &[u8]) -> Vec<u8> {
  rgb.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect()
}

fn test_pixels(count: usize) -> Vec<u8> {
  (0..count).map(|i| (i * 37 + i / 7) as u8).collect()
}

#[test]
fn test_decode_2x2_stored_rgba() {
  #[rustfmt::skip]
  let raw = [
    0, 255, 0, 0, 255, 0, 255, 0, 255,
    0, 0, 0, 255, 255, 10, 20, 30, 40,
  ];
  let png = PngWriter::new().ihdr(2, 2, 8, 6, 0).idat(&zlib_stored(&raw)).iend().finish();
  let image = decode(&png).unwrap();
  assert_eq!(image.width, 2);
  assert_eq!(image.height, 2);
  assert_eq!(
    image.as_bytes(),
    &[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 10, 20, 30, 40]
  );
  assert_eq!(image.get(1, 1), Some(RGBA8::new(10, 20, 30, 40)));
}

#[test]
fn test_round_trip_rgba_all_filters_and_levels() {
  let (width, height) = (13, 9);
  let pixels = test_pixels(width as usize * height as usize * 4);
  for filters in [&[0_u8][..], &[1], &[2], &[3], &[4], &[4, 3, 2, 1, 0]] {
    for level in [0, 1, 6, 10] {
      let png = encode_png(&pixels, width, height, 6, filters, level);
      let image = decode(&png).unwrap();
      assert_eq!((image.width, image.height), (width, height));
      assert_eq!(image.as_bytes(), &pixels[..], "filters {filters:?}, level {level}");
    }
  }
}

#[test]
fn test_round_trip_rgb_all_filters() {
  let (width, height) = (7, 11);
  let pixels = test_pixels(width as usize * height as usize * 3);
  let expected = to_rgba(&pixels);
  for filters in [&[0_u8][..], &[1], &[2], &[3], &[4], &[3, 4, 0, 2, 1]] {
    let png = encode_png(&pixels, width, height, 2, filters, 9);
    let image = decode(&png).unwrap();
    assert_eq!(image.as_bytes(), &expected[..], "filters {filters:?}");
    assert!(image.as_rgba8().iter().all(|p| p.a == 255));
  }
}

#[test]
fn test_idat_split_across_chunks() {
  let pixels = test_pixels(5 * 5 * 4);
  let zlib = encode_image_data(&pixels, 5, 4, &[4], 6);
  let (a, b) = zlib.split_at(zlib.len() / 2);
  let (b, c) = b.split_at(1);
  let png = PngWriter::new()
    .ihdr(5, 5, 8, 6, 0)
    .idat(a)
    .chunk(b"tEXt", b"Comment\0split")
    .idat(b)
    .idat(&[])
    .idat(c)
    .iend()
    .finish();
  assert_eq!(decode(&png).unwrap().as_bytes(), &pixels[..]);
}

#[test]
fn test_unknown_chunks_skipped() {
  let pixels = test_pixels(3 * 2 * 4);
  let zlib = encode_image_data(&pixels, 3, 4, &[0], 6);
  let png = PngWriter::new()
    .ihdr(3, 2, 8, 6, 0)
    .chunk(b"gAMA", &[0, 0, 0xB1, 0x8F])
    .chunk(b"zzZz", &[1, 2, 3])
    .idat(&zlib)
    .chunk(b"tIME", &[0; 7])
    .iend()
    .chunk(b"junk", &[9; 20])
    .finish();
  assert_eq!(decode(&png).unwrap().as_bytes(), &pixels[..]);
}

#[test]
fn test_bad_signature() {
  let png = encode_png(&test_pixels(4), 1, 1, 6, &[0], 6);
  for i in 0..8 {
    let mut bad = png.clone();
    bad[i] ^= 0x20;
    assert_eq!(decode(&bad), Err(DecodeError::InvalidHeader));
  }
  assert_eq!(decode(&[]), Err(DecodeError::InvalidHeader));
  assert_eq!(decode(&PNG_SIGNATURE[..7]), Err(DecodeError::InvalidHeader));
}

#[test]
fn test_bad_ihdr() {
  let zlib = encode_image_data(&test_pixels(4), 1, 4, &[0], 6);
  let zero_width = PngWriter::new().ihdr(0, 1, 8, 6, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&zero_width), Err(DecodeError::InvalidIHDR));
  let bad_interlace = PngWriter::new().ihdr(1, 1, 8, 6, 2).idat(&zlib).iend().finish();
  assert_eq!(decode(&bad_interlace), Err(DecodeError::InvalidIHDR));
  let long_ihdr = PngWriter::new().chunk(b"IHDR", &[0; 14]).idat(&zlib).iend().finish();
  assert_eq!(decode(&long_ihdr), Err(DecodeError::InvalidIHDR));
  let mut truncated = PngWriter::new().ihdr(1, 1, 8, 6, 0).finish();
  truncated.truncate(8 + 8 + 6);
  assert_eq!(decode(&truncated), Err(DecodeError::InvalidIHDR));
}

#[test]
fn test_chunk_order_errors() {
  let zlib = encode_image_data(&test_pixels(4), 1, 4, &[0], 6);
  let idat_first = PngWriter::new().idat(&zlib).ihdr(1, 1, 8, 6, 0).iend().finish();
  assert_eq!(decode(&idat_first), Err(DecodeError::IhdrNotFirst));
  let text_first =
    PngWriter::new().chunk(b"tEXt", b"a\0b").ihdr(1, 1, 8, 6, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&text_first), Err(DecodeError::IhdrNotFirst));
  let iend_first = PngWriter::new().iend().finish();
  assert_eq!(decode(&iend_first), Err(DecodeError::IhdrNotFirst));
  let two_ihdr =
    PngWriter::new().ihdr(1, 1, 8, 6, 0).ihdr(1, 1, 8, 6, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&two_ihdr), Err(DecodeError::IhdrNotFirst));
  assert_eq!(decode(&PNG_SIGNATURE), Err(DecodeError::IhdrNotFirst));
}

#[test]
fn test_missing_idat() {
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::InvalidIDAT));
  let empty_idat = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&[]).iend().finish();
  assert_eq!(decode(&empty_idat), Err(DecodeError::InvalidIDAT));
}

#[test]
fn test_missing_iend_acts_like_iend() {
  let pixels = test_pixels(4 * 4 * 4);
  let zlib = encode_image_data(&pixels, 4, 4, &[1, 2], 6);
  let png = PngWriter::new().ihdr(4, 4, 8, 6, 0).idat(&zlib).finish();
  assert_eq!(decode(&png).unwrap().as_bytes(), &pixels[..]);
  // a partial chunk header at the end is dropped too
  let mut partial = png.clone();
  partial.extend_from_slice(&[0, 0, 0]);
  assert_eq!(decode(&partial).unwrap().as_bytes(), &pixels[..]);
}

#[test]
fn test_truncated_idat() {
  let pixels = test_pixels(4 * 4 * 4);
  let zlib = encode_image_data(&pixels, 4, 4, &[0], 6);
  let mut png = PngWriter::new().ihdr(4, 4, 8, 6, 0).idat(&zlib).finish();
  // cut into the CRC and the end of the payload
  png.truncate(png.len() - 6);
  assert_eq!(decode(&png), Err(DecodeError::UnexpectedEnd));
}

#[test]
fn test_too_little_image_data() {
  // one full row of a two row image
  let raw = [0_u8, 1, 2, 3, 4];
  let png = PngWriter::new().ihdr(1, 2, 8, 6, 0).idat(&zlib_stored(&raw)).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::UnexpectedEnd));
}

#[test]
fn test_image_data_cannot_inflate_past_image_size() {
  // a 1x1 image needs 5 bytes, this inflates to 1 MiB
  let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&vec![0_u8; 1 << 20], 10);
  assert!(zlib.len() < 4096);
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&zlib).iend().finish();
  let mut scratch = PngScratch::new();
  assert_eq!(
    decode_with_scratch(&png, &DecodeLimits::default(), &mut scratch),
    Err(DecodeError::OutputLimit)
  );
  // even one byte over is refused
  let one_over = zlib_stored(&[0, 1, 2, 3, 4, 5]);
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&one_over).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::OutputLimit));
  let exact = zlib_stored(&[0, 1, 2, 3, 4]);
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&exact).iend().finish();
  assert_eq!(decode(&png).unwrap().as_bytes(), &[1, 2, 3, 4]);
}

#[test]
fn test_bad_filter_byte() {
  let raw = [5_u8, 1, 2, 3, 4];
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&zlib_stored(&raw)).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::InvalidFilter));
}

#[test]
fn test_corrupt_zlib() {
  let mut zlib = zlib_stored(&[0, 1, 2, 3, 4]);
  zlib[1] ^= 1;
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::CorruptZlib));

  // fixed huffman: a back-reference before any output
  // BFINAL=1, BTYPE=01, length symbol 257 (0000001), distance 0 (00000)
  let bad_distance = [0x78, 0x01, 0b0000_0011, 0b0000_0010, 0, 0];
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&bad_distance).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::BadDistance));

  // BTYPE=11
  let png = PngWriter::new().ihdr(1, 1, 8, 6, 0).idat(&[0x78, 0x01, 0b111, 0]).iend().finish();
  assert_eq!(decode(&png), Err(DecodeError::IllegalCompressionType));
}

#[test]
fn test_unsupported_formats() {
  let zlib = zlib_stored(&[0, 1, 2, 3, 4]);
  let palette = PngWriter::new()
    .ihdr(1, 1, 8, 3, 0)
    .chunk(b"PLTE", &[1, 2, 3])
    .idat(&zlib)
    .iend()
    .finish();
  assert_eq!(decode(&palette), Err(DecodeError::Unsupported(Unsupported::Palette)));
  // a PLTE on an RGB image is still refused
  let rgb_plte = PngWriter::new()
    .ihdr(1, 1, 8, 2, 0)
    .chunk(b"PLTE", &[1, 2, 3])
    .idat(&zlib)
    .iend()
    .finish();
  assert_eq!(decode(&rgb_plte), Err(DecodeError::Unsupported(Unsupported::Palette)));

  let interlaced = PngWriter::new().ihdr(1, 1, 8, 6, 1).idat(&zlib).iend().finish();
  assert_eq!(decode(&interlaced), Err(DecodeError::Unsupported(Unsupported::Interlaced)));
  let gray = PngWriter::new().ihdr(1, 1, 8, 0, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&gray), Err(DecodeError::Unsupported(Unsupported::Grayscale)));
  let gray_alpha = PngWriter::new().ihdr(1, 1, 8, 4, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&gray_alpha), Err(DecodeError::Unsupported(Unsupported::GrayscaleAlpha)));
  let deep = PngWriter::new().ihdr(1, 1, 16, 6, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&deep), Err(DecodeError::Unsupported(Unsupported::BitDepth(16))));
  let shallow = PngWriter::new().ihdr(1, 1, 1, 0, 0).idat(&zlib).iend().finish();
  assert_eq!(decode(&shallow), Err(DecodeError::Unsupported(Unsupported::BitDepth(1))));
}

#[test]
fn test_limits() {
  let pixels = test_pixels(8 * 8 * 4);
  let png = encode_png(&pixels, 8, 8, 6, &[0], 6);
  let ok = DecodeLimits { max_pixels: 64, ..DecodeLimits::default() };
  assert!(decode_with_limits(&png, &ok).is_ok());
  let small = DecodeLimits { max_pixels: 63, ..DecodeLimits::default() };
  assert_eq!(decode_with_limits(&png, &small), Err(DecodeError::ImageTooLarge));
  let narrow = DecodeLimits { max_dimension: 8, ..DecodeLimits::default() };
  assert_eq!(decode_with_limits(&png, &narrow), Err(DecodeError::InvalidIHDR));
  let idat_len = PngRawChunkIter::new(&png)
    .find(|c| c.type_ == PngChunkType::IDAT)
    .map(|c| c.data.len() as u32)
    .unwrap();
  let short_idat = DecodeLimits { max_idat_chunk_len: idat_len - 1, ..DecodeLimits::default() };
  assert_eq!(decode_with_limits(&png, &short_idat), Err(DecodeError::InvalidIDAT));
}

#[test]
fn test_scratch_reuse() {
  let mut scratch = PngScratch::new();
  let limits = DecodeLimits::default();
  let big_pixels = test_pixels(20 * 10 * 4);
  let big = encode_png(&big_pixels, 20, 10, 6, &[4], 6);
  let small_pixels = test_pixels(2 * 3 * 3);
  let small = encode_png(&small_pixels, 2, 3, 2, &[3], 6);

  let a = decode_with_scratch(&big, &limits, &mut scratch).unwrap();
  assert_eq!(a.as_bytes(), &big_pixels[..]);
  let b = decode_with_scratch(&small, &limits, &mut scratch).unwrap();
  assert_eq!(b.as_bytes(), &to_rgba(&small_pixels)[..]);
  // a failure part way through doesn't leave anything behind
  assert!(decode_with_scratch(&small[..small.len() - 20], &limits, &mut scratch).is_err());
  let c = decode_with_scratch(&big, &limits, &mut scratch).unwrap();
  assert_eq!(c, a);
  assert_eq!(c.into_bytes(), big_pixels);
}

#[test]
fn test_png_get_header() {
  let png = encode_png(&test_pixels(6 * 4 * 3), 6, 4, 2, &[0], 6);
  let header = png_get_header(&png).unwrap();
  assert_eq!((header.width, header.height), (6, 4));
  assert_eq!(header.bit_depth, 8);
  assert_eq!(header.color_type, PngColorType::RGB);
  assert!(!header.is_interlaced);
  assert_eq!(png_get_header(&png[..10]), Err(DecodeError::IhdrNotFirst));
  assert_eq!(png_get_header(&png[1..]), Err(DecodeError::InvalidHeader));
}

#[test]
fn test_chunk_iter_and_crc() {
  let png = encode_png(&test_pixels(4), 1, 1, 6, &[0], 6);
  let chunks: Vec<_> = PngRawChunkIter::new(&png).collect();
  assert_eq!(chunks.len(), 3);
  assert_eq!(chunks[0].type_, PngChunkType::IHDR);
  assert_eq!(chunks[1].type_, PngChunkType::IDAT);
  assert_eq!(chunks[2].type_, PngChunkType::IEND);
  assert_eq!(chunks[2].declared_crc, 0xAE42_6082);
  for c in chunks.iter() {
    assert_eq!(c.compute_actual_crc(), c.declared_crc);
  }
  // truncation stops the iterator
  assert_eq!(PngRawChunkIter::new(&png[..png.len() - 1]).count(), 2);
}

#[test]
fn test_vertical_flip_decoded() {
  let pixels = test_pixels(3 * 2 * 4);
  let png = encode_png(&pixels, 3, 2, 6, &[0], 6);
  let mut image = decode(&png).unwrap();
  image.vertical_flip();
  assert_eq!(&image.as_bytes()[..12], &pixels[12..]);
  assert_eq!(&image.as_bytes()[12..], &pixels[..12]);
}

#[test]
fn test_RawPngChunkIter_no_panics() {
  // even totally random data should never panic the iterator!
  for _ in 0..10 {
    let v = super::rand_bytes(1024);
    for _ in PngRawChunkIter::new(&v) {
      //
    }
  }
}

#[test]
fn test_decode_no_panics() {
  // random data after a real signature
  for _ in 0..100 {
    let mut v = PNG_SIGNATURE.to_vec();
    v.extend(super::rand_bytes(512));
    let _ = decode(&v);
  }
  // random image data behind a real header
  for _ in 0..100 {
    let mut idat = vec![0x78, 0x01];
    idat.extend(super::rand_bytes(256));
    let png = PngWriter::new().ihdr(4, 4, 8, 6, 0).idat(&idat).iend().finish();
    let _ = decode(&png);
  }
  // random corruption of a good file
  let good = encode_png(&test_pixels(16 * 16 * 4), 16, 16, 6, &[4], 6);
  for _ in 0..100 {
    let mut bad = good.clone();
    let r = super::rand_bytes(8);
    for pair in r.chunks_exact(2) {
      let i = 8 + usize::from(pair[0]) * (bad.len() - 8) / 256;
      bad[i] = pair[1];
    }
    let _ = decode(&bad);
  }
}

proptest! {
  #[test]
  fn prop_round_trip(
    width in 1_u32..=9,
    height in 1_u32..=9,
    rgba in any::<bool>(),
    seed in proptest::collection::vec(any::<u8>(), 9 * 9 * 4),
    filters in proptest::collection::vec(0_u8..5, 1..=9),
    level in 0_u8..=10,
  ) {
    let channels = if rgba { 4 } else { 3 };
    let pixels = &seed[..(width * height) as usize * channels];
    let png = encode_png(pixels, width, height, if rgba { 6 } else { 2 }, &filters, level);
    let image = decode(&png).unwrap();
    prop_assert_eq!((image.width, image.height), (width, height));
    if rgba {
      prop_assert_eq!(image.as_bytes(), pixels);
    } else {
      prop_assert_eq!(image.as_bytes(), &to_rgba(pixels)[..]);
    }
  }

  #[test]
  fn prop_first_line_filters(
    data in proptest::collection::vec(any::<u8>(), 1..64),
    bpp in prop_oneof![Just(1_usize), Just(3), Just(4), Just(8)],
  ) {
    let zero = vec![0_u8; data.len()];
    let mut expected = vec![0_u8; data.len()];
    let mut actual = vec![0_u8; data.len()];
    for (f, same) in [
      (FilterMethod::Up, FilterMethod::None),
      (FilterMethod::Average, FilterMethod::AverageFirstLine),
      (FilterMethod::Paeth, FilterMethod::Sub),
    ] {
      unfilter_line(f, &data, &zero, &mut expected, bpp);
      unfilter_line(same, &data, &zero, &mut actual, bpp);
      prop_assert_eq!(&expected, &actual);
    }
  }

  #[test]
  fn prop_filter_inverts(
    line in proptest::collection::vec(any::<u8>(), 24),
    prev in proptest::collection::vec(any::<u8>(), 24),
    filter in 0_u8..5,
  ) {
    let filtered = filter_line(filter, &line, &prev, 3);
    let mut out = vec![0_u8; 24];
    unfilter_line(FilterMethod::try_from(filter).unwrap(), &filtered, &prev, &mut out, 3);
    prop_assert_eq!(out, line);
  }
}
