#![forbid(unsafe_code)]

//! A zlib / deflate decompressor.
//!
//! * [RFC 1950: ZLIB Compressed Data Format][rfc1950]
//! * [RFC 1951: DEFLATE Compressed Data Format][rfc1951]
//!
//! [rfc1950]: https://www.rfc-editor.org/rfc/rfc1950
//! [rfc1951]: https://www.rfc-editor.org/rfc/rfc1951
//!
//! The whole compressed stream must be in memory as one slice, and the output
//! goes into a single growable `Vec<u8>`. The Adler-32 trailer of a zlib stream
//! is not checked.

use alloc::vec::Vec;

use crate::{ByteCursor, DecodeError, DecodeResult};

mod bit_reader;
pub(crate) use bit_reader::*;

mod huffman;
pub(crate) use huffman::*;

mod tables;
use tables::*;


/// The kind of a deflate block, from its `BTYPE` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockType {
  Uncompressed,
  FixedHuffman,
  DynamicHuffman,
}
impl TryFrom<u32> for BlockType {
  type Error = DecodeError;
  #[inline]
  fn try_from(btype: u32) -> Result<Self, Self::Error> {
    Ok(match btype {
      0 => Self::Uncompressed,
      1 => Self::FixedHuffman,
      2 => Self::DynamicHuffman,
      _ => return Err(DecodeError::IllegalCompressionType),
    })
  }
}

/// Checks the two byte zlib header at the start of `cursor`.
///
/// The compression method must be deflate, there must not be a preset
/// dictionary, and the header check bits must be right. There must also be at
/// least some data after the header.
fn read_zlib_header(cursor: &mut ByteCursor<'_>) -> DecodeResult<()> {
  let cmf = cursor.get_u8().ok_or(DecodeError::CorruptZlib)?;
  let flg = cursor.get_u8().ok_or(DecodeError::CorruptZlib)?;
  let compression_method = cmf & 0b1111;
  let preset_dictionary = flg & 0b10_0000 != 0;
  if cursor.is_at_end()
    || (u16::from(cmf) * 256 + u16::from(flg)) % 31 != 0
    || preset_dictionary
    || compression_method != 8
  {
    return Err(DecodeError::CorruptZlib);
  }
  Ok(())
}

/// Decompresses a zlib stream, appending the output to `out`.
pub fn zlib_decompress_into(data: &[u8], out: &mut Vec<u8>) -> DecodeResult<()> {
  zlib_decompress_into_limited(data, out, usize::MAX)
}

/// Decompresses a zlib stream, appending at most `limit` bytes to `out`.
///
/// ## Failure
/// * [`DecodeError::OutputLimit`] if the stream holds more than `limit` bytes.
///   Nothing past the limit is ever allocated.
pub fn zlib_decompress_into_limited(
  data: &[u8], out: &mut Vec<u8>, limit: usize,
) -> DecodeResult<()> {
  let mut cursor = ByteCursor::new(data);
  read_zlib_header(&mut cursor)?;
  Inflater::new(BitReader::new(cursor), limit).run(out)
}

/// Decompresses a raw deflate stream (no zlib header), appending the output to
/// `out`.
pub fn inflate_into(data: &[u8], out: &mut Vec<u8>) -> DecodeResult<()> {
  Inflater::new(BitReader::new(ByteCursor::new(data)), usize::MAX).run(out)
}

/// Decompresses a zlib stream into a new `Vec`.
pub fn zlib_decompress_to_vec(data: &[u8]) -> DecodeResult<Vec<u8>> {
  let mut out = Vec::new();
  zlib_decompress_into(data, &mut out)?;
  Ok(out)
}

/// Block by block decoding state.
struct Inflater<'b> {
  br: BitReader<'b>,
  /// The fixed tables, built the first time a fixed block shows up.
  fixed: Option<(Huffman, Huffman)>,
  /// Most bytes this stream may add to the output.
  limit: usize,
}

impl<'b> Inflater<'b> {
  fn new(br: BitReader<'b>, limit: usize) -> Self {
    Self { br, fixed: None, limit }
  }

  fn run(mut self, out: &mut Vec<u8>) -> DecodeResult<()> {
    let start_len = out.len();
    loop {
      let bfinal = self.br.read_bits(1)? != 0;
      let btype = BlockType::try_from(self.br.read_bits(2)?)?;
      debug!("deflate block: {btype:?}, final: {bfinal}");
      match btype {
        BlockType::Uncompressed => self.stored_block(out, start_len)?,
        BlockType::FixedHuffman => {
          if self.fixed.is_none() {
            self.fixed = Some((
              Huffman::build(&FIXED_LIT_LEN_LENGTHS)?,
              Huffman::build(&FIXED_DIST_LENGTHS)?,
            ));
          }
          if let Some((lit_len, dist)) = &self.fixed {
            block_body(&mut self.br, lit_len, dist, out, start_len, self.limit)?;
          }
        }
        BlockType::DynamicHuffman => {
          let (lit_len, dist) = read_dynamic_tables(&mut self.br)?;
          block_body(&mut self.br, &lit_len, &dist, out, start_len, self.limit)?;
        }
      }
      if bfinal {
        break;
      }
    }
    trace!("inflated {} bytes", out.len() - start_len);
    Ok(())
  }

  fn stored_block(&mut self, out: &mut Vec<u8>, start: usize) -> DecodeResult<()> {
    self.br.align_to_byte();
    let mut header = [0_u8; 4];
    let mut k = 0;
    while k < header.len() {
      match self.br.unbuffer_byte() {
        Some(b) => header[k] = b,
        None => break,
      }
      k += 1;
    }
    if self.br.bits_buffered() != 0 {
      // only possible when the buffer is holding end-of-stream padding
      return Err(DecodeError::CorruptZlib);
    }
    while k < header.len() {
      if self.br.is_exhausted() {
        return Err(DecodeError::UnexpectedEnd);
      }
      header[k] = self.br.get_byte();
      k += 1;
    }
    let len = u16::from_le_bytes([header[0], header[1]]);
    let nlen = u16::from_le_bytes([header[2], header[3]]);
    if nlen != len ^ 0xFFFF {
      return Err(DecodeError::CorruptZlib);
    }
    let bytes = self.br.take_bytes(usize::from(len)).ok_or(DecodeError::ReadPastBuffer)?;
    if bytes.len() > self.limit - (out.len() - start) {
      return Err(DecodeError::OutputLimit);
    }
    out.try_reserve(bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
  }
}

/// Reads the header of a dynamic block and builds its two tables.
fn read_dynamic_tables(br: &mut BitReader<'_>) -> DecodeResult<(Huffman, Huffman)> {
  let hlit = br.read_bits(5)? as usize + 257;
  let hdist = br.read_bits(5)? as usize + 1;
  let hclen = br.read_bits(4)? as usize + 4;
  let total = hlit + hdist;

  let mut code_length_lengths = [0_u8; 19];
  for &i in CODE_LENGTH_ORDER.iter().take(hclen) {
    code_length_lengths[i] = br.read_bits(3)? as u8;
  }
  let code_length_table = Huffman::build(&code_length_lengths)?;

  // hlit is at most 288 and hdist at most 32
  let mut code_lengths = [0_u8; 288 + 32];
  let mut n = 0;
  while n < total {
    let symbol = code_length_table.decode(br)?;
    let (fill, repeat) = match symbol {
      0..=15 => {
        code_lengths[n] = symbol as u8;
        n += 1;
        continue;
      }
      16 => {
        if n == 0 {
          return Err(DecodeError::BadCodeLengths);
        }
        (code_lengths[n - 1], br.read_bits(2)? as usize + 3)
      }
      17 => (0, br.read_bits(3)? as usize + 3),
      18 => (0, br.read_bits(7)? as usize + 11),
      _ => return Err(DecodeError::BadCodeLengths),
    };
    if total - n < repeat {
      return Err(DecodeError::BadCodeLengths);
    }
    code_lengths[n..n + repeat].fill(fill);
    n += repeat;
  }

  let (lit_len_lengths, dist_lengths) = code_lengths[..total].split_at(hlit);
  Ok((Huffman::build(lit_len_lengths)?, Huffman::build(dist_lengths)?))
}

/// Decodes the symbols of one Huffman block until its end-of-block symbol.
///
/// Back-references can reach as far back as `out[start]`, but no further.
/// The output can't grow past `start + limit`.
fn block_body(
  br: &mut BitReader<'_>, lit_len: &Huffman, dist: &Huffman, out: &mut Vec<u8>, start: usize,
  limit: usize,
) -> DecodeResult<()> {
  loop {
    let symbol = lit_len.decode(br)?;
    let room = limit - (out.len() - start);
    match symbol {
      0..=255 => {
        if room == 0 {
          return Err(DecodeError::OutputLimit);
        }
        out.try_reserve(1)?;
        out.push(symbol as u8);
      }
      256 => {
        // If we padded past the end of the data, then the end of block code
        // must not have used any of the padding bits.
        if br.hit_eof_once() && br.bits_buffered() < 16 {
          return Err(DecodeError::UnexpectedEnd);
        }
        return Ok(());
      }
      257..=285 => {
        let i = usize::from(symbol - 257);
        let len =
          usize::from(LENGTH_BASE[i]) + br.read_bits(u32::from(LENGTH_EXTRA_BITS[i]))? as usize;

        let d = usize::from(dist.decode(br)?);
        if d >= DIST_BASE.len() {
          return Err(DecodeError::BadHuffmanCode);
        }
        let distance =
          usize::from(DIST_BASE[d]) + br.read_bits(u32::from(DIST_EXTRA_BITS[d]))? as usize;
        if distance > out.len() - start {
          return Err(DecodeError::BadDistance);
        }
        if len > room {
          return Err(DecodeError::OutputLimit);
        }

        // The source and destination can overlap (distance < len), so this
        // has to go one byte at a time.
        out.try_reserve(len)?;
        let mut p = out.len() - distance;
        for _ in 0..len {
          let b = out[p];
          out.push(b);
          p += 1;
        }
      }
      _ => return Err(DecodeError::BadHuffmanCode),
    }
  }
}
