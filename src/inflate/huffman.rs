use super::*;

/// Codes this many bits long or shorter decode with a single table lookup.
pub(crate) const FAST_BITS: u32 = 9;
const FAST_MASK: u32 = (1 << FAST_BITS) - 1;

/// The largest alphabet that deflate uses (the literal/length alphabet).
pub(crate) const NUM_SYMBOLS: usize = 288;

/// Reverses the low `bits` bits of `v`.
#[inline]
#[must_use]
pub(crate) const fn bit_reverse(v: u16, bits: u32) -> u16 {
  debug_assert!(bits >= 1 && bits <= 16);
  v.reverse_bits() >> (16 - bits)
}

/// A canonical Huffman decoding table.
///
/// Codes of each length are stored as a contiguous run of "canonical
/// positions", in symbol order, so the table is described by the first code and
/// first position of each length. Short codes also get entries in `fast`,
/// indexed by the next [`FAST_BITS`] bits of input (which arrive bit-reversed
/// relative to how Huffman codes are written).
#[derive(Clone)]
pub(crate) struct Huffman {
  /// `(length << FAST_BITS) | symbol`, or 0 when no short code matches.
  pub(crate) fast: [u16; 1 << FAST_BITS],
  /// Exclusive upper bound of the codes of each length, shifted up so that it
  /// lines up with a 16 bit MSB-first window.
  pub(crate) max_code: [u32; 17],
  pub(crate) first_code: [u16; 16],
  pub(crate) first_symbol: [u16; 16],
  /// Code length of each canonical position.
  pub(crate) length: [u8; NUM_SYMBOLS],
  /// Symbol of each canonical position.
  pub(crate) value: [u16; NUM_SYMBOLS],
}

impl core::fmt::Debug for Huffman {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    f.debug_struct("Huffman")
      .field("first_code", &&self.first_code[1..])
      .field("first_symbol", &&self.first_symbol[1..])
      .field("max_code", &&self.max_code[1..])
      .finish_non_exhaustive()
  }
}

impl Huffman {
  /// Builds a table from the code length of each symbol (0 for unused
  /// symbols).
  pub fn build(code_lengths: &[u8]) -> DecodeResult<Self> {
    if code_lengths.len() > NUM_SYMBOLS {
      return Err(DecodeError::BadCodeLengths);
    }
    let mut out = Self {
      fast: [0; 1 << FAST_BITS],
      max_code: [0; 17],
      first_code: [0; 16],
      first_symbol: [0; 16],
      length: [0; NUM_SYMBOLS],
      value: [0; NUM_SYMBOLS],
    };

    let mut sizes = [0_u32; 17];
    for &len in code_lengths {
      *sizes.get_mut(usize::from(len)).ok_or(DecodeError::BadCodeLengths)? += 1;
    }
    sizes[0] = 0;
    if sizes[16] != 0 {
      return Err(DecodeError::BadCodeLengths);
    }
    for (len, &size) in sizes.iter().enumerate().take(16).skip(1) {
      if size > (1 << len) {
        return Err(DecodeError::BadSizes);
      }
    }

    let mut next_code = [0_u32; 16];
    let mut code = 0_u32;
    let mut k = 0_u32;
    for len in 1..16 {
      next_code[len] = code;
      out.first_code[len] = code as u16;
      out.first_symbol[len] = k as u16;
      code += sizes[len];
      if sizes[len] != 0 && code - 1 >= (1 << len) {
        return Err(DecodeError::BadCodeLengths);
      }
      out.max_code[len] = code << (16 - len);
      code <<= 1;
      k += sizes[len];
    }
    out.max_code[16] = 0x1_0000;

    for (symbol, &len) in code_lengths.iter().enumerate() {
      if len == 0 {
        continue;
      }
      let len_u = usize::from(len);
      let canonical_pos =
        (next_code[len_u] - u32::from(out.first_code[len_u]) + u32::from(out.first_symbol[len_u]))
          as usize;
      *out.length.get_mut(canonical_pos).ok_or(DecodeError::BadCodeLengths)? = len;
      out.value[canonical_pos] = symbol as u16;
      if u32::from(len) <= FAST_BITS {
        let fast_value = (u16::from(len) << FAST_BITS) | symbol as u16;
        let mut j = usize::from(bit_reverse(next_code[len_u] as u16, u32::from(len)));
        while j < out.fast.len() {
          out.fast[j] = fast_value;
          j += 1 << len;
        }
      }
      next_code[len_u] += 1;
    }

    Ok(out)
  }

  /// Decodes one symbol from the bit stream.
  pub fn decode(&self, br: &mut BitReader<'_>) -> DecodeResult<u16> {
    br.ensure_bits(16)?;
    let bits = br.peek_buffer();

    let fast_value = self.fast[(bits & FAST_MASK) as usize];
    if fast_value != 0 {
      br.consume(u32::from(fast_value) >> FAST_BITS);
      return Ok(fast_value & (FAST_MASK as u16));
    }

    // slow path: the code is longer than FAST_BITS, or it's not a real code.
    let reversed = u32::from(bit_reverse(bits as u16, 16));
    let mut len = FAST_BITS as usize + 1;
    while reversed >= self.max_code[len] {
      len += 1;
    }
    if len >= 16 {
      return Err(DecodeError::CorruptZlib);
    }
    let pos = (reversed >> (16 - len))
      .wrapping_sub(u32::from(self.first_code[len]))
      .wrapping_add(u32::from(self.first_symbol[len])) as usize;
    match self.length.get(pos) {
      Some(&l) if usize::from(l) == len => {
        br.consume(len as u32);
        Ok(self.value[pos])
      }
      _ => Err(DecodeError::CorruptZlib),
    }
  }
}
