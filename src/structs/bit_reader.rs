/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

use anyhow::Context;

use crate::error::{err_exit_code, CodecError, Result};
use crate::here;

use super::byte_stream::ByteStream;

/// MSB-first bit-level cursor over a [`ByteStream`] (spec section 4.2).
///
/// Invariant: `count` is in `[0, 32]`, and the low `32 - count` bits of
/// `buffer` are always zero — `buffer` holds its valid bits left-aligned,
/// the next bit to be returned is always the current MSB. This is the same
/// left-aligned-buffer shape as the teacher's `VPXBoolReader`, but the
/// refill unit is one big-endian 32-bit segment (not one byte), since the
/// codec writes whole segments and the entropy code must stay MSB-first
/// across segment boundaries.
pub struct BitReader<'a, R> {
    stream: &'a mut ByteStream<R>,
    buffer: u32,
    count: i32,
}

impl<'a, R: std::io::Read> BitReader<'a, R> {
    pub fn new(stream: &'a mut ByteStream<R>) -> Self {
        BitReader {
            stream,
            buffer: 0,
            count: 0,
        }
    }

    /// Returns the next `n` bits (`0 <= n <= 32`) MSB-first, right-aligned in
    /// the result. Refills from the underlying `ByteStream` at most once per
    /// call, since `n <= 32` and a refill always supplies a fresh 32 bits.
    pub fn get_bits(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 32, "get_bits: n must be <= 32");

        if n == 0 {
            return Ok(0);
        }

        if self.count >= n as i32 {
            let result = self.buffer >> (32 - n);
            self.buffer = if n == 32 { 0 } else { self.buffer << n };
            self.count -= n as i32;
            return Ok(result);
        }

        let have = self.count as u32;
        let partial = if have > 0 { self.buffer >> (32 - have) } else { 0 };
        let need = n - have;

        self.buffer = 0;
        self.count = 0;
        self.refill()?;

        let extra = self.buffer >> (32 - need);
        self.buffer = if need == 32 { 0 } else { self.buffer << need };
        self.count = 32 - need as i32;

        Ok((partial << need) | extra)
    }

    /// `(acc << n) | get_bits(n)`. Used when matching a codeword bit by bit,
    /// typically with `n == 1`.
    pub fn add_bits(&mut self, acc: u32, n: u32) -> Result<u32> {
        let bits = self.get_bits(n)?;
        if n == 32 {
            Ok(bits)
        } else {
            Ok((acc << n) | bits)
        }
    }

    /// Pushes `n` bits (`0 <= n <= 32`, right-aligned in `bits`) back onto the
    /// front of the stream, undoing a `get_bits(n)` call. Used by the fast
    /// codebook lookup: peek `FAST_BITS` bits, then push back whatever the
    /// matched codeword didn't actually need.
    pub fn unget_bits(&mut self, bits: u32, n: u32) {
        debug_assert!(n <= 32);
        debug_assert!(self.count + n as i32 <= 32, "unget_bits: not enough room");
        if n == 0 {
            return;
        }
        let restored_high = if n == 32 { bits } else { bits << (32 - n) };
        let restored_low = if n == 32 { 0 } else { self.buffer >> n };
        self.buffer = restored_high | restored_low;
        self.count += n as i32;
    }

    /// Discards buffered bits until `count` is `0` (already-consumed-up-to
    /// boundary) or `32` (untouched, already on a segment boundary). No
    /// stream access is needed: the discarded bits are already buffered.
    pub fn align_to_segment(&mut self) {
        if self.count != 32 {
            self.buffer = 0;
            self.count = 0;
        }
    }

    /// Byte-accurate position in the underlying `ByteStream`.
    ///
    /// Open question resolved (see DESIGN.md): the source only defines this
    /// when the bit buffer is empty or full; this port rejects any other
    /// state rather than guessing at a flush semantic.
    pub fn position(&self) -> Result<usize> {
        if self.count != 0 && self.count != 32 {
            return err_exit_code(
                CodecError::SyntaxError,
                "position() called with a partially-consumed bit buffer",
            )
            .context(here!());
        }
        Ok(self.stream.position())
    }

    fn refill(&mut self) -> Result<()> {
        match self.stream.get_word() {
            Ok(word) => {
                self.buffer = word;
                self.count = 32;
                Ok(())
            }
            Err(_) => err_exit_code(CodecError::Underflow, "bit reader refill failed").context(here!()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader_over(bytes: &[u8]) -> ByteStream<std::io::Cursor<&[u8]>> {
        ByteStream::open_read_memory(bytes)
    }

    #[test]
    fn get_bits_splits_reconstruct_full_read() {
        // 0xA5C3_F00D split every possible way should reconstruct the same value.
        let word: u32 = 0xA5C3_F00D;
        let bytes = word.to_be_bytes();

        for split in 0..=32u32 {
            let mut stream = reader_over(&bytes);
            let mut br = BitReader::new(&mut stream);

            let hi = br.get_bits(split).unwrap();
            let lo = br.get_bits(32 - split).unwrap();

            let reconstructed = if split == 32 {
                hi
            } else {
                (hi << (32 - split)) | lo
            };
            assert_eq!(reconstructed, word, "split={split}");
        }
    }

    #[test]
    fn refill_crosses_segment_boundary() {
        let bytes = [0x00, 0x00, 0x00, 0xFFu8, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut stream = reader_over(&bytes);
        let mut br = BitReader::new(&mut stream);

        assert_eq!(br.get_bits(24).unwrap(), 0);
        // this read straddles the first/second word
        assert_eq!(br.get_bits(16).unwrap(), 0x00FF);
        assert_eq!(br.get_bits(24).unwrap(), 0xFFFFFF);
    }

    #[test]
    fn align_to_segment_discards_partial_bits() {
        let bytes = [0xFFu8, 0x00, 0x00, 0x00];
        let mut stream = reader_over(&bytes);
        let mut br = BitReader::new(&mut stream);

        br.get_bits(3).unwrap();
        assert_eq!(br.count, 29);
        br.align_to_segment();
        assert_eq!(br.count, 0);
    }

    #[test]
    fn position_requires_aligned_buffer() {
        let bytes = [0u8; 8];
        let mut stream = reader_over(&bytes);
        let mut br = BitReader::new(&mut stream);

        assert_eq!(br.position().unwrap(), 0);
        br.get_bits(4).unwrap();
        assert!(br.position().is_err());
        br.align_to_segment();
        assert_eq!(br.position().unwrap(), 4);
    }

    #[test]
    fn unget_bits_restores_exact_state() {
        let word: u32 = 0xA5C3_F00D;
        let bytes = word.to_be_bytes();
        let mut stream = reader_over(&bytes);
        let mut br = BitReader::new(&mut stream);

        let peeked = br.get_bits(12).unwrap();
        br.unget_bits(peeked, 12);
        assert_eq!(br.get_bits(32).unwrap(), word);
    }

    #[test]
    fn unget_bits_partial_rewind_keeps_remainder_readable() {
        let word: u32 = 0xA5C3_F00D;
        let bytes = word.to_be_bytes();
        let mut stream = reader_over(&bytes);
        let mut br = BitReader::new(&mut stream);

        let peeked = br.get_bits(12).unwrap();
        // only the top 5 bits were actually consumed by a matched codeword;
        // push the remaining 7 back.
        let extra_len = 7;
        let extra_bits = peeked & ((1 << extra_len) - 1);
        br.unget_bits(extra_bits, extra_len);
        let rest = br.get_bits(27).unwrap();
        assert_eq!((peeked >> extra_len) << 27 | rest, word >> 5);
    }

    #[test]
    fn underflow_past_end_of_stream() {
        let bytes = [0u8, 0, 0, 1];
        let mut stream = reader_over(&bytes);
        let mut br = BitReader::new(&mut stream);
        br.get_bits(32).unwrap();
        assert!(br.get_bits(1).is_err());
    }
}
