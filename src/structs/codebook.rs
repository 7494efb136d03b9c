/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Fixed, process-wide prefix-code table for codeset 17 (spec section 4.3).
//!
//! Unlike the teacher's `Branch`, which is an *adaptive* binary probability
//! model mutated on every observed bit, a `Codebook` entry is immutable once
//! built: GPR highpass bands are coded against one static table, not an
//! online-adapted one. What carries over from `Branch` is the idiom, not the
//! algorithm — precompute a read-only table once, expose it as a `'static`
//! reference, and back it with an exhaustive `#[test]` that walks every
//! codeword the same way `branch.rs`'s `test_all_probabilities` walks every
//! count pair.

use std::sync::OnceLock;

use crate::helpers::u32_bit_length;

use super::codebook_table::{CODEBOOK_17_ENTRIES, CODEBOOK_17_MAX_CODE_LEN, CODEBOOK_17_SPECIAL_BAND_END};

/// `FAST_BITS`-wide direct lookup table width (spec section 4.3: "typical K=12").
const FAST_BITS: u32 = 12;
const FAST_TABLE_SIZE: usize = 1 << FAST_BITS;

pub const SPECIAL_MARKER_BAND_END: i16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodebookSymbol {
    /// `(run, magnitude)`: `run` zeros followed by one coefficient of this
    /// magnitude (sign read separately when `magnitude > 0`).
    RunMagnitude { run: u16, magnitude: i16 },
    /// a negative-value, zero-run marker; `SPECIAL_MARKER_BAND_END` (1)
    /// signals the end of the subband.
    Special(i16),
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    code_bits: u32,
    code_length: u8,
    symbol: CodebookSymbol,
}

pub struct Codebook {
    entries: Vec<Entry>,
    /// indexed by the next `FAST_BITS` bits of the stream; `None` when no
    /// codeword of length <= FAST_BITS matches that prefix, in which case
    /// the caller falls back to the linear scan over `entries`.
    fast: Vec<Option<(u8, CodebookSymbol)>>,
    max_code_len: u8,
}

impl Codebook {
    fn build() -> Codebook {
        debug_assert_eq!(u32_bit_length(FAST_TABLE_SIZE as u32 - 1), FAST_BITS, "FAST_TABLE_SIZE must be exactly 2^FAST_BITS");

        let mut entries = Vec::with_capacity(CODEBOOK_17_ENTRIES.len() + 1);
        for &(code_bits, code_length, run, magnitude) in CODEBOOK_17_ENTRIES {
            entries.push(Entry {
                code_bits,
                code_length,
                symbol: CodebookSymbol::RunMagnitude { run, magnitude },
            });
        }
        let (special_bits, special_len) = CODEBOOK_17_SPECIAL_BAND_END;
        entries.push(Entry {
            code_bits: special_bits,
            code_length: special_len,
            symbol: CodebookSymbol::Special(SPECIAL_MARKER_BAND_END),
        });

        let mut fast = vec![None; FAST_TABLE_SIZE];
        for e in &entries {
            if e.code_length as u32 <= FAST_BITS {
                let shift = FAST_BITS - e.code_length as u32;
                let lo = (e.code_bits << shift) as usize;
                let hi = lo + (1usize << shift);
                for slot in &mut fast[lo..hi] {
                    debug_assert!(slot.is_none(), "fast table collision: codebook is not prefix-free");
                    *slot = Some((e.code_length, e.symbol));
                }
            }
        }

        Codebook {
            entries,
            fast,
            max_code_len: CODEBOOK_17_MAX_CODE_LEN,
        }
    }

    pub fn max_code_len(&self) -> u8 {
        self.max_code_len
    }

    /// Looks up the symbol for the next `FAST_BITS` bits of the stream,
    /// right-aligned in `next_bits` exactly as `BitReader::get_bits(FAST_BITS)`
    /// returns them. Returns `(consumed_bits, symbol)`; the caller must push
    /// back `FAST_BITS - consumed_bits` unused bits.
    pub fn lookup_fast(&self, next_bits: u32) -> Option<(u8, CodebookSymbol)> {
        self.fast[(next_bits & (FAST_TABLE_SIZE as u32 - 1)) as usize]
    }

    pub fn fast_bits() -> u32 {
        FAST_BITS
    }

    /// `(code_bits, code_length)` for the band-end marker codeword, for
    /// callers that need to hand-assemble a valid subband body without
    /// reaching into the codebook table directly.
    pub fn special_band_end_bits() -> (u32, u8) {
        CODEBOOK_17_SPECIAL_BAND_END
    }

    /// Linear scan fallback for codewords longer than `FAST_BITS`. `acc` is
    /// the bits accumulated so far (right-aligned), `len` how many.
    pub fn lookup_slow(&self, acc: u32, len: u8) -> Option<CodebookSymbol> {
        self.entries
            .iter()
            .find(|e| e.code_length == len && e.code_bits == acc)
            .map(|e| e.symbol)
    }
}

pub fn codeset_17() -> &'static Codebook {
    static TABLE: OnceLock<Codebook> = OnceLock::new();
    TABLE.get_or_init(Codebook::build)
}

#[cfg(test)]
mod test {
    use super::*;

    /// Exhaustive coverage check mirroring `branch.rs`'s
    /// `test_all_probabilities`: every codeword in the table decodes
    /// unambiguously, and no entry is a bit-prefix of any other entry.
    #[test]
    fn codebook_is_prefix_free_and_covers_every_entry() {
        let book = codeset_17();
        assert!(book.max_code_len() <= 26, "spec: max code length <= 26 bits");

        for (i, a) in book.entries.iter().enumerate() {
            for b in book.entries.iter().skip(i + 1) {
                let shorter = a.code_length.min(b.code_length);
                let a_prefix = a.code_bits >> (a.code_length - shorter);
                let b_prefix = b.code_bits >> (b.code_length - shorter);
                assert_ne!(
                    a_prefix, b_prefix,
                    "codewords for {:?} and {:?} share a prefix",
                    a.symbol, b.symbol
                );
            }

            // the full codeword itself must resolve to exactly this symbol.
            if a.code_length as u32 <= FAST_BITS {
                let shift = FAST_BITS as u8 - a.code_length;
                let (len, sym) = book.lookup_fast(a.code_bits << shift).unwrap();
                assert_eq!(len, a.code_length);
                assert_eq!(sym, a.symbol);
            } else {
                let sym = book.lookup_slow(a.code_bits, a.code_length).unwrap();
                assert_eq!(sym, a.symbol);
            }
        }
    }

    #[test]
    fn band_end_marker_decodes_to_special() {
        let book = codeset_17();
        let (bits, len) = CODEBOOK_17_SPECIAL_BAND_END;
        assert!(len as u32 <= FAST_BITS);
        let shift = FAST_BITS as u8 - len;
        let (decoded_len, sym) = book.lookup_fast(bits << shift).unwrap();
        assert_eq!(decoded_len, len);
        assert_eq!(sym, CodebookSymbol::Special(SPECIAL_MARKER_BAND_END));
    }

    #[test]
    fn run_magnitude_entries_have_positive_magnitude() {
        let book = codeset_17();
        for e in &book.entries {
            if let CodebookSymbol::RunMagnitude { magnitude, .. } = e.symbol {
                assert!(magnitude >= 1);
            }
        }
    }
}
