/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Per-subband entropy decode (spec section 4.6): highpass bands are
//! zero-run/magnitude VLC coded against codeset 17 with no spatial context;
//! the lowpass band is raw fixed-width coefficients.
//!
//! Mirrors the teacher's per-unit decode loop (`read_coefficient_block`) in
//! control shape — accumulate bits, look up a table, write zeros then a
//! value, advance a cursor — but the lookup key is a fixed codebook, not an
//! adaptively-updated probability, and there is no block-neighbor predictor.

use std::io::Read;

use anyhow::Context;

use crate::consts::BAND_END_TRAILER;
use crate::error::{err_exit_code, CodecError, Result};
use crate::here;

use super::bit_reader::BitReader;
use super::codebook::{Codebook, CodebookSymbol};

/// Reads one symbol: peek the fast-lookup width, consult the direct table,
/// and fall back to bit-by-bit accumulation for codewords longer than it.
/// Unused peeked bits are pushed back onto the stream so the caller sees
/// exactly the codeword's own length consumed.
fn next_symbol<R: Read>(bits: &mut BitReader<R>, book: &Codebook) -> Result<CodebookSymbol> {
    let fast_bits = Codebook::fast_bits();
    let peeked = bits.get_bits(fast_bits)?;

    if let Some((code_len, symbol)) = book.lookup_fast(peeked) {
        let extra = fast_bits - code_len as u32;
        if extra > 0 {
            bits.unget_bits(peeked & ((1 << extra) - 1), extra);
        }
        return Ok(symbol);
    }

    let mut acc = peeked;
    let mut len = fast_bits as u8;
    loop {
        if len > book.max_code_len() {
            return err_exit_code(CodecError::SyntaxError, "no codeword matched within the codebook's max length")
                .context(here!());
        }
        if let Some(symbol) = book.lookup_slow(acc, len) {
            return Ok(symbol);
        }
        acc = bits.add_bits(acc, 1)?;
        len += 1;
    }
}

/// Decodes one highpass band (spec section 4.6/4.7) into `out`, which must
/// already be sized `width * height` and is fully overwritten: a
/// `CodebookSymbol::RunMagnitude` writes `run` zeros then one signed
/// coefficient, repeating until the band-end marker and its trailer
/// codeword are read.
pub fn decode_highpass_band<R: Read>(bits: &mut BitReader<R>, book: &Codebook, out: &mut [i16]) -> Result<()> {
    out.fill(0);
    let len = out.len();
    let mut pos = 0usize;

    loop {
        match next_symbol(bits, book)? {
            CodebookSymbol::Special(_) => break,
            CodebookSymbol::RunMagnitude { run, magnitude } => {
                let run = run as usize;
                let next_pos = pos.checked_add(run).filter(|&p| p < len);
                let Some(next_pos) = next_pos else {
                    return err_exit_code(CodecError::SyntaxError, "highpass run of zeros overruns the subband")
                        .context(here!());
                };
                pos = next_pos;

                let value = if magnitude > 0 {
                    let sign_bit = bits.get_bits(1)?;
                    if sign_bit != 0 {
                        -magnitude
                    } else {
                        magnitude
                    }
                } else {
                    0
                };
                out[pos] = value;
                pos += 1;
            }
        }
    }

    // `pos <= len` always holds here: the run-overrun check above already
    // rejects any run that would carry `pos` past `len - 1`. A band-end
    // marker arriving with `pos < len` leaves the remaining coefficients at
    // their pre-filled zero, the same early-EOB-implies-zero-fill shape as
    // the teacher's coefficient-block decode. Codeset 17 has no
    // zero-magnitude entry, so this is the only way an all-zero band (or an
    // all-zero tail) is ever represented.
    //
    // No alignment here: the trailer codeword directly follows the marker
    // bit-for-bit, the same unaligned relationship `SAMPLE_END_MARKER` has
    // with the byte that precedes it. The next `SegmentParser::get_segment`
    // call re-aligns to the following 32-bit boundary on its own.
    let trailer = bits.get_bits(16)? as u16;
    if trailer != BAND_END_TRAILER {
        return err_exit_code(CodecError::BandEndTrailer, "band-end trailer codeword mismatch").context(here!());
    }

    Ok(())
}

/// Decodes the lowpass band (subband 0): `width * height` unsigned
/// coefficients of `lowpass_precision` bits each, row-major, no entropy
/// coding (spec section 4.6).
pub fn decode_lowpass_band<R: Read>(bits: &mut BitReader<R>, lowpass_precision: u8, out: &mut [i16]) -> Result<()> {
    if !(8..=16).contains(&lowpass_precision) {
        return err_exit_code(CodecError::LowpassPrecision, "LowpassPrecision out of the 8..16 range").context(here!());
    }

    for slot in out.iter_mut() {
        let raw = bits.get_bits(lowpass_precision as u32)?;
        if lowpass_precision == 16 && raw > i16::MAX as u32 {
            return err_exit_code(CodecError::LowpassValue, "lowpass coefficient does not fit in i16").context(here!());
        }
        *slot = raw as i16;
    }

    Ok(())
}
