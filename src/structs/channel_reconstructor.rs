/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! GS/RG/BG channel planes to interleaved RGB bytes (spec section 4.8).
//!
//! The 12-bit -> 16-bit decoder log curve (and its unused-by-the-decoder
//! encoder-direction twin, kept for completeness of the table machinery) are
//! precomputed 4096-entry tables built once behind a `std::sync::OnceLock`,
//! the same "read-only table, process-wide, built on first use" shape as
//! the teacher's other static lookup tables.

use std::sync::OnceLock;

use anyhow::Context;

use crate::consts::LOG_CURVE_TABLE_SIZE;
use crate::error::{err_exit_code, CodecError, Result};
use crate::here;
use crate::parameters::{DecoderParameters, OutputBits};

use super::image::{ComponentArray, RgbImage};

fn build_decoder_log_curve() -> [u16; LOG_CURVE_TABLE_SIZE] {
    let mut table = [0u16; LOG_CURVE_TABLE_SIZE];
    let denom = (LOG_CURVE_TABLE_SIZE - 1) as f64;
    for (i, slot) in table.iter_mut().enumerate() {
        let x = i as f64 / denom;
        let out = 65535.0 * (113f64.powf(x) - 1.0) / 112.0;
        *slot = out.round().clamp(0.0, 65535.0) as u16;
    }
    table
}

/// `out = 65535 * (113^(in/4095) - 1) / 112` (spec section 4.8).
pub fn decoder_log_curve() -> &'static [u16; LOG_CURVE_TABLE_SIZE] {
    static TABLE: OnceLock<[u16; LOG_CURVE_TABLE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(build_decoder_log_curve)
}

fn build_encoder_log_curve() -> [u16; LOG_CURVE_TABLE_SIZE] {
    let mut table = [0u16; LOG_CURVE_TABLE_SIZE];
    let denom = (LOG_CURVE_TABLE_SIZE - 1) as f64;
    for (i, slot) in table.iter_mut().enumerate() {
        let out16 = i as f64 / denom * 65535.0;
        let ratio = 1.0 + out16 * 112.0 / 65535.0;
        let x = ratio.ln() / 113f64.ln();
        *slot = (x * denom).round().clamp(0.0, denom) as u16;
    }
    table
}

/// The forward direction of the log curve pair; not exercised by this
/// decoder but kept alongside [`decoder_log_curve`] as the matched table.
pub fn encoder_log_curve() -> &'static [u16; LOG_CURVE_TABLE_SIZE] {
    static TABLE: OnceLock<[u16; LOG_CURVE_TABLE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(build_encoder_log_curve)
}

fn normalize_to_12_bit(value: i32, shift: u32) -> usize {
    let shifted = value >> shift;
    shifted.clamp(0, (LOG_CURVE_TABLE_SIZE - 1) as i32) as usize
}

fn gain_to_8bit(sample16: u16, num: u32, pow2_den: u32) -> u8 {
    let gained = ((sample16 as u64) * num as u64) >> pow2_den;
    (gained as f64).sqrt().round().clamp(0.0, 255.0) as u8
}

/// Reconstructs interleaved RGB bytes from the three decoded color-difference
/// planes (spec section 4.8). Reads each source plane mirrored horizontally,
/// since the bitstream stores images flipped.
pub fn reconstruct_to_rgb(
    gs: &ComponentArray,
    rg: &ComponentArray,
    bg: &ComponentArray,
    params: &DecoderParameters,
) -> Result<RgbImage> {
    if gs.width != rg.width || gs.width != bg.width || gs.height != rg.height || gs.height != bg.height {
        return err_exit_code(CodecError::ImageDimensions, "GS/RG/BG channel dimensions disagree").context(here!());
    }
    if gs.precision != rg.precision || gs.precision != bg.precision {
        return err_exit_code(CodecError::ImageDimensions, "GS/RG/BG channel precisions disagree").context(here!());
    }

    let width = gs.width;
    let height = gs.height;
    let precision = gs.precision as u32;
    let midpoint = 1i32 << (precision - 1);
    let shift = precision.saturating_sub(12);

    let bytes_per_pixel = match params.output_bits {
        OutputBits::Eight { .. } => 3,
        OutputBits::Sixteen => 6,
    };
    let mut image = RgbImage::new(width, height, bytes_per_pixel);
    let log_curve = decoder_log_curve();

    for y in 0..height {
        for x in 0..width {
            let mirrored_x = width - 1 - x;

            let g_full = gs.at(mirrored_x, y);
            let r_full = 2 * (rg.at(mirrored_x, y) - midpoint) + g_full;
            let b_full = 2 * (bg.at(mirrored_x, y) - midpoint) + g_full;

            let g16 = log_curve[normalize_to_12_bit(g_full, shift)];
            let r16 = log_curve[normalize_to_12_bit(r_full, shift)];
            let b16 = log_curve[normalize_to_12_bit(b_full, shift)];

            match params.output_bits {
                OutputBits::Eight { gain } => {
                    let r8 = gain_to_8bit(r16, gain[0].num, gain[0].pow2_den);
                    let g8 = gain_to_8bit(g16, gain[1].num, gain[1].pow2_den);
                    let b8 = gain_to_8bit(b16, gain[2].num, gain[2].pow2_den);
                    let row = image.row_mut(y);
                    row[x * 3] = r8;
                    row[x * 3 + 1] = g8;
                    row[x * 3 + 2] = b8;
                }
                OutputBits::Sixteen => {
                    let row = image.row_mut(y);
                    row[x * 6..x * 6 + 2].copy_from_slice(&r16.to_be_bytes());
                    row[x * 6 + 2..x * 6 + 4].copy_from_slice(&g16.to_be_bytes());
                    row[x * 6 + 4..x * 6 + 6].copy_from_slice(&b16.to_be_bytes());
                }
            }
        }
    }

    Ok(image)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parameters::RationalGain;

    #[test]
    fn log_curve_endpoints_match_the_formula() {
        let table = decoder_log_curve();
        assert_eq!(table[0], 0);
        assert_eq!(table[LOG_CURVE_TABLE_SIZE - 1], 65535);
    }

    #[test]
    fn log_curve_is_monotonic() {
        let table = decoder_log_curve();
        for w in table.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn midpoint_everywhere_reconstructs_to_mid_gray() {
        let precision = 12u8;
        let mid = 1i32 << (precision - 1);
        let mut gs = ComponentArray::new(2, 2, precision);
        let mut rg = ComponentArray::new(2, 2, precision);
        let mut bg = ComponentArray::new(2, 2, precision);
        for v in gs.data.iter_mut() {
            *v = mid;
        }
        for v in rg.data.iter_mut() {
            *v = mid;
        }
        for v in bg.data.iter_mut() {
            *v = mid;
        }

        let params = DecoderParameters {
            output_bits: OutputBits::Sixteen,
            ..Default::default()
        };
        let image = reconstruct_to_rgb(&gs, &rg, &bg, &params).unwrap();

        let expected = decoder_log_curve()[mid as usize].to_be_bytes();
        for y in 0..2 {
            let row = &image.data[y * image.pitch..(y + 1) * image.pitch];
            for px in row.chunks(2) {
                assert_eq!(px, expected);
            }
        }
    }

    #[test]
    fn eight_bit_unity_gain_is_sqrt_of_sixteen_bit_value() {
        assert_eq!(gain_to_8bit(65535, 1, 0), 255);
        assert_eq!(gain_to_8bit(0, 1, 0), 0);
        let gain = RationalGain::default();
        assert_eq!(gain_to_8bit(65535, gain.num, gain.pow2_den), 255);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let gs = ComponentArray::new(2, 2, 12);
        let rg = ComponentArray::new(3, 2, 12);
        let bg = ComponentArray::new(2, 2, 12);
        let params = DecoderParameters::default();
        assert!(reconstruct_to_rgb(&gs, &rg, &bg, &params).is_err());
    }
}
