/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Bitstream constants: tags, markers, chunk bit masks, and the subband
//! index tables from spec section 3. Kept as plain `const`s rather than an
//! enum-heavy tag registry, matching the teacher's `consts.rs` convention of
//! exposing flat lookup tables (e.g. `ZIGZAG_TO_TRANSPOSED`) for the hot
//! path to index directly.

/// First 32 bits of a valid elementary stream: ASCII "VC-5".
pub const START_MARKER: u32 = 0x5643_2D35;

/// 16-bit unaligned codeword terminating a sample.
pub const SAMPLE_END_MARKER: u16 = 0x1E1E;

/// Codeset-17 band-end trailer codeword (consumed after `SPECIAL_MARKER_BAND_END`).
pub const BAND_END_TRAILER: u16 = 0xE33F;

pub const SMALL_CHUNK_BIT: u16 = 0x4000;
pub const LARGE_CHUNK_BIT: u16 = 0x2000;
pub const CODEBLOCK_TAG: u16 = 0x6000;
pub const CODEBLOCK_MASK: u16 = 0x7000;

pub const MAX_CHANNEL_COUNT: usize = 4;
pub const MAX_WAVELET_COUNT: usize = 3;
pub const SUBBAND_COUNT: usize = 10;
pub const BANDS_PER_WAVELET: usize = 4;

/// `PrescaleShift` packs 2 bits per entry into its 16-bit value, level 0 in
/// the MSBs (spec section 4.5); only the first `MAX_WAVELET_COUNT` entries
/// are consumed by the 3-level baseline transform, the rest exist for
/// forward compatibility with deeper pyramids.
pub const PRESCALE_TABLE_SIZE: usize = 8;

pub const IMAGE_FORMAT_RAW: i16 = 4;
pub const DEFAULT_PATTERN_WIDTH: i16 = 2;
pub const DEFAULT_PATTERN_HEIGHT: i16 = 2;
pub const DEFAULT_COMPONENTS_PER_SAMPLE: i16 = 4;

pub mod tag {
    pub const IMAGE_WIDTH: i16 = 20;
    pub const IMAGE_HEIGHT: i16 = 21;
    pub const CHANNEL_COUNT: i16 = 12;
    pub const SUBBAND_COUNT: i16 = 14;
    pub const CHANNEL_NUMBER: i16 = 62;
    pub const LOWPASS_PRECISION: i16 = 35;
    pub const QUANTIZATION: i16 = 53;
    pub const SUBBAND_NUMBER: i16 = 48;
    pub const IMAGE_FORMAT: i16 = 84;
    pub const BITS_PER_COMPONENT: i16 = 101;
    pub const MAX_BITS_PER_COMPONENT: i16 = 102;
    pub const CHANNEL_WIDTH: i16 = 104;
    pub const CHANNEL_HEIGHT: i16 = 105;
    pub const PATTERN_WIDTH: i16 = 106;
    pub const PATTERN_HEIGHT: i16 = 107;
    pub const COMPONENTS_PER_SAMPLE: i16 = 108;
    pub const PRESCALE_SHIFT: i16 = 109;
    pub const LARGE_CODEBLOCK: i16 = 0x6000;
    pub const UNIQUE_IMAGE_IDENTIFIER: i16 = 0x4004;
}

/// subband -> wavelet index, decode order 0..10 (spec section 3).
pub const SUBBAND_TO_WAVELET: [usize; SUBBAND_COUNT] = [2, 2, 2, 2, 1, 1, 1, 0, 0, 0];

/// subband -> band-within-wavelet (0=LL, 1=LH, 2=HL, 3=HH).
pub const SUBBAND_TO_BAND: [usize; SUBBAND_COUNT] = [0, 1, 2, 3, 1, 2, 3, 1, 2, 3];

/// Default prescale shift table for 12-bit precision (spec section 4.7).
pub const DEFAULT_PRESCALE_12BIT: [u8; 8] = [0, 2, 2, 0, 0, 0, 0, 0];

/// UMID label prefix required by `UniqueImageIdentifier` (spec section 8, scenario 3).
pub const UMID_LABEL: [u8; 16] = [
    0x06, 0x0A, 0x2B, 0x34, 0x01, 0x01, 0x01, 0x05, 0x01, 0x01, 0x01, 0x20, 0x00, 0x00, 0x00, 0x00,
];

pub const LOG_CURVE_TABLE_SIZE: usize = 4096;
