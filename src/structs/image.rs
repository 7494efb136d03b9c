/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Plain owned buffers that sit between the wavelet pyramid and the final
//! RGB bytes (spec sections 3 and 4.8). No behavior lives here; these are
//! the decoder's output types.

/// One fully-reconstructed channel plane at `precision` bits per sample,
/// row-major (spec section 4.7's "final component array").
#[derive(Debug, Clone)]
pub struct ComponentArray {
    pub width: usize,
    pub height: usize,
    pub precision: u8,
    pub data: Vec<i32>,
}

impl ComponentArray {
    pub fn new(width: usize, height: usize, precision: u8) -> Self {
        ComponentArray {
            width,
            height,
            precision,
            data: vec![0i32; width * height],
        }
    }

    pub fn at(&self, x: usize, y: usize) -> i32 {
        self.data[y * self.width + x]
    }
}

/// The decoded channel set for one sample, prior to RGB conversion: GS, RG,
/// BG, and (Bayer-only) GD (spec section 3).
pub struct UnpackedImage {
    pub width: usize,
    pub height: usize,
    pub channels: Vec<ComponentArray>,
    /// Present when the bitstream carried a `UniqueImageIdentifier` chunk
    /// (spec section 8, scenario 3).
    pub unique_image_identifier: Option<super::codec_state::UniqueImageIdentifier>,
}

/// Final interleaved RGB output (spec section 4.8): `pitch` bytes per row,
/// `bytes_per_pixel` per sample (3 for 8-bit output, 6 for 16-bit).
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub bytes_per_pixel: usize,
    pub pitch: usize,
    pub data: Vec<u8>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, bytes_per_pixel: usize) -> Self {
        let pitch = width * bytes_per_pixel;
        RgbImage {
            width,
            height,
            bytes_per_pixel,
            pitch,
            data: vec![0u8; pitch * height],
        }
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.data[y * self.pitch..(y + 1) * self.pitch]
    }
}
