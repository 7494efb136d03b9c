/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Optional decode statistics, gated behind the `decode_stats` feature —
//! the port of the teacher's `compression_stats` feature and `Metrics`
//! struct. Disabled by default so the hot path carries no bookkeeping cost.

#[derive(Debug, Default, Clone, Copy)]
pub struct Metrics {
    pub subbands_decoded: u64,
    pub coefficients_written: u64,
    pub channels_reconstructed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    #[cfg(feature = "decode_stats")]
    #[inline]
    pub fn record_subband(&mut self, coefficients: u64) {
        self.subbands_decoded += 1;
        self.coefficients_written += coefficients;
    }

    #[cfg(not(feature = "decode_stats"))]
    #[inline(always)]
    pub fn record_subband(&mut self, _coefficients: u64) {}

    #[cfg(feature = "decode_stats")]
    #[inline]
    pub fn record_channel(&mut self) {
        self.channels_reconstructed += 1;
    }

    #[cfg(not(feature = "decode_stats"))]
    #[inline(always)]
    pub fn record_channel(&mut self) {}

    pub fn drain(&mut self) -> Metrics {
        std::mem::take(self)
    }
}
