/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Decoder configuration surface: the port of the teacher's `EnabledFeatures`.
//!
//! Everything here is data, not behavior — a `DecoderParameters` value is
//! threaded by reference through the driver and the reconstructor, never
//! mutated once constructed.

/// Runtime-selectable VC-5 parts, spec section 9's "runtime `enabled_parts`
/// bitmask" design note. Only the baseline combination is exercised by this
/// core; unsupported-but-optional chunks belonging to other parts are simply
/// skipped via their own payload size, never treated as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledParts(u32);

impl EnabledParts {
    pub const ELEMENTARY: EnabledParts = EnabledParts(1 << 0);
    pub const IMAGE_FORMATS: EnabledParts = EnabledParts(1 << 1);
    pub const LAYERS: EnabledParts = EnabledParts(1 << 2);
    pub const SECTIONS: EnabledParts = EnabledParts(1 << 3);
    pub const METADATA: EnabledParts = EnabledParts(1 << 4);

    pub const fn baseline() -> EnabledParts {
        EnabledParts(Self::ELEMENTARY.0 | Self::IMAGE_FORMATS.0)
    }

    pub const fn contains(self, part: EnabledParts) -> bool {
        (self.0 & part.0) == part.0
    }

    pub const fn union(self, other: EnabledParts) -> EnabledParts {
        EnabledParts(self.0 | other.0)
    }
}

impl Default for EnabledParts {
    fn default() -> Self {
        EnabledParts::baseline()
    }
}

/// Per-channel 8-bit output gain: `out = sqrt((in * num) >> pow2_den)` before
/// the final 8-bit clamp (spec section 4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RationalGain {
    pub num: u32,
    pub pow2_den: u32,
}

impl Default for RationalGain {
    fn default() -> Self {
        // unity gain: num / 2^pow2_den == 1
        RationalGain { num: 1, pow2_den: 0 }
    }
}

/// Output precision and the parameters that only apply to one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputBits {
    Eight { gain: [RationalGain; 3] },
    Sixteen,
}

impl Default for OutputBits {
    fn default() -> Self {
        OutputBits::Sixteen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecoderParameters {
    pub output_bits: OutputBits,
    pub enabled_parts: EnabledParts,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn baseline_contains_elementary_and_image_formats_only() {
        let p = EnabledParts::baseline();
        assert!(p.contains(EnabledParts::ELEMENTARY));
        assert!(p.contains(EnabledParts::IMAGE_FORMATS));
        assert!(!p.contains(EnabledParts::LAYERS));
        assert!(!p.contains(EnabledParts::SECTIONS));
        assert!(!p.contains(EnabledParts::METADATA));
    }
}
