/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

use anyhow::Context;

use crate::consts::{
    DEFAULT_PRESCALE_12BIT, MAX_CHANNEL_COUNT, PRESCALE_TABLE_SIZE, SUBBAND_COUNT, UMID_LABEL,
};
use crate::error::{err_exit_code, CodecError, Result};
use crate::here;

/// A `UniqueImageIdentifier` chunk's payload (spec section 8, scenario 3):
/// 16-byte UMID label, 16-byte UUID, 4-byte big-endian sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueImageIdentifier {
    pub umid_label: [u8; 16],
    pub uuid: [u8; 16],
    pub sequence_number: u32,
}

impl UniqueImageIdentifier {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() != 36 {
            return err_exit_code(CodecError::SyntaxError, "UniqueImageIdentifier: wrong payload length")
                .context(here!());
        }

        let mut umid_label = [0u8; 16];
        umid_label.copy_from_slice(&payload[0..16]);

        if umid_label != UMID_LABEL {
            return err_exit_code(CodecError::UmidLabel, "UniqueImageIdentifier: UMID label mismatch").context(here!());
        }

        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(&payload[16..32]);

        let sequence_number = u32::from_be_bytes(payload[32..36].try_into().unwrap());

        Ok(UniqueImageIdentifier {
            umid_label,
            uuid,
            sequence_number,
        })
    }
}

/// Tracks which of the six required header parameters (spec section 4.5,
/// step 3) have been seen, catching both missing and duplicate occurrences.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredHeaderFlags {
    image_width: bool,
    image_height: bool,
    image_format: bool,
    pattern_width: bool,
    pattern_height: bool,
    components_per_sample: bool,
}

macro_rules! required_flag_accessor {
    ($mark:ident, $field:ident) => {
        pub fn $mark(&mut self) -> Result<()> {
            if self.$field {
                return err_exit_code(
                    CodecError::DuplicateHeaderParameter,
                    concat!(stringify!($field), " seen twice before a codeblock"),
                )
                .context(here!());
            }
            self.$field = true;
            Ok(())
        }
    };
}

impl RequiredHeaderFlags {
    required_flag_accessor!(mark_image_width, image_width);
    required_flag_accessor!(mark_image_height, image_height);
    required_flag_accessor!(mark_image_format, image_format);
    required_flag_accessor!(mark_pattern_width, pattern_width);
    required_flag_accessor!(mark_pattern_height, pattern_height);
    required_flag_accessor!(mark_components_per_sample, components_per_sample);

    pub fn all_set(&self) -> bool {
        self.image_width
            && self.image_height
            && self.image_format
            && self.pattern_width
            && self.pattern_height
            && self.components_per_sample
    }
}

/// Per-channel, per-subband cursor and quantization/prescale state (spec
/// section 3's "Codec state"). Reset once per sample; the channel/subband
/// cursor fields are overwritten as the driver advances through the
/// bitstream in strict order.
pub struct CodecState {
    pub image_width: u16,
    pub image_height: u16,
    pub bits_per_component: u8,
    pub channel_count: usize,
    pub subband_count: usize,
    pub image_format: i16,
    pub pattern_width: i16,
    pub pattern_height: i16,
    pub components_per_sample: i16,
    pub unique_image_identifier: Option<UniqueImageIdentifier>,

    pub channel_number: usize,
    pub channel_width: u16,
    pub channel_height: u16,
    pub channel_position: usize,

    pub subband_number: usize,
    pub quantization: i32,
    pub lowpass_precision: u8,
    pub prescale_table: [u8; PRESCALE_TABLE_SIZE],

    /// bit `i` set once subband `i` of the current channel has been decoded.
    pub decoded_subband_mask: u32,

    pub header_flags: RequiredHeaderFlags,
    pub in_codeblock: bool,
    pub end_of_sample: bool,
}

impl Default for CodecState {
    fn default() -> Self {
        CodecState {
            image_width: 0,
            image_height: 0,
            bits_per_component: 12,
            channel_count: 0,
            subband_count: SUBBAND_COUNT,
            image_format: 0,
            pattern_width: 0,
            pattern_height: 0,
            components_per_sample: 0,
            unique_image_identifier: None,

            channel_number: 0,
            channel_width: 0,
            channel_height: 0,
            channel_position: 0,

            subband_number: 0,
            quantization: 1,
            lowpass_precision: 0,
            prescale_table: DEFAULT_PRESCALE_12BIT,

            decoded_subband_mask: 0,

            header_flags: RequiredHeaderFlags::default(),
            in_codeblock: false,
            end_of_sample: false,
        }
    }
}

impl CodecState {
    pub fn new() -> Self {
        CodecState::default()
    }

    pub fn reset_subband_mask(&mut self) {
        self.decoded_subband_mask = 0;
    }

    pub fn mark_subband_decoded(&mut self, subband: usize) {
        self.decoded_subband_mask |= 1 << subband;
    }

    pub fn is_subband_decoded(&self, subband: usize) -> bool {
        (self.decoded_subband_mask & (1 << subband)) != 0
    }

    /// Unpacks `PrescaleShift`'s 16-bit value into `PRESCALE_TABLE_SIZE`
    /// 2-bit shift amounts, level 0 in the most-significant bits.
    pub fn set_prescale_from_packed(&mut self, packed: u16) {
        for (i, slot) in self.prescale_table.iter_mut().enumerate() {
            let shift = (PRESCALE_TABLE_SIZE - 1 - i) * 2;
            *slot = ((packed as u32 >> shift) & 0b11) as u8;
        }
    }

    pub fn is_default_prescale(&self) -> bool {
        self.bits_per_component == 12 && self.prescale_table == DEFAULT_PRESCALE_12BIT
    }

    pub fn require_channel_count_in_range(&self) -> Result<()> {
        if self.channel_count == 0 || self.channel_count > MAX_CHANNEL_COUNT {
            return err_exit_code(CodecError::ImageDimensions, "ChannelCount out of range").context(here!());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prescale_default_matches_spec_table() {
        let state = CodecState::new();
        assert!(state.is_default_prescale());
    }

    #[test]
    fn prescale_unpacks_level_zero_from_msbs() {
        let mut state = CodecState::new();
        // level 0 = 0b10 (2), level 1 = 0b10 (2), rest zero: matches the default.
        let packed: u16 = 0b10_10_00_00_00_00_00_00;
        state.set_prescale_from_packed(packed);
        assert_eq!(state.prescale_table, DEFAULT_PRESCALE_12BIT);
    }

    #[test]
    fn required_header_flags_detect_duplicates() {
        let mut flags = RequiredHeaderFlags::default();
        flags.mark_image_width().unwrap();
        assert!(flags.mark_image_width().is_err());
    }

    #[test]
    fn required_header_flags_all_set_only_after_every_flag() {
        let mut flags = RequiredHeaderFlags::default();
        flags.mark_image_width().unwrap();
        flags.mark_image_height().unwrap();
        flags.mark_image_format().unwrap();
        flags.mark_pattern_width().unwrap();
        flags.mark_pattern_height().unwrap();
        assert!(!flags.all_set());
        flags.mark_components_per_sample().unwrap();
        assert!(flags.all_set());
    }

    #[test]
    fn unique_image_identifier_round_trip() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&UMID_LABEL);
        payload.extend_from_slice(&[0xAAu8; 16]);
        payload.extend_from_slice(&0x42u32.to_be_bytes());

        let id = UniqueImageIdentifier::parse(&payload).unwrap();
        assert_eq!(id.sequence_number, 0x42);
        assert_eq!(id.uuid, [0xAAu8; 16]);
    }

    #[test]
    fn unique_image_identifier_rejects_bad_label() {
        let mut payload = vec![0u8; 36];
        payload[0] = 0xFF;
        assert!(UniqueImageIdentifier::parse(&payload).is_err());
    }
}
