/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! Top-level decode driver (spec section 4.5): reads the start marker, the
//! header tag-value pairs, then each channel's subbands in order, until the
//! sample-stop codeword or end of stream.
//!
//! Shaped like the teacher's `lepton_decode_row_range` loop — read the next
//! unit, dispatch on it, check for termination — rather than recursive
//! descent, so the abstract state machine in the spec stays visible as
//! control flow instead of being implicit in a call stack.

use std::io::Read;

use anyhow::Context;

use crate::consts::{
    tag, DEFAULT_COMPONENTS_PER_SAMPLE, DEFAULT_PATTERN_HEIGHT, DEFAULT_PATTERN_WIDTH,
    IMAGE_FORMAT_RAW, MAX_WAVELET_COUNT, SAMPLE_END_MARKER, START_MARKER, SUBBAND_TO_BAND,
    SUBBAND_TO_WAVELET,
};
use crate::error::{err_exit_code, find_codec_error, CodecError, Result};
use crate::helpers::u16_bit_length;
use crate::here;
use crate::parameters::DecoderParameters;

use super::bit_reader::BitReader;
use super::byte_stream::ByteStream;
use super::channel_reconstructor::reconstruct_to_rgb;
use super::codebook::codeset_17;
use super::codec_state::CodecState;
use super::entropy_decoder::{decode_highpass_band, decode_lowpass_band};
use super::image::{ComponentArray, RgbImage, UnpackedImage};
use super::segment::{is_chunk_tag, ChunkKind, SegmentParser, TagValue};
use super::transform::{dequantize_and_uncompand_highpass, reconstruct_channel};
use super::wavelet::{Wavelet, BAND_LL};
use crate::metrics::Metrics;

/// Below this per-dimension size a channel cannot support
/// `MAX_WAVELET_COUNT` real levels of 2x halving (2^3 == 8): the driver
/// treats the decoded lowpass band as the final component array directly,
/// with every highpass subband reduced to a zero-length, band-end-marker-only
/// body (spec section 8, scenario 4's 1x1-channel fixture).
const MIN_SYNTHESIZABLE_DIM: u16 = 1 << MAX_WAVELET_COUNT;

/// Per-channel decode buffers: either a real three-level wavelet pyramid, or
/// (for degenerate channel sizes) just the raw lowpass coefficients.
enum ChannelBuffers {
    Wavelets(Box<[Wavelet; MAX_WAVELET_COUNT]>),
    Degenerate { lowpass: Vec<i16> },
}

impl ChannelBuffers {
    fn new(width: u16, height: u16) -> Self {
        if width < MIN_SYNTHESIZABLE_DIM || height < MIN_SYNTHESIZABLE_DIM {
            return ChannelBuffers::Degenerate {
                lowpass: vec![0i16; width as usize * height as usize],
            };
        }
        let (w2, h2) = (width as usize / 8, height as usize / 8);
        let (w1, h1) = (w2 * 2, h2 * 2);
        let (w0, h0) = (w1 * 2, h1 * 2);
        ChannelBuffers::Wavelets(Box::new([Wavelet::new(w0, h0), Wavelet::new(w1, h1), Wavelet::new(w2, h2)]))
    }

    fn decode_subband<R: Read>(
        &mut self,
        bits: &mut BitReader<R>,
        subband_number: usize,
        quantization: i32,
        lowpass_precision: u8,
    ) -> Result<()> {
        let wavelet_index = SUBBAND_TO_WAVELET[subband_number];
        let band_index = SUBBAND_TO_BAND[subband_number];

        match self {
            ChannelBuffers::Degenerate { lowpass } => {
                if subband_number == 0 {
                    decode_lowpass_band(bits, lowpass_precision, lowpass)?;
                } else {
                    decode_highpass_band(bits, codeset_17(), &mut [])?;
                }
            }
            ChannelBuffers::Wavelets(wavelets) => {
                let wavelet = &mut wavelets[wavelet_index];
                if subband_number == 0 {
                    decode_lowpass_band(bits, lowpass_precision, wavelet.band_mut(BAND_LL))?;
                } else {
                    wavelet.set_quant(band_index, quantization);
                    decode_highpass_band(bits, codeset_17(), wavelet.band_mut(band_index))?;
                }
                wavelet.mark_band_decoded(band_index);
            }
        }
        Ok(())
    }

    fn finalize(self, precision: u8, width: usize, height: usize, prescale_table: &[u8]) -> ComponentArray {
        let mut out = ComponentArray::new(width, height, precision);
        match self {
            ChannelBuffers::Degenerate { lowpass } => {
                for (dst, &src) in out.data.iter_mut().zip(lowpass.iter()) {
                    *dst = src as i32;
                }
            }
            ChannelBuffers::Wavelets(mut wavelets) => {
                for wavelet in wavelets.iter_mut() {
                    dequantize_and_uncompand_highpass(wavelet);
                }
                let reconstructed = reconstruct_channel(&wavelets, prescale_table);
                out.data.copy_from_slice(&reconstructed);
            }
        }
        out
    }
}

fn apply_header_tag<R: Read>(parser: &mut SegmentParser<R>, state: &mut CodecState, tv: TagValue) -> Result<()> {
    let t = tv.abs_tag()?;
    let v = tv.value;

    if t == tag::UNIQUE_IMAGE_IDENTIFIER {
        let (_, segments) = is_chunk_tag(tv)?.expect("UniqueImageIdentifier tag must carry chunk framing");
        let mut payload = Vec::with_capacity(segments as usize * 4);
        for _ in 0..segments {
            payload.extend_from_slice(&parser.bits_mut().get_bits(32)?.to_be_bytes());
        }
        state.unique_image_identifier = Some(super::codec_state::UniqueImageIdentifier::parse(&payload)?);
        return Ok(());
    }

    if let Some((_, segments)) = is_chunk_tag(tv)? {
        // unrecognized small/large chunk belonging to an unsupported optional
        // part: skip its payload via the declared segment count.
        for _ in 0..segments {
            parser.bits_mut().get_bits(32)?;
        }
        return Ok(());
    }

    match t {
        tag::IMAGE_WIDTH => {
            if !(1..=i16::MAX).contains(&v) {
                return err_exit_code(CodecError::ImageDimensions, "ImageWidth out of range").context(here!());
            }
            state.image_width = v as u16;
            log::trace!("ImageWidth = {} ({} bits)", state.image_width, u16_bit_length(state.image_width));
            state.header_flags.mark_image_width()?;
        }
        tag::IMAGE_HEIGHT => {
            if !(1..=i16::MAX).contains(&v) {
                return err_exit_code(CodecError::ImageDimensions, "ImageHeight out of range").context(here!());
            }
            state.image_height = v as u16;
            log::trace!("ImageHeight = {} ({} bits)", state.image_height, u16_bit_length(state.image_height));
            state.header_flags.mark_image_height()?;
        }
        tag::BITS_PER_COMPONENT => {
            if !(8..=32).contains(&v) {
                return err_exit_code(CodecError::ImageDimensions, "BitsPerComponent out of range").context(here!());
            }
            state.bits_per_component = v as u8;
        }
        tag::MAX_BITS_PER_COMPONENT => {
            // optional, not tracked beyond acceptance
        }
        tag::CHANNEL_COUNT => {
            state.channel_count = v as usize;
            state.require_channel_count_in_range()?;
        }
        tag::SUBBAND_COUNT => {
            state.subband_count = v as usize;
        }
        tag::PRESCALE_SHIFT => {
            state.set_prescale_from_packed(v as u16);
        }
        tag::LOWPASS_PRECISION => {
            state.lowpass_precision = v as u8;
        }
        tag::IMAGE_FORMAT => {
            if v != IMAGE_FORMAT_RAW {
                return err_exit_code(CodecError::BadImageFormat, "ImageFormat is not RAW").context(here!());
            }
            state.image_format = v;
            state.header_flags.mark_image_format()?;
        }
        tag::PATTERN_WIDTH => {
            if v != DEFAULT_PATTERN_WIDTH {
                return err_exit_code(CodecError::PatternDimensions, "PatternWidth must be 2").context(here!());
            }
            state.pattern_width = v;
            state.header_flags.mark_pattern_width()?;
        }
        tag::PATTERN_HEIGHT => {
            if v != DEFAULT_PATTERN_HEIGHT {
                return err_exit_code(CodecError::PatternDimensions, "PatternHeight must be 2").context(here!());
            }
            state.pattern_height = v;
            state.header_flags.mark_pattern_height()?;
        }
        tag::COMPONENTS_PER_SAMPLE => {
            if v != DEFAULT_COMPONENTS_PER_SAMPLE {
                return err_exit_code(CodecError::BadImageFormat, "ComponentsPerSample must be 4").context(here!());
            }
            state.components_per_sample = v;
            state.header_flags.mark_components_per_sample()?;
        }
        // per-channel cursor tags: these recur once per channel, interleaved
        // with the global header tags ahead of that channel's first
        // codeblock (spec section 4.5's body-phase step), not just once at
        // the very start of the stream.
        tag::CHANNEL_NUMBER => state.channel_number = v as usize,
        tag::CHANNEL_WIDTH => state.channel_width = v as u16,
        tag::CHANNEL_HEIGHT => state.channel_height = v as u16,
        _ if tv.is_optional() => {
            // unrecognized optional, non-chunk tag: nothing further to skip,
            // the tag-value pair itself was the whole payload.
        }
        _ => {
            return err_exit_code(CodecError::InvalidTag, "unrecognized required tag").context(here!());
        }
    }
    Ok(())
}

/// Decodes one sample from `reader` into its unpacked per-channel planes
/// (spec section 4.5's full driver state machine).
pub fn decode_stream<R: Read>(reader: R, _params: &DecoderParameters) -> Result<UnpackedImage> {
    let mut stream = ByteStream::open_read(reader);

    let start = stream.get_word()?;
    if start != START_MARKER {
        return err_exit_code(CodecError::MissingStartMarker, "stream does not begin with the VC-5 start marker").context(here!());
    }
    log::trace!("start marker ok");

    let mut bits = BitReader::new(&mut stream);
    let mut parser = SegmentParser::new(&mut bits);
    let mut state = CodecState::new();
    let mut metrics = Metrics::new();

    let mut channels = Vec::new();
    let mut current_buffers: Option<ChannelBuffers> = None;
    let mut subbands_done = 0usize;

    loop {
        let tv = match parser.get_segment() {
            Ok(tv) => tv,
            Err(e) => {
                if !state.header_flags.all_set() {
                    if let Some(CodecError::Underflow) = find_codec_error(&e) {
                        return err_exit_code(
                            CodecError::RequiredParameter,
                            "stream ended before required header parameters were set",
                        )
                        .context(here!());
                    }
                }
                return Err(e);
            }
        };

        if is_chunk_tag(tv)?.map(|(kind, _)| kind) == Some(ChunkKind::Codeblock) {
            if !state.header_flags.all_set() {
                return err_exit_code(
                    CodecError::RequiredParameter,
                    "a codeblock arrived before required header parameters were set",
                )
                .context(here!());
            }

            if current_buffers.is_none() {
                log::debug!(
                    "channel {} start: {}x{}",
                    channels.len(),
                    state.channel_width,
                    state.channel_height
                );
                current_buffers = Some(ChannelBuffers::new(state.channel_width, state.channel_height));
                subbands_done = 0;
                state.reset_subband_mask();
            }

            let buffers = current_buffers.as_mut().expect("just populated above");
            decode_subband_codeblock(&mut parser, &mut state, buffers, tv)?;
            metrics.record_subband(state.channel_width as u64 * state.channel_height as u64);
            subbands_done += 1;

            if subbands_done == state.subband_count {
                let buffers = current_buffers.take().expect("channel in progress");
                channels.push(buffers.finalize(
                    state.bits_per_component,
                    state.channel_width as usize,
                    state.channel_height as usize,
                    &state.prescale_table,
                ));
                metrics.record_channel();
                log::debug!("channel {} reconstructed", channels.len() - 1);
                if channels.len() == state.channel_count {
                    break;
                }
            }
            continue;
        }

        if cfg!(feature = "detailed_tracing") {
            log::trace!("header tag {} = {}", tv.tag, tv.value);
        }
        apply_header_tag(&mut parser, &mut state, tv)?;
    }

    match parser.bits_mut().get_bits(16) {
        Ok(marker) if marker as u16 == SAMPLE_END_MARKER => state.end_of_sample = true,
        Ok(_) => return err_exit_code(CodecError::BandEndMarker, "sample-stop codeword mismatch").context(here!()),
        Err(_) => state.end_of_sample = true, // exhaustion of outer framing also ends the sample
    }
    log::trace!("decode stats: {:?}", metrics);

    Ok(UnpackedImage {
        width: state.image_width as usize,
        height: state.image_height as usize,
        channels,
        unique_image_identifier: state.unique_image_identifier,
    })
}

fn decode_subband_codeblock<R: Read>(
    parser: &mut SegmentParser<R>,
    state: &mut CodecState,
    buffers: &mut ChannelBuffers,
    codeblock_tv: TagValue,
) -> Result<()> {
    if is_chunk_tag(codeblock_tv)?.map(|(kind, _)| kind) != Some(ChunkKind::Codeblock) {
        return err_exit_code(CodecError::SyntaxError, "expected a LargeCodeblock tag").context(here!());
    }

    let subband_number = parser.get_value(tag::SUBBAND_NUMBER)? as usize;
    let quantization = parser.get_value(tag::QUANTIZATION)? as i32;
    state.subband_number = subband_number;
    state.quantization = quantization;

    if subband_number == 0 {
        let lowpass_precision = parser.get_value(tag::LOWPASS_PRECISION)? as u8;
        state.lowpass_precision = lowpass_precision;
        buffers.decode_subband(parser.bits_mut(), subband_number, quantization, lowpass_precision)?;
    } else {
        buffers.decode_subband(parser.bits_mut(), subband_number, quantization, state.lowpass_precision)?;
    }

    state.mark_subband_decoded(subband_number);
    Ok(())
}

/// Decodes one sample and reconstructs it straight to interleaved RGB bytes
/// (spec section 4.8), reading channels 0/1/2 as GS/RG/BG.
pub fn decode_image<R: Read>(reader: R, params: &DecoderParameters) -> Result<RgbImage> {
    let unpacked = decode_stream(reader, params)?;
    if unpacked.channels.len() < 3 {
        return err_exit_code(CodecError::ImageDimensions, "fewer than three channels decoded, cannot form RGB").context(here!());
    }
    let image = reconstruct_to_rgb(&unpacked.channels[0], &unpacked.channels[1], &unpacked.channels[2], params)?;
    log::trace!("rgb reconstruction complete: {}x{}", image.width, image.height);
    Ok(image)
}
