/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

use anyhow::Context;

use crate::consts::{CODEBLOCK_MASK, CODEBLOCK_TAG, LARGE_CHUNK_BIT, SMALL_CHUNK_BIT};
use crate::error::{err_exit_code, CodecError, Result};
use crate::here;

use super::bit_reader::BitReader;

/// 32-bit tag-value segment (spec section 3): 16-bit signed tag, 16-bit
/// signed value. A negative tag is the "optional" twin of its absolute
/// value; `abs_tag()` normalizes that away for tag matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagValue {
    pub tag: i16,
    pub value: i16,
}

impl TagValue {
    pub fn is_optional(self) -> bool {
        self.tag < 0
    }

    /// Normalizes away the optional/negated sign for tag matching. A raw tag
    /// word of `0x8000` (`i16::MIN`) has no representable absolute value and
    /// is rejected as a malformed tag rather than overflowing `i16::abs()`.
    pub fn abs_tag(self) -> Result<i16> {
        match self.tag.checked_abs() {
            Some(t) => Ok(t),
            None => err_exit_code(CodecError::InvalidTag, "tag 0x8000 has no valid absolute value").context(here!()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Small,
    Large,
    Codeblock,
}

/// Classifies a tag as chunk framing, returning the payload size in 32-bit
/// segments when it is (spec section 4.4).
pub fn is_chunk_tag(tag_value: TagValue) -> Result<Option<(ChunkKind, u32)>> {
    let raw = tag_value.abs_tag()? as u16;
    let value = tag_value.value as u16;

    if (raw & CODEBLOCK_MASK) == CODEBLOCK_TAG {
        return Ok(Some((ChunkKind::Codeblock, ((raw & 0xFF) as u32) << 16 | value as u32)));
    }
    if (raw & LARGE_CHUNK_BIT) != 0 {
        return Ok(Some((ChunkKind::Large, ((raw & 0xFF) as u32) << 16 | value as u32)));
    }
    if (raw & SMALL_CHUNK_BIT) != 0 {
        return Ok(Some((ChunkKind::Small, value as u32)));
    }
    Ok(None)
}

/// Reads 32-bit tag-value segments off a [`BitReader`] (spec section 4.4).
pub struct SegmentParser<'r, 'a, R> {
    bits: &'r mut BitReader<'a, R>,
}

impl<'r, 'a, R: std::io::Read> SegmentParser<'r, 'a, R> {
    pub fn new(bits: &'r mut BitReader<'a, R>) -> Self {
        SegmentParser { bits }
    }

    pub fn get_segment(&mut self) -> Result<TagValue> {
        self.bits.align_to_segment();
        let raw = self.bits.get_bits(32)?;
        Ok(TagValue {
            tag: (raw >> 16) as i16,
            value: raw as i16,
        })
    }

    /// Reads one segment and verifies its tag matches `expected_tag`
    /// (accepting the optional/negated twin), returning the value.
    pub fn get_value(&mut self, expected_tag: i16) -> Result<i16> {
        let tv = self.get_segment()?;
        if tv.abs_tag()? != expected_tag.abs() {
            return err_exit_code(
                CodecError::InvalidTag,
                &format!("expected tag {expected_tag}, got {}", tv.tag),
            )
            .context(here!());
        }
        Ok(tv.value)
    }

    pub fn bits_mut(&mut self) -> &mut BitReader<'a, R> {
        self.bits
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::structs::byte_stream::ByteStream;

    fn segment_bytes(tag: i16, value: i16) -> [u8; 4] {
        let word = ((tag as u16 as u32) << 16) | (value as u16 as u32);
        word.to_be_bytes()
    }

    #[test]
    fn parses_tag_and_value() {
        let bytes = segment_bytes(20, 1920);
        let mut stream = ByteStream::open_read_memory(&bytes);
        let mut bits = BitReader::new(&mut stream);
        let mut parser = SegmentParser::new(&mut bits);
        let tv = parser.get_segment().unwrap();
        assert_eq!(tv.tag, 20);
        assert_eq!(tv.value, 1920);
    }

    #[test]
    fn get_value_accepts_optional_twin() {
        let bytes = segment_bytes(-102, 8);
        let mut stream = ByteStream::open_read_memory(&bytes);
        let mut bits = BitReader::new(&mut stream);
        let mut parser = SegmentParser::new(&mut bits);
        assert_eq!(parser.get_value(102).unwrap(), 8);
    }

    #[test]
    fn get_value_rejects_mismatched_tag() {
        let bytes = segment_bytes(21, 1080);
        let mut stream = ByteStream::open_read_memory(&bytes);
        let mut bits = BitReader::new(&mut stream);
        let mut parser = SegmentParser::new(&mut bits);
        assert!(parser.get_value(20).is_err());
    }

    #[test]
    fn small_chunk_reports_segment_count() {
        let tv = TagValue {
            tag: SMALL_CHUNK_BIT as i16 | 5,
            value: 12,
        };
        let (kind, size) = is_chunk_tag(tv).unwrap().unwrap();
        assert_eq!(kind, ChunkKind::Small);
        assert_eq!(size, 12);
    }

    #[test]
    fn large_chunk_combines_low_byte_and_value() {
        let tv = TagValue {
            tag: (LARGE_CHUNK_BIT | 0x0001) as i16,
            value: 0x0203u16 as i16,
        };
        let (kind, size) = is_chunk_tag(tv).unwrap().unwrap();
        assert_eq!(kind, ChunkKind::Large);
        assert_eq!(size, 0x0001_0203);
    }

    #[test]
    fn codeblock_tag_is_recognized() {
        let tv = TagValue {
            tag: CODEBLOCK_TAG as i16,
            value: 42,
        };
        let (kind, size) = is_chunk_tag(tv).unwrap().unwrap();
        assert_eq!(kind, ChunkKind::Codeblock);
        assert_eq!(size, 42);
    }

    #[test]
    fn abs_tag_rejects_i16_min_instead_of_panicking() {
        let tv = TagValue { tag: i16::MIN, value: 0 };
        let err = tv.abs_tag().unwrap_err();
        assert_eq!(crate::error::find_codec_error(&err), Some(CodecError::InvalidTag));
    }

    #[test]
    fn is_chunk_tag_rejects_i16_min_tag() {
        let tv = TagValue { tag: i16::MIN, value: 0 };
        let err = is_chunk_tag(tv).unwrap_err();
        assert_eq!(crate::error::find_codec_error(&err), Some(CodecError::InvalidTag));
    }
}
