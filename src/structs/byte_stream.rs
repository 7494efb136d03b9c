/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

use anyhow::Context;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{err_exit_code, CodecError, Result};
use crate::here;

/// Sequential cursor over a byte source, returning big-endian 32-bit words in
/// host order (spec section 4.1). Generic over the reader, the same pattern
/// the teacher uses for `VPXBoolReader<R: Read>`, rather than boxing a
/// `dyn Read`.
pub struct ByteStream<R> {
    reader: R,
    byte_count: usize,
}

impl<R: Read> ByteStream<R> {
    pub fn open_read(reader: R) -> Self {
        ByteStream {
            reader,
            byte_count: 0,
        }
    }

    /// Reads one big-endian 32-bit word, advancing `byte_count` by 4.
    pub fn get_word(&mut self) -> Result<u32> {
        match self.reader.read_u32::<BigEndian>() {
            Ok(v) => {
                self.byte_count += 4;
                Ok(v)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                err_exit_code(CodecError::EndOfStream, "get_word: short read").context(here!())
            }
            Err(_) => err_exit_code(CodecError::FileRead, "get_word: I/O error").context(here!()),
        }
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        match self.reader.read_u8() {
            Ok(v) => {
                self.byte_count += 1;
                Ok(v)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                err_exit_code(CodecError::EndOfStream, "get_byte: short read").context(here!())
            }
            Err(_) => err_exit_code(CodecError::FileRead, "get_byte: I/O error").context(here!()),
        }
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        let mut remaining = n;
        let mut buf = [0u8; 256];
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            match self.reader.read_exact(&mut buf[..chunk]) {
                Ok(()) => {
                    self.byte_count += chunk;
                    remaining -= chunk;
                }
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return err_exit_code(CodecError::EndOfStream, "skip: short read").context(here!())
                }
                Err(_) => return err_exit_code(CodecError::FileRead, "skip: I/O error").context(here!()),
            }
        }
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.byte_count
    }
}

impl<'a> ByteStream<Cursor<&'a [u8]>> {
    pub fn open_read_memory(buffer: &'a [u8]) -> Self {
        ByteStream {
            reader: Cursor::new(buffer),
            byte_count: 0,
        }
    }

    /// Returns to offset 0 and resets `byte_count`. Only meaningful on a
    /// seekable in-memory source; the streaming `Read`-only variant has no
    /// `rewind` because the spec scopes this core to sequential decode of a
    /// single sample (no mid-stream seek, spec section 1 non-goals).
    pub fn rewind(&mut self) {
        self.reader.set_position(0);
        self.byte_count = 0;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_big_endian_words_in_order() {
        let data = [0x00, 0x00, 0x00, 0x01, 0xDE, 0xAD, 0xBE, 0xEF];
        let mut s = ByteStream::open_read_memory(&data);
        assert_eq!(s.get_word().unwrap(), 1);
        assert_eq!(s.get_word().unwrap(), 0xDEAD_BEEF);
        assert_eq!(s.position(), 8);
    }

    #[test]
    fn short_read_is_end_of_stream() {
        let data = [0x00, 0x00, 0x01];
        let mut s = ByteStream::open_read_memory(&data);
        assert!(s.get_word().is_err());
    }

    #[test]
    fn rewind_resets_position() {
        let data = [0u8, 0, 0, 1, 0, 0, 0, 2];
        let mut s = ByteStream::open_read_memory(&data);
        s.get_word().unwrap();
        s.rewind();
        assert_eq!(s.position(), 0);
        assert_eq!(s.get_word().unwrap(), 1);
    }

    #[test]
    fn skip_advances_position() {
        let data = [0u8, 0, 0, 1, 0, 0, 0, 2];
        let mut s = ByteStream::open_read_memory(&data);
        s.skip(4).unwrap();
        assert_eq!(s.get_word().unwrap(), 2);
    }
}
