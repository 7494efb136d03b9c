/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

use std::fmt;

/// Uniform error taxonomy for the decode pipeline (spec section 7).
///
/// Every fallible call in the crate returns `crate::Result<T>`, which is
/// `anyhow::Result<T>` wrapping one of these variants. There is no nested
/// try/catch anywhere in the driver: errors propagate with `?` and the
/// top-level entry points are the only place that observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    // stream errors
    EndOfStream,
    FileOpen,
    FileRead,
    FileSeek,
    FileFlush,

    // bitstream errors
    Underflow,
    Overflow,

    // syntax errors
    MissingStartMarker,
    InvalidTag,
    DuplicateHeaderParameter,
    RequiredParameter,
    BandEndMarker,
    BandEndTrailer,
    SyntaxError,

    // semantic errors
    ImageDimensions,
    InvalidBand,
    LowpassPrecision,
    LowpassValue,
    BadImageFormat,
    PatternDimensions,
    EnabledParts,
    UmidLabel,

    // allocation errors
    OutOfMemory,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for CodecError {}

pub type Result<T> = anyhow::Result<T>;

/// Ports the teacher's `err_exit_code` helper: builds a `Result::Err` carrying
/// a `CodecError` plus a short human-readable message, without unwinding
/// through a panic. The `CodecError` stays downcastable from the returned
/// `anyhow::Error` (via `.chain()`), so callers that need to recover on a
/// specific variant — e.g. the driver turning an end-of-stream `Underflow`
/// into `RequiredParameter` when header fields are still missing — don't
/// have to pattern-match on the message text.
pub fn err_exit_code<T>(code: CodecError, message: &str) -> Result<T> {
    Err(anyhow::Error::new(code).context(message.to_string()))
}

/// Finds the first `CodecError` in an `anyhow::Error`'s cause chain.
pub fn find_codec_error(err: &anyhow::Error) -> Option<CodecError> {
    err.chain().find_map(|cause| cause.downcast_ref::<CodecError>().copied())
}

/// Location-tagging macro, the direct port of the teacher's `here!()` used in
/// every `.context(here!())` call site. Kept as a macro (rather than
/// `#[track_caller]`) so existing `.context(here!())` call sites read the
/// same way the teacher's do.
#[macro_export]
macro_rules! here {
    () => {
        concat!(file!(), ":", line!())
    };
}
