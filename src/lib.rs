/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

//! VC-5 compliant decoder core for GoPro's GPR RAW image format.
//!
//! Entry points are [`decode_stream`] (per-channel planes) and
//! [`decode_image`] (straight to interleaved RGB bytes). Both are generic
//! over `R: std::io::Read`, the teacher's convention for not committing to a
//! file-backed or in-memory source at the API boundary.

pub mod consts;
pub mod error;
pub mod helpers;
pub mod metrics;
pub mod parameters;
pub mod structs;

pub use error::{find_codec_error, CodecError, Result};
pub use parameters::{DecoderParameters, EnabledParts, OutputBits, RationalGain};
pub use structs::driver::{decode_image, decode_stream};
pub use structs::image::{ComponentArray, RgbImage, UnpackedImage};
pub use structs::codec_state::UniqueImageIdentifier;
