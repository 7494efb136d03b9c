/*---------------------------------------------------------------------------------------------
 *  Copyright (c) the gpr_core contributors.
 *  Licensed under the Apache License, Version 2.0. See LICENSE in the project root for license information.
 *--------------------------------------------------------------------------------------------*/

pub mod bit_reader;
pub mod byte_stream;
pub mod channel_reconstructor;
pub mod codebook;
pub mod codebook_table;
pub mod codec_state;
pub mod driver;
pub mod entropy_decoder;
pub mod image;
pub mod segment;
pub mod transform;
pub mod wavelet;
