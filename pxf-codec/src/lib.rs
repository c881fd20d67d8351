// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel Exchange Format (PXF) v300 codec.
//!
//! The encoder turns PCM audio channels or a byte payload into an ordered
//! list of RGBA images; the decoder recovers the payload from any subset or
//! permutation of those images. See the crate README for the format overview.

mod common;
mod header;
mod image;
mod obb;
mod row;
mod sbr;
mod text;
mod whiten;

pub mod ldpc;

mod decoder;
mod encoder;
mod stream;

pub use common::ChannelMode;
pub use decoder::{
    decode, decode_metadata_only, load, AudioDecodeResult, BinaryDecodeResult, DecodeResult,
    MetadataSummary, SourceImage, ValidationFlags,
};
pub use encoder::{EncodeInput, EncodeOptions, Encoder};
pub use image::PxfImage;
pub use stream::{BlockStats, StreamingAudioDecoder};

pub use pxf_core::errors::{Error, Result};
