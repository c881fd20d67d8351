// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-format constants and shared geometry helpers.

use pxf_core::rng::XorShift128P;

pub use pxf_core::dsp::SILENCE_THRESHOLD;

/// The only format version this codec reads or writes.
pub const FORMAT_VERSION: u16 = 300;

/// Every image is exactly this many pixels wide.
pub const IMAGE_WIDTH: u32 = 1024;

/// Pixel width and height of one block.
pub const BLOCK_DIM: usize = 8;

/// Blocks per image row.
pub const BLOCKS_PER_ROW: usize = 128;

/// Payload blocks per row; the remaining four carry row metadata.
pub const DATA_BLOCKS_PER_ROW: usize = 124;

/// Metadata blocks per row.
pub const META_BLOCKS_PER_ROW: usize = BLOCKS_PER_ROW - DATA_BLOCKS_PER_ROW;

/// Blocks per SBR subgroup (half of a data row).
pub const SUBGROUP_BLOCKS: usize = DATA_BLOCKS_PER_ROW / 2;

/// Blocks per scale quadrant (half of a subgroup).
pub const QUADRANT_BLOCKS: usize = SUBGROUP_BLOCKS / 2;

/// MDCT hop size in samples.
pub const HOP: usize = 128;

/// MDCT window length in samples.
pub const WINDOW_LEN: usize = 2 * HOP;

/// MDCT bins per block.
pub const NUM_BINS: usize = 128;

/// Bins stored in pixels; the rest are reconstructed by SBR.
pub const STORED_BINS: usize = 96;

/// Stored bins carried in the luma plane.
pub const LUMA_BINS: usize = 64;

/// Serialized header length before error correction.
pub const HEADER_BYTES: usize = 768;

/// Fixed header prefix length.
pub const HEADER_FIXED_BYTES: usize = 21;

/// Space available to the serialized metadata mapping.
pub const METADATA_MAX_BYTES: usize = HEADER_BYTES - HEADER_FIXED_BYTES;

/// Audio row metadata payload length.
pub const ROW_META_BYTES: usize = 28;

/// Payload bytes carried by one binary block.
pub const BINARY_BLOCK_BYTES: usize = 20;

/// Payload bytes carried by one binary row.
pub const BINARY_ROW_BYTES: usize = DATA_BLOCKS_PER_ROW * BINARY_BLOCK_BYTES;

/// Two-bit pairs per binary row, the granularity of the row permutation.
pub const BINARY_ROW_PAIRS: usize = BINARY_ROW_BYTES * 4;

pub const HEADER_XOR_MASK_SEED: u32 = 0xE5B4_D3BD;
pub const ROW_META_XOR_SEED_BASE: u32 = 0xC439_6125;
pub const BINARY_PERMUTATION_SEED: u32 = 0xBF4D_0153;

/// Default maximum image height in pixels.
pub const DEFAULT_MAX_HEIGHT: u32 = 4096;

/// The zigzag scan order for an 8x8 coefficient block: scan position to flat
/// row-major index.
#[rustfmt::skip]
pub const ZIGZAG_8X8_FLAT: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10, 17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34, 27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// The zigzag scan order for a 4x4 coefficient block.
#[rustfmt::skip]
pub const ZIGZAG_4X4_FLAT: [usize; 16] = [
    0, 1, 4, 8, 5, 2, 3, 6, 9, 12, 13, 10, 7, 11, 14, 15,
];

/// The channel mode stored in every image header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    Mono,
    StereoMid,
    StereoSide,
    Binary,
}

impl ChannelMode {
    pub fn from_u8(value: u8) -> Option<ChannelMode> {
        match value {
            0 => Some(ChannelMode::Mono),
            1 => Some(ChannelMode::StereoMid),
            2 => Some(ChannelMode::StereoSide),
            3 => Some(ChannelMode::Binary),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match *self {
            ChannelMode::Mono => 0,
            ChannelMode::StereoMid => 1,
            ChannelMode::StereoSide => 2,
            ChannelMode::Binary => 3,
        }
    }

    pub fn is_audio(&self) -> bool {
        !matches!(*self, ChannelMode::Binary)
    }
}

/// Produces the XOR whitening mask for a seed: two PRNG bytes folded per
/// output byte. Encoder and decoder must observe exactly this paired-byte
/// stream to stay bit-compatible.
pub fn whiten_mask(seed: u32, len: usize) -> Vec<u8> {
    let mut rng = XorShift128P::new(seed);
    (0..len).map(|_| rng.next_byte() ^ rng.next_byte()).collect()
}

/// XORs a buffer in place with the whitening mask for a seed.
pub fn xor_whiten(bytes: &mut [u8], seed: u32) {
    let mask = whiten_mask(seed, bytes.len());
    for (byte, m) in bytes.iter_mut().zip(mask) {
        *byte ^= m;
    }
}

macro_rules! validate {
    ($a:expr) => {
        if !$a {
            log::error!("check failed at {}:{}", file!(), line!());
            return pxf_core::errors::decode_error("pxf: invalid data");
        }
    };
}

pub(crate) use validate;
