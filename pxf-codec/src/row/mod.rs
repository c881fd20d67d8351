// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `row` module implements the per-row payload pipelines and the audio
//! row metadata sidecar.

pub mod audio;
pub mod binary;

use once_cell::sync::Lazy;

use pxf_core::dsp::half::{float_to_half, half_to_float};
use pxf_core::util::bits;

use crate::common::{
    whiten_mask, xor_whiten, DATA_BLOCKS_PER_ROW, META_BLOCKS_PER_ROW, ROW_META_BYTES,
    ROW_META_XOR_SEED_BASE,
};
use crate::image::{read_block_levels, PxfImage};
use crate::ldpc;

/// Soft-decision clamp for all LLR lookup tables.
const LLR_CLAMP: f64 = 20.0;

/// Laplacian spread of the luma symbol channels.
const LUMA_SIGMA: f64 = 12.0;

/// Laplacian spread of the chroma symbol channels.
const CHROMA_SIGMA: f64 = 40.0;

fn llr_1bit_table(sigma: f64) -> [f64; 256] {
    let mut table = [0.0; 256];
    for (v, entry) in table.iter_mut().enumerate() {
        let v = v as f64;
        // Centroids 0 (bit 0) and 255 (bit 1).
        *entry = (((v - 255.0).abs() - v.abs()) / sigma).clamp(-LLR_CLAMP, LLR_CLAMP);
    }
    table
}

fn llr_2bit_table(zero_centroids: [f64; 2], one_centroids: [f64; 2]) -> [f64; 256] {
    let mut table = [0.0; 256];
    for (v, entry) in table.iter_mut().enumerate() {
        let v = v as f64;
        let num: f64 =
            zero_centroids.iter().map(|&c| (-(v - c).abs() / LUMA_SIGMA).exp()).sum();
        let den: f64 =
            one_centroids.iter().map(|&c| (-(v - c).abs() / LUMA_SIGMA).exp()).sum();
        *entry = (num / den).ln().clamp(-LLR_CLAMP, LLR_CLAMP);
    }
    table
}

/// 1-bit luma LLRs, used for the header row and all metadata blocks.
pub(crate) static LLR_1BIT_LUMA: Lazy<[f64; 256]> = Lazy::new(|| llr_1bit_table(LUMA_SIGMA));

/// 1-bit chroma LLRs for the binary block Cb/Cr symbols.
pub(crate) static LLR_1BIT_CHROMA: Lazy<[f64; 256]> = Lazy::new(|| llr_1bit_table(CHROMA_SIGMA));

/// 2-bit luma LLRs: the MSB partitions the Gray levels {0,85} vs {170,255}.
pub(crate) static LLR_2BIT_MSB: Lazy<[f64; 256]> =
    Lazy::new(|| llr_2bit_table([0.0, 85.0], [170.0, 255.0]));

/// 2-bit luma LLRs: the LSB partitions the Gray levels {0,255} vs {85,170}.
pub(crate) static LLR_2BIT_LSB: Lazy<[f64; 256]> =
    Lazy::new(|| llr_2bit_table([0.0, 255.0], [85.0, 170.0]));

/// Log-scale quantization of a band factor over [0, 2] into one byte.
pub fn log_encode(value: f64) -> u8 {
    let clamped = value.clamp(0.0, 2.0);
    (255.0 * clamped.ln_1p() / 3.0f64.ln()).round() as u8
}

pub fn log_decode(code: u8) -> f64 {
    (f64::from(code) / 255.0 * 3.0f64.ln()).exp_m1()
}

/// The decoded audio row metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RowMetadata {
    /// One packed SBR word per subgroup.
    pub sbr_words: [u32; 2],
    /// Luma scale per subgroup.
    pub scale_y: [f32; 2],
    /// Chroma scale per subgroup and quadrant.
    pub scale_c: [[f32; 2]; 2],
    /// Log-encoded band factors per subgroup.
    pub band_factor_codes: [[u8; 4]; 2],
}

impl RowMetadata {
    /// The fallback used when a row's metadata cannot be recovered: unit
    /// scales, unit band factors, silent SBR.
    pub fn neutral() -> RowMetadata {
        RowMetadata {
            sbr_words: [0, 0],
            scale_y: [1.0, 1.0],
            scale_c: [[1.0, 1.0], [1.0, 1.0]],
            band_factor_codes: [[log_encode(1.0); 4], [log_encode(1.0); 4]],
        }
    }

    pub fn band_factor(&self, subgroup: usize, band: usize) -> f64 {
        log_decode(self.band_factor_codes[subgroup][band])
    }

    pub fn serialize(&self) -> [u8; ROW_META_BYTES] {
        let mut out = [0u8; ROW_META_BYTES];
        out[0..4].copy_from_slice(&self.sbr_words[0].to_be_bytes());
        out[4..8].copy_from_slice(&self.sbr_words[1].to_be_bytes());

        let scales = [
            self.scale_y[0],
            self.scale_y[1],
            self.scale_c[0][0],
            self.scale_c[0][1],
            self.scale_c[1][0],
            self.scale_c[1][1],
        ];
        for (i, &scale) in scales.iter().enumerate() {
            let half = float_to_half(scale);
            out[8 + 2 * i..10 + 2 * i].copy_from_slice(&half.to_le_bytes());
        }

        out[20..24].copy_from_slice(&self.band_factor_codes[0]);
        out[24..28].copy_from_slice(&self.band_factor_codes[1]);
        out
    }

    /// Deserializes recovered metadata bytes. Returns `None` when any scale
    /// is non-finite or non-positive, which callers treat as a whole-row
    /// fallback.
    pub fn deserialize(bytes: &[u8; ROW_META_BYTES]) -> Option<RowMetadata> {
        let word_a = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        let word_b = u32::from_be_bytes(bytes[4..8].try_into().unwrap());

        let mut scales = [0.0f32; 6];
        for (i, scale) in scales.iter_mut().enumerate() {
            let half = u16::from_le_bytes(bytes[8 + 2 * i..10 + 2 * i].try_into().unwrap());
            *scale = half_to_float(half);
            if !scale.is_finite() || *scale <= 0.0 {
                return None;
            }
        }

        Some(RowMetadata {
            sbr_words: [word_a, word_b],
            scale_y: [scales[0], scales[1]],
            scale_c: [[scales[2], scales[3]], [scales[4], scales[5]]],
            band_factor_codes: [
                bytes[20..24].try_into().unwrap(),
                bytes[24..28].try_into().unwrap(),
            ],
        })
    }
}

/// LDPC-encodes, whitens, and writes a row's metadata into its four trailing
/// blocks.
pub fn write_row_metadata(image: &mut PxfImage, block_row: usize, local_row: usize, meta: &RowMetadata) {
    let payload = meta.serialize();
    // The row metadata code is sized exactly for the 28-byte payload.
    let mut codeword = ldpc::row_meta_code().encode_bytes(&payload).unwrap();
    xor_whiten(&mut codeword, ROW_META_XOR_SEED_BASE.wrapping_add(local_row as u32));
    image.put_block_bits(block_row, DATA_BLOCKS_PER_ROW, &bits::unpack_msb(&codeword));
}

/// The outcome of reading one row's metadata.
pub struct RowMetadataRead {
    pub meta: RowMetadata,
    /// True when the row fell back to neutral defaults.
    pub fallback: bool,
    /// True when the OSD pass was needed.
    pub osd: bool,
}

/// Reads, soft-decodes, and deserializes a row's metadata, falling back to
/// neutral defaults when recovery fails.
pub fn read_row_metadata(data: &[u8], width: u32, block_row: usize, local_row: usize) -> RowMetadataRead {
    let levels = read_block_levels(data, width, block_row, DATA_BLOCKS_PER_ROW, META_BLOCKS_PER_ROW);

    let code = ldpc::row_meta_code();
    let mask = whiten_mask(ROW_META_XOR_SEED_BASE.wrapping_add(local_row as u32), code.n() / 8);

    let llr: Vec<f64> = levels
        .iter()
        .enumerate()
        .map(|(i, &level)| {
            let soft = LLR_1BIT_LUMA[level as usize];
            // Whitening is a known XOR mask: flip the LLR where the mask bit
            // is set.
            if mask[i / 8] >> (7 - i % 8) & 1 != 0 {
                -soft
            }
            else {
                soft
            }
        })
        .collect();

    let decoded = code.decode(&llr);

    if !decoded.corrected {
        log::warn!("row {} metadata did not converge, using neutral defaults", local_row);
        return RowMetadataRead { meta: RowMetadata::neutral(), fallback: true, osd: false };
    }

    let payload: [u8; ROW_META_BYTES] = decoded.bytes().try_into().unwrap();

    match RowMetadata::deserialize(&payload) {
        Some(meta) => RowMetadataRead { meta, fallback: false, osd: decoded.osd },
        None => {
            log::warn!("row {} metadata held non-finite fields, using neutral defaults", local_row);
            RowMetadataRead { meta: RowMetadata::neutral(), fallback: true, osd: decoded.osd }
        }
    }
}
