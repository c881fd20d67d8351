// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The binary row pipeline.
//!
//! A row carries 2480 payload bytes: LDPC parity is computed over the
//! sequential bytes, a CRC32-C guards the decoded result, and a seeded
//! Fisher-Yates permutation spreads the bytes across the row at two-bit-pair
//! granularity before they are written as Gray-coded luma symbols and
//! one-bit chroma symbols through the OBB map with companding disabled.

use pxf_core::checksum::Crc32c;
use pxf_core::rng::{shuffled_indices, XorShift128P};
use pxf_core::util::bits;

use crate::common::{
    BINARY_BLOCK_BYTES, BINARY_PERMUTATION_SEED, BINARY_ROW_BYTES, BINARY_ROW_PAIRS, BLOCK_DIM,
    DATA_BLOCKS_PER_ROW, META_BLOCKS_PER_ROW,
};
use crate::image::{pixel_rgb, read_block_levels, PxfImage};
use crate::ldpc;
use crate::obb;
use crate::row::{LLR_1BIT_CHROMA, LLR_1BIT_LUMA, LLR_2BIT_LSB, LLR_2BIT_MSB};

/// Gray-coded symbol values: 00 -> -1, 01 -> -1/3, 11 -> +1/3, 10 -> +1.
const GRAY_VALUES: [f64; 4] = [-1.0, -1.0 / 3.0, 1.0, 1.0 / 3.0];

/// Parity bytes stored per row (the code's N-K).
const PARITY_BYTES: usize = 28;

#[inline]
fn read_pair(bytes: &[u8], pair: usize) -> u8 {
    (bytes[pair / 4] >> (6 - 2 * (pair % 4))) & 0x3
}

#[inline]
fn write_pair(bytes: &mut [u8], pair: usize, value: u8) {
    bytes[pair / 4] |= (value & 0x3) << (6 - 2 * (pair % 4));
}

fn row_permutation(local_row: usize) -> Vec<u32> {
    let mut rng = XorShift128P::new(BINARY_PERMUTATION_SEED.wrapping_add(local_row as u32));
    shuffled_indices(&mut rng, BINARY_ROW_PAIRS)
}

/// Encodes one binary row. `row_bytes` must already be padded to the full
/// row length.
pub fn encode_row(row_bytes: &[u8], local_row: usize, image: &mut PxfImage, block_row: usize) {
    assert_eq!(row_bytes.len(), BINARY_ROW_BYTES);

    // Parity and CRC cover the sequential (unpermuted) bytes.
    let codeword = ldpc::binary_code().encode_bytes(row_bytes).unwrap();
    let parity = &codeword[BINARY_ROW_BYTES..BINARY_ROW_BYTES + PARITY_BYTES];
    let crc = Crc32c::of(row_bytes);

    let permutation = row_permutation(local_row);
    let mut permuted = vec![0u8; BINARY_ROW_BYTES];
    for (j, &src) in permutation.iter().enumerate() {
        write_pair(&mut permuted, j, read_pair(row_bytes, src as usize));
    }

    for block in 0..DATA_BLOCKS_PER_ROW {
        let payload = &permuted[block * BINARY_BLOCK_BYTES..(block + 1) * BINARY_BLOCK_BYTES];

        for py in 0..BLOCK_DIM {
            for px in 0..BLOCK_DIM {
                let symbol = py * BLOCK_DIM + px;
                let y = GRAY_VALUES[read_pair(payload, symbol) as usize];

                let chroma = (py / 2) * 4 + px / 2;
                let cb = if payload[16 + chroma / 8] >> (7 - chroma % 8) & 1 != 0 { 1.0 } else { -1.0 };
                let cr = if payload[18 + chroma / 8] >> (7 - chroma % 8) & 1 != 0 { 1.0 } else { -1.0 };

                let rgb = obb::encode_point([y, cb, cr], false);
                image.put_pixel(block * BLOCK_DIM + px, block_row * BLOCK_DIM + py, rgb);
            }
        }
    }

    let mut meta = [0u8; PARITY_BYTES + 4];
    meta[..PARITY_BYTES].copy_from_slice(parity);
    meta[PARITY_BYTES..].copy_from_slice(&crc.to_be_bytes());
    image.put_block_bits(block_row, DATA_BLOCKS_PER_ROW, &bits::unpack_msb(&meta));
}

/// The outcome of decoding one binary row.
pub struct BinaryRowDecode {
    pub bytes: Vec<u8>,
    pub crc_ok: bool,
    pub corrected: bool,
    pub osd: bool,
}

/// Soft-decodes one binary row from pixels.
pub fn decode_row(data: &[u8], width: u32, block_row: usize, local_row: usize) -> BinaryRowDecode {
    // Gather soft bits in permuted pair order.
    let mut permuted_llr = Vec::with_capacity(BINARY_ROW_PAIRS * 2);

    for block in 0..DATA_BLOCKS_PER_ROW {
        let mut cb_sum = [0.0f64; 16];
        let mut cr_sum = [0.0f64; 16];
        let mut y_llr = [0.0f64; 128];

        for py in 0..BLOCK_DIM {
            for px in 0..BLOCK_DIM {
                let rgb =
                    pixel_rgb(data, width, block * BLOCK_DIM + px, block_row * BLOCK_DIM + py);
                let point = obb::decode_pixel(rgb, false);

                let symbol = py * BLOCK_DIM + px;
                let level = point_level(point[0]);
                y_llr[2 * symbol] = LLR_2BIT_MSB[level];
                y_llr[2 * symbol + 1] = LLR_2BIT_LSB[level];

                let chroma = (py / 2) * 4 + px / 2;
                cb_sum[chroma] += point[1] * 0.25;
                cr_sum[chroma] += point[2] * 0.25;
            }
        }

        permuted_llr.extend_from_slice(&y_llr);
        for &v in &cb_sum {
            permuted_llr.push(LLR_1BIT_CHROMA[point_level(v)]);
        }
        for &v in &cr_sum {
            permuted_llr.push(LLR_1BIT_CHROMA[point_level(v)]);
        }
    }

    // Invert the pair permutation.
    let permutation = row_permutation(local_row);
    let mut data_llr = vec![0.0f64; BINARY_ROW_PAIRS * 2];
    for (j, &src) in permutation.iter().enumerate() {
        data_llr[2 * src as usize] = permuted_llr[2 * j];
        data_llr[2 * src as usize + 1] = permuted_llr[2 * j + 1];
    }

    // Parity LLRs and the stored CRC from the metadata blocks.
    let levels = read_block_levels(data, width, block_row, DATA_BLOCKS_PER_ROW, META_BLOCKS_PER_ROW);
    for &level in &levels[..PARITY_BYTES * 8] {
        data_llr.push(LLR_1BIT_LUMA[level as usize]);
    }

    let crc_bits: Vec<u8> = levels[PARITY_BYTES * 8..].iter().map(|&l| u8::from(l >= 128)).collect();
    let stored_crc = u32::from_be_bytes(bits::pack_msb(&crc_bits).try_into().unwrap());

    let decoded = ldpc::binary_code().decode(&data_llr);
    let bytes = decoded.bytes();

    let crc_ok = Crc32c::of(&bytes) == stored_crc;

    BinaryRowDecode { bytes, crc_ok, corrected: decoded.corrected, osd: decoded.osd }
}

/// Rescales an OBB point value in [-1, 1] to a 0..=255 lookup index.
#[inline]
fn point_level(value: f64) -> usize {
    ((value + 1.0) * 127.5).round().clamp(0.0, 255.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::IMAGE_WIDTH;

    fn test_payload() -> Vec<u8> {
        (0..BINARY_ROW_BYTES).map(|i| (i * 131 + 17) as u8).collect()
    }

    #[test]
    fn verify_pair_accessors() {
        let mut buf = [0u8; 2];
        write_pair(&mut buf, 0, 0b10);
        write_pair(&mut buf, 3, 0b01);
        write_pair(&mut buf, 4, 0b11);
        assert_eq!(buf, [0b10_00_00_01, 0b11_00_00_00]);
        assert_eq!(read_pair(&buf, 0), 0b10);
        assert_eq!(read_pair(&buf, 3), 0b01);
        assert_eq!(read_pair(&buf, 4), 0b11);
    }

    #[test]
    fn verify_permutation_differs_per_row() {
        assert_ne!(row_permutation(0), row_permutation(1));
        assert_eq!(row_permutation(3), row_permutation(3));
    }

    #[test]
    fn verify_clean_row_roundtrip() {
        let payload = test_payload();
        let mut image = PxfImage::new(24, "t.png".into());

        encode_row(&payload, 0, &mut image, 2);
        let decoded = decode_row(&image.data, IMAGE_WIDTH, 2, 0);

        assert!(decoded.corrected);
        assert!(decoded.crc_ok);
        assert_eq!(decoded.bytes, payload);
    }

    #[test]
    fn verify_roundtrip_survives_pixel_damage() {
        let payload = test_payload();
        let mut image = PxfImage::new(24, "t.png".into());
        encode_row(&payload, 4, &mut image, 2);

        // Trample two luma symbols in separate blocks.
        image.put_pixel(3, 17, [128, 128, 128]);
        image.put_pixel(900, 21, [128, 128, 128]);

        let decoded = decode_row(&image.data, IMAGE_WIDTH, 2, 4);
        assert!(decoded.crc_ok);
        assert_eq!(decoded.bytes, payload);
    }

    #[test]
    fn verify_wrong_row_index_breaks_crc() {
        let payload = test_payload();
        let mut image = PxfImage::new(24, "t.png".into());
        encode_row(&payload, 0, &mut image, 2);

        let decoded = decode_row(&image.data, IMAGE_WIDTH, 2, 1);
        assert!(!decoded.crc_ok);
    }
}
