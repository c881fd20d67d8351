// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `image` module provides the RGBA buffer type emitted by the encoder
//! and block-level pixel access shared by both pipelines.

use crate::common::{BLOCK_DIM, IMAGE_WIDTH};

/// An encoded RGBA image. Alpha is always 255. Ownership passes to the
/// caller on emission; the decoder never mutates image data.
pub struct PxfImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub name: String,
}

impl PxfImage {
    /// Creates a black, fully opaque image of the fixed wire width.
    pub fn new(height: u32, name: String) -> PxfImage {
        debug_assert!(height % BLOCK_DIM as u32 == 0);

        let mut data = vec![0u8; (IMAGE_WIDTH * height * 4) as usize];
        for pixel in data.chunks_exact_mut(4) {
            pixel[3] = 255;
        }

        PxfImage { data, width: IMAGE_WIDTH, height, name }
    }

    pub fn block_rows(&self) -> usize {
        self.height as usize / BLOCK_DIM
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let at = (y * self.width as usize + x) * 4;
        self.data[at] = rgb[0];
        self.data[at + 1] = rgb[1];
        self.data[at + 2] = rgb[2];
        self.data[at + 3] = 255;
    }

    /// Writes one bit per pixel into consecutive blocks of a block-row,
    /// starting at `block_col`. Within a block, bits fill raster order; bit 1
    /// is white.
    pub fn put_block_bits(&mut self, block_row: usize, block_col: usize, bits: &[u8]) {
        debug_assert!(bits.len() % (BLOCK_DIM * BLOCK_DIM) == 0);

        for (i, &bit) in bits.iter().enumerate() {
            let block = block_col + i / (BLOCK_DIM * BLOCK_DIM);
            let within = i % (BLOCK_DIM * BLOCK_DIM);
            let x = block * BLOCK_DIM + within % BLOCK_DIM;
            let y = block_row * BLOCK_DIM + within / BLOCK_DIM;
            let level = if bit != 0 { 255 } else { 0 };
            self.put_pixel(x, y, [level, level, level]);
        }
    }

    /// Borrows this image as a decoder source.
    pub fn as_source(&self) -> crate::decoder::SourceImage<'_> {
        crate::decoder::SourceImage { data: &self.data, width: self.width, height: self.height }
    }
}

/// Reads the RGB triple at a pixel of a caller-owned RGBA buffer.
#[inline]
pub fn pixel_rgb(data: &[u8], width: u32, x: usize, y: usize) -> [u8; 3] {
    let at = (y * width as usize + x) * 4;
    [data[at], data[at + 1], data[at + 2]]
}

/// BT.601 luma of a pixel, rounded to [0, 255]. The 1-bit-per-pixel regions
/// are written as pure black or white, but a lossy transport may tint them.
#[inline]
pub fn pixel_luma(data: &[u8], width: u32, x: usize, y: usize) -> u8 {
    let [r, g, b] = pixel_rgb(data, width, x, y);
    let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    luma.round().clamp(0.0, 255.0) as u8
}

/// Reads back the 1-bit-per-pixel luma levels of consecutive blocks of a
/// block-row, in the same order `put_block_bits` writes them.
pub fn read_block_levels(
    data: &[u8],
    width: u32,
    block_row: usize,
    block_col: usize,
    num_blocks: usize,
) -> Vec<u8> {
    let mut levels = Vec::with_capacity(num_blocks * BLOCK_DIM * BLOCK_DIM);
    for block in 0..num_blocks {
        for within in 0..BLOCK_DIM * BLOCK_DIM {
            let x = (block_col + block) * BLOCK_DIM + within % BLOCK_DIM;
            let y = block_row * BLOCK_DIM + within / BLOCK_DIM;
            levels.push(pixel_luma(data, width, x, y));
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BLOCKS_PER_ROW;
    use pxf_core::util::bits;

    #[test]
    fn verify_new_image_is_opaque_black() {
        let image = PxfImage::new(24, "t.png".into());
        assert_eq!(image.data.len(), 1024 * 24 * 4);
        assert_eq!(&image.data[..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn verify_block_bits_roundtrip() {
        let mut image = PxfImage::new(24, "t.png".into());
        let bytes: Vec<u8> = (0u16..64).map(|i| (i * 37 + 11) as u8).collect();
        let written = bits::unpack_msb(&bytes);

        image.put_block_bits(1, 3, &written);

        let levels = read_block_levels(&image.data, image.width, 1, 3, 8);
        let read: Vec<u8> = levels.iter().map(|&l| u8::from(l >= 128)).collect();
        assert_eq!(read, written);
        assert_eq!(bits::pack_msb(&read), bytes);
    }

    #[test]
    fn verify_blocks_do_not_overlap() {
        let mut image = PxfImage::new(24, "t.png".into());
        let ones = vec![1u8; BLOCK_DIM * BLOCK_DIM];
        image.put_block_bits(0, BLOCKS_PER_ROW - 1, &ones);

        // Neighbouring block must stay untouched.
        let neighbour = read_block_levels(&image.data, image.width, 0, BLOCKS_PER_ROW - 2, 1);
        assert!(neighbour.iter().all(|&l| l == 0));
    }
}
