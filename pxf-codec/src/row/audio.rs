// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The audio row pipeline.
//!
//! Encode: window and MDCT each of the row's 124 blocks, analyze SBR, whiten
//! the stored bins, normalize with per-band factors, map the bins through the
//! zigzag scans into 8x8 luma and 4x4 chroma coefficient blocks, inverse-DCT
//! to spatial form, scale into the unit cube, and write OBB pixels. Decode
//! reverses each step, compensating the chroma scales for the attenuation the
//! 8-bit RGB round trip introduces.

use pxf_core::dsp::dct::Dct2d;
use pxf_core::dsp::half::{float_to_half, half_to_float, F16_MAX};
use pxf_core::dsp::mdct::Mdct;
use pxf_core::dsp::window::sine_window;

use crate::common::{
    DATA_BLOCKS_PER_ROW, BLOCK_DIM, HOP, LUMA_BINS, NUM_BINS, QUADRANT_BLOCKS, SILENCE_THRESHOLD,
    STORED_BINS, SUBGROUP_BLOCKS, WINDOW_LEN, ZIGZAG_4X4_FLAT, ZIGZAG_8X8_FLAT,
};
use crate::image::{pixel_rgb, PxfImage};
use crate::obb;
use crate::row::{log_decode, log_encode, RowMetadata};
use crate::sbr;
use crate::whiten::WhiteningProfile;

/// Bins per band-factor band.
const BAND_BINS: usize = LUMA_BINS / 4;

/// Spatial representation of one block: 8x8 luma and two 4x4 chroma planes.
#[derive(Clone, Copy)]
struct SpatialBlock {
    y: [f64; 64],
    cb: [f64; 16],
    cr: [f64; 16],
}

impl SpatialBlock {
    fn zeroed() -> SpatialBlock {
        SpatialBlock { y: [0.0; 64], cb: [0.0; 16], cr: [0.0; 16] }
    }
}

/// Context needed to derive the deterministic SBR noise seed for a block.
#[derive(Clone, Copy, Debug)]
pub struct NoiseContext {
    pub salt: u32,
    pub chunk_index: u32,
    pub channel_mode: u8,
}

impl NoiseContext {
    fn seed(&self, local_block: u32) -> u32 {
        self.salt ^ self.chunk_index ^ local_block ^ u32::from(self.channel_mode)
    }
}

/// Reusable state for encoding and decoding audio rows at one sample rate.
pub struct AudioRowCodec {
    mdct: Mdct,
    dct8: Dct2d,
    dct4: Dct2d,
    window: Vec<f64>,
    whiten: WhiteningProfile,
    frame: Vec<f64>,
}

impl AudioRowCodec {
    pub fn new(sample_rate: u32) -> AudioRowCodec {
        AudioRowCodec {
            mdct: Mdct::new(NUM_BINS),
            dct8: Dct2d::new(8),
            dct4: Dct2d::new(4),
            window: sine_window(WINDOW_LEN),
            whiten: WhiteningProfile::new(sample_rate),
            frame: vec![0.0; WINDOW_LEN],
        }
    }

    /// Windows the samples of global block `g` and produces its MDCT
    /// spectrum. Block `g` covers samples `[(g-1)*HOP, (g+1)*HOP)`; out of
    /// range positions read as silence.
    pub fn block_spectrum(&mut self, samples: &[f32], block: u64, bins: &mut [f64; NUM_BINS]) {
        let start = block as i64 * HOP as i64 - HOP as i64;
        for (n, value) in self.frame.iter_mut().enumerate() {
            let at = start + n as i64;
            let sample = if at >= 0 && (at as usize) < samples.len() {
                f64::from(samples[at as usize])
            }
            else {
                0.0
            };
            *value = sample * self.window[n];
        }
        self.mdct.forward(&self.frame, bins);
    }

    /// Encodes one full data row. `row_first_block` is the global index of
    /// the row's first block within the channel's block stream.
    pub fn encode_row(
        &mut self,
        samples: &[f32],
        row_first_block: u64,
        image: &mut PxfImage,
        block_row: usize,
    ) -> RowMetadata {
        // 1. Forward MDCT of every block in the row.
        let mut spectra = vec![[0.0f64; NUM_BINS]; DATA_BLOCKS_PER_ROW];
        for (b, spectrum) in spectra.iter_mut().enumerate() {
            self.block_spectrum(samples, row_first_block + b as u64, spectrum);
        }

        // 2. SBR side info comes from the unmodified spectra.
        let sbr_words = [
            sbr::analyze_subgroup(&spectra[..SUBGROUP_BLOCKS]),
            sbr::analyze_subgroup(&spectra[SUBGROUP_BLOCKS..]),
        ];

        // 3. Flatten the stored bins.
        for spectrum in spectra.iter_mut() {
            self.whiten.apply(&mut spectrum[..STORED_BINS]);
        }

        // 4. Per-subgroup band normalization of the luma bins. The encoder
        // applies the quantized factor so the decoder inverts it exactly.
        let mut band_factor_codes = [[0u8; 4]; 2];
        for subgroup in 0..2 {
            let blocks = &mut spectra[subgroup * SUBGROUP_BLOCKS..(subgroup + 1) * SUBGROUP_BLOCKS];
            for band in 0..4 {
                let mut max = 0.0f64;
                for spectrum in blocks.iter() {
                    for k in band * BAND_BINS..(band + 1) * BAND_BINS {
                        max = max.max(spectrum[k].abs());
                    }
                }

                let code = if max < SILENCE_THRESHOLD {
                    log_encode(1.0)
                }
                else {
                    log_encode((1.0 / max).min(2.0))
                };
                band_factor_codes[subgroup][band] = code;

                let factor = log_decode(code);
                for spectrum in blocks.iter_mut() {
                    for k in band * BAND_BINS..(band + 1) * BAND_BINS {
                        spectrum[k] *= factor;
                    }
                }
            }
        }

        // 5/6. Zigzag the bins into coefficient blocks and go spatial.
        let mut spatial = vec![SpatialBlock::zeroed(); DATA_BLOCKS_PER_ROW];
        let mut coef8 = [0.0f64; 64];
        let mut coef4 = [0.0f64; 16];
        for (spectrum, out) in spectra.iter().zip(spatial.iter_mut()) {
            coef8.fill(0.0);
            for (i, &flat) in ZIGZAG_8X8_FLAT.iter().enumerate() {
                coef8[flat] = spectrum[i];
            }
            self.dct8.inverse(&coef8, &mut out.y);

            coef4.fill(0.0);
            for (i, &flat) in ZIGZAG_4X4_FLAT.iter().enumerate() {
                coef4[flat] = spectrum[LUMA_BINS + 2 * i];
            }
            self.dct4.inverse(&coef4, &mut out.cb);

            coef4.fill(0.0);
            for (i, &flat) in ZIGZAG_4X4_FLAT.iter().enumerate() {
                coef4[flat] = spectrum[LUMA_BINS + 2 * i + 1];
            }
            self.dct4.inverse(&coef4, &mut out.cr);
        }

        // 7. Row scales: luma per subgroup, chroma per subgroup quadrant.
        let mut scale_y = [0.0f32; 2];
        for subgroup in 0..2 {
            let blocks = &spatial[subgroup * SUBGROUP_BLOCKS..(subgroup + 1) * SUBGROUP_BLOCKS];
            let max = blocks
                .iter()
                .flat_map(|b| b.y.iter())
                .fold(0.0f64, |m, &v| m.max(v.abs()));
            scale_y[subgroup] = quantize_scale(max);
        }

        let mut scale_c = [[0.0f32; 2]; 2];
        for subgroup in 0..2 {
            for quadrant in 0..2 {
                let at = subgroup * SUBGROUP_BLOCKS + quadrant * QUADRANT_BLOCKS;
                let blocks = &spatial[at..at + QUADRANT_BLOCKS];
                let max = blocks
                    .iter()
                    .flat_map(|b| b.cb.iter().chain(b.cr.iter()))
                    .fold(0.0f64, |m, &v| m.max(v.abs()));
                scale_c[subgroup][quadrant] = quantize_scale(max);
            }
        }

        // 8. Scale into the unit cube and write OBB pixels; 4x4 chroma is
        // nearest-neighbour upsampled over each 2x2 luma cell.
        for (b, block) in spatial.iter().enumerate() {
            let subgroup = b / SUBGROUP_BLOCKS;
            let quadrant = (b % SUBGROUP_BLOCKS) / QUADRANT_BLOCKS;

            let sy = f64::from(scale_y[subgroup]);
            let sc = f64::from(scale_c[subgroup][quadrant]);
            let y_silent = is_silence_sentinel(scale_y[subgroup]);
            let c_silent = is_silence_sentinel(scale_c[subgroup][quadrant]);

            for py in 0..BLOCK_DIM {
                for px in 0..BLOCK_DIM {
                    let chroma_at = (py / 2) * 4 + px / 2;
                    let point = [
                        if y_silent { 0.0 } else { block.y[py * BLOCK_DIM + px] * sy },
                        if c_silent { 0.0 } else { block.cb[chroma_at] * sc },
                        if c_silent { 0.0 } else { block.cr[chroma_at] * sc },
                    ];
                    let rgb = obb::encode_point(point, true);
                    image.put_pixel(b * BLOCK_DIM + px, block_row * BLOCK_DIM + py, rgb);
                }
            }
        }

        RowMetadata { sbr_words, scale_y, scale_c, band_factor_codes }
    }

    /// Decodes one full data row back into per-block MDCT spectra.
    /// `row_block_base` is the data-block index of the row's first block
    /// within its image, used for the SBR noise seed.
    pub fn decode_row(
        &mut self,
        data: &[u8],
        width: u32,
        block_row: usize,
        meta: &RowMetadata,
        noise: &NoiseContext,
        row_block_base: u32,
    ) -> Vec<[f64; NUM_BINS]> {
        // Recover the spatial planes; chroma averages its 2x2 pixel cell.
        let mut spatial = vec![SpatialBlock::zeroed(); DATA_BLOCKS_PER_ROW];
        for (b, block) in spatial.iter_mut().enumerate() {
            for py in 0..BLOCK_DIM {
                for px in 0..BLOCK_DIM {
                    let rgb =
                        pixel_rgb(data, width, b * BLOCK_DIM + px, block_row * BLOCK_DIM + py);
                    let point = obb::decode_pixel(rgb, true);

                    block.y[py * BLOCK_DIM + px] = point[0];
                    let chroma_at = (py / 2) * 4 + px / 2;
                    block.cb[chroma_at] += point[1] * 0.25;
                    block.cr[chroma_at] += point[2] * 0.25;
                }
            }
        }

        // The RGB round trip attenuates chroma; measure the surviving
        // maximum per quadrant and fold it into the stored scale.
        let mut chroma_comp = [[1.0f64; 2]; 2];
        for subgroup in 0..2 {
            for quadrant in 0..2 {
                let at = subgroup * SUBGROUP_BLOCKS + quadrant * QUADRANT_BLOCKS;
                let max = spatial[at..at + QUADRANT_BLOCKS]
                    .iter()
                    .flat_map(|b| b.cb.iter().chain(b.cr.iter()))
                    .fold(0.0f64, |m, &v| m.max(v.abs()));
                chroma_comp[subgroup][quadrant] = if max > SILENCE_THRESHOLD { max } else { 1.0 };
            }
        }

        let mut spectra = vec![[0.0f64; NUM_BINS]; DATA_BLOCKS_PER_ROW];
        let mut coef8 = [0.0f64; 64];
        let mut coef4cb = [0.0f64; 16];
        let mut coef4cr = [0.0f64; 16];
        let mut plane8 = [0.0f64; 64];
        let mut plane4 = [0.0f64; 16];

        for (b, (block, spectrum)) in spatial.iter().zip(spectra.iter_mut()).enumerate() {
            let subgroup = b / SUBGROUP_BLOCKS;
            let quadrant = (b % SUBGROUP_BLOCKS) / QUADRANT_BLOCKS;

            let sy = meta.scale_y[subgroup];
            let sc = meta.scale_c[subgroup][quadrant];

            if is_silence_sentinel(sy) {
                plane8.fill(0.0);
            }
            else {
                for (out, &v) in plane8.iter_mut().zip(block.y.iter()) {
                    *out = v / f64::from(sy);
                }
            }
            self.dct8.forward(&plane8, &mut coef8);

            if is_silence_sentinel(sc) {
                coef4cb.fill(0.0);
                coef4cr.fill(0.0);
            }
            else {
                let effective = f64::from(sc) * chroma_comp[subgroup][quadrant];
                for (out, &v) in plane4.iter_mut().zip(block.cb.iter()) {
                    *out = v / effective;
                }
                self.dct4.forward(&plane4, &mut coef4cb);
                for (out, &v) in plane4.iter_mut().zip(block.cr.iter()) {
                    *out = v / effective;
                }
                self.dct4.forward(&plane4, &mut coef4cr);
            }

            for (i, &flat) in ZIGZAG_8X8_FLAT.iter().enumerate() {
                spectrum[i] = coef8[flat];
            }
            for (i, &flat) in ZIGZAG_4X4_FLAT.iter().enumerate() {
                spectrum[LUMA_BINS + 2 * i] = coef4cb[flat];
                spectrum[LUMA_BINS + 2 * i + 1] = coef4cr[flat];
            }

            // Undo band normalization and whitening, then rebuild the top
            // bins from the SBR side info.
            for band in 0..4 {
                let factor = meta.band_factor(subgroup, band);
                if factor > SILENCE_THRESHOLD {
                    for k in band * BAND_BINS..(band + 1) * BAND_BINS {
                        spectrum[k] /= factor;
                    }
                }
            }

            self.whiten.remove(&mut spectrum[..STORED_BINS]);

            let seed = noise.seed(row_block_base + b as u32);
            sbr::synthesize_block(spectrum, meta.sbr_words[subgroup], b % SUBGROUP_BLOCKS, seed);
        }

        spectra
    }

    /// Inverse-transforms one block's spectrum into its windowed 256-sample
    /// frame.
    pub fn synthesize_frame(&mut self, bins: &[f64; NUM_BINS], frame: &mut [f64]) {
        self.mdct.inverse(bins, frame);
        for (value, &w) in frame.iter_mut().zip(self.window.iter()) {
            *value *= w;
        }
    }
}

/// Quantizes a reciprocal scale into binary16, reserving the maximum finite
/// value as the silence sentinel.
fn quantize_scale(max_abs: f64) -> f32 {
    if max_abs < SILENCE_THRESHOLD {
        return F16_MAX as f32;
    }

    let scale = (1.0 / max_abs).min(F16_MAX) as f32;
    let mut half = float_to_half(scale);
    if half == 0x7BFF && max_abs >= SILENCE_THRESHOLD {
        // Non-silent content must not collide with the sentinel.
        half = 0x7BFE;
    }
    half_to_float(half)
}

/// True when a stored scale marks its region as silent.
fn is_silence_sentinel(scale: f32) -> bool {
    f64::from(scale) >= F16_MAX
}
