// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Block-level SBR synthesis.

use super::{
    noise_sample, patch_source, unpack, BAND_WIDTH, NUM_BANDS, SBR_BASE_BIN, SBR_BINS,
};
use crate::common::{NUM_BINS, SILENCE_THRESHOLD};

const ENERGY_FLOOR: f64 = 1e-24;

/// Gain contour control points: the junction anchor just below the
/// reconstructed range, then one anchor per envelope band center.
const CONTOUR_X: [f64; 5] = [95.5, 99.5, 107.5, 115.5, 123.5];

fn energy_db(e: f64) -> f64 {
    10.0 * e.max(ENERGY_FLOOR).log10()
}

fn interpolate_gain(contour_y: &[f64; 5], x: f64) -> f64 {
    if x <= CONTOUR_X[0] {
        return contour_y[0];
    }
    if x >= CONTOUR_X[4] {
        return contour_y[4];
    }
    for i in 0..4 {
        if x <= CONTOUR_X[i + 1] {
            let f = (x - CONTOUR_X[i]) / (CONTOUR_X[i + 1] - CONTOUR_X[i]);
            return contour_y[i] * (1.0 - f) + contour_y[i + 1] * f;
        }
    }
    contour_y[4]
}

/// Reconstructs bins 96..128 of one block from its stored bins and the
/// subgroup side-info word. `block_pos` is the block's position within the
/// subgroup; `seed` decorrelates the noise component across blocks and
/// channels.
pub fn synthesize_block(bins: &mut [f64; NUM_BINS], word: u32, block_pos: usize, seed: u32) {
    let params = unpack(word, block_pos);

    let band_gain: [f64; NUM_BANDS] = {
        let mut g = [0.0; NUM_BANDS];
        for (b, gain) in g.iter_mut().enumerate() {
            *gain = params.hf_gain_db + params.band_env_db[b];
        }
        g
    };

    // Junction gain: either anchored to the first band, or measured so the
    // contour continues the level of the top stored bins.
    let junction = {
        let low_energy: f64 = (88..96).map(|i| bins[i] * bins[i]).sum();
        let source_energy: f64 = (0..BAND_WIDTH)
            .map(|j| {
                let v = bins[patch_source(params.patch_mode, j)];
                v * v
            })
            .sum();

        if params.patch_mode == 3 || source_energy <= SILENCE_THRESHOLD * SILENCE_THRESHOLD {
            band_gain[0]
        }
        else {
            let measured = energy_db(low_energy) - energy_db(source_energy);
            measured.clamp(band_gain[0] - 6.0, band_gain[0] + 6.0)
        }
    };

    let contour_y = [junction, band_gain[0], band_gain[1], band_gain[2], band_gain[3]];

    let noise_ratio = params.noise_ratio;
    let tone_ratio = 1.0 - noise_ratio;
    let w_tonal = (params.tonality * tone_ratio).sqrt();
    let w_noisy = ((1.0 - params.tonality) * tone_ratio + noise_ratio).sqrt();

    // Per-band source RMS is the reference amplitude for the noise component,
    // so silent source bands synthesize silence.
    let mut band_rms: [f64; NUM_BANDS] = [0.0; NUM_BANDS];
    let mut band_peak: [f64; NUM_BANDS] = [0.0; NUM_BANDS];
    for (b, (rms, peak)) in band_rms.iter_mut().zip(band_peak.iter_mut()).enumerate() {
        let mut energy = 0.0;
        for j in 0..BAND_WIDTH {
            let v = bins[patch_source(params.patch_mode, b * BAND_WIDTH + j)];
            energy += v * v;
            *peak = peak.max(v.abs());
        }
        *rms = (energy / BAND_WIDTH as f64).sqrt();
    }

    for j in 0..SBR_BINS {
        let k = SBR_BASE_BIN + j;
        let band = j / BAND_WIDTH;
        let source = bins[patch_source(params.patch_mode, j)];

        let tonal = match params.proc_mode {
            // Harmonic: cubic shaping of the value normalized to the band peak.
            2 if band_peak[band] > SILENCE_THRESHOLD => {
                let normalized = source / band_peak[band];
                normalized * normalized * normalized * band_peak[band]
            }
            // Inverse: negate odd-indexed bins.
            3 if j % 2 == 1 => -source,
            _ => source,
        };

        let noise = noise_sample(seed, k) * band_rms[band];

        let mixed = if params.proc_mode == 1 {
            // Transient: noise fills in only where the source is silent.
            if source.abs() < SILENCE_THRESHOLD {
                w_noisy * noise
            }
            else {
                w_tonal * tonal
            }
        }
        else {
            w_tonal * tonal + w_noisy * noise
        };

        let gain_db = interpolate_gain(&contour_y, k as f64);
        bins[k] = mixed * 10.0f64.powf(gain_db / 20.0) * params.shape;
    }
}
