// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Row-level SBR analysis.

use super::{
    pack_normal, pack_temporal, patch_source, BAND_WIDTH, NUM_BANDS, SBR_BASE_BIN, SBR_BINS,
};
use crate::common::{NUM_BINS, SILENCE_THRESHOLD, SUBGROUP_BLOCKS};

const ENERGY_FLOOR: f64 = 1e-24;

fn energy_db(e: f64) -> f64 {
    10.0 * e.max(ENERGY_FLOOR).log10()
}

/// Per-band energies of the target range over a span of blocks.
fn target_band_energies(spectra: &[[f64; NUM_BINS]]) -> [f64; NUM_BANDS] {
    let mut bands = [0.0; NUM_BANDS];
    for spectrum in spectra {
        for (b, band) in bands.iter_mut().enumerate() {
            for j in 0..BAND_WIDTH {
                let v = spectrum[SBR_BASE_BIN + b * BAND_WIDTH + j];
                *band += v * v;
            }
        }
    }
    bands
}

/// Per-band energies of the patch source range over a span of blocks.
fn source_band_energies(spectra: &[[f64; NUM_BINS]], patch_mode: u8) -> [f64; NUM_BANDS] {
    let mut bands = [0.0; NUM_BANDS];
    for spectrum in spectra {
        for j in 0..SBR_BINS {
            let v = spectrum[patch_source(patch_mode, j)];
            bands[j / BAND_WIDTH] += v * v;
        }
    }
    bands
}

/// Picks the patch mode whose source bands best track the target bands, by
/// minimum total per-band dB error.
fn pick_patch(spectra: &[[f64; NUM_BINS]]) -> (u8, [f64; NUM_BANDS], [f64; NUM_BANDS]) {
    let target = target_band_energies(spectra);

    let mut best: Option<(f64, u8, [f64; NUM_BANDS])> = None;
    for patch_mode in 0..4u8 {
        let source = source_band_energies(spectra, patch_mode);
        let error: f64 = (0..NUM_BANDS)
            .map(|b| (energy_db(target[b]) - energy_db(source[b])).abs())
            .sum();
        if best.is_none() || error < best.as_ref().unwrap().0 {
            best = Some((error, patch_mode, source));
        }
    }

    let (_, patch_mode, source) = best.unwrap();
    (patch_mode, target, source)
}

/// Overall high-band gain in dB for a span of blocks under a patch mode,
/// clamped to the representable range.
fn overall_gain_db(spectra: &[[f64; NUM_BINS]], patch_mode: u8) -> f64 {
    let target: f64 = target_band_energies(spectra).iter().sum();
    let source: f64 = source_band_energies(spectra, patch_mode).iter().sum();

    if source <= SILENCE_THRESHOLD * SILENCE_THRESHOLD {
        return -48.0;
    }
    (energy_db(target) - energy_db(source)).clamp(-48.0, 15.0)
}

/// Spectral flatness of the target band magnitudes: the ratio of geometric
/// to arithmetic mean, in [0, 1]. Silence is maximally flat.
fn target_flatness(spectra: &[[f64; NUM_BINS]]) -> f64 {
    let mut log_sum = 0.0;
    let mut sum = 0.0;
    let mut count = 0usize;

    for spectrum in spectra {
        for j in 0..SBR_BINS {
            let mag = spectrum[SBR_BASE_BIN + j].abs();
            if mag > SILENCE_THRESHOLD {
                log_sum += mag.ln();
                sum += mag;
                count += 1;
            }
        }
    }

    if count == 0 {
        return 1.0;
    }

    let geometric = (log_sum / count as f64).exp();
    let arithmetic = sum / count as f64;
    (geometric / arithmetic).clamp(0.0, 1.0)
}

/// Per-block high-band energy, for transient detection.
fn block_energies(spectra: &[[f64; NUM_BINS]]) -> Vec<f64> {
    spectra
        .iter()
        .map(|s| s[SBR_BASE_BIN..].iter().map(|v| v * v).sum())
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Classifies the subgroup's high-band envelope: 0 flat, 1 attack, 2 decay,
/// 3 impulse.
fn transient_shape(spectra: &[[f64; NUM_BINS]]) -> u32 {
    let energies = block_energies(spectra);
    let len = energies.len();

    let head = mean(&energies[..len / 8]);
    let tail = mean(&energies[len - len / 8..]);
    let mid = mean(&energies[3 * len / 8..5 * len / 8]);

    let floor = SILENCE_THRESHOLD * SILENCE_THRESHOLD;
    let rises = tail > 4.0 * head && tail > floor;
    let falls = head > 4.0 * tail && head > floor;

    if mid > 4.0 * (head + tail) && mid > floor {
        3
    }
    else if rises {
        1
    }
    else if falls {
        2
    }
    else {
        0
    }
}

fn quantize_band_env(target: &[f64; NUM_BANDS], source: &[f64; NUM_BANDS], gain_db: f64, step: f64, bias: f64, max: u32) -> [u32; NUM_BANDS] {
    let mut env = [0u32; NUM_BANDS];
    for (b, out) in env.iter_mut().enumerate() {
        let band_db = if source[b] > ENERGY_FLOOR {
            energy_db(target[b]) - energy_db(source[b])
        }
        else {
            -48.0
        };
        let offset = band_db - gain_db;
        *out = (((offset - bias) / step).round().max(0.0) as u32).min(max);
    }
    env
}

/// Analyzes one 62-block subgroup and returns its packed side-info word.
///
/// The synthesizer implements all four processing modes, but analysis always
/// emits mode 0; the measured envelopes already absorb the level differences
/// the other modes would shape.
pub fn analyze_subgroup(spectra: &[[f64; NUM_BINS]]) -> u32 {
    assert_eq!(spectra.len(), SUBGROUP_BLOCKS);

    let (patch_mode, target, _source) = pick_patch(spectra);

    let half_a = &spectra[..SUBGROUP_BLOCKS / 2];
    let half_b = &spectra[SUBGROUP_BLOCKS / 2..];

    let gain_a = overall_gain_db(half_a, patch_mode);
    let gain_b = overall_gain_db(half_b, patch_mode);

    let energy_a: f64 = target_band_energies(half_a).iter().sum();
    let energy_b: f64 = target_band_energies(half_b).iter().sum();
    let total = energy_a + energy_b;
    let variation = if total > ENERGY_FLOOR { (energy_a - energy_b).abs() / total } else { 0.0 };

    let flatness = target_flatness(spectra);
    let tonality = 1.0 - flatness;

    if (gain_a - gain_b).abs() > 4.0 || variation > 0.5 {
        // The halves diverge too much for a single envelope.
        let gain_idx_a = (((gain_a + 48.0) / 2.0).round().max(0.0) as u32).min(31);
        let gain_idx_b = (((gain_b + 48.0) / 2.0).round().max(0.0) as u32).min(31);

        let source = source_band_energies(spectra, patch_mode);
        let whole_gain = overall_gain_db(spectra, patch_mode);
        let env = quantize_band_env(&target, &source, whole_gain, 3.0, -4.5, 3);

        let noise = ((flatness * 3.0).round() as u32).min(3);
        let tonality_q = ((tonality * 3.0).round() as u32).min(3);

        let transient_a = transient_shape(half_a) == 3;
        let transient_b = transient_shape(half_b) == 3;

        pack_temporal(
            u32::from(patch_mode),
            0,
            tonality_q,
            env,
            [gain_idx_a, gain_idx_b],
            [noise, noise],
            [transient_a, transient_b],
        )
    }
    else {
        let gain_db = overall_gain_db(spectra, patch_mode);
        let gain_index = ((gain_db + 48.0).round().max(0.0) as u32).min(63);

        let source = source_band_energies(spectra, patch_mode);
        let quantized_gain = f64::from(gain_index) - 48.0;
        let env = quantize_band_env(&target, &source, quantized_gain, 2.0, -6.0, 7);

        let noise_floor = ((flatness * 15.0).round() as u32).min(15);
        let tonality_q = ((tonality * 7.0).round() as u32).min(7);
        let shape = transient_shape(spectra);

        pack_normal(gain_index, env, noise_floor, tonality_q, u32::from(patch_mode), 0, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbr::unpack;

    fn silent_subgroup() -> Vec<[f64; NUM_BINS]> {
        vec![[0.0; NUM_BINS]; SUBGROUP_BLOCKS]
    }

    #[test]
    fn verify_silence_analyzes_to_floor_gain() {
        let word = analyze_subgroup(&silent_subgroup());
        let params = unpack(word, 0);
        assert_eq!(params.hf_gain_db, -48.0);
        assert_eq!(params.proc_mode, 0);
    }

    #[test]
    fn verify_matched_band_gets_unity_gain() {
        // High band mirrors the adjacent band exactly, so the measured gain
        // is 0 dB under patch mode 0.
        let mut spectra = silent_subgroup();
        for spectrum in spectra.iter_mut() {
            for j in 0..SBR_BINS {
                let v = ((j * 13 + 5) % 7) as f64 * 0.11 + 0.1;
                spectrum[64 + j] = v;
                spectrum[SBR_BASE_BIN + j] = v;
            }
        }

        let word = analyze_subgroup(&spectra);
        let params = unpack(word, 10);
        assert_eq!(params.patch_mode, 0);
        assert!(params.hf_gain_db.abs() <= 1.0);
    }

    #[test]
    fn verify_divergent_halves_switch_to_temporal() {
        let mut spectra = silent_subgroup();
        for (i, spectrum) in spectra.iter_mut().enumerate() {
            let level = if i < SUBGROUP_BLOCKS / 2 { 1.0 } else { 0.01 };
            for j in 0..SBR_BINS {
                spectrum[64 + j] = 0.5;
                spectrum[SBR_BASE_BIN + j] = level;
            }
        }

        let word = analyze_subgroup(&spectra);
        assert_eq!(word & 1, 1, "expected temporal mode");

        let a = unpack(word, 0);
        let b = unpack(word, 40);
        assert!(a.hf_gain_db > b.hf_gain_db);
    }
}
