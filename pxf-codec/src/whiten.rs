// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `whiten` module flattens the stored MDCT spectrum.
//!
//! A reference table of mean coefficient magnitudes, measured at 32 kHz,
//! anchors the profile. For other sample rates the per-bin average is read at
//! the bin-center frequency by linear interpolation, falling back to the
//! fitted power-law tail above the table range. The encoder divides stored
//! bins by the profile, the decoder multiplies.

use crate::common::STORED_BINS;

/// Reference sample rate of the measurement table.
const REF_SAMPLE_RATE: f64 = 32000.0;

/// Frequency step between reference table entries.
const REF_HZ_PER_BIN: f64 = REF_SAMPLE_RATE / 256.0;

/// Power-law tail fit `A * f^-P` used above the table range.
const TAIL_A: f64 = 8.432e7;
const TAIL_P: f64 = 2.1414;

const PROFILE_FLOOR: f64 = 1e-12;

/// Mean `|MDCT|` magnitudes over the 96 stored bins at 32 kHz.
#[rustfmt::skip]
const WHITEN_REF_32K: [f64; STORED_BINS] = [
    3.174904e+01, 3.174904e+01, 3.174904e+01, 3.174904e+01,
    3.174904e+01, 3.174904e+01, 3.174904e+01, 3.174904e+01,
    2.788366e+01, 2.197405e+01, 1.773506e+01, 1.459584e+01,
    1.220912e+01, 1.035406e+01, 8.884931e+00, 7.702491e+00,
    6.737323e+00, 5.939718e+00, 5.273342e+00, 4.711155e+00,
    4.232703e+00, 3.822291e+00, 3.467719e+00, 3.159387e+00,
    2.889663e+00, 2.652420e+00, 2.442692e+00, 2.256423e+00,
    2.090272e+00, 1.941470e+00, 1.807706e+00, 1.687040e+00,
    1.577831e+00, 1.478688e+00, 1.388423e+00, 1.306016e+00,
    1.230590e+00, 1.161387e+00, 1.097746e+00, 1.039093e+00,
    9.849253e-01, 9.348013e-01, 8.883323e-01, 8.451749e-01,
    8.050250e-01, 7.676122e-01, 7.326959e-01, 7.000609e-01,
    6.695147e-01, 6.408847e-01, 6.140155e-01, 5.887670e-01,
    5.650129e-01, 5.426386e-01, 5.215405e-01, 5.016242e-01,
    4.828041e-01, 4.650019e-01, 4.481464e-01, 4.321722e-01,
    4.170197e-01, 4.026339e-01, 3.889646e-01, 3.759654e-01,
    3.635937e-01, 3.518102e-01, 3.405785e-01, 3.298651e-01,
    3.196390e-01, 3.098712e-01, 3.005352e-01, 2.916061e-01,
    2.830608e-01, 2.748779e-01, 2.670374e-01, 2.595206e-01,
    2.523103e-01, 2.453900e-01, 2.387446e-01, 2.323600e-01,
    2.262227e-01, 2.203203e-01, 2.146412e-01, 2.091742e-01,
    2.039091e-01, 1.988361e-01, 1.939462e-01, 1.892306e-01,
    1.846814e-01, 1.802908e-01, 1.760517e-01, 1.719572e-01,
    1.680009e-01, 1.641767e-01, 1.604789e-01, 1.569019e-01,
];

/// Per-sample-rate whitening profile over the 96 stored bins.
pub struct WhiteningProfile {
    avg: [f64; STORED_BINS],
}

impl WhiteningProfile {
    pub fn new(sample_rate: u32) -> WhiteningProfile {
        let mut avg = [0.0f64; STORED_BINS];

        for (k, entry) in avg.iter_mut().enumerate() {
            let freq = (k as f64 + 0.5) * f64::from(sample_rate) / 256.0;
            let pos = freq / REF_HZ_PER_BIN - 0.5;

            let value = if pos <= 0.0 {
                WHITEN_REF_32K[0]
            }
            else if pos < (STORED_BINS - 1) as f64 {
                let i = pos as usize;
                let frac = pos - i as f64;
                WHITEN_REF_32K[i] * (1.0 - frac) + WHITEN_REF_32K[i + 1] * frac
            }
            else {
                TAIL_A * freq.powf(-TAIL_P)
            };

            *entry = value.max(PROFILE_FLOOR);
        }

        WhiteningProfile { avg }
    }

    /// The mean magnitude at stored bin `k`.
    pub fn avg(&self, k: usize) -> f64 {
        self.avg[k]
    }

    /// Divides the stored bins by the profile (encoder direction).
    pub fn apply(&self, bins: &mut [f64]) {
        for (bin, &avg) in bins.iter_mut().zip(self.avg.iter()) {
            *bin /= avg;
        }
    }

    /// Multiplies the stored bins by the profile (decoder direction).
    pub fn remove(&self, bins: &mut [f64]) {
        for (bin, &avg) in bins.iter_mut().zip(self.avg.iter()) {
            *bin *= avg;
        }
    }
}
