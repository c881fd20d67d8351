// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mdct` module implements the Modified Discrete Cosine Transform (MDCT).
//!
//! The transform is evaluated in direct form against a precomputed basis. The
//! codec only ever uses the 128-bin (256-sample window) size, but the kernel
//! is generic over the bin count.

use std::f64;

/// N-bin MDCT and IMDCT over 2N-sample windows.
///
/// The forward transform maps `2N` windowed samples to `N` coefficients:
///
/// `X[k] = sum(x[n] * cos(PI * (k + 0.5) * (n + 0.5 + N/2) / N))`
///
/// The inverse is the transpose scaled by `2/N`. With a sine window and 50%
/// overlap-add this satisfies the Princen-Bradley condition, so consecutive
/// inverse transforms reconstruct the input exactly.
pub struct Mdct {
    num_bins: usize,
    basis: Vec<f64>,
}

impl Mdct {
    /// Instantiate an N-bin MDCT.
    pub fn new(num_bins: usize) -> Mdct {
        assert!(num_bins > 0);

        let n = num_bins as f64;
        let window_len = 2 * num_bins;

        let mut basis = vec![0.0; num_bins * window_len];

        for k in 0..num_bins {
            for i in 0..window_len {
                let phase = f64::consts::PI * (k as f64 + 0.5) * (i as f64 + 0.5 + n / 2.0) / n;
                basis[k * window_len + i] = phase.cos();
            }
        }

        Mdct { num_bins, basis }
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Performs the forward MDCT. The frame must contain `2N` windowed
    /// samples; `N` coefficients are written to `bins`.
    pub fn forward(&self, frame: &[f64], bins: &mut [f64]) {
        assert_eq!(frame.len(), 2 * self.num_bins);
        assert_eq!(bins.len(), self.num_bins);

        let window_len = 2 * self.num_bins;

        for (k, bin) in bins.iter_mut().enumerate() {
            let basis = &self.basis[k * window_len..(k + 1) * window_len];
            *bin = frame.iter().zip(basis).map(|(&x, &b)| x * b).sum();
        }
    }

    /// Performs the inverse MDCT, producing `2N` output samples that must be
    /// windowed and overlap-added by the caller.
    pub fn inverse(&self, bins: &[f64], frame: &mut [f64]) {
        assert_eq!(bins.len(), self.num_bins);
        assert_eq!(frame.len(), 2 * self.num_bins);

        let window_len = 2 * self.num_bins;
        let scale = 2.0 / self.num_bins as f64;

        frame.fill(0.0);

        for (k, &bin) in bins.iter().enumerate() {
            let basis = &self.basis[k * window_len..(k + 1) * window_len];
            for (out, &b) in frame.iter_mut().zip(basis) {
                *out += bin * b;
            }
        }

        for out in frame.iter_mut() {
            *out *= scale;
        }
    }
}
