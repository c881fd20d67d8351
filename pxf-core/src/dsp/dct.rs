// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dct` module implements the separable two-dimensional Discrete Cosine Transform.
//!
//! The forward transform is an orthonormal type-II DCT applied along both
//! axes; the inverse is the corresponding type-III transform. Only the small
//! fixed sizes used for block coefficient mapping (8x8 and 4x4) are needed,
//! so the transforms are evaluated in direct form.

use std::f64;

/// NxN orthonormal 2D DCT (type-II forward, type-III inverse).
pub struct Dct2d {
    n: usize,
    basis: Vec<f64>,
    scratch: Vec<f64>,
}

impl Dct2d {
    pub fn new(n: usize) -> Dct2d {
        assert!(n > 0);

        let mut basis = vec![0.0; n * n];
        let norm = (2.0 / n as f64).sqrt();

        for k in 0..n {
            let scale = if k == 0 { norm / f64::consts::SQRT_2 } else { norm };
            for i in 0..n {
                basis[k * n + i] =
                    scale * (f64::consts::PI * (i as f64 + 0.5) * k as f64 / n as f64).cos();
            }
        }

        Dct2d { n, basis, scratch: vec![0.0; n * n] }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    /// Transforms an NxN spatial block (row-major) into NxN coefficients.
    pub fn forward(&mut self, src: &[f64], dst: &mut [f64]) {
        let n = self.n;
        assert_eq!(src.len(), n * n);
        assert_eq!(dst.len(), n * n);

        // Rows first: scratch[r][l] = sum_c basis[l][c] * src[r][c].
        for r in 0..n {
            for l in 0..n {
                let mut acc = 0.0;
                for c in 0..n {
                    acc += self.basis[l * n + c] * src[r * n + c];
                }
                self.scratch[r * n + l] = acc;
            }
        }

        // Then columns: dst[k][l] = sum_r basis[k][r] * scratch[r][l].
        for k in 0..n {
            for l in 0..n {
                let mut acc = 0.0;
                for r in 0..n {
                    acc += self.basis[k * n + r] * self.scratch[r * n + l];
                }
                dst[k * n + l] = acc;
            }
        }
    }

    /// Transforms NxN coefficients back into an NxN spatial block.
    pub fn inverse(&mut self, src: &[f64], dst: &mut [f64]) {
        let n = self.n;
        assert_eq!(src.len(), n * n);
        assert_eq!(dst.len(), n * n);

        // Columns first: scratch[k][c] = sum_l basis[l][c] * src[k][l].
        for k in 0..n {
            for c in 0..n {
                let mut acc = 0.0;
                for l in 0..n {
                    acc += self.basis[l * n + c] * src[k * n + l];
                }
                self.scratch[k * n + c] = acc;
            }
        }

        // Then rows: dst[r][c] = sum_k basis[k][r] * scratch[k][c].
        for r in 0..n {
            for c in 0..n {
                let mut acc = 0.0;
                for k in 0..n {
                    acc += self.basis[k * n + r] * self.scratch[k * n + c];
                }
                dst[r * n + c] = acc;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(n: usize) {
        let mut dct = Dct2d::new(n);
        let src: Vec<f64> = (0..n * n).map(|i| ((i * 31 + 7) % 17) as f64 * 0.11 - 0.9).collect();
        let mut coef = vec![0.0; n * n];
        let mut back = vec![0.0; n * n];

        dct.forward(&src, &mut coef);
        dct.inverse(&coef, &mut back);

        for i in 0..n * n {
            assert!((src[i] - back[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn verify_roundtrip() {
        roundtrip(4);
        roundtrip(8);
    }

    #[test]
    fn verify_dc_term() {
        // The DC coefficient of an orthonormal DCT of a constant block of
        // value v must be N * v.
        let mut dct = Dct2d::new(8);
        let src = vec![0.5; 64];
        let mut coef = vec![0.0; 64];
        dct.forward(&src, &mut coef);
        assert!((coef[0] - 8.0 * 0.5).abs() < 1e-12);
        for &c in &coef[1..] {
            assert!(c.abs() < 1e-12);
        }
    }

    #[test]
    fn verify_parseval() {
        let mut dct = Dct2d::new(8);
        let src: Vec<f64> = (0..64).map(|i| ((i as f64) * 0.7).sin()).collect();
        let mut coef = vec![0.0; 64];
        dct.forward(&src, &mut coef);
        let e_spatial: f64 = src.iter().map(|v| v * v).sum();
        let e_coef: f64 = coef.iter().map(|v| v * v).sum();
        assert!((e_spatial - e_coef).abs() < 1e-9);
    }
}
