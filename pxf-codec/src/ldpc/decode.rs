// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Layered Sum-Product decoding with an Ordered Statistics fallback.

use super::LdpcCode;

const MAX_ITERATIONS: usize = 50;
const LLR_CLAMP: f64 = 30.0;
const TANH_EPSILON: f64 = 1e-12;
const OSD_FLIP_CANDIDATES: usize = 15;

/// The outcome of a soft decode.
pub struct LdpcDecode {
    /// The recovered data bits, one per byte.
    pub bits: Vec<u8>,
    /// True when the final hard decision satisfies every parity check.
    pub corrected: bool,
    /// True when the result came from the OSD fallback.
    pub osd: bool,
}

impl LdpcDecode {
    /// Packs the recovered data bits into bytes, MSB-first.
    pub fn bytes(&self) -> Vec<u8> {
        pxf_core::util::bits::pack_msb(&self.bits)
    }
}

fn syndrome_ok_soft(code: &LdpcCode, lq: &[f64]) -> bool {
    (0..code.num_checks()).all(|c| {
        code.check_neighbors(c).iter().fold(0u8, |s, &v| s ^ u8::from(lq[v as usize] < 0.0)) == 0
    })
}

fn syndrome_ok_hard(code: &LdpcCode, hard: &[u8]) -> bool {
    (0..code.num_checks()).all(|c| {
        code.check_neighbors(c).iter().fold(0u8, |s, &v| s ^ hard[v as usize]) == 0
    })
}

pub fn decode(code: &LdpcCode, llr: &[f64]) -> LdpcDecode {
    assert_eq!(llr.len(), code.n());

    let m = code.num_checks();
    let mut lq = llr.to_vec();
    let mut r = vec![0.0f64; code.chk_vars.len()];

    // Per-check scratch for the tanh of each extrinsic input.
    let mut tanhs: Vec<f64> = Vec::with_capacity(512);

    for _ in 0..MAX_ITERATIONS {
        for c in 0..m {
            let begin = code.chk_offsets[c] as usize;
            let end = code.chk_offsets[c + 1] as usize;

            tanhs.clear();
            let mut product = 1.0f64;
            let mut zeros = 0usize;

            for e in begin..end {
                let v = code.chk_vars[e] as usize;
                let extrinsic = (lq[v] - r[e]).clamp(-LLR_CLAMP, LLR_CLAMP);
                let t = (extrinsic / 2.0).tanh();
                tanhs.push(t);
                if t == 0.0 {
                    zeros += 1;
                }
                else {
                    product *= t;
                }
            }

            for (i, e) in (begin..end).enumerate() {
                let v = code.chk_vars[e] as usize;
                let t = tanhs[i];

                // Zero-aware product exclusion.
                let excluded = if zeros == 0 {
                    product / t
                }
                else if zeros == 1 && t == 0.0 {
                    product
                }
                else {
                    0.0
                };

                let excluded = excluded.clamp(-1.0 + TANH_EPSILON, 1.0 - TANH_EPSILON);
                let new_r = 2.0 * excluded.atanh();

                // Serial schedule: the posterior update is visible to the
                // next check immediately.
                lq[v] += new_r - r[e];
                r[e] = new_r;
            }
        }

        if syndrome_ok_soft(code, &lq) {
            let bits = lq[..code.k()].iter().map(|&l| u8::from(l < 0.0)).collect();
            return LdpcDecode { bits, corrected: true, osd: false };
        }
    }

    // Ordered Statistics fallback: try flipping each of the least reliable
    // bits, one at a time, and keep the first syndrome-satisfying decision.
    let mut order: Vec<usize> = (0..code.n()).collect();
    order.sort_by(|&a, &b| lq[a].abs().partial_cmp(&lq[b].abs()).unwrap());

    let mut hard: Vec<u8> = lq.iter().map(|&l| u8::from(l < 0.0)).collect();

    for &v in order.iter().take(OSD_FLIP_CANDIDATES) {
        hard[v] ^= 1;
        if syndrome_ok_hard(code, &hard) {
            return LdpcDecode { bits: hard[..code.k()].to_vec(), corrected: true, osd: true };
        }
        hard[v] ^= 1;
    }

    LdpcDecode { bits: hard[..code.k()].to_vec(), corrected: false, osd: false }
}
