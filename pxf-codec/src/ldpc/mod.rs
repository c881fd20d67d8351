// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `ldpc` module implements the systematic staircase LDPC codes.
//!
//! Three fixed codes protect the header, the audio row metadata, and the
//! binary payload rows. Each parity-check matrix is `H = [H_d | H_p]` where
//! `H_p` is the dual-diagonal staircase and `H_d` has column weight 3,
//! constructed by Progressive Edge Growth from a fixed seed. Construction is
//! fully deterministic, so the graphs behave as shipped immutable tables;
//! they are built once per process and shared.

mod decode;
mod peg;

use once_cell::sync::Lazy;

use pxf_core::errors::{invalid_length_error, Result};
use pxf_core::util::bits;

pub use decode::LdpcDecode;

const PEG_SEED_HEADER: u32 = 0x1F2E_3D4C;
const PEG_SEED_ROW_META: u32 = 0x2B3C_4D5E;
const PEG_SEED_BINARY: u32 = 0x3A4B_5C6D;

/// A fixed systematic LDPC code over a staircase Tanner graph.
pub struct LdpcCode {
    n: usize,
    k: usize,
    /// Check-to-variable adjacency, flattened; neighbor order is load-bearing
    /// for bit-exact decoder behavior.
    chk_vars: Vec<u32>,
    /// Per-check offsets into `chk_vars`, length `m + 1`.
    chk_offsets: Vec<u32>,
}

impl LdpcCode {
    fn build(n: usize, k: usize, seed: u32) -> LdpcCode {
        let (chk_vars, chk_offsets) = peg::build_graph(n, k, seed);
        LdpcCode { n, k, chk_vars, chk_offsets }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn check_neighbors(&self, c: usize) -> &[u32] {
        &self.chk_vars[self.chk_offsets[c] as usize..self.chk_offsets[c + 1] as usize]
    }

    /// Encodes `k` data bits (one bit per byte) into an `n`-bit codeword:
    /// data bits followed by staircase-accumulated parity.
    pub fn encode_bits(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() != self.k {
            return invalid_length_error("ldpc data bit count");
        }

        let m = self.n - self.k;
        let mut parity = vec![0u8; m];

        for c in 0..m {
            let mut acc = 0u8;
            for &v in self.check_neighbors(c) {
                let v = v as usize;
                if v < self.k {
                    acc ^= data[v] & 1;
                }
            }
            parity[c] = acc;
        }

        for c in 1..m {
            parity[c] ^= parity[c - 1];
        }

        let mut codeword = Vec::with_capacity(self.n);
        codeword.extend_from_slice(data);
        codeword.extend_from_slice(&parity);
        Ok(codeword)
    }

    /// Encodes `k/8` data bytes into an `n/8`-byte codeword, MSB-first.
    pub fn encode_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() * 8 != self.k {
            return invalid_length_error("ldpc data byte count");
        }
        let bits = self.encode_bits(&bits::unpack_msb(data))?;
        Ok(bits::pack_msb(&bits))
    }

    /// Soft-decodes channel LLRs (positive favors bit 0) into the `k` data
    /// bits. Always produces a decision; `corrected` reports whether the
    /// syndrome was satisfied.
    pub fn decode(&self, llr: &[f64]) -> LdpcDecode {
        decode::decode(self, llr)
    }

    pub(crate) fn num_checks(&self) -> usize {
        self.n - self.k
    }
}

/// The header code: N=8192, K=6144, rate 0.75.
pub fn header_code() -> &'static LdpcCode {
    static CODE: Lazy<LdpcCode> = Lazy::new(|| LdpcCode::build(8192, 6144, PEG_SEED_HEADER));
    &CODE
}

/// The audio row metadata code: N=256, K=224, rate 0.875.
pub fn row_meta_code() -> &'static LdpcCode {
    static CODE: Lazy<LdpcCode> = Lazy::new(|| LdpcCode::build(256, 224, PEG_SEED_ROW_META));
    &CODE
}

/// The binary payload row code: N=20064, K=19840, rate 0.989.
pub fn binary_code() -> &'static LdpcCode {
    static CODE: Lazy<LdpcCode> = Lazy::new(|| LdpcCode::build(20064, 19840, PEG_SEED_BINARY));
    &CODE
}
