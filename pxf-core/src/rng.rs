// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `rng` module implements the deterministic PRNG used throughout the wire format.
//!
//! Every consumer of randomness in the codec (whitening masks, the binary row
//! permutation, LDPC graph tie-breaking) draws from `XorShift128P` so that the
//! encoder and decoder observe identical streams for identical seeds.

/// SplitMix64 step. Used only to expand a 32-bit user seed into the 128-bit
/// XorShift state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// XorShift128+ generator seeded from a 32-bit seed via SplitMix64.
#[derive(Clone, Debug)]
pub struct XorShift128P {
    s0: u64,
    s1: u64,
}

impl XorShift128P {
    pub fn new(seed: u32) -> XorShift128P {
        let mut state = u64::from(seed);
        let s0 = splitmix64(&mut state);
        let s1 = splitmix64(&mut state);

        // The all-zero state is a fixed point of the generator.
        if s0 == 0 && s1 == 0 {
            XorShift128P { s0: 0, s1: 1 }
        }
        else {
            XorShift128P { s0, s1 }
        }
    }

    pub fn next64(&mut self) -> u64 {
        let mut x = self.s0;
        let y = self.s1;
        self.s0 = y;
        x ^= x << 23;
        x ^= x >> 17;
        x ^= y;
        x ^= y >> 26;
        self.s1 = x;
        self.s0.wrapping_add(self.s1)
    }

    /// Returns the high 32 bits of the next output.
    pub fn next32(&mut self) -> u32 {
        (self.next64() >> 32) as u32
    }

    /// Returns the high 8 bits of the next output.
    pub fn next_byte(&mut self) -> u8 {
        (self.next64() >> 56) as u8
    }
}

/// Generates the identity permutation of `len` indices shuffled by Fisher-Yates,
/// consuming one `next32` per swap.
pub fn shuffled_indices(rng: &mut XorShift128P, len: usize) -> Vec<u32> {
    let mut indices: Vec<u32> = (0..len as u32).collect();
    for i in (1..len).rev() {
        let j = (rng.next32() as usize) % (i + 1);
        indices.swap(i, j);
    }
    indices
}
