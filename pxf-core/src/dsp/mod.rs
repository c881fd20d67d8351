// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dsp` module implements the numeric kernels of the codec.

pub mod dct;
pub mod half;
pub mod mdct;
pub mod window;

/// Magnitudes below this threshold are treated as silence by every kernel and
/// pipeline stage.
pub const SILENCE_THRESHOLD: f64 = 1e-9;
