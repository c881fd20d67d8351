// PXF
// Copyright (c) 2026 The Project PXF Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `obb` module maps audio points to pixels through an oriented bounding box.
//!
//! A point `(y, cb, cr)` in the unit cube is mu-law companded per axis,
//! scaled to the box half-extents, rotated in the Cb/Cr plane, offset to the
//! box center in YCbCr space, and converted to RGB with the BT.601 matrix.
//! Binary mode uses the same box with companding disabled.

/// Box center in YCbCr space.
const CENTER: [f64; 3] = [127.426429853651, 128.0, 128.0];

/// Box half-extents per axis.
const EXTENT: [f64; 3] = [41.159043640701, 61.527423138263, 48.637958664678];

/// Rotation of the Cb/Cr plane. The luma axis is fixed.
const ROT_COS: f64 = -0.000087098752;
const ROT_SIN: f64 = 0.999999996207;

/// Mu-law strength per axis; a non-positive value disables companding.
const MU: [f64; 3] = [6.0, 2.0, 3.0];

fn mu_compress(x: f64, mu: f64) -> f64 {
    if mu <= 0.0 {
        return x;
    }
    ((mu * x.abs()).ln_1p() / mu.ln_1p()).copysign(x)
}

fn mu_expand(y: f64, mu: f64) -> f64 {
    if mu <= 0.0 {
        return y;
    }
    ((y.abs() * mu.ln_1p()).exp_m1() / mu).copysign(y)
}

/// Projects a point in `[-1, 1]^3` to continuous RGB, without quantization.
pub fn project_point(point: [f64; 3], mu_law: bool) -> [f64; 3] {
    let mut u = [0.0f64; 3];
    for i in 0..3 {
        let q = if mu_law { mu_compress(point[i], MU[i]) } else { point[i] };
        u[i] = q * EXTENT[i];
    }

    let y = CENTER[0] + u[0];
    let cb = CENTER[1] + ROT_COS * u[1] - ROT_SIN * u[2];
    let cr = CENTER[2] + ROT_SIN * u[1] + ROT_COS * u[2];

    // BT.601 YCbCr to RGB.
    let r = y + 1.402 * (cr - 128.0);
    let g = y - 0.344136286201 * (cb - 128.0) - 0.714136286201 * (cr - 128.0);
    let b = y + 1.772 * (cb - 128.0);

    [r, g, b]
}

/// Encodes a point in `[-1, 1]^3` to an 8-bit RGB pixel.
pub fn encode_point(point: [f64; 3], mu_law: bool) -> [u8; 3] {
    let rgb = project_point(point, mu_law);
    let mut out = [0u8; 3];
    for i in 0..3 {
        out[i] = rgb[i].round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Decodes continuous RGB back to a point in `[-1, 1]^3` (approximately; out
/// of box pixels may decode slightly outside the cube).
pub fn decode_rgb(rgb: [f64; 3], mu_law: bool) -> [f64; 3] {
    let (r, g, b) = (rgb[0], rgb[1], rgb[2]);

    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = (b - y) / 1.772 + 128.0;
    let cr = (r - y) / 1.402 + 128.0;

    let w = [y - CENTER[0], cb - CENTER[1], cr - CENTER[2]];

    // Inverse rotation is the transpose.
    let u = [w[0], ROT_COS * w[1] + ROT_SIN * w[2], -ROT_SIN * w[1] + ROT_COS * w[2]];

    let mut point = [0.0f64; 3];
    for i in 0..3 {
        let q = u[i] / EXTENT[i];
        point[i] = if mu_law { mu_expand(q, MU[i]) } else { q };
    }
    point
}

/// Decodes an 8-bit RGB pixel back to a point.
pub fn decode_pixel(rgb: [u8; 3], mu_law: bool) -> [f64; 3] {
    decode_rgb([f64::from(rgb[0]), f64::from(rgb[1]), f64::from(rgb[2])], mu_law)
}
