// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.


#![allow(dead_code)]

use envtet::TetConfig;

/// Corners of the unit cube, index `i + 2j + 4k`.
pub fn cube_vertices() -> Vec<[f64; 3]> {
    let mut out = Vec::with_capacity(8);
    for k in 0..2 {
        for j in 0..2 {
            for i in 0..2 {
                out.push([i as f64, j as f64, k as f64]);
            }
        }
    }
    out
}

/// Outward-oriented triangles of [`cube_vertices`].
pub fn cube_faces() -> Vec<[usize; 3]> {
    vec![
        [0, 2, 1],
        [1, 2, 3],
        [4, 5, 6],
        [5, 7, 6],
        [0, 1, 5],
        [0, 5, 4],
        [2, 7, 3],
        [2, 6, 7],
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
    ]
}

/// Coarse settings that keep a full run on the cube short.
pub fn coarse_config() -> TetConfig {
    TetConfig::new().with_edge_length_rel(5.0).with_max_passes(8)
}

pub fn signed_volume(v: &[[f64; 3]], t: &[usize; 4]) -> f64 {
    let d = |i: usize| {
        let (p, o) = (v[t[i]], v[t[0]]);
        [p[0] - o[0], p[1] - o[1], p[2] - o[2]]
    };
    let (a, b, c) = (d(1), d(2), d(3));
    let cross = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    (cross[0] * c[0] + cross[1] * c[1] + cross[2] * c[2]) / 6.0
}

/// Rotation used for the off-axis cube: `angles.0` about z, then `angles.1` about x.
pub const CUBE_ROTATION: (f64, f64) = (0.7, 0.4);

pub fn rotate(p: [f64; 3], (a, b): (f64, f64)) -> [f64; 3] {
    let (sa, ca) = a.sin_cos();
    let (sb, cb) = b.sin_cos();
    let q = [ca * p[0] - sa * p[1], sa * p[0] + ca * p[1], p[2]];
    [q[0], cb * q[1] - sb * q[2], sb * q[1] + cb * q[2]]
}

pub fn unrotate(p: [f64; 3], (a, b): (f64, f64)) -> [f64; 3] {
    let (sa, ca) = (-a).sin_cos();
    let (sb, cb) = (-b).sin_cos();
    let q = [p[0], cb * p[1] - sb * p[2], sb * p[1] + cb * p[2]];
    [ca * q[0] - sa * q[1], sa * q[0] + ca * q[1], q[2]]
}

/// The unit cube turned off every axis, so plane cuts land on non-doubles.
pub fn rotated_cube_vertices() -> Vec<[f64; 3]> {
    cube_vertices().into_iter().map(|p| rotate(p, CUBE_ROTATION)).collect()
}

/// Squared distance from `p` to triangle `abc`.
pub fn point_triangle_distance2(p: [f64; 3], [a, b, c]: [[f64; 3]; 3]) -> f64 {
    let sub = |u: [f64; 3], v: [f64; 3]| [u[0] - v[0], u[1] - v[1], u[2] - v[2]];
    let dot = |u: [f64; 3], v: [f64; 3]| u[0] * v[0] + u[1] * v[1] + u[2] * v[2];
    let at = |s: f64, t: f64| {
        [
            a[0] + s * (b[0] - a[0]) + t * (c[0] - a[0]),
            a[1] + s * (b[1] - a[1]) + t * (c[1] - a[1]),
            a[2] + s * (b[2] - a[2]) + t * (c[2] - a[2]),
        ]
    };
    let seg = |u: [f64; 3], v: [f64; 3]| {
        let d = sub(v, u);
        let len2 = dot(d, d);
        let t = if len2 > 0.0 { (dot(sub(p, u), d) / len2).clamp(0.0, 1.0) } else { 0.0 };
        let q = [u[0] + t * d[0], u[1] + t * d[1], u[2] + t * d[2]];
        let e = sub(p, q);
        dot(e, e)
    };

    let (e0, e1, w) = (sub(b, a), sub(c, a), sub(p, a));
    let (d00, d01, d11) = (dot(e0, e0), dot(e0, e1), dot(e1, e1));
    let denom = d00 * d11 - d01 * d01;
    if denom > 0.0 {
        let (d20, d21) = (dot(w, e0), dot(w, e1));
        let s = (d11 * d20 - d01 * d21) / denom;
        let t = (d00 * d21 - d01 * d20) / denom;
        if s >= 0.0 && t >= 0.0 && s + t <= 1.0 {
            let e = sub(p, at(s, t));
            return dot(e, e);
        }
    }
    seg(a, b).min(seg(b, c)).min(seg(c, a))
}
