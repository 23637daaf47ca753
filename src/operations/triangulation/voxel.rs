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

use crate::envelope::Envelope;
use crate::geometry::{aabb::Aabb, point::Point3};

/// Regular grid points strictly inside `bbox` that keep at least half a
/// spacing away from `surface`.
pub fn voxel_points(bbox: &Aabb, spacing: f64, surface: &Envelope) -> Vec<Point3> {
    if !(spacing > 0.0) || !spacing.is_finite() {
        return Vec::new();
    }
    let divisions = |axis: usize| {
        let extent = bbox.max[axis] - bbox.min[axis];
        ((extent / spacing).ceil() as usize).max(1)
    };
    let n = [divisions(0), divisions(1), divisions(2)];
    let min_d2 = 0.25 * spacing * spacing;

    let mut out = Vec::new();
    for k in 1..n[2] {
        for j in 1..n[1] {
            for i in 1..n[0] {
                let p = Point3::new(
                    coord(bbox, 0, i, n[0]),
                    coord(bbox, 1, j, n[1]),
                    coord(bbox, 2, k, n[2]),
                );
                if bbox.contains_strictly(&p) && surface.squared_distance(&p) > min_d2 {
                    out.push(p);
                }
            }
        }
    }
    out
}

#[inline]
fn coord(bbox: &Aabb, axis: usize, i: usize, n: usize) -> f64 {
    let t = i as f64 / n as f64;
    bbox.min[axis] * (1.0 - t) + bbox.max[axis] * t
}
