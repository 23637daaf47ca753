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

use crate::geometry::point::{Point3, Vector3};

pub fn barycentric_coords(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> Option<(f64, f64, f64)> {
    let v0 = *b - *a;
    let v1 = *c - *a;
    let v2 = *p - *a;

    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    let denom = d00 * d11 - d01 * d01;
    if denom == 0.0 {
        return None; // degenerate triangle
    }

    let v = (d11 * d20 - d01 * d21) / denom; // coeff of B
    let w = (d00 * d21 - d01 * d20) / denom; // coeff of C
    let u = 1.0 - v - w; // coeff of A
    Some((u, v, w))
}

/// Closest point to `p` on the closed triangle `abc` (Voronoi-region walk).
pub fn closest_point_on_triangle(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> Point3 {
    let ab = *b - *a;
    let ac = *c - *a;
    let ap = *p - *a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = *p - *b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return *a + ab * v;
    }

    let cp = *p - *c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return *a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return *b + (*c - *b) * w;
    }

    let denom = va + vb + vc;
    if denom == 0.0 || !denom.is_finite() {
        // Collinear triangle: fall back to the best of the three edges.
        return [(a, b), (b, c), (c, a)]
            .into_iter()
            .map(|(s, t)| closest_point_on_segment(p, s, t))
            .min_by(|x, y| x.distance_squared_to(p).total_cmp(&y.distance_squared_to(p)))
            .unwrap_or(*a);
    }
    let inv = 1.0 / denom;
    let v = vb * inv;
    let w = vc * inv;
    *a + ab * v + ac * w
}

pub fn closest_point_on_segment(p: &Point3, a: &Point3, b: &Point3) -> Point3 {
    let ab = *b - *a;
    let len2 = ab.norm2();
    if len2 == 0.0 {
        return *a;
    }
    let t = ((*p - *a).dot(&ab) / len2).clamp(0.0, 1.0);
    *a + ab * t
}

#[inline]
pub fn point_triangle_squared_distance(p: &Point3, tri: &[Point3; 3]) -> f64 {
    closest_point_on_triangle(p, &tri[0], &tri[1], &tri[2]).distance_squared_to(p)
}

/// Unnormalized normal `(b - a) x (c - a)`.
#[inline]
pub fn triangle_normal(a: &Point3, b: &Point3, c: &Point3) -> Vector3 {
    (*b - *a).cross(&(*c - *a))
}

#[inline]
pub fn triangle_area(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    0.5 * triangle_normal(a, b, c).norm()
}

/// Cosine of the smallest interior angle (largest cosine); 1.0 when degenerate.
pub fn tri_min_angle_cos(a: &Point3, b: &Point3, c: &Point3) -> f64 {
    let corner = |p: &Point3, q: &Point3, r: &Point3| -> f64 {
        let u = *q - *p;
        let v = *r - *p;
        let den = (u.norm2() * v.norm2()).sqrt();
        if den == 0.0 { 1.0 } else { u.dot(&v) / den }
    };
    corner(a, b, c).max(corner(b, c, a)).max(corner(c, a, b))
}

/// Points of a barycentric grid covering triangle `abc` with spacing at most `spacing`.
/// Vertices are included.
pub fn sample_triangle(tri: &[Point3; 3], spacing: f64, out: &mut Vec<Point3>) {
    let longest = tri[0]
        .distance_to(&tri[1])
        .max(tri[1].distance_to(&tri[2]))
        .max(tri[2].distance_to(&tri[0]));
    let n = if spacing > 0.0 && longest.is_finite() {
        ((longest / spacing).ceil() as usize).max(1)
    } else {
        1
    };
    let inv = 1.0 / n as f64;
    for i in 0..=n {
        for j in 0..=(n - i) {
            let u = i as f64 * inv;
            let v = j as f64 * inv;
            let w = 1.0 - u - v;
            let x = u * tri[0].x + v * tri[1].x + w * tri[2].x;
            let y = u * tri[0].y + v * tri[1].y + w * tri[2].y;
            let z = u * tri[0].z + v * tri[1].z + w * tri[2].z;
            out.push(Point3::new(x, y, z));
        }
    }
}
