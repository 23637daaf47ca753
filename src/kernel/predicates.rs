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

use rug::Rational;

use crate::geometry::point::Point3;
use crate::kernel::orientation::orient3d;
use crate::numeric::rational::{self as q, ExactPoint3};

/// Index of the largest-magnitude component; projecting along it keeps a
/// plane with that normal non-degenerate.
pub fn dominant_axis(n: &[Rational; 3]) -> usize {
    let abs: [Rational; 3] = std::array::from_fn(|i| Rational::from(n[i].abs_ref()));
    if abs[0] >= abs[1] && abs[0] >= abs[2] {
        0
    } else if abs[1] >= abs[2] {
        1
    } else {
        2
    }
}

fn orient2d_exact(a: &ExactPoint3, b: &ExactPoint3, c: &ExactPoint3, drop: usize) -> i8 {
    let (i, j) = ((drop + 1) % 3, (drop + 2) % 3);
    let ux = q::sub(b.coord(i), a.coord(i));
    let uy = q::sub(b.coord(j), a.coord(j));
    let vx = q::sub(c.coord(i), a.coord(i));
    let vy = q::sub(c.coord(j), a.coord(j));
    q::sub(&q::mul(&ux, &vy), &q::mul(&uy, &vx)).cmp0() as i8
}

/// `p` lies in the closed triangle `abc`, all four points being coplanar.
pub fn point_in_triangle_coplanar(p: &ExactPoint3, a: &ExactPoint3, b: &ExactPoint3, c: &ExactPoint3) -> bool {
    let n = q::cross3(&b.sub(a), &c.sub(a));
    if q::is_zero3(&n) {
        return false;
    }
    let drop = dominant_axis(&n);
    let s0 = orient2d_exact(a, b, p, drop);
    let s1 = orient2d_exact(b, c, p, drop);
    let s2 = orient2d_exact(c, a, p, drop);
    let has_pos = s0 > 0 || s1 > 0 || s2 > 0;
    let has_neg = s0 < 0 || s1 < 0 || s2 < 0;
    !(has_pos && has_neg)
}

/// `a`, `b`, `c` exactly collinear (or coincident).
pub fn are_collinear(a: &ExactPoint3, b: &ExactPoint3, c: &ExactPoint3) -> bool {
    q::is_zero3(&q::cross3(&b.sub(a), &c.sub(a)))
}

/// `p` lies on the closed segment `ab`.
pub fn is_point_on_segment(p: &ExactPoint3, a: &ExactPoint3, b: &ExactPoint3) -> bool {
    if !are_collinear(a, b, p) {
        return false;
    }
    let ab = b.sub(a);
    let ap = p.sub(a);
    let t = q::dot3(&ap, &ab);
    t.cmp0().is_ge() && t <= q::dot3(&ab, &ab)
}

/// Float version of the degenerate-triangle test, decided exactly.
pub fn is_degenerate_triangle(a: &Point3, b: &Point3, c: &Point3) -> bool {
    match (
        ExactPoint3::from_point(a),
        ExactPoint3::from_point(b),
        ExactPoint3::from_point(c),
    ) {
        (Some(a), Some(b), Some(c)) => are_collinear(&a, &b, &c),
        _ => true,
    }
}

/// Segment `pq` crosses or touches triangle `abc` (non-coplanar configurations).
pub fn segment_triangle_intersect(p: &Point3, q: &Point3, a: &Point3, b: &Point3, c: &Point3) -> bool {
    let sp = orient3d(a, b, c, p);
    let sq = orient3d(a, b, c, q);
    if sp == 0 && sq == 0 {
        return coplanar_segment_triangle_intersect(p, q, a, b, c);
    }
    if sp == sq {
        return false;
    }
    let s0 = orient3d(p, q, a, b);
    let s1 = orient3d(p, q, b, c);
    let s2 = orient3d(p, q, c, a);
    let has_pos = s0 > 0 || s1 > 0 || s2 > 0;
    let has_neg = s0 < 0 || s1 < 0 || s2 < 0;
    !(has_pos && has_neg)
}

fn coplanar_segment_triangle_intersect(p: &Point3, q: &Point3, a: &Point3, b: &Point3, c: &Point3) -> bool {
    let (Some(ep), Some(eq), Some(ea), Some(eb), Some(ec)) = (
        ExactPoint3::from_point(p),
        ExactPoint3::from_point(q),
        ExactPoint3::from_point(a),
        ExactPoint3::from_point(b),
        ExactPoint3::from_point(c),
    ) else {
        return false;
    };
    if point_in_triangle_coplanar(&ep, &ea, &eb, &ec) || point_in_triangle_coplanar(&eq, &ea, &eb, &ec) {
        return true;
    }
    let n = q::cross3(&eb.sub(&ea), &ec.sub(&ea));
    if q::is_zero3(&n) {
        return false;
    }
    let drop = dominant_axis(&n);
    [(&ea, &eb), (&eb, &ec), (&ec, &ea)]
        .into_iter()
        .any(|(u, v)| segments_cross_2d(&ep, &eq, u, v, drop))
}

fn segments_cross_2d(p: &ExactPoint3, q: &ExactPoint3, u: &ExactPoint3, v: &ExactPoint3, drop: usize) -> bool {
    let d1 = orient2d_exact(p, q, u, drop);
    let d2 = orient2d_exact(p, q, v, drop);
    let d3 = orient2d_exact(u, v, p, drop);
    let d4 = orient2d_exact(u, v, q, drop);
    if d1 * d2 < 0 && d3 * d4 < 0 {
        return true;
    }
    (d1 == 0 && is_point_on_segment(u, p, q))
        || (d2 == 0 && is_point_on_segment(v, p, q))
        || (d3 == 0 && is_point_on_segment(p, u, v))
        || (d4 == 0 && is_point_on_segment(q, u, v))
}
