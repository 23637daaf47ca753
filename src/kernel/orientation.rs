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

//! Filtered exact orientation and in-sphere predicates.
//!
//! Every predicate first runs in [`Ball`] arithmetic and only falls back to
//! `rug::Rational` when the sign of the filtered value is uncertain.

use rug::Rational;

use crate::geometry::point::Point3;
use crate::numeric::ball::{self, Ball};
use crate::numeric::rational::{self as q, ExactPoint3};

#[inline]
fn ball_diff(p: &Point3, o: &Point3) -> [Ball; 3] {
    [
        Ball::diff(p.x, o.x),
        Ball::diff(p.y, o.y),
        Ball::diff(p.z, o.z),
    ]
}

#[inline]
fn sign_of(r: &Rational) -> i8 {
    r.cmp0() as i8
}

/// Sign of `((b - a) x (c - a)) . (d - a)`:
/// - `1` if `d` lies on the side the normal of `abc` points to (positive volume)
/// - `-1` on the other side
/// - `0` if coplanar
pub fn orient3d(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> i8 {
    let ab = ball_diff(b, a);
    let ac = ball_diff(c, a);
    let ad = ball_diff(d, a);
    if let Some(s) = ball::det3(&ab, &ac, &ad).sign_if_certain() {
        return s;
    }
    match exact4(a, b, c, d) {
        Some([a, b, c, d]) => orient3d_exact(&a, &b, &c, &d),
        None => 0,
    }
}

pub fn orient3d_exact(a: &ExactPoint3, b: &ExactPoint3, c: &ExactPoint3, d: &ExactPoint3) -> i8 {
    let ab = b.sub(a);
    let ac = c.sub(a);
    let ad = d.sub(a);
    sign_of(&q::dot3(&q::cross3(&ab, &ac), &ad))
}

/// `1` if `e` is strictly inside the circumsphere of the positively oriented
/// tetrahedron `abcd`, `-1` if strictly outside, `0` if cospherical.
pub fn insphere(a: &Point3, b: &Point3, c: &Point3, d: &Point3, e: &Point3) -> i8 {
    let rows = [
        ball_diff(a, e),
        ball_diff(b, e),
        ball_diff(c, e),
        ball_diff(d, e),
    ];
    let lift = |r: &[Ball; 3]| ball::dot3(r, r);
    let det = lift(&rows[1])
        .mul(ball::det3(&rows[0], &rows[2], &rows[3]))
        .sub(lift(&rows[0]).mul(ball::det3(&rows[1], &rows[2], &rows[3])))
        .sub(lift(&rows[2]).mul(ball::det3(&rows[0], &rows[1], &rows[3])))
        .add(lift(&rows[3]).mul(ball::det3(&rows[0], &rows[1], &rows[2])));
    if let Some(s) = det.sign_if_certain() {
        return -s;
    }
    match (exact4(a, b, c, d), ExactPoint3::from_point(e)) {
        (Some([a, b, c, d]), Some(e)) => insphere_exact(&a, &b, &c, &d, &e),
        _ => 0,
    }
}

pub fn insphere_exact(
    a: &ExactPoint3,
    b: &ExactPoint3,
    c: &ExactPoint3,
    d: &ExactPoint3,
    e: &ExactPoint3,
) -> i8 {
    let rows = [a.sub(e), b.sub(e), c.sub(e), d.sub(e)];
    let lift = |r: &[Rational; 3]| q::dot3(r, r);
    let det3 = |u: &[Rational; 3], v: &[Rational; 3], w: &[Rational; 3]| q::dot3(&q::cross3(u, v), w);

    // Laplace expansion along the lifted column.
    let mut det = q::mul(&lift(&rows[1]), &det3(&rows[0], &rows[2], &rows[3]));
    det -= &q::mul(&lift(&rows[0]), &det3(&rows[1], &rows[2], &rows[3]));
    det -= &q::mul(&lift(&rows[2]), &det3(&rows[0], &rows[1], &rows[3]));
    det += &q::mul(&lift(&rows[3]), &det3(&rows[0], &rows[1], &rows[2]));
    -sign_of(&det)
}

fn exact4(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> Option<[ExactPoint3; 4]> {
    Some([
        ExactPoint3::from_point(a)?,
        ExactPoint3::from_point(b)?,
        ExactPoint3::from_point(c)?,
        ExactPoint3::from_point(d)?,
    ])
}

/// Signed volume (times 6) in plain doubles, for quality measures only.
#[inline]
pub fn signed_volume6(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> f64 {
    (*b - *a).cross(&(*c - *a)).dot(&(*d - *a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet() -> [Point3; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn orientation_3d_positive_volume() {
        let [a, b, c, d] = unit_tet();
        assert_eq!(orient3d(&a, &b, &c, &d), 1);
    }

    #[test]
    fn orientation_3d_negative_volume() {
        let [a, b, c, _] = unit_tet();
        let d = Point3::new(0.0, 0.0, -1.0); // below the abc plane
        assert_eq!(orient3d(&a, &b, &c, &d), -1);
    }

    #[test]
    fn orientation_3d_coplanar() {
        let [a, b, c, _] = unit_tet();
        let d = Point3::new(1.0, 1.0, 0.0); // lies in the same z=0 plane
        assert_eq!(orient3d(&a, &b, &c, &d), 0);
    }

    #[test]
    fn orientation_near_degenerate_uses_exact_path() {
        // d is off the plane by one ulp-ish amount that plain doubles lose.
        let a = Point3::new(0.1, 0.1, 0.1);
        let b = Point3::new(0.7, 0.3, 0.1);
        let c = Point3::new(0.2, 0.9, 0.1);
        let d = Point3::new(0.5, 0.5, 0.1 + f64::EPSILON * 0.1);
        let ea = ExactPoint3::from_point(&a).unwrap();
        let eb = ExactPoint3::from_point(&b).unwrap();
        let ec = ExactPoint3::from_point(&c).unwrap();
        let ed = ExactPoint3::from_point(&d).unwrap();
        assert_eq!(orient3d(&a, &b, &c, &d), orient3d_exact(&ea, &eb, &ec, &ed));
    }

    #[test]
    fn insphere_center_far_and_on_sphere() {
        let [a, b, c, d] = unit_tet();
        assert_eq!(insphere(&a, &b, &c, &d, &Point3::new(0.5, 0.5, 0.5)), 1);
        assert_eq!(insphere(&a, &b, &c, &d, &Point3::new(10.0, 0.0, 0.0)), -1);
        // (1,1,1) is on the circumsphere centred at (1/2,1/2,1/2).
        assert_eq!(insphere(&a, &b, &c, &d, &Point3::new(1.0, 1.0, 1.0)), 0);
    }
}
