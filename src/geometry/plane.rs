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

use crate::numeric::rational::{self as q, ExactPoint3};

/// Exact oriented plane `normal . x + d = 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Plane {
    pub normal: [Rational; 3],
    pub d: Rational,
}

impl Plane {
    pub fn new(normal: [Rational; 3], d: Rational) -> Self {
        Plane { normal, d }
    }

    /// Plane through three points, normal `(p2 - p1) x (p3 - p1)`.
    /// `None` if the points are collinear.
    pub fn from_points(p1: &ExactPoint3, p2: &ExactPoint3, p3: &ExactPoint3) -> Option<Self> {
        let normal = q::cross3(&p2.sub(p1), &p3.sub(p1));
        Self::through_point(normal, p1)
    }

    /// Plane containing segment `ab` and the direction `dir`, oriented by
    /// `(b - a) x dir`.
    pub fn through_edge(a: &ExactPoint3, b: &ExactPoint3, dir: &[Rational; 3]) -> Option<Self> {
        let normal = q::cross3(&b.sub(a), dir);
        Self::through_point(normal, a)
    }

    fn through_point(normal: [Rational; 3], p: &ExactPoint3) -> Option<Self> {
        if q::is_zero3(&normal) {
            return None;
        }
        let mut d = q::dot3(&normal, &p.0);
        d = -d;
        Some(Plane::new(normal, d))
    }

    /// Value of `normal . p + d`.
    pub fn eval(&self, p: &ExactPoint3) -> Rational {
        let mut v = q::dot3(&self.normal, &p.0);
        v += &self.d;
        v
    }

    /// `1` on the side the normal points to, `-1` behind, `0` on the plane.
    pub fn side(&self, p: &ExactPoint3) -> i8 {
        self.eval(p).cmp0() as i8
    }

    /// Intersection with the line through `a` and `b`; `None` when parallel.
    pub fn intersect_segment(&self, a: &ExactPoint3, b: &ExactPoint3) -> Option<ExactPoint3> {
        let dir = b.sub(a);
        let denom = q::dot3(&self.normal, &dir);
        if denom.cmp0().is_eq() {
            return None;
        }
        let mut t = self.eval(a);
        t = -t;
        t /= &denom;
        Some(a.add_scaled(&dir, &t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3;

    fn ep(x: f64, y: f64, z: f64) -> ExactPoint3 {
        ExactPoint3::from_point(&Point3::new(x, y, z)).unwrap()
    }

    #[test]
    fn side_and_intersection() {
        let plane = Plane::from_points(&ep(0.0, 0.0, 0.5), &ep(1.0, 0.0, 0.5), &ep(0.0, 1.0, 0.5)).unwrap();
        assert_eq!(plane.side(&ep(0.3, 0.3, 1.0)), 1);
        assert_eq!(plane.side(&ep(0.3, 0.3, 0.0)), -1);
        assert_eq!(plane.side(&ep(7.0, -3.0, 0.5)), 0);

        let x = plane.intersect_segment(&ep(0.0, 0.0, 0.0), &ep(0.0, 0.0, 3.0)).unwrap();
        assert_eq!(x, ep(0.0, 0.0, 0.5));
        assert_eq!(plane.side(&x), 0);
    }

    #[test]
    fn collinear_points_have_no_plane() {
        assert!(Plane::from_points(&ep(0.0, 0.0, 0.0), &ep(1.0, 1.0, 1.0), &ep(2.0, 2.0, 2.0)).is_none());
    }

    #[test]
    fn edge_plane_contains_the_edge() {
        let a = ep(0.0, 0.0, 0.0);
        let b = ep(1.0, 0.0, 0.0);
        let n = [Rational::from(0), Rational::from(0), Rational::from(1)];
        let plane = Plane::through_edge(&a, &b, &n).unwrap();
        assert_eq!(plane.side(&a), 0);
        assert_eq!(plane.side(&b), 0);
        assert_eq!(plane.side(&ep(0.5, 0.0, 9.0)), 0);
        assert_eq!(plane.side(&ep(0.5, 1.0, 0.0)), -1);
    }
}
