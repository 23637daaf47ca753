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
use serde::{Deserialize, Serialize};

use crate::geometry::point::Point3;

// In-place API on rug::Rational: clone the left operand, then assign.

#[inline]
pub fn add(a: &Rational, b: &Rational) -> Rational {
    let mut r = a.clone();
    r += b;
    r
}

#[inline]
pub fn sub(a: &Rational, b: &Rational) -> Rational {
    let mut r = a.clone();
    r -= b;
    r
}

#[inline]
pub fn mul(a: &Rational, b: &Rational) -> Rational {
    let mut r = a.clone();
    r *= b;
    r
}

#[inline]
pub fn div(a: &Rational, b: &Rational) -> Rational {
    let mut r = a.clone();
    r /= b;
    r
}

pub fn dot3(a: &[Rational; 3], b: &[Rational; 3]) -> Rational {
    let mut acc = mul(&a[0], &b[0]);
    acc += &mul(&a[1], &b[1]);
    acc += &mul(&a[2], &b[2]);
    acc
}

pub fn cross3(a: &[Rational; 3], b: &[Rational; 3]) -> [Rational; 3] {
    [
        sub(&mul(&a[1], &b[2]), &mul(&a[2], &b[1])),
        sub(&mul(&a[2], &b[0]), &mul(&a[0], &b[2])),
        sub(&mul(&a[0], &b[1]), &mul(&a[1], &b[0])),
    ]
}

pub fn is_zero3(v: &[Rational; 3]) -> bool {
    v.iter().all(|x| x.cmp0().is_eq())
}

/// A point with arbitrary-precision rational coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExactPoint3(pub [Rational; 3]);

impl ExactPoint3 {
    /// Exact conversion; `None` for non-finite input.
    pub fn from_point(p: &Point3) -> Option<Self> {
        Some(ExactPoint3([
            Rational::from_f64(p.x)?,
            Rational::from_f64(p.y)?,
            Rational::from_f64(p.z)?,
        ]))
    }

    /// Nearest double approximation.
    pub fn to_point(&self) -> Point3 {
        Point3::new(self.0[0].to_f64(), self.0[1].to_f64(), self.0[2].to_f64())
    }

    #[inline]
    pub fn coord(&self, i: usize) -> &Rational {
        &self.0[i]
    }

    pub fn sub(&self, o: &ExactPoint3) -> [Rational; 3] {
        [
            sub(&self.0[0], &o.0[0]),
            sub(&self.0[1], &o.0[1]),
            sub(&self.0[2], &o.0[2]),
        ]
    }

    /// `self + t * dir`
    pub fn add_scaled(&self, dir: &[Rational; 3], t: &Rational) -> ExactPoint3 {
        ExactPoint3([
            add(&self.0[0], &mul(&dir[0], t)),
            add(&self.0[1], &mul(&dir[1], t)),
            add(&self.0[2], &mul(&dir[2], t)),
        ])
    }

    pub fn midpoint(a: &ExactPoint3, b: &ExactPoint3) -> ExactPoint3 {
        let half = Rational::from((1, 2));
        ExactPoint3(std::array::from_fn(|i| mul(&add(&a.0[i], &b.0[i]), &half)))
    }

    /// Average of the given points, `None` when empty.
    pub fn centroid<'a, I>(points: I) -> Option<ExactPoint3>
    where
        I: IntoIterator<Item = &'a ExactPoint3>,
    {
        let mut sum = [Rational::new(), Rational::new(), Rational::new()];
        let mut n = 0u32;
        for p in points {
            for i in 0..3 {
                sum[i] += &p.0[i];
            }
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let n = Rational::from(n);
        for s in sum.iter_mut() {
            *s /= &n;
        }
        Some(ExactPoint3(sum))
    }

    /// True if rounding to doubles loses nothing.
    pub fn is_float_exact(&self) -> bool {
        self.0.iter().all(|c| match Rational::from_f64(c.to_f64()) {
            Some(back) => &back == c,
            None => false,
        })
    }
}
