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

//! Error-tracked double arithmetic used as the fast filter in front of the
//! exact predicates.

#[derive(Copy, Clone, Debug)]
pub struct Ball {
    pub m: f64,
    pub r: f64,
} // value ∈ [m - r, m + r]

// Radii are themselves rounded; inflate them a hair before trusting a sign.
const RADIUS_SAFETY: f64 = 1.0 + 1.0 / (1u64 << 40) as f64;

#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    let err = (a - (s - bb)) + (b - bb);
    (s, err)
}

#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    let err = f64::mul_add(a, b, -p);
    (p, err)
}

impl Ball {
    #[inline]
    pub fn from_f64(x: f64) -> Self {
        Ball { m: x, r: 0.0 }
    }

    #[inline]
    pub fn add(self, o: Self) -> Self {
        let (s, e) = two_sum(self.m, o.m);
        Ball {
            m: s,
            r: self.r + o.r + e.abs(),
        }
    }

    #[inline]
    pub fn sub(self, o: Self) -> Self {
        self.add(o.neg())
    }

    #[inline]
    pub fn neg(self) -> Self {
        Ball {
            m: -self.m,
            r: self.r,
        }
    }

    #[inline]
    pub fn mul(self, o: Self) -> Self {
        let (p, e) = two_prod(self.m, o.m);
        Ball {
            m: p,
            r: self.m.abs() * o.r + o.m.abs() * self.r + self.r * o.r + e.abs(),
        }
    }

    /// `a - b` for two exact doubles.
    #[inline]
    pub fn diff(a: f64, b: f64) -> Self {
        Ball::from_f64(a).sub(Ball::from_f64(b))
    }

    /// Sign of the enclosed value if the whole interval lies on one side of zero.
    #[inline]
    pub fn sign_if_certain(self) -> Option<i8> {
        if !self.m.is_finite() || !self.r.is_finite() {
            return None;
        }
        let r = self.r * RADIUS_SAFETY;
        if self.m > r {
            Some(1)
        } else if self.m < -r {
            Some(-1)
        } else if self.m == 0.0 && self.r == 0.0 {
            Some(0)
        } else {
            None
        }
    }
}

pub fn dot3(a: &[Ball; 3], b: &[Ball; 3]) -> Ball {
    a[0].mul(b[0]).add(a[1].mul(b[1])).add(a[2].mul(b[2]))
}

pub fn cross3(a: &[Ball; 3], b: &[Ball; 3]) -> [Ball; 3] {
    [
        a[1].mul(b[2]).sub(a[2].mul(b[1])),
        a[2].mul(b[0]).sub(a[0].mul(b[2])),
        a[0].mul(b[1]).sub(a[1].mul(b[0])),
    ]
}

/// Determinant of the 3x3 matrix with columns `a`, `b`, `c`.
pub fn det3(a: &[Ball; 3], b: &[Ball; 3], c: &[Ball; 3]) -> Ball {
    dot3(&cross3(a, b), c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_products_are_certain() {
        let a = Ball::from_f64(3.0).mul(Ball::from_f64(-2.0));
        assert_eq!(a.sign_if_certain(), Some(-1));
        assert_eq!(a.m, -6.0);
    }

    #[test]
    fn cancellation_brackets_true_value() {
        // 0.1 + 0.2 - 0.3 over the stored doubles is exactly 2^-55.
        let v = Ball::from_f64(0.1)
            .add(Ball::from_f64(0.2))
            .sub(Ball::from_f64(0.3));
        let truth = 2f64.powi(-55);
        let r = v.r * RADIUS_SAFETY;
        assert!(v.m - r <= truth && truth <= v.m + r);
        assert_eq!(v.sign_if_certain(), Some(1));
    }

    #[test]
    fn zero_is_certain() {
        assert_eq!(Ball::diff(1.5, 1.5).sign_if_certain(), Some(0));
    }
}
