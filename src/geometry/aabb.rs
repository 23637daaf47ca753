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

use serde::{Deserialize, Serialize};

use crate::geometry::point::{Point3, Vector3};

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub fn new(min: Point3, max: Point3) -> Self {
        Aabb { min, max }
    }

    /// Smallest box containing all `points`; `None` when empty.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut it = points.into_iter();
        let first = *it.next()?;
        let mut b = Aabb::new(first, first);
        for p in it {
            b.expand(p);
        }
        Some(b)
    }

    pub fn expand(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        let mut b = *self;
        b.expand(&other.min);
        b.expand(&other.max);
        b
    }

    /// Grow every side by `margin`.
    pub fn enlarged(&self, margin: f64) -> Aabb {
        let m = Vector3::new(margin, margin, margin);
        Aabb::new(self.min - m, self.max + m)
    }

    /// Does this AABB intersect `other`? Touching counts.
    pub fn intersects(&self, other: &Aabb) -> bool {
        for i in 0..3 {
            if self.max[i] < other.min[i] || other.max[i] < self.min[i] {
                return false;
            }
        }
        true
    }

    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Strictly inside, off every side.
    pub fn contains_strictly(&self, p: &Point3) -> bool {
        (0..3).all(|i| self.min[i] < p[i] && p[i] < self.max[i])
    }

    /// Center coordinate along axis `i`.
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.min[i] + self.max[i])
    }

    fn extent(&self, i: usize) -> f64 {
        self.max[i] - self.min[i]
    }

    /// Return the axis index with largest extent.
    pub fn longest_axis(&self) -> usize {
        let mut best_i = 0usize;
        let mut best = self.extent(0);
        for i in 1..3 {
            let e = self.extent(i);
            if e > best {
                best_i = i;
                best = e;
            }
        }
        best_i
    }

    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }

    /// Squared distance from `p` to the box (zero inside).
    pub fn squared_distance(&self, p: &Point3) -> f64 {
        let mut d2 = 0.0;
        for i in 0..3 {
            let v = p[i];
            if v < self.min[i] {
                d2 += (self.min[i] - v) * (self.min[i] - v);
            } else if v > self.max[i] {
                d2 += (v - self.max[i]) * (v - self.max[i]);
            }
        }
        d2
    }

    /// The eight corners, index `i + 2j + 4k` for corner `(i, j, k)`.
    pub fn corners(&self) -> [Point3; 8] {
        std::array::from_fn(|c| {
            Point3::new(
                if c & 1 == 0 { self.min.x } else { self.max.x },
                if c & 2 == 0 { self.min.y } else { self.max.y },
                if c & 4 == 0 { self.min.z } else { self.max.z },
            )
        })
    }
}
