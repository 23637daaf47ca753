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

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::geometry::aabb::Aabb;

/// Uniform grid over item bounding boxes. Lookups only; never iterated, so
/// the hasher's seed cannot leak into results.
pub struct SpatialHash {
    hash_inv: f64,
    cells: AHashMap<u128, SmallVec<[usize; 8]>>,
}

impl SpatialHash {
    pub fn new(cell: f64) -> Self {
        let mut cell = cell.max(1e-12); // clamp to avoid INF
        if !cell.is_finite() {
            cell = 1.0;
        }
        Self {
            hash_inv: 1.0 / cell,
            cells: AHashMap::default(),
        }
    }

    #[inline(always)]
    fn floor_sat_i64(x: f64) -> i64 {
        if !x.is_finite() {
            return if x.is_sign_positive() { i64::MAX } else { i64::MIN };
        }
        let i = x as i64;
        i - ((i as f64 > x) as i64)
    }

    #[inline(always)]
    fn pack_key3(kx: i64, ky: i64, kz: i64) -> u128 {
        // 3 × 42-bit signed lanes into 126 bits (fits typical ranges).
        let mask = (1u128 << 42) - 1;
        let ux = (kx as i128 as u128) & mask;
        let uy = (ky as i128 as u128) & mask;
        let uz = (kz as i128 as u128) & mask;
        ux | (uy << 42) | (uz << 84)
    }

    fn key_range(&self, b: &Aabb) -> ([i64; 3], [i64; 3]) {
        let lo = std::array::from_fn(|i| Self::floor_sat_i64(b.min[i] * self.hash_inv));
        let hi = std::array::from_fn(|i| Self::floor_sat_i64(b.max[i] * self.hash_inv));
        (lo, hi)
    }

    pub fn insert(&mut self, id: usize, b: &Aabb) {
        let (lo, hi) = self.key_range(b);
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    self.cells.entry(Self::pack_key3(x, y, z)).or_default().push(id);
                }
            }
        }
    }

    /// Ids registered in any cell overlapping `b`, sorted and deduplicated.
    pub fn query(&self, b: &Aabb, out: &mut Vec<usize>) {
        out.clear();
        let (lo, hi) = self.key_range(b);
        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
                    if let Some(ids) = self.cells.get(&Self::pack_key3(x, y, z)) {
                        out.extend_from_slice(ids);
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3;

    #[test]
    fn floor_handles_negatives() {
        assert_eq!(SpatialHash::floor_sat_i64(-0.5), -1);
        assert_eq!(SpatialHash::floor_sat_i64(1.5), 1);
        assert_eq!(SpatialHash::floor_sat_i64(f64::INFINITY), i64::MAX);
    }

    #[test]
    fn query_finds_overlapping_items() {
        let mut h = SpatialHash::new(1.0);
        h.insert(0, &Aabb::new(Point3::new(0.1, 0.1, 0.1), Point3::new(0.2, 0.2, 0.2)));
        h.insert(1, &Aabb::new(Point3::new(5.1, 5.1, 5.1), Point3::new(5.2, 5.2, 5.2)));
        h.insert(2, &Aabb::new(Point3::new(-0.5, 0.1, 0.1), Point3::new(1.5, 0.2, 0.2)));
        let mut out = Vec::new();
        h.query(&Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(0.5, 0.5, 0.5)), &mut out);
        assert_eq!(out, vec![0, 2]);
    }
}
