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

//! Incremental 3D Delaunay tetrahedralization (Bowyer-Watson) inside a box.
//!
//! The box corners seed a 6-tet Kuhn triangulation, so every inserted point
//! lies strictly inside the current hull and no super-simplex is needed.

use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::{TetError, TetResult};
use crate::geometry::{aabb::Aabb, point::Point3};
use crate::kernel::orientation::{insphere, orient3d};
use crate::quality::FACETS;

const NONE: usize = usize::MAX;
const INSERTION_SEED: u64 = 0x7e7_5eed;

#[derive(Clone, Debug)]
struct Cell {
    v: [usize; 4],
    /// `nb[i]` is the cell across the facet opposite `v[i]`.
    nb: [usize; 4],
    removed: bool,
}

#[derive(Clone, Debug)]
pub struct Delaunay {
    /// Box corners (index `i + 2j + 4k`) followed by the inserted points.
    pub points: Vec<Point3>,
    /// Positively oriented cells.
    pub tets: Vec<[usize; 4]>,
}

#[inline]
fn facet_key(v: &[usize; 4], i: usize) -> [usize; 3] {
    let mut k = FACETS[i].map(|j| v[j]);
    k.sort_unstable();
    k
}

struct Builder {
    points: Vec<Point3>,
    cells: Vec<Cell>,
    last: usize,
    rng: StdRng,
}

impl Delaunay {
    /// Tetrahedralize `points`, all strictly inside `bbox`. Point `k` becomes
    /// vertex `8 + k`; exact duplicates stay unreferenced.
    ///
    /// # Errors
    ///
    /// [`TetError::Delaunay`] when a point lies outside the box or cannot be inserted.
    pub fn build(bbox: &Aabb, points: &[Point3]) -> TetResult<Self> {
        if let Some(p) = points.iter().find(|p| !bbox.contains_strictly(p)) {
            return Err(TetError::Delaunay(format!("point {p:?} is not strictly inside the box")));
        }
        let mut b = Builder::new(bbox, points);
        let mut order: Vec<usize> = (8..b.points.len()).collect();
        order.shuffle(&mut b.rng);
        let mut skipped = 0usize;
        for pid in order {
            if !b.insert(pid)? {
                skipped += 1;
            }
        }
        let tets: Vec<[usize; 4]> = b.cells.iter().filter(|c| !c.removed).map(|c| c.v).collect();
        debug!(n_points = b.points.len(), n_tets = tets.len(), skipped, "delaunay done");
        Ok(Delaunay {
            points: b.points,
            tets,
        })
    }
}

impl Builder {
    fn new(bbox: &Aabb, points: &[Point3]) -> Self {
        let mut all = bbox.corners().to_vec();
        all.extend_from_slice(points);

        // Kuhn triangulation: one tet per axis permutation along the 0-7 diagonal.
        let mut cells = Vec::with_capacity(6);
        for perm in [[1, 2, 4], [1, 4, 2], [2, 1, 4], [2, 4, 1], [4, 1, 2], [4, 2, 1]] {
            let mut v = [0, perm[0], perm[0] + perm[1], 7];
            if orient3d(&all[v[0]], &all[v[1]], &all[v[2]], &all[v[3]]) < 0 {
                v.swap(2, 3);
            }
            cells.push(Cell {
                v,
                nb: [NONE; 4],
                removed: false,
            });
        }
        let mut open: AHashMap<[usize; 3], (usize, usize)> = AHashMap::new();
        for c in 0..cells.len() {
            for i in 0..4 {
                let key = facet_key(&cells[c].v, i);
                if let Some((d, j)) = open.remove(&key) {
                    cells[c].nb[i] = d;
                    cells[d].nb[j] = c;
                } else {
                    open.insert(key, (c, i));
                }
            }
        }

        Self {
            points: all,
            cells,
            last: 0,
            rng: StdRng::seed_from_u64(INSERTION_SEED),
        }
    }

    #[inline]
    fn sees(&self, c: usize, i: usize, p: &Point3) -> i8 {
        let v = &self.cells[c].v;
        let f = FACETS[i];
        orient3d(&self.points[v[f[0]]], &self.points[v[f[1]]], &self.points[v[f[2]]], p)
    }

    /// Stochastic visibility walk from the last created cell; a linear scan
    /// backs it up if the walk does not settle.
    fn locate(&mut self, p: &Point3) -> Option<usize> {
        let mut c = self.last;
        let max_steps = 4 * self.cells.len() + 16;
        'walk: for _ in 0..max_steps {
            let start = self.rng.random_range(0..4);
            for k in 0..4 {
                let i = (start + k) % 4;
                if self.sees(c, i, p) > 0 {
                    let n = self.cells[c].nb[i];
                    if n == NONE {
                        return None;
                    }
                    c = n;
                    continue 'walk;
                }
            }
            return Some(c);
        }
        trace!("walk did not settle, scanning");
        (0..self.cells.len()).find(|&c| !self.cells[c].removed && (0..4).all(|i| self.sees(c, i, p) <= 0))
    }

    fn in_conflict(&self, c: usize, p: &Point3) -> bool {
        let v = self.cells[c].v.map(|i| &self.points[i]);
        insphere(v[0], v[1], v[2], v[3], p) > 0
    }

    /// Insert point `pid`. Returns `false` for a duplicate.
    fn insert(&mut self, pid: usize) -> TetResult<bool> {
        let p = self.points[pid];
        let Some(start) = self.locate(&p) else {
            return Err(TetError::Delaunay(format!("cannot locate point {pid}")));
        };
        if self.cells[start].v.iter().any(|&v| self.points[v] == p) {
            trace!(pid, "duplicate point skipped");
            return Ok(false);
        }

        // Conflict region. `member` answers membership, `in_cavity` keeps the order.
        let mut member: AHashSet<usize> = AHashSet::new();
        member.insert(start);
        let mut in_cavity = vec![start];
        let mut stack = vec![start];
        while let Some(c) = stack.pop() {
            for &n in &self.cells[c].nb {
                if n != NONE && !member.contains(&n) && self.in_conflict(n, &p) {
                    member.insert(n);
                    in_cavity.push(n);
                    stack.push(n);
                }
            }
        }

        // Shrink until every boundary facet is strictly visible from p.
        loop {
            let bad = in_cavity.iter().copied().find(|&c| {
                (0..4).any(|i| {
                    let n = self.cells[c].nb[i];
                    (n == NONE || !member.contains(&n)) && self.sees(c, i, &p) >= 0
                })
            });
            match bad {
                None => break,
                Some(c) if c == start => {
                    return Err(TetError::Delaunay(format!("cavity of point {pid} is not star-shaped")));
                }
                Some(c) => {
                    member.remove(&c);
                    in_cavity.retain(|&x| x != c);
                }
            }
        }
        in_cavity.sort_unstable();

        let mut open: AHashMap<[usize; 3], (usize, usize)> = AHashMap::new();
        for &c in &in_cavity {
            for i in 0..4 {
                let outer = self.cells[c].nb[i];
                if outer != NONE && member.contains(&outer) {
                    continue;
                }
                let mut v = self.cells[c].v;
                v[i] = pid;
                let n = self.cells.len();
                let mut nb = [NONE; 4];
                nb[i] = outer;
                if outer != NONE {
                    if let Some(k) = self.cells[outer].nb.iter().position(|&x| x == c) {
                        self.cells[outer].nb[k] = n;
                    }
                }
                self.cells.push(Cell { v, nb, removed: false });
                for j in (0..4).filter(|&j| j != i) {
                    let key = facet_key(&v, j);
                    if let Some((d, l)) = open.remove(&key) {
                        self.cells[n].nb[j] = d;
                        self.cells[d].nb[l] = n;
                    } else {
                        open.insert(key, (n, j));
                    }
                }
                self.last = n;
            }
        }
        for &c in &in_cavity {
            self.cells[c].removed = true;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::orientation::signed_volume6;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
    }

    fn random_points(n: usize, seed: u64) -> Vec<Point3> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Point3::new(
                    rng.random_range(0.05..0.95),
                    rng.random_range(0.05..0.95),
                    rng.random_range(0.05..0.95),
                )
            })
            .collect()
    }

    #[test]
    fn empty_box_is_six_tets() {
        let dt = Delaunay::build(&unit_box(), &[]).unwrap();
        assert_eq!(dt.tets.len(), 6);
        let vol: f64 = dt
            .tets
            .iter()
            .map(|t| signed_volume6(&dt.points[t[0]], &dt.points[t[1]], &dt.points[t[2]], &dt.points[t[3]]) / 6.0)
            .sum();
        assert_relative_eq!(vol, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cells_are_positive_and_fill_the_box() {
        let pts = random_points(40, 7);
        let dt = Delaunay::build(&unit_box(), &pts).unwrap();
        let mut vol = 0.0;
        for t in &dt.tets {
            let [a, b, c, d] = t.map(|i| dt.points[i]);
            assert_eq!(orient3d(&a, &b, &c, &d), 1);
            vol += signed_volume6(&a, &b, &c, &d) / 6.0;
        }
        assert_relative_eq!(vol, 1.0, epsilon = 1e-9);
        let used: std::collections::BTreeSet<usize> = dt.tets.iter().flatten().copied().collect();
        assert_eq!(used.len(), 48);
    }

    #[test]
    fn circumspheres_are_empty() {
        let pts = random_points(30, 11);
        let dt = Delaunay::build(&unit_box(), &pts).unwrap();
        for t in &dt.tets {
            let [a, b, c, d] = t.map(|i| dt.points[i]);
            for (i, p) in dt.points.iter().enumerate() {
                if t.contains(&i) {
                    continue;
                }
                assert!(insphere(&a, &b, &c, &d, p) <= 0, "vertex {i} inside circumsphere of {t:?}");
            }
        }
    }

    #[test]
    fn duplicates_and_outside_points() {
        let p = Point3::new(0.5, 0.5, 0.5);
        let dt = Delaunay::build(&unit_box(), &[p, p]).unwrap();
        let used: std::collections::BTreeSet<usize> = dt.tets.iter().flatten().copied().collect();
        assert_eq!(used.len(), 9);

        let outside = Point3::new(1.5, 0.5, 0.5);
        assert!(Delaunay::build(&unit_box(), &[outside]).is_err());
    }
}
