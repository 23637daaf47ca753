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

use crate::geometry::{aabb::Aabb, point::Point3};

/// A static AABB-tree over generic data `D`.
pub enum AabbTree<D> {
    Leaf {
        aabb: Aabb,
        data: D,
    },
    Node {
        aabb: Aabb,
        left: Box<AabbTree<D>>,
        right: Box<AabbTree<D>>,
        count: usize,
    },
}

impl<D> AabbTree<D> {
    /// Build an AABB-tree over `(aabb, data)` pairs via recursive median split
    /// along the longest axis. Returns `None` for an empty item list.
    pub fn build(items: Vec<(Aabb, D)>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(Self::build_binary_tree(items))
    }

    fn build_binary_tree(mut items: Vec<(Aabb, D)>) -> Self {
        if items.len() == 1 {
            let (aabb, data) = items.remove(0);
            return AabbTree::Leaf { aabb, data };
        }

        let mut bounds = items[0].0;
        for (b, _) in items.iter().skip(1) {
            bounds = bounds.union(b);
        }
        let axis = bounds.longest_axis();
        items.sort_by(|a, b| a.0.center(axis).total_cmp(&b.0.center(axis)));

        let mid = items.len() / 2;
        let right_items = items.split_off(mid); // items = left half

        let left = Box::new(Self::build_binary_tree(items));
        let right = Box::new(Self::build_binary_tree(right_items));
        let count = left.size() + right.size();

        AabbTree::Node {
            aabb: bounds,
            left,
            right,
            count,
        }
    }

    /// Get AABB of this node/leaf
    pub fn aabb(&self) -> &Aabb {
        match self {
            AabbTree::Leaf { aabb, .. } => aabb,
            AabbTree::Node { aabb, .. } => aabb,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            AabbTree::Leaf { .. } => 1,
            AabbTree::Node { count, .. } => *count,
        }
    }

    /// Collect all `&D` whose AABB intersects `query`.
    pub fn query<'a>(&'a self, query: &Aabb, out: &mut Vec<&'a D>) {
        match self {
            AabbTree::Leaf { aabb, data } => {
                if aabb.intersects(query) {
                    out.push(data);
                }
            }
            AabbTree::Node {
                aabb, left, right, ..
            } => {
                if aabb.intersects(query) {
                    left.query(query, out);
                    right.query(query, out);
                }
            }
        }
    }

    /// Item minimizing `dist2(item)`, with `dist2` bounded below by the
    /// squared point-box distance of the item's AABB.
    pub fn nearest<F>(&self, p: &Point3, dist2: &F) -> Option<(f64, &D)>
    where
        F: Fn(&D) -> f64,
    {
        let mut best = None;
        self.nearest_rec(p, dist2, &mut best);
        best
    }

    fn nearest_rec<'a, F>(&'a self, p: &Point3, dist2: &F, best: &mut Option<(f64, &'a D)>)
    where
        F: Fn(&D) -> f64,
    {
        let bound = best.map_or(f64::INFINITY, |b| b.0);
        match self {
            AabbTree::Leaf { aabb, data } => {
                if aabb.squared_distance(p) < bound {
                    let d = dist2(data);
                    if d < bound {
                        *best = Some((d, data));
                    }
                }
            }
            AabbTree::Node {
                aabb, left, right, ..
            } => {
                if aabb.squared_distance(p) >= bound {
                    return;
                }
                let dl = left.aabb().squared_distance(p);
                let dr = right.aabb().squared_distance(p);
                if dl <= dr {
                    left.nearest_rec(p, dist2, best);
                    right.nearest_rec(p, dist2, best);
                } else {
                    right.nearest_rec(p, dist2, best);
                    left.nearest_rec(p, dist2, best);
                }
            }
        }
    }

    /// Early-exit test: is any item within squared distance `r2` of `p`?
    pub fn any_within<F>(&self, p: &Point3, r2: f64, dist2: &F) -> bool
    where
        F: Fn(&D) -> f64,
    {
        match self {
            AabbTree::Leaf { aabb, data } => aabb.squared_distance(p) <= r2 && dist2(data) <= r2,
            AabbTree::Node {
                aabb, left, right, ..
            } => {
                aabb.squared_distance(p) <= r2
                    && (left.any_within(p, r2, dist2) || right.any_within(p, r2, dist2))
            }
        }
    }
}
