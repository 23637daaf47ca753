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

//! Target edge lengths: the per-vertex scale field, an optional background
//! sizing mesh, and the adaptive updates applied when quality stalls.

use tracing::{debug, info};

use crate::config::BackgroundMesh;
use crate::geometry::{aabb::Aabb, aabb_tree::AabbTree, point::Point3};
use crate::kernel::orientation::signed_volume6;
use crate::quality::MAX_ENERGY;

use super::Refiner;

// Barycentric slack when deciding which background tet holds a point.
const BARY_TOL: f64 = 1e-10;

/// A background tet mesh carrying one target edge length per vertex.
pub struct BackgroundSizing {
    vertices: Vec<Point3>,
    tets: Vec<[usize; 4]>,
    sizing: Vec<f64>,
    tree: Option<AabbTree<usize>>,
}

impl BackgroundSizing {
    pub fn new(bg: &BackgroundMesh) -> Self {
        let vertices: Vec<Point3> = bg.vertices.iter().map(|&p| Point3::from_array(p)).collect();
        let items = bg
            .tets
            .iter()
            .enumerate()
            .filter_map(|(i, t)| Some((Aabb::from_points(t.iter().map(|&v| &vertices[v]))?, i)))
            .collect();
        let tree = AabbTree::build(items);
        Self {
            vertices,
            tets: bg.tets.clone(),
            sizing: bg.sizing.clone(),
            tree,
        }
    }

    /// Linearly interpolated sizing at `p`; `None` outside the background mesh.
    pub fn value_at(&self, p: &Point3) -> Option<f64> {
        let tree = self.tree.as_ref()?;
        let mut hits = Vec::new();
        tree.query(&Aabb::new(*p, *p), &mut hits);
        let mut hits: Vec<usize> = hits.into_iter().copied().collect();
        hits.sort_unstable();
        hits.into_iter().find_map(|t| self.interpolate(t, p))
    }

    fn interpolate(&self, t: usize, p: &Point3) -> Option<f64> {
        let v = self.tets[t];
        let q = v.map(|i| self.vertices[i]);
        let total = signed_volume6(&q[0], &q[1], &q[2], &q[3]);
        if total == 0.0 {
            return None;
        }
        let mut value = 0.0;
        for k in 0..4 {
            let mut r = q;
            r[k] = *p;
            let w = signed_volume6(&r[0], &r[1], &r[2], &r[3]) / total;
            if w < -BARY_TOL {
                return None;
            }
            value += w * self.sizing[v[k]];
        }
        Some(value)
    }
}

impl Refiner<'_> {
    /// Desired length of edge `(a, b)`.
    pub(crate) fn target_length(&self, a: usize, b: usize) -> f64 {
        let scale = 0.5 * (self.mesh.vertices[a].scale + self.mesh.vertices[b].scale);
        let mid = self.mesh.posf(a).midpoint(&self.mesh.posf(b));
        match self.sizing.and_then(|s| s.value_at(&mid)) {
            Some(h) => h * scale,
            None => self.state.initial_edge_len * scale,
        }
    }

    fn min_scale(&self) -> f64 {
        0.5 * self.state.eps / self.state.initial_edge_len
    }

    /// Relax the envelope if a sub-stage is left, otherwise shrink the target
    /// length around the tets still above the energy threshold. Tets that are
    /// flat in doubles are left to the degenerate pass: splitting around them
    /// only multiplies them.
    pub(crate) fn update_scaling(&mut self) -> bool {
        if self.state.advance_sub_stage() {
            info!(sub_stage = self.state.sub_stage, eps = self.state.eps, "envelope relaxed");
            return true;
        }
        let thres = self.config.filter_energy_thres;
        let mut bad: Vec<usize> = self
            .mesh
            .live_tets()
            .filter(|&t| {
                let e = self.mesh.tets[t].quality.energy;
                e > thres && e < MAX_ENERGY
            })
            .flat_map(|t| self.mesh.tets[t].v)
            .collect();
        bad.sort_unstable();
        bad.dedup();

        let floor = self.min_scale();
        let factor = self.config.adaptive_scalar;
        let mut changed = 0;
        for v in bad {
            let old = self.mesh.vertices[v].scale;
            let new = (old * factor).max(floor);
            if new < old {
                self.mesh.vertices[v].scale = new;
                changed += 1;
            }
        }
        debug!(changed, "sizing field refined");
        changed > 0
    }

    /// Scale every target length by ±10% when the vertex count is off target by
    /// more than 5%.
    pub(crate) fn nudge_toward_target(&mut self) -> bool {
        let Some(target) = self.config.target_num_vertices else {
            return false;
        };
        let n = self.mesh.n_live_vertices() as f64;
        let t = target as f64;
        if (n - t).abs() <= 0.05 * t {
            return false;
        }
        let factor = if n > t { 1.1 } else { 0.9 };
        let floor = self.min_scale();
        for v in self.mesh.vertices.iter_mut().filter(|v| !v.removed) {
            v.scale = (v.scale * factor).max(floor);
        }
        debug!(n_v = n, target, factor, "vertex budget nudge");
        true
    }
}
