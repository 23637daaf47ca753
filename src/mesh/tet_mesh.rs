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

use crate::geometry::{aabb::Aabb, point::Point3};
use crate::kernel::orientation::{orient3d, orient3d_exact};
use crate::mesh::vertex::{TetVertex, VertexPos};
use crate::quality::{FACETS, MAX_ENERGY, QualitySummary, TetQuality, tet_quality};

/// Which side of the input triangle's normal a tet lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Front,
    Back,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetTag {
    #[default]
    Interior,
    Surface(Side),
    BoundingBox,
}

impl FacetTag {
    #[inline]
    pub fn is_surface(self) -> bool {
        matches!(self, FacetTag::Surface(_))
    }

    /// Tag seen from the tet on the other side of the facet.
    pub fn flipped(self) -> FacetTag {
        match self {
            FacetTag::Surface(s) => FacetTag::Surface(s.opposite()),
            t => t,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tet {
    pub v: [usize; 4],
    /// `tags[i]` labels the facet opposite `v[i]`.
    pub tags: [FacetTag; 4],
    pub quality: TetQuality,
    pub removed: bool,
}

impl Tet {
    /// Local index of the facet made of the given three vertices.
    pub fn facet_of(&self, f: &[usize; 3]) -> Option<usize> {
        (0..4).find(|&i| !f.contains(&self.v[i]) && f.iter().all(|x| self.v.contains(x)))
    }

    #[inline]
    pub fn local(&self, v: usize) -> Option<usize> {
        self.v.iter().position(|&x| x == v)
    }

    /// Facet `i` with outward orientation.
    pub fn facet(&self, i: usize) -> [usize; 3] {
        FACETS[i].map(|j| self.v[j])
    }
}

/// Tet arena with tombstones. Indices stay stable until [`TetMesh::compact`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TetMesh {
    pub vertices: Vec<TetVertex>,
    pub tets: Vec<Tet>,
    /// The enlarged box whose faces carry `BoundingBox` facets.
    pub bbox: Option<Aabb>,
}

impl TetMesh {
    pub fn new(bbox: Option<Aabb>) -> Self {
        Self {
            vertices: Vec::new(),
            tets: Vec::new(),
            bbox,
        }
    }

    pub fn add_vertex(&mut self, v: TetVertex) -> usize {
        self.vertices.push(v);
        self.vertices.len() - 1
    }

    #[inline]
    pub fn posf(&self, v: usize) -> Point3 {
        self.vertices[v].posf()
    }

    pub fn points(&self, v: &[usize; 4]) -> [Point3; 4] {
        v.map(|i| self.posf(i))
    }

    pub fn quality_of(&self, v: &[usize; 4]) -> TetQuality {
        tet_quality(&self.points(v))
    }

    /// Exact orientation sign of `v` with vertex positions looked up through `pos`.
    pub fn orient_with<F>(v: &[usize; 4], pos: F) -> i8
    where
        F: Fn(usize) -> VertexPos,
    {
        let p = v.map(&pos);
        if p.iter().all(VertexPos::is_rounded) {
            return orient3d(&p[0].posf(), &p[1].posf(), &p[2].posf(), &p[3].posf());
        }
        match (p[0].to_exact(), p[1].to_exact(), p[2].to_exact(), p[3].to_exact()) {
            (Some(a), Some(b), Some(c), Some(d)) => orient3d_exact(&a, &b, &c, &d),
            _ => 0,
        }
    }

    pub fn orient(&self, v: &[usize; 4]) -> i8 {
        Self::orient_with(v, |i| self.vertices[i].pos.clone())
    }

    pub fn add_tet(&mut self, v: [usize; 4], tags: [FacetTag; 4]) -> usize {
        let t = self.tets.len();
        let quality = self.quality_of(&v);
        self.tets.push(Tet {
            v,
            tags,
            quality,
            removed: false,
        });
        for &vi in &v {
            let conn = &mut self.vertices[vi].conn_tets;
            if let Err(pos) = conn.binary_search(&t) {
                conn.insert(pos, t);
            }
        }
        t
    }

    pub fn remove_tet(&mut self, t: usize) {
        self.tets[t].removed = true;
        for vi in self.tets[t].v {
            let conn = &mut self.vertices[vi].conn_tets;
            if let Ok(pos) = conn.binary_search(&t) {
                conn.remove(pos);
            }
        }
    }

    pub fn live_tets(&self) -> impl Iterator<Item = usize> + '_ {
        self.tets.iter().enumerate().filter(|(_, t)| !t.removed).map(|(i, _)| i)
    }

    pub fn n_live_tets(&self) -> usize {
        self.tets.iter().filter(|t| !t.removed).count()
    }

    pub fn n_live_vertices(&self) -> usize {
        self.vertices.iter().filter(|v| !v.removed).count()
    }

    /// Live tets containing both `a` and `b`, sorted.
    pub fn edge_tets(&self, a: usize, b: usize) -> Vec<usize> {
        let cb = &self.vertices[b].conn_tets;
        self.vertices[a]
            .conn_tets
            .iter()
            .copied()
            .filter(|t| cb.binary_search(t).is_ok())
            .collect()
    }

    /// Live tets containing the facet `f`, sorted (at most two).
    pub fn face_tets(&self, f: &[usize; 3]) -> Vec<usize> {
        let mut out = self.edge_tets(f[0], f[1]);
        out.retain(|&t| self.tets[t].v.contains(&f[2]));
        out
    }

    /// Sorted one-ring of `v`.
    pub fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.vertices[v]
            .conn_tets
            .iter()
            .flat_map(|&t| self.tets[t].v)
            .filter(|&u| u != v)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Box planes a vertex lies on, one bit per `min_x, max_x, min_y, ...`.
    pub fn bbox_planes(&self, v: usize) -> u8 {
        let Some(b) = &self.bbox else {
            return 0;
        };
        let p = self.posf(v);
        let mut mask = 0u8;
        for axis in 0..3 {
            if p[axis] == b.min[axis] {
                mask |= 1 << (2 * axis);
            }
            if p[axis] == b.max[axis] {
                mask |= 1 << (2 * axis + 1);
            }
        }
        mask
    }

    pub fn recompute_quality(&mut self, t: usize) {
        self.tets[t].quality = self.quality_of(&self.tets[t].v);
    }

    pub fn max_energy(&self) -> f64 {
        self.tets
            .iter()
            .filter(|t| !t.removed)
            .map(|t| t.quality.energy)
            .fold(0.0, f64::max)
    }

    pub fn quality_summary(&self) -> Option<QualitySummary> {
        QualitySummary::from_qualities(self.tets.iter().filter(|t| !t.removed).map(|t| &t.quality))
    }

    /// Demote `v` to its double if every incident tet stays positive.
    /// Returns whether `v` is rounded afterwards.
    pub fn try_round(&mut self, v: usize) -> bool {
        if self.vertices[v].pos.is_rounded() {
            return true;
        }
        let rounded = self.vertices[v].pos.rounded();
        let ok = self.vertices[v].conn_tets.iter().all(|&t| {
            Self::orient_with(&self.tets[t].v, |i| {
                if i == v {
                    rounded.clone()
                } else {
                    self.vertices[i].pos.clone()
                }
            }) > 0
        });
        if ok {
            self.vertices[v].pos = rounded;
        }
        ok
    }

    /// Demote exact vertices whose double keeps every incident tet positive.
    /// Returns the number of vertices still exact.
    pub fn round_vertices(&mut self) -> usize {
        let mut unrounded = 0;
        for v in 0..self.vertices.len() {
            if !self.vertices[v].removed && !self.try_round(v) {
                unrounded += 1;
            }
        }
        unrounded
    }

    /// Live tets that are flat or inverted in double coordinates, sorted.
    pub fn flat_tets(&self) -> Vec<usize> {
        self.live_tets().filter(|&t| self.tets[t].quality.energy >= MAX_ENERGY).collect()
    }

    /// Drop every live tet that is flat in doubles and retry rounding around
    /// them. Returns the number of tets dropped.
    pub fn remove_flat_tets(&mut self) -> usize {
        let flat = self.flat_tets();
        let mut touched: Vec<usize> = flat.iter().flat_map(|&t| self.tets[t].v).collect();
        for &t in &flat {
            self.remove_tet(t);
        }
        touched.sort_unstable();
        touched.dedup();
        for v in touched {
            if self.vertices[v].conn_tets.is_empty() {
                self.vertices[v].removed = true;
            } else {
                self.try_round(v);
            }
        }
        flat.len()
    }

    pub fn n_unrounded(&self) -> usize {
        self.vertices.iter().filter(|v| !v.removed && !v.pos.is_rounded()).count()
    }

    /// Outward facets tagged `Surface(Back)`: the tracked input surface.
    pub fn tracked_surface(&self) -> Vec<[usize; 3]> {
        let mut out = Vec::new();
        for t in self.tets.iter().filter(|t| !t.removed) {
            for i in 0..4 {
                if t.tags[i] == FacetTag::Surface(Side::Back) {
                    out.push(t.facet(i));
                }
            }
        }
        out
    }

    /// Mark vertices with no live tet as removed.
    pub fn remove_isolated_vertices(&mut self) {
        for v in &mut self.vertices {
            if v.conn_tets.is_empty() {
                v.removed = true;
            }
        }
    }

    /// Drop tombstones and renumber. Only between stages.
    pub fn compact(&mut self) {
        self.remove_isolated_vertices();
        let mut map = vec![usize::MAX; self.vertices.len()];
        let mut vertices = Vec::with_capacity(self.vertices.len());
        for (i, v) in self.vertices.drain(..).enumerate() {
            if !v.removed {
                map[i] = vertices.len();
                vertices.push(TetVertex {
                    conn_tets: Vec::new(),
                    ..v
                });
            }
        }
        let tets: Vec<Tet> = self.tets.drain(..).filter(|t| !t.removed).collect();
        self.vertices = vertices;
        for mut t in tets {
            t.v = t.v.map(|i| map[i]);
            let ti = self.tets.len();
            for &vi in &t.v {
                self.vertices[vi].conn_tets.push(ti);
            }
            self.tets.push(t);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn two_tets() -> TetMesh {
        let mut m = TetMesh::new(None);
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ] {
            m.add_vertex(TetVertex::new(VertexPos::Float(p)));
        }
        m.add_tet([0, 1, 2, 3], [FacetTag::Interior; 4]);
        m.add_tet([0, 2, 1, 4], [FacetTag::Interior; 4]);
        m
    }

    #[test]
    fn adjacency_queries() {
        let m = two_tets();
        assert_eq!(m.orient(&[0, 1, 2, 3]), 1);
        assert_eq!(m.orient(&[0, 2, 1, 4]), 1);
        assert_eq!(m.edge_tets(0, 1), vec![0, 1]);
        assert_eq!(m.face_tets(&[2, 1, 0]), vec![0, 1]);
        assert_eq!(m.neighbors(3), vec![0, 1, 2]);
        assert_eq!(m.tets[0].facet_of(&[1, 2, 3]), Some(0));
    }

    #[test]
    fn compact_renumbers() {
        let mut m = two_tets();
        m.remove_tet(0);
        m.compact();
        assert_eq!(m.tets.len(), 1);
        assert_eq!(m.vertices.len(), 4);
        assert_eq!(m.tets[0].v, [0, 2, 1, 3]);
        assert_eq!(m.orient(&m.tets[0].v), 1);
    }

    #[test]
    fn bbox_plane_mask() {
        let mut m = two_tets();
        m.bbox = Some(Aabb::new(Point3::new(0.0, 0.0, -1.0), Point3::new(1.0, 1.0, 1.0)));
        assert_eq!(m.bbox_planes(0), 0b00_01_01);
        assert_eq!(m.bbox_planes(3), 0b10_01_01);
    }
}
