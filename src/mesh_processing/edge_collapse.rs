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

use tracing::trace;

use crate::envelope::EnvelopeCheck;
use crate::geometry::{aabb::Aabb, point::Point3, tri_tri_intersect::faces_conflict, util::triangle_normal};
use crate::kernel::predicates::is_degenerate_triangle;
use crate::mesh_processing::spatial_hash::SpatialHash;
use crate::mesh_processing::surface::{SurfaceMesh, edge_key, face_key};

/// Triangle mesh under local edits: tombstoned faces, per-vertex face lists
/// and a grid for self-intersection queries.
pub struct WorkingSurface {
    pub vertices: Vec<Point3>,
    pub faces: Vec<[usize; 3]>,
    pub face_removed: Vec<bool>,
    pub vertex_removed: Vec<bool>,
    v_faces: Vec<Vec<usize>>,
    grid: SpatialHash,
}

impl WorkingSurface {
    pub fn new(mesh: SurfaceMesh) -> Self {
        let cell = (2.0 * mesh.average_edge_length()).max(1e-9);
        let mut v_faces = vec![Vec::new(); mesh.vertices.len()];
        let mut grid = SpatialHash::new(cell);
        for (fi, f) in mesh.faces.iter().enumerate() {
            for &v in f {
                v_faces[v].push(fi);
            }
            if let Some(b) = Aabb::from_points(f.iter().map(|&v| &mesh.vertices[v])) {
                grid.insert(fi, &b);
            }
        }
        Self {
            face_removed: vec![false; mesh.faces.len()],
            vertex_removed: vec![false; mesh.vertices.len()],
            vertices: mesh.vertices,
            faces: mesh.faces,
            v_faces,
            grid,
        }
    }

    /// Drop tombstones and unreferenced vertices.
    pub fn into_mesh(self) -> SurfaceMesh {
        let faces = self
            .faces
            .iter()
            .zip(&self.face_removed)
            .filter(|(_, removed)| !**removed)
            .map(|(f, _)| *f)
            .collect();
        let mut mesh = SurfaceMesh {
            vertices: self.vertices,
            faces,
        };
        mesh.remove_unreferenced();
        mesh
    }

    #[inline]
    pub fn vertex_faces(&self, v: usize) -> &[usize] {
        &self.v_faces[v]
    }

    pub fn face_points(&self, f: &[usize; 3]) -> [Point3; 3] {
        [self.vertices[f[0]], self.vertices[f[1]], self.vertices[f[2]]]
    }

    /// Live faces containing both `a` and `b`.
    pub fn edge_faces(&self, a: usize, b: usize) -> Vec<usize> {
        self.v_faces[a]
            .iter()
            .copied()
            .filter(|&f| self.faces[f].contains(&b))
            .collect()
    }

    /// Sorted one-ring of `v`.
    pub fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.v_faces[v]
            .iter()
            .flat_map(|&f| self.faces[f])
            .filter(|&u| u != v)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn is_border_vertex(&self, v: usize) -> bool {
        self.neighbors(v).into_iter().any(|u| self.edge_faces(v, u).len() == 1)
    }

    /// All live edges, sorted by key.
    pub fn live_edges(&self) -> Vec<[usize; 2]> {
        let mut edges: Vec<[usize; 2]> = Vec::new();
        for (fi, f) in self.faces.iter().enumerate() {
            if self.face_removed[fi] {
                continue;
            }
            for k in 0..3 {
                edges.push(edge_key(f[k], f[(k + 1) % 3]));
            }
        }
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    /// Would any of `new_faces` (with positions overridden by `moved`) cross a
    /// live face outside `ignore`?
    pub fn conflicts(&self, new_faces: &[[usize; 3]], moved: Option<(usize, Point3)>, ignore: &[usize]) -> bool {
        let pos = |v: usize| match moved {
            Some((m, p)) if m == v => p,
            _ => self.vertices[v],
        };
        let mut hits = Vec::new();
        for nf in new_faces {
            let pn = [pos(nf[0]), pos(nf[1]), pos(nf[2])];
            let Some(b) = Aabb::from_points(pn.iter()) else {
                continue;
            };
            self.grid.query(&b, &mut hits);
            for &g in &hits {
                if self.face_removed[g] || ignore.contains(&g) {
                    continue;
                }
                let gf = self.faces[g];
                let pg = [pos(gf[0]), pos(gf[1]), pos(gf[2])];
                if faces_conflict(nf, &pn, &gf, &pg) {
                    return true;
                }
            }
        }
        false
    }

    /// Tombstone `removed`, append `added` and refresh adjacency.
    pub fn replace_faces(&mut self, removed: &[usize], added: Vec<[usize; 3]>) {
        for &f in removed {
            self.face_removed[f] = true;
            for v in self.faces[f] {
                self.v_faces[v].retain(|&g| g != f);
            }
        }
        for f in added {
            let fi = self.faces.len();
            self.faces.push(f);
            self.face_removed.push(false);
            for v in f {
                self.v_faces[v].push(fi);
            }
            if let Some(b) = Aabb::from_points(f.iter().map(|&v| &self.vertices[v])) {
                self.grid.insert(fi, &b);
            }
        }
    }

    /// A border vertex whose two border neighbours are collinear with it; it
    /// can slide away without changing the outline.
    fn is_straight_border_vertex(&self, v: usize) -> bool {
        let border: Vec<usize> = self
            .neighbors(v)
            .into_iter()
            .filter(|&u| self.edge_faces(v, u).len() == 1)
            .collect();
        let [p, q] = border[..] else {
            return false;
        };
        is_degenerate_triangle(&self.vertices[p], &self.vertices[v], &self.vertices[q])
    }

    fn has_face(&self, key: &[usize; 3], ignore: &[usize]) -> bool {
        self.v_faces[key[0]]
            .iter()
            .any(|&g| !ignore.contains(&g) && face_key(&self.faces[g]) == *key)
    }
}

/// What the "begin" phase returns if everything is okay.
/// Feed this into [`WorkingSurface::commit_collapse`].
#[derive(Debug)]
pub struct CollapsePlan {
    pub v_keep: usize,
    pub v_gone: usize,
    pub p_star: Point3,
    pub removed_faces: Vec<usize>,
    pub new_faces: Vec<[usize; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseReject {
    NotAdjacent,
    NonManifold,
    BorderForbidden,
    LinkCondition,  // common neighbors != edge opposites
    DuplicateFaces, // a surviving face would repeat an existing one
    DegenerateFace, // zero area after placement
    NormalFlip,     // orientation flips after placement
    Envelope,
    SelfIntersection,
}

pub struct CollapseOpts {
    /// If true, do not allow collapsing a border edge.
    pub forbid_border: bool,
    /// If true, reject when any surviving triangle flips orientation at p*.
    pub forbid_normal_flip: bool,
}

impl Default for CollapseOpts {
    fn default() -> Self {
        Self {
            forbid_border: false,
            forbid_normal_flip: true,
        }
    }
}

pub trait Placement {
    fn place(&self, mesh: &WorkingSurface, v_keep: usize, v_gone: usize) -> Point3;
}

/// Keep the surviving vertex where it is.
pub struct KeepVertex;
impl Placement for KeepVertex {
    fn place(&self, mesh: &WorkingSurface, v_keep: usize, _v_gone: usize) -> Point3 {
        mesh.vertices[v_keep]
    }
}

pub struct Midpoint;
impl Placement for Midpoint {
    fn place(&self, mesh: &WorkingSurface, v_keep: usize, v_gone: usize) -> Point3 {
        mesh.vertices[v_keep].midpoint(&mesh.vertices[v_gone])
    }
}

impl WorkingSurface {
    /// Check whether merging `v_gone` into `v_keep` is admissible.
    pub fn begin_collapse(
        &self,
        v_keep: usize,
        v_gone: usize,
        placement: &dyn Placement,
        opts: &CollapseOpts,
        envelope: &EnvelopeCheck<'_>,
    ) -> Result<CollapsePlan, CollapseReject> {
        let edge = self.edge_faces(v_keep, v_gone);
        match edge.len() {
            0 => return Err(CollapseReject::NotAdjacent),
            1 | 2 => {}
            _ => return Err(CollapseReject::NonManifold),
        }

        // Border edges collapse along the border only; a border vertex never
        // moves inward.
        let border_edge = edge.len() == 1;
        if border_edge && opts.forbid_border {
            return Err(CollapseReject::BorderForbidden);
        }
        if !border_edge && self.is_border_vertex(v_gone) {
            return Err(CollapseReject::BorderForbidden);
        }
        if border_edge && !self.is_straight_border_vertex(v_gone) {
            return Err(CollapseReject::BorderForbidden);
        }

        // Link condition.
        let mut opposite: Vec<usize> = edge
            .iter()
            .filter_map(|&f| self.faces[f].iter().copied().find(|&v| v != v_keep && v != v_gone))
            .collect();
        opposite.sort_unstable();
        let n_gone = self.neighbors(v_gone);
        let n_keep = self.neighbors(v_keep);
        let common: Vec<usize> = n_gone.iter().copied().filter(|v| n_keep.binary_search(v).is_ok()).collect();
        if common != opposite {
            return Err(CollapseReject::LinkCondition);
        }

        let p_star = placement.place(self, v_keep, v_gone);
        let pos = |v: usize| {
            if v == v_keep || v == v_gone {
                p_star
            } else {
                self.vertices[v]
            }
        };

        let mut new_faces = Vec::new();
        let mut touched = Vec::new();
        for &f in self.v_faces[v_gone].iter().chain(self.v_faces[v_keep].iter()) {
            if edge.contains(&f) || touched.contains(&f) {
                continue;
            }
            touched.push(f);
            let old = self.faces[f];
            let new = old.map(|v| if v == v_gone { v_keep } else { v });
            let pn = [pos(new[0]), pos(new[1]), pos(new[2])];
            if is_degenerate_triangle(&pn[0], &pn[1], &pn[2]) {
                return Err(CollapseReject::DegenerateFace);
            }
            if opts.forbid_normal_flip {
                let po = self.face_points(&old);
                let n_old = triangle_normal(&po[0], &po[1], &po[2]);
                let n_new = triangle_normal(&pn[0], &pn[1], &pn[2]);
                if n_old.dot(&n_new) <= 0.0 {
                    return Err(CollapseReject::NormalFlip);
                }
            }
            if old.contains(&v_gone) && self.has_face(&face_key(&new), &edge) {
                return Err(CollapseReject::DuplicateFaces);
            }
            if !envelope.facet_ok(&pn) {
                return Err(CollapseReject::Envelope);
            }
            new_faces.push(new);
        }

        let mut removed_faces = edge;
        removed_faces.extend_from_slice(&touched);
        if self.conflicts(&new_faces, Some((v_keep, p_star)), &removed_faces) {
            return Err(CollapseReject::SelfIntersection);
        }

        Ok(CollapsePlan {
            v_keep,
            v_gone,
            p_star,
            removed_faces,
            new_faces,
        })
    }

    pub fn commit_collapse(&mut self, plan: CollapsePlan) {
        trace!(v_keep = plan.v_keep, v_gone = plan.v_gone, "surface collapse");
        self.vertices[plan.v_keep] = plan.p_star;
        self.replace_faces(&plan.removed_faces, plan.new_faces);
        self.vertex_removed[plan.v_gone] = true;
    }
}
