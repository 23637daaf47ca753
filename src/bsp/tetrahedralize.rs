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
use tracing::debug;

use crate::bsp::subdivision::Bsp;
use crate::error::{TetError, TetResult};
use crate::geometry::aabb::Aabb;
use crate::kernel::predicates::is_point_on_segment;
use crate::mesh::{FacetTag, Side, TetMesh, TetVertex, VertexPos};
use crate::numeric::rational::ExactPoint3;

struct Builder<'a> {
    bsp: &'a Bsp,
    mesh: TetMesh,
    vmap: Vec<usize>,
    face_centers: AHashMap<usize, usize>,
    labels: Vec<Option<Option<usize>>>,
}

impl Builder<'_> {
    fn vertex(&mut self, v: usize) -> usize {
        if self.vmap[v] == usize::MAX {
            let pos = VertexPos::from_exact(self.bsp.arena.vertices[v].clone());
            self.vmap[v] = self.mesh.add_vertex(TetVertex::new(pos));
        }
        self.vmap[v]
    }

    fn new_vertex(&mut self, p: ExactPoint3) -> usize {
        self.mesh.add_vertex(TetVertex::new(VertexPos::from_exact(p)))
    }

    fn label(&mut self, f: usize) -> Option<usize> {
        if let Some(l) = self.labels[f] {
            return l;
        }
        let l = self.bsp.surface_triangle(f);
        self.labels[f] = Some(l);
        l
    }

    fn tag(&mut self, f: usize, n: usize) -> TetResult<FacetTag> {
        if let Some(g) = self.label(f) {
            return match self.bsp.node_side(n, g) {
                Some(1) => Ok(FacetTag::Surface(Side::Front)),
                Some(-1) => Ok(FacetTag::Surface(Side::Back)),
                _ => Err(TetError::Delaunay(format!("cell {n} is flat against triangle {g}"))),
            };
        }
        if self.bsp.arena.faces[f].nodes.len() == 1 {
            Ok(FacetTag::BoundingBox)
        } else {
            Ok(FacetTag::Interior)
        }
    }

    /// Add `tri + apex` with positive orientation; `tag` goes to the facet
    /// opposite the apex.
    fn add(&mut self, tri: [usize; 3], apex: usize, tag: FacetTag) -> TetResult<()> {
        let mut v = [tri[0], tri[1], tri[2], apex];
        match self.mesh.orient(&v) {
            1 => {}
            -1 => v.swap(0, 1),
            _ => return Err(TetError::Delaunay(format!("flat tet {v:?} in a BSP cell"))),
        }
        let mut tags = [FacetTag::Interior; 4];
        tags[3] = tag;
        self.mesh.add_tet(v, tags);
        Ok(())
    }

    fn cell(&mut self, n: usize) -> TetResult<()> {
        let bsp = self.bsp;
        let arena = &bsp.arena;
        let faces = arena.nodes[n].faces.clone();
        let verts = arena.node_vertices(n);
        let simplex = verts.len() == 4 && faces.len() == 4 && faces.iter().all(|&f| arena.faces[f].edges.len() == 3);

        if simplex {
            let mut v = [0usize; 4];
            let mut tags = [FacetTag::Interior; 4];
            for i in 0..4 {
                v[i] = self.vertex(verts[i]);
            }
            for &f in &faces {
                let fv = arena.face_vertices(f);
                let Some(i) = (0..4).find(|&i| !fv.contains(&verts[i])) else {
                    continue;
                };
                tags[i] = self.tag(f, n)?;
            }
            if self.mesh.orient(&v) < 0 {
                v.swap(0, 1);
                tags.swap(0, 1);
            }
            self.mesh.add_tet(v, tags);
            return Ok(());
        }

        let Some(c) = arena.node_centroid(n) else {
            return Ok(());
        };
        let c = self.new_vertex(c);
        for f in faces {
            let tag = self.tag(f, n)?;
            let lp: Vec<usize> = arena.face_vertices(f).into_iter().map(|v| self.vertex(v)).collect();
            if lp.len() == 3 {
                self.add([lp[0], lp[1], lp[2]], c, tag)?;
                continue;
            }
            let fc = match self.face_centers.get(&f) {
                Some(&fc) => fc,
                None => {
                    let Some(p) = arena.face_centroid(f) else {
                        continue;
                    };
                    let fc = self.new_vertex(p);
                    self.face_centers.insert(f, fc);
                    fc
                }
            };
            for k in 0..lp.len() {
                self.add([lp[k], lp[(k + 1) % lp.len()], fc], c, tag)?;
            }
        }
        Ok(())
    }
}

/// Turn every leaf cell into tets and label vertices. `boundary_edges` are
/// open-boundary input edges in arena numbering.
pub fn tetrahedralize(bsp: &Bsp, bbox: Aabb, boundary_edges: &[[usize; 2]]) -> TetResult<TetMesh> {
    let mut b = Builder {
        bsp,
        mesh: TetMesh::new(Some(bbox)),
        vmap: vec![usize::MAX; bsp.arena.vertices.len()],
        face_centers: AHashMap::new(),
        labels: vec![None; bsp.arena.faces.len()],
    };
    for n in 0..bsp.arena.nodes.len() {
        if bsp.arena.nodes[n].is_leaf() {
            b.cell(n)?;
        }
    }
    let mut mesh = b.mesh;

    for t in 0..mesh.tets.len() {
        for i in 0..4 {
            let tag = mesh.tets[t].tags[i];
            for v in mesh.tets[t].facet(i) {
                match tag {
                    FacetTag::Surface(_) => mesh.vertices[v].on_surface = true,
                    FacetTag::BoundingBox => mesh.vertices[v].on_bbox = true,
                    FacetTag::Interior => {}
                }
            }
        }
    }

    if !boundary_edges.is_empty() {
        let edges: Vec<[ExactPoint3; 2]> = boundary_edges
            .iter()
            .map(|e| e.map(|v| bsp.arena.vertices[v].clone()))
            .collect();
        for v in mesh.vertices.iter_mut().filter(|v| v.on_surface) {
            let Some(p) = v.pos.to_exact() else {
                continue;
            };
            v.on_boundary = edges.iter().any(|[a, b]| is_point_on_segment(&p, a, b));
        }
    }

    let unrounded = mesh.round_vertices();
    debug!(
        n_v = mesh.vertices.len(),
        n_t = mesh.tets.len(),
        unrounded,
        "bsp cells tetrahedralized"
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3;
    use crate::geometry::util::triangle_area;
    use crate::kernel::orientation::signed_volume6;
    use approx::assert_relative_eq;

    use crate::test_support::cube_tet_mesh as cube_mesh;

    #[test]
    fn cube_is_conforming_and_positive() {
        let mesh = cube_mesh();
        let mut volume = 0.0;
        for t in mesh.live_tets() {
            let v = mesh.tets[t].v;
            assert_eq!(mesh.orient(&v), 1);
            let [a, b, c, d] = mesh.points(&v);
            volume += signed_volume6(&a, &b, &c, &d) / 6.0;
        }
        assert_relative_eq!(volume, 27.0, epsilon = 1e-9);

        let area: f64 = mesh
            .tracked_surface()
            .iter()
            .map(|f| triangle_area(&mesh.posf(f[0]), &mesh.posf(f[1]), &mesh.posf(f[2])))
            .sum();
        assert_relative_eq!(area, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn tracked_surface_points_outward() {
        let mesh = cube_mesh();
        let centre = Point3::new(1.5, 1.5, 1.5);
        for f in mesh.tracked_surface() {
            let [a, b, c] = f.map(|v| mesh.posf(v));
            assert!(signed_volume6(&a, &b, &c, &centre) < 0.0);
        }
    }

    #[test]
    fn vertex_flags() {
        let mesh = cube_mesh();
        let corner = mesh
            .vertices
            .iter()
            .position(|v| v.posf() == Point3::new(1.0, 1.0, 1.0))
            .unwrap();
        assert!(mesh.vertices[corner].on_surface);
        assert!(!mesh.vertices[corner].on_bbox);
        let box_corner = mesh
            .vertices
            .iter()
            .position(|v| v.posf() == Point3::new(0.0, 0.0, 0.0))
            .unwrap();
        assert!(mesh.vertices[box_corner].on_bbox);
    }
}
