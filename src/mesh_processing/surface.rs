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

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{TetError, TetResult};
use crate::geometry::{aabb::Aabb, point::Point3};
use crate::kernel::predicates::is_degenerate_triangle;

/// Indexed triangle mesh; faces may be non-manifold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub vertices: Vec<Point3>,
    pub faces: Vec<[usize; 3]>,
}

#[inline]
pub fn edge_key(a: usize, b: usize) -> [usize; 2] {
    if a < b { [a, b] } else { [b, a] }
}

#[inline]
pub fn face_key(f: &[usize; 3]) -> [usize; 3] {
    let mut k = *f;
    k.sort_unstable();
    k
}

impl SurfaceMesh {
    /// Validate raw arrays.
    ///
    /// # Errors
    ///
    /// [`TetError::InvalidInput`] for non-finite coordinates or out-of-range indices.
    pub fn from_arrays(vertices: &[[f64; 3]], faces: &[[usize; 3]]) -> TetResult<Self> {
        let vertices: Vec<Point3> = vertices.iter().map(|v| Point3::from_array(*v)).collect();
        if let Some(i) = vertices.iter().position(|p| !p.is_finite()) {
            return Err(TetError::InvalidInput(format!("vertex {i} has a non-finite coordinate")));
        }
        for (fi, f) in faces.iter().enumerate() {
            if let Some(&v) = f.iter().find(|&&v| v >= vertices.len()) {
                return Err(TetError::InvalidInput(format!(
                    "face {fi} references vertex {v}, but only {} vertices exist",
                    vertices.len()
                )));
            }
        }
        Ok(Self {
            vertices,
            faces: faces.to_vec(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn bbox(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter())
    }

    pub fn triangle(&self, f: usize) -> [Point3; 3] {
        let [a, b, c] = self.faces[f];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Merge coincident vertices, drop faces with repeated indices, zero area
    /// or a duplicated vertex set, then drop unreferenced vertices.
    pub fn clean(&self) -> SurfaceMesh {
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut vertices = Vec::new();
        let mut seen: AHashMap<[u64; 3], usize> = AHashMap::default();
        for p in &self.vertices {
            // +0.0 and -0.0 are the same point.
            let key = [p.x + 0.0, p.y + 0.0, p.z + 0.0].map(f64::to_bits);
            let id = *seen.entry(key).or_insert_with(|| {
                vertices.push(*p);
                vertices.len() - 1
            });
            remap.push(id);
        }

        let mut faces = Vec::with_capacity(self.faces.len());
        let mut face_set: AHashSet<[usize; 3]> = AHashSet::default();
        for f in &self.faces {
            let g = f.map(|v| remap[v]);
            if g[0] == g[1] || g[1] == g[2] || g[0] == g[2] {
                continue;
            }
            if is_degenerate_triangle(&vertices[g[0]], &vertices[g[1]], &vertices[g[2]]) {
                continue;
            }
            if face_set.insert(face_key(&g)) {
                faces.push(g);
            }
        }

        let mut out = SurfaceMesh { vertices, faces };
        out.remove_unreferenced();
        out
    }

    pub fn remove_unreferenced(&mut self) {
        let mut used = vec![false; self.vertices.len()];
        for f in &self.faces {
            for &v in f {
                used[v] = true;
            }
        }
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut vertices = Vec::new();
        for (i, p) in self.vertices.iter().enumerate() {
            if used[i] {
                remap[i] = vertices.len();
                vertices.push(*p);
            }
        }
        for f in &mut self.faces {
            *f = f.map(|v| remap[v]);
        }
        self.vertices = vertices;
    }

    /// Undirected edge -> incident faces, in key order.
    pub fn edge_faces(&self) -> BTreeMap<[usize; 2], Vec<usize>> {
        let mut map: BTreeMap<[usize; 2], Vec<usize>> = BTreeMap::new();
        for (fi, f) in self.faces.iter().enumerate() {
            for k in 0..3 {
                map.entry(edge_key(f[k], f[(k + 1) % 3])).or_default().push(fi);
            }
        }
        map
    }

    /// Every edge shared by exactly two faces.
    pub fn is_closed(&self) -> bool {
        !self.is_empty() && self.edge_faces().values().all(|fs| fs.len() == 2)
    }

    /// Edges with a single incident face.
    pub fn boundary_edges(&self) -> Vec<[usize; 2]> {
        self.edge_faces()
            .into_iter()
            .filter(|(_, fs)| fs.len() == 1)
            .map(|(e, _)| e)
            .collect()
    }

    pub fn average_edge_length(&self) -> f64 {
        let edges = self.edge_faces();
        if edges.is_empty() {
            return 0.0;
        }
        let total: f64 = edges
            .keys()
            .map(|[a, b]| self.vertices[*a].distance_to(&self.vertices[*b]))
            .sum();
        total / edges.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_merges_and_drops() {
        let mesh = SurfaceMesh::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 0.0, 0.0], // duplicate of 1
                [2.0, 0.0, 0.0], // collinear with 0 and 1
                [9.0, 9.0, 9.0], // unreferenced
            ],
            &[[0, 1, 2], [0, 3, 2], [2, 1, 0], [0, 1, 4], [1, 1, 2]],
        )
        .unwrap();
        let clean = mesh.clean();
        assert_eq!(clean.faces.len(), 1);
        assert_eq!(clean.vertices.len(), 3);
        assert!(!clean.is_closed());
        assert_eq!(clean.boundary_edges().len(), 3);
    }

    #[test]
    fn rejects_bad_indices() {
        assert!(SurfaceMesh::from_arrays(&[[0.0; 3]], &[[0, 1, 2]]).is_err());
        assert!(SurfaceMesh::from_arrays(&[[f64::NAN, 0.0, 0.0]], &[]).is_err());
    }

    #[test]
    fn tetrahedron_surface_is_closed() {
        let mesh = SurfaceMesh::from_arrays(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
        .unwrap();
        assert!(mesh.clean().is_closed());
    }
}
