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

use crate::error::{TetError, TetResult};
use crate::geometry::point::Point3;
use crate::mesh::tet_mesh::TetMesh;
use crate::quality::{FACETS, dihedral_angles};

/// Facets used by exactly one tet, oriented outward, in sorted key order.
pub fn boundary_faces(tets: &[[usize; 4]]) -> Vec<[usize; 3]> {
    let mut count: BTreeMap<[usize; 3], (usize, [usize; 3])> = BTreeMap::new();
    for t in tets {
        for f in FACETS {
            let face = f.map(|j| t[j]);
            let mut key = face;
            key.sort_unstable();
            count.entry(key).or_insert((0, face)).0 += 1;
        }
    }
    count
        .into_values()
        .filter(|(n, _)| *n == 1)
        .map(|(_, f)| f)
        .collect()
}

/// Boundary triangles of a tet mesh with unreferenced vertices dropped.
/// Surviving vertices keep their relative order.
///
/// # Errors
///
/// [`TetError::InvalidInput`] when a tet references a vertex past the end of `vertices`.
pub fn extract_surface_mesh(
    vertices: &[[f64; 3]],
    tets: &[[usize; 4]],
) -> TetResult<(Vec<[f64; 3]>, Vec<[usize; 3]>)> {
    if let Some(t) = tets.iter().find(|t| t.iter().any(|&v| v >= vertices.len())) {
        return Err(TetError::InvalidInput(format!(
            "tet {t:?} references a vertex past {}",
            vertices.len()
        )));
    }
    let faces = boundary_faces(tets);
    let mut map = vec![usize::MAX; vertices.len()];
    for &v in faces.iter().flatten() {
        map[v] = 0;
    }
    let mut out_v = Vec::new();
    for (i, m) in map.iter_mut().enumerate() {
        if *m == 0 {
            *m = out_v.len();
            out_v.push(vertices[i]);
        }
    }
    let out_f = faces.into_iter().map(|f| f.map(|v| map[v])).collect();
    Ok((out_v, out_f))
}

/// Flat arrays handed back to the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractedMesh {
    pub vertices: Vec<Point3>,
    pub tets: Vec<[usize; 4]>,
    pub min_dihedral_angles: Vec<f64>,
    pub unrounded_vertices: usize,
}

/// Live tets, referenced vertices only, positions as doubles.
pub fn extract_volume(mesh: &TetMesh) -> ExtractedMesh {
    let mut map = vec![usize::MAX; mesh.vertices.len()];
    let mut vertices = Vec::new();
    let mut unrounded_vertices = 0;
    let live: Vec<[usize; 4]> = mesh.tets.iter().filter(|t| !t.removed).map(|t| t.v).collect();
    for &v in live.iter().flatten() {
        if map[v] == usize::MAX {
            map[v] = 0;
        }
    }
    for (i, m) in map.iter_mut().enumerate() {
        if *m == 0 {
            *m = vertices.len();
            vertices.push(mesh.posf(i));
            if !mesh.vertices[i].pos.is_rounded() {
                unrounded_vertices += 1;
            }
        }
    }
    let tets: Vec<[usize; 4]> = live.iter().map(|t| t.map(|v| map[v])).collect();
    let min_dihedral_angles = tets
        .iter()
        .map(|t| dihedral_angles(&t.map(|v| vertices[v])).0)
        .collect();
    ExtractedMesh {
        vertices,
        tets,
        min_dihedral_angles,
        unrounded_vertices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tets() -> (Vec<[f64; 3]>, Vec<[usize; 4]>) {
        (
            vec![
                [9.0, 9.0, 9.0], // unreferenced
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [0.0, 0.0, -1.0],
            ],
            vec![[1, 2, 3, 4], [1, 3, 2, 5]],
        )
    }

    #[test]
    fn shared_facet_is_interior() {
        let (v, t) = two_tets();
        let (sv, sf) = extract_surface_mesh(&v, &t).unwrap();
        assert_eq!(sv.len(), 5);
        assert_eq!(sf.len(), 6);
        assert!(!sv.contains(&[9.0, 9.0, 9.0]));
    }

    #[test]
    fn extraction_is_deterministic() {
        let (v, t) = two_tets();
        assert_eq!(extract_surface_mesh(&v, &t).unwrap(), extract_surface_mesh(&v, &t).unwrap());
    }

    #[test]
    fn out_of_range_tet_is_rejected() {
        let (v, mut t) = two_tets();
        t.push([1, 2, 3, 6]);
        let err = extract_surface_mesh(&v, &t).unwrap_err();
        assert!(matches!(err, TetError::InvalidInput(_)));
        assert!(err.to_string().contains("past 6"));
    }
}
