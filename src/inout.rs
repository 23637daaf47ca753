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

//! Inside/outside classification by generalized winding number.

use std::f64::consts::PI;

use tracing::debug;

use crate::geometry::point::Point3;
use crate::mesh::{TetMesh, VertexPos};
use crate::mesh_processing::surface::edge_key;

/// Tets whose barycenter winds less than this are outside.
pub const WINDING_THRESHOLD: f64 = 0.5;

const BOUNDARY_SMOOTH_ITERS: usize = 10;

/// Signed solid angle of triangle `abc` seen from `p`, over 4π.
fn solid_angle(p: &Point3, a: &Point3, b: &Point3, c: &Point3) -> f64 {
    let (x, y, z) = (*a - *p, *b - *p, *c - *p);
    let (lx, ly, lz) = (x.norm(), y.norm(), z.norm());
    let num = x.dot(&y.cross(&z));
    let den = lx * ly * lz + x.dot(&y) * lz + y.dot(&z) * lx + z.dot(&x) * ly;
    2.0 * num.atan2(den) / (4.0 * PI)
}

/// Generalized winding number of `p` with respect to a triangle soup.
pub fn winding_number(p: &Point3, vertices: &[Point3], faces: &[[usize; 3]]) -> f64 {
    faces
        .iter()
        .map(|f| solid_angle(p, &vertices[f[0]], &vertices[f[1]], &vertices[f[2]]))
        .sum()
}

/// Laplacian smoothing of the open-boundary loops of the tracked surface.
/// A vertex only moves while all its tets stay positive. Returns the number
/// of moves.
fn smooth_open_boundary(mesh: &mut TetMesh, faces: &[[usize; 3]]) -> usize {
    let mut edges: Vec<[usize; 2]> = faces
        .iter()
        .flat_map(|f| [edge_key(f[0], f[1]), edge_key(f[1], f[2]), edge_key(f[2], f[0])])
        .collect();
    edges.sort_unstable();
    let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertices.len()];
    for run in edges.chunk_by(|x, y| x == y) {
        if let [[a, b]] = run {
            neighbors[*a].push(*b);
            neighbors[*b].push(*a);
        }
    }

    let mut moved = 0;
    for _ in 0..BOUNDARY_SMOOTH_ITERS {
        for v in 0..neighbors.len() {
            let pts: Vec<Point3> = neighbors[v].iter().map(|&u| mesh.posf(u)).collect();
            let Some(target) = Point3::centroid(&pts) else {
                continue;
            };
            if target == mesh.posf(v) {
                continue;
            }
            let pos = VertexPos::Float(target);
            let ok = mesh.vertices[v].conn_tets.iter().all(|&t| {
                TetMesh::orient_with(&mesh.tets[t].v, |i| {
                    if i == v { pos.clone() } else { mesh.vertices[i].pos.clone() }
                }) > 0
            });
            if ok {
                mesh.vertices[v].pos = pos;
                for t in mesh.vertices[v].conn_tets.clone() {
                    mesh.recompute_quality(t);
                }
                moved += 1;
            }
        }
    }
    moved
}

/// Remove every tet whose barycenter has winding number at most
/// [`WINDING_THRESHOLD`] with respect to the tracked surface. Returns the
/// number of tets removed.
pub fn filter_outside(mesh: &mut TetMesh, smooth_boundary: bool) -> usize {
    let faces = mesh.tracked_surface();
    if smooth_boundary {
        let moved = smooth_open_boundary(mesh, &faces);
        debug!(moved, "open boundary smoothed");
    }
    let vertices: Vec<Point3> = mesh.vertices.iter().map(|v| v.posf()).collect();

    let outside: Vec<usize> = mesh
        .live_tets()
        .filter(|&t| {
            let pts: Vec<Point3> = mesh.tets[t].v.iter().map(|&v| vertices[v]).collect();
            Point3::centroid(&pts)
                .is_none_or(|c| winding_number(&c, &vertices, &faces) <= WINDING_THRESHOLD)
        })
        .collect();
    for &t in &outside {
        mesh.remove_tet(t);
    }
    mesh.remove_isolated_vertices();
    debug!(removed = outside.len(), kept = mesh.n_live_tets(), "winding number filter");
    outside.len()
}
