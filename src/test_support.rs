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

//! Shared fixtures for unit tests.

use crate::bsp::{subdivide, tetrahedralize};
use crate::geometry::{aabb::Aabb, point::Point3};
use crate::mesh::TetMesh;
use crate::operations::triangulation::Delaunay;

/// Corners of the unit cube at `offset`, index `i + 2j + 4k`.
pub fn cube_vertices(offset: f64) -> Vec<Point3> {
    let mut out = Vec::with_capacity(8);
    for k in 0..2 {
        for j in 0..2 {
            for i in 0..2 {
                out.push(Point3::new(offset + i as f64, offset + j as f64, offset + k as f64));
            }
        }
    }
    out
}

/// Outward-oriented triangles of [`cube_vertices`].
pub fn cube_faces() -> [[usize; 3]; 12] {
    [
        [0, 2, 1],
        [1, 2, 3],
        [4, 5, 6],
        [5, 7, 6],
        [0, 1, 5],
        [0, 5, 4],
        [2, 7, 3],
        [2, 6, 7],
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
    ]
}

/// The unit cube at offset 1 carved into the box `[0, 3]³`.
pub fn cube_tet_mesh() -> TetMesh {
    let bbox = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 3.0));
    let dt = Delaunay::build(&bbox, &cube_vertices(1.0)).unwrap();
    let faces: Vec<[usize; 3]> = cube_faces().iter().map(|f| f.map(|v| v + 8)).collect();
    let bsp = subdivide(&dt, &faces).unwrap();
    tetrahedralize(&bsp, bbox, &[]).unwrap()
}
