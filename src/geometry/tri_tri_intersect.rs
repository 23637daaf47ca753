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

use crate::geometry::point::Point3;
use crate::kernel::orientation::orient3d;
use crate::kernel::predicates::segment_triangle_intersect;

/// Shared-vertex pattern between two triangles, used to skip the contacts
/// that mesh adjacency produces legitimately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contact {
    Disjoint,
    SharedVertex(usize, usize),
    SharedEdge,
}

pub fn contact(f: &[usize; 3], g: &[usize; 3]) -> Contact {
    let mut shared = Vec::with_capacity(3);
    for (i, a) in f.iter().enumerate() {
        if let Some(j) = g.iter().position(|b| b == a) {
            shared.push((i, j));
        }
    }
    match shared.len() {
        0 => Contact::Disjoint,
        1 => Contact::SharedVertex(shared[0].0, shared[0].1),
        _ => Contact::SharedEdge,
    }
}

/// Closed triangle-triangle intersection, decided by exact segment/triangle tests:
/// two triangles meet iff an edge of one meets the other.
pub fn tri_tri_intersect(p: &[Point3; 3], q: &[Point3; 3]) -> bool {
    for i in 0..3 {
        let (a, b) = (&p[i], &p[(i + 1) % 3]);
        if segment_triangle_intersect(a, b, &q[0], &q[1], &q[2]) {
            return true;
        }
        let (c, d) = (&q[i], &q[(i + 1) % 3]);
        if segment_triangle_intersect(c, d, &p[0], &p[1], &p[2]) {
            return true;
        }
    }
    false
}

/// Intersection test that ignores the contact implied by shared mesh vertices:
/// triangles sharing a vertex only conflict if the opposite edges reach across,
/// triangles sharing an edge never do unless they fold onto each other.
pub fn faces_conflict(f: &[usize; 3], pf: &[Point3; 3], g: &[usize; 3], pg: &[Point3; 3]) -> bool {
    match contact(f, g) {
        Contact::Disjoint => tri_tri_intersect(pf, pg),
        Contact::SharedVertex(i, j) => {
            let (a, b) = (&pf[(i + 1) % 3], &pf[(i + 2) % 3]);
            let (c, d) = (&pg[(j + 1) % 3], &pg[(j + 2) % 3]);
            segment_triangle_intersect(a, b, &pg[0], &pg[1], &pg[2])
                || segment_triangle_intersect(c, d, &pf[0], &pf[1], &pf[2])
        }
        Contact::SharedEdge => {
            // Folded pair: the apexes coincide in direction along the shared edge.
            let apex_f = (0..3).find(|&k| !g.contains(&f[k]));
            let apex_g = (0..3).find(|&k| !f.contains(&g[k]));
            match (apex_f, apex_g) {
                (Some(i), Some(j)) => {
                    orient3d(&pf[0], &pf[1], &pf[2], &pg[j]) == 0
                        && same_side_of_shared_edge(pf, i, &pg[j])
                }
                _ => true,
            }
        }
    }
}

fn same_side_of_shared_edge(pf: &[Point3; 3], apex: usize, other: &Point3) -> bool {
    let a = pf[(apex + 1) % 3];
    let b = pf[(apex + 2) % 3];
    let n = (b - a).cross(&(pf[apex] - a));
    let m = (b - a).cross(&(*other - a));
    n.dot(&m) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_triangles_intersect() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let q = [
            Point3::new(0.2, 0.2, -1.0),
            Point3::new(0.2, 0.2, 1.0),
            Point3::new(0.3, -1.0, 0.0),
        ];
        assert!(tri_tri_intersect(&p, &q));
    }

    #[test]
    fn fan_neighbours_do_not_conflict() {
        let pts = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ];
        let f = [0, 1, 2];
        let g = [0, 2, 3];
        let pf = [pts[0], pts[1], pts[2]];
        let pg = [pts[0], pts[2], pts[3]];
        assert!(!faces_conflict(&f, &pf, &g, &pg));

        // Folded back onto the first triangle.
        let h = [0, 2, 4];
        let ph = [pts[0], pts[2], Point3::new(0.5, 0.2, 0.0)];
        assert!(faces_conflict(&f, &pf, &h, &ph));
    }
}
