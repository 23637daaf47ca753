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

use ahash::AHashSet;
use tracing::debug;

use crate::bsp::arena::{BspArena, Cut};
use crate::error::{TetError, TetResult};
use crate::geometry::{aabb::Aabb, aabb_tree::AabbTree, plane::Plane, point::Point3};
use crate::kernel::predicates::point_in_triangle_coplanar;
use crate::numeric::rational::ExactPoint3;
use crate::operations::triangulation::Delaunay;

/// Slack added to float cell boxes so that rounding never drops a candidate.
const BOX_SLACK: f64 = 1e-9;

/// A BSP whose leaf faces on input triangles lie entirely inside or outside
/// each of them.
pub struct Bsp {
    pub arena: BspArena,
    /// Input triangles in arena vertex numbering.
    pub triangles: Vec<[usize; 3]>,
    /// Triangles already present as Delaunay faces.
    pub matched: Vec<bool>,
    /// Supporting plane followed by the three edge planes, per triangle.
    planes: Vec<Option<Plane>>,
}

fn triangle_planes(p: [&ExactPoint3; 3]) -> [Option<Plane>; 4] {
    let Some(support) = Plane::from_points(p[0], p[1], p[2]) else {
        return [None, None, None, None];
    };
    let n = support.normal.clone();
    let edge = |k: usize| Plane::through_edge(p[k], p[(k + 1) % 3], &n);
    [Some(support.clone()), edge(0), edge(1), edge(2)]
}

impl Bsp {
    #[inline]
    pub fn plane(&self, cut: Cut) -> Option<&Plane> {
        self.planes[4 * cut.0 + cut.1 as usize].as_ref()
    }

    fn tri_points(&self, g: usize) -> [&ExactPoint3; 3] {
        self.triangles[g].map(|v| &self.arena.vertices[v])
    }

    /// Does face `f` lie in `plane`?
    fn face_on_plane(&self, f: usize, plane: &Plane) -> bool {
        self.arena
            .face_vertices(f)
            .iter()
            .all(|&v| plane.side(&self.arena.vertices[v]) == 0)
    }

    fn node_box(&self, n: usize) -> Option<Aabb> {
        let pts: Vec<Point3> = self
            .arena
            .node_vertices(n)
            .iter()
            .map(|&v| self.arena.vertices[v].to_point())
            .collect();
        let b = Aabb::from_points(pts.iter())?;
        Some(b.enlarged(BOX_SLACK * (1.0 + b.diagonal())))
    }

    fn tri_box(&self, g: usize) -> Option<Aabb> {
        let pts = self.tri_points(g).map(ExactPoint3::to_point);
        Aabb::from_points(pts.iter())
    }

    /// Triangle `g` reaches into the open half-space on `keep` of `plane`,
    /// or lies in the plane.
    fn reaches(&self, g: usize, plane: &Plane, keep: i8) -> bool {
        let s = self.tri_points(g).map(|p| plane.side(p));
        s.iter().all(|&x| x == 0) || s.iter().any(|&x| x == keep)
    }

    fn keep_for_child(&self, g: usize, plane: &Plane, keep: i8, child_box: Option<&Aabb>) -> bool {
        if !self.reaches(g, plane, keep) {
            return false;
        }
        match (child_box, self.tri_box(g)) {
            (Some(cb), Some(tb)) => cb.intersects(&tb),
            _ => true,
        }
    }

    /// Input triangle that face `f` lies on, if any (lowest index wins).
    pub fn surface_triangle(&self, f: usize) -> Option<usize> {
        let mut candidates: Vec<usize> = self.arena.faces[f]
            .nodes
            .iter()
            .flat_map(|&n| self.arena.nodes[n].div_faces.iter().copied())
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        let centroid = self.arena.face_centroid(f)?;
        candidates.into_iter().find(|&g| {
            let Some(plane) = self.plane((g, 0)) else {
                return false;
            };
            if !self.face_on_plane(f, plane) {
                return false;
            }
            let [a, b, c] = self.tri_points(g);
            point_in_triangle_coplanar(&centroid, a, b, c)
        })
    }

    /// Side of the supporting plane of `g` that cell `n` lies on.
    pub fn node_side(&self, n: usize, g: usize) -> Option<i8> {
        let plane = self.plane((g, 0))?;
        let c = self.arena.node_centroid(n)?;
        Some(plane.side(&c))
    }
}

/// Build the BSP from a Delaunay tetrahedralization and the input triangles
/// (indices into `dt.points`).
pub fn subdivide(dt: &Delaunay, triangles: &[[usize; 3]]) -> TetResult<Bsp> {
    let mut bsp = match_faces(dt, triangles)?;
    split_cells(&mut bsp);
    Ok(bsp)
}

/// Wrap the Delaunay cells as BSP leaves, mark the triangles that already are
/// Delaunay faces, and hand every cell the triangles overlapping it.
pub fn match_faces(dt: &Delaunay, triangles: &[[usize; 3]]) -> TetResult<Bsp> {
    let arena = BspArena::from_delaunay(dt).ok_or_else(|| TetError::Delaunay("non-finite vertex".into()))?;

    let mut dt_faces: AHashSet<[usize; 3]> = AHashSet::with_capacity(dt.tets.len() * 2);
    for t in &dt.tets {
        for f in crate::quality::FACETS {
            let mut key = f.map(|j| t[j]);
            key.sort_unstable();
            dt_faces.insert(key);
        }
    }
    let matched: Vec<bool> = triangles
        .iter()
        .map(|t| {
            let mut key = *t;
            key.sort_unstable();
            dt_faces.contains(&key)
        })
        .collect();

    let planes: Vec<Option<Plane>> = triangles
        .iter()
        .flat_map(|t| triangle_planes(t.map(|v| &arena.vertices[v])))
        .collect();

    let mut bsp = Bsp {
        arena,
        triangles: triangles.to_vec(),
        matched,
        planes,
    };

    let items: Vec<(Aabb, usize)> = (0..bsp.triangles.len())
        .filter_map(|g| Some((bsp.tri_box(g)?, g)))
        .collect();
    let tree = AabbTree::build(items);

    let n_cells = bsp.arena.nodes.len();
    for n in 0..n_cells {
        let mut div: Vec<usize> = Vec::new();
        if let (Some(tree), Some(b)) = (&tree, bsp.node_box(n)) {
            let mut hits = Vec::new();
            tree.query(&b, &mut hits);
            div.extend(hits.into_iter().copied());
        }
        div.sort_unstable();
        let queue: Vec<Cut> = div
            .iter()
            .filter(|&&g| !bsp.matched[g])
            .flat_map(|&g| (0..4u8).map(move |k| (g, k)))
            .collect();
        bsp.arena.nodes[n].div_faces = div;
        bsp.arena.nodes[n].queue = queue;
    }
    debug!(
        n_triangles = bsp.triangles.len(),
        n_matched = bsp.matched.iter().filter(|&&m| m).count(),
        "face matching done"
    );
    Ok(bsp)
}

/// Split cells until no unembedded triangle crosses a leaf.
pub fn split_cells(bsp: &mut Bsp) {
    let n_cells = bsp.arena.nodes.len();
    let mut stack: Vec<usize> = (0..n_cells).rev().collect();
    let mut n_splits = 0usize;
    while let Some(n) = stack.pop() {
        let queue = std::mem::take(&mut bsp.arena.nodes[n].queue);
        for (idx, &(g, k)) in queue.iter().enumerate() {
            let Some(plane) = bsp.plane((g, k)).cloned() else {
                continue;
            };
            if k > 0 {
                let Some(support) = bsp.plane((g, 0)) else {
                    continue;
                };
                let against = bsp.arena.nodes[n].faces.iter().any(|&f| bsp.face_on_plane(f, support));
                if !against {
                    continue;
                }
            }
            let Some([front, back]) = bsp.arena.split_node(n, &plane) else {
                continue;
            };
            n_splits += 1;
            let rest = &queue[idx + 1..];
            let div = bsp.arena.nodes[n].div_faces.clone();
            for (child, keep) in [(front, 1i8), (back, -1i8)] {
                let cb = bsp.node_box(child);
                let child_div: Vec<usize> = div
                    .iter()
                    .copied()
                    .filter(|&h| bsp.keep_for_child(h, &plane, keep, cb.as_ref()))
                    .collect();
                let child_queue: Vec<Cut> = rest
                    .iter()
                    .copied()
                    .filter(|&(h, _)| child_div.binary_search(&h).is_ok())
                    .collect();
                bsp.arena.nodes[child].div_faces = child_div;
                bsp.arena.nodes[child].queue = child_queue;
            }
            stack.push(back);
            stack.push(front);
            break;
        }
    }
    debug!(n_splits, n_nodes = bsp.arena.nodes.len(), "bsp subdivision done");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_in_box() -> (Delaunay, Vec<[usize; 3]>) {
        // Unit cube [1,2]^3 inside the box [0,3]^3.
        let bbox = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 3.0, 3.0));
        let pts = crate::test_support::cube_vertices(1.0);
        let dt = Delaunay::build(&bbox, &pts).unwrap();
        let faces = crate::test_support::cube_faces().map(|f| f.map(|v| v + 8)).to_vec();
        (dt, faces)
    }

    #[test]
    fn every_input_triangle_is_covered_by_leaf_faces() {
        let (dt, faces) = cube_in_box();
        let bsp = subdivide(&dt, &faces).unwrap();
        for (g, t) in faces.iter().enumerate() {
            assert!(bsp.plane((g, 0)).is_some());
            // Area of leaf faces labelled with g equals the triangle's area (1/2).
            let mut area = 0.0;
            for f in 0..bsp.arena.faces.len() {
                if bsp.surface_triangle(f) != Some(g) {
                    continue;
                }
                let lp: Vec<Point3> = bsp
                    .arena
                    .face_vertices(f)
                    .iter()
                    .map(|&v| bsp.arena.vertices[v].to_point())
                    .collect();
                for k in 1..lp.len() - 1 {
                    area += crate::geometry::util::triangle_area(&lp[0], &lp[k], &lp[k + 1]);
                }
            }
            assert!((area - 0.5).abs() < 1e-9, "triangle {t:?} covered by area {area}");
        }
    }

    #[test]
    fn leaf_cells_never_straddle_an_input_plane() {
        let (dt, faces) = cube_in_box();
        let bsp = subdivide(&dt, &faces).unwrap();
        for n in 0..bsp.arena.nodes.len() {
            if !bsp.arena.nodes[n].is_leaf() {
                continue;
            }
            let centroid = bsp.arena.node_centroid(n).unwrap().to_point();
            // Cells inside the cube stay inside and vice versa.
            let inside = (1.0..=2.0).contains(&centroid.x)
                && (1.0..=2.0).contains(&centroid.y)
                && (1.0..=2.0).contains(&centroid.z);
            for v in bsp.arena.node_vertices(n) {
                let p = bsp.arena.vertices[v].to_point();
                let p_inside = (1.0..=2.0).contains(&p.x) && (1.0..=2.0).contains(&p.y) && (1.0..=2.0).contains(&p.z);
                if inside {
                    assert!(p_inside, "cell {n} leaks out of the cube at {p:?}");
                }
            }
        }
    }
}
