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

//! Vertex, edge, face and node arenas for the binary space partition.
//!
//! Cells are convex polyhedra. Faces are convex polygons stored as a cyclic
//! list of edges and may carry collinear vertices where a neighbouring cell
//! was cut. Edges and faces are shared between cells, so every cut propagates
//! to the neighbours and no T-junctions appear.

use ahash::AHashMap;

use crate::geometry::plane::Plane;
use crate::numeric::rational::ExactPoint3;
use crate::operations::triangulation::Delaunay;
use crate::quality::FACETS;

#[derive(Clone, Debug)]
pub struct BspEdge {
    pub v: [usize; 2],
    pub faces: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct BspFace {
    /// Edges in cyclic order.
    pub edges: Vec<usize>,
    /// Active cells on either side (one on the domain boundary).
    pub nodes: Vec<usize>,
}

/// A pending cut: input triangle and which of its planes (0 = supporting,
/// 1..=3 = edge planes).
pub type Cut = (usize, u8);

#[derive(Clone, Debug, Default)]
pub struct BspNode {
    pub faces: Vec<usize>,
    /// Input triangles that may touch this cell.
    pub div_faces: Vec<usize>,
    pub queue: Vec<Cut>,
    pub children: Option<[usize; 2]>,
}

impl BspNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct BspArena {
    pub vertices: Vec<ExactPoint3>,
    pub edges: Vec<BspEdge>,
    pub faces: Vec<BspFace>,
    pub nodes: Vec<BspNode>,
}

impl BspArena {
    /// One cell per Delaunay tet, faces and edges shared by key.
    pub fn from_delaunay(dt: &Delaunay) -> Option<Self> {
        let vertices = dt
            .points
            .iter()
            .map(ExactPoint3::from_point)
            .collect::<Option<Vec<_>>>()?;
        let mut arena = BspArena {
            vertices,
            ..Default::default()
        };
        let mut edge_ids: AHashMap<[usize; 2], usize> = AHashMap::new();
        let mut face_ids: AHashMap<[usize; 3], usize> = AHashMap::new();

        for t in &dt.tets {
            let node = arena.nodes.len();
            let mut faces = Vec::with_capacity(4);
            for f in FACETS {
                let tri = f.map(|j| t[j]);
                let mut key = tri;
                key.sort_unstable();
                let fid = match face_ids.get(&key) {
                    Some(&fid) => fid,
                    None => {
                        let fid = arena.faces.len();
                        let mut edges = Vec::with_capacity(3);
                        for k in 0..3 {
                            let (a, b) = (tri[k], tri[(k + 1) % 3]);
                            let ekey = if a < b { [a, b] } else { [b, a] };
                            let eid = *edge_ids.entry(ekey).or_insert_with(|| {
                                arena.edges.push(BspEdge { v: ekey, faces: Vec::new() });
                                arena.edges.len() - 1
                            });
                            arena.edges[eid].faces.push(fid);
                            edges.push(eid);
                        }
                        arena.faces.push(BspFace {
                            edges,
                            nodes: Vec::new(),
                        });
                        face_ids.insert(key, fid);
                        fid
                    }
                };
                arena.faces[fid].nodes.push(node);
                faces.push(fid);
            }
            arena.nodes.push(BspNode {
                faces,
                ..Default::default()
            });
        }
        Some(arena)
    }

    /// Vertices of face `f` in loop order; `loop[k]` is shared by
    /// `edges[k]` and `edges[k + 1]`.
    pub fn face_vertices(&self, f: usize) -> Vec<usize> {
        let edges = &self.faces[f].edges;
        let n = edges.len();
        (0..n)
            .map(|k| {
                let e = self.edges[edges[k]].v;
                let next = self.edges[edges[(k + 1) % n]].v;
                if next.contains(&e[0]) { e[0] } else { e[1] }
            })
            .collect()
    }

    /// Sorted, deduplicated vertices of a cell.
    pub fn node_vertices(&self, n: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.nodes[n]
            .faces
            .iter()
            .flat_map(|&f| self.faces[f].edges.iter())
            .flat_map(|&e| self.edges[e].v)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn node_edges(&self, n: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.nodes[n]
            .faces
            .iter()
            .flat_map(|&f| self.faces[f].edges.iter().copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Exact vertex average, strictly inside a non-degenerate convex cell.
    pub fn node_centroid(&self, n: usize) -> Option<ExactPoint3> {
        let vs = self.node_vertices(n);
        ExactPoint3::centroid(vs.iter().map(|&v| &self.vertices[v]))
    }

    pub fn face_centroid(&self, f: usize) -> Option<ExactPoint3> {
        let vs = self.face_vertices(f);
        ExactPoint3::centroid(vs.iter().map(|&v| &self.vertices[v]))
    }

    /// Cut edge `e` at `m`, keeping the loop order of every face that uses it.
    fn split_edge(&mut self, e: usize, m: usize) {
        let [a, b] = self.edges[e].v;
        let faces = self.edges[e].faces.clone();
        self.edges[e].v = [a, m];
        let e2 = self.edges.len();
        self.edges.push(BspEdge {
            v: [m, b],
            faces: faces.clone(),
        });
        for f in faces {
            let edges = &mut self.faces[f].edges;
            let n = edges.len();
            let Some(p) = edges.iter().position(|&x| x == e) else {
                continue;
            };
            let prev = self.edges[edges[(p + n - 1) % n]].v;
            if prev.contains(&a) {
                edges.insert(p + 1, e2);
            } else {
                edges.insert(p, e2);
            }
        }
    }

    /// Split face `f` along the chord between loop positions `i < j`. `f`
    /// keeps the chain `i..=j`; the returned face gets the rest.
    fn split_face(&mut self, f: usize, i: usize, j: usize) -> usize {
        let lp = self.face_vertices(f);
        let old = self.faces[f].edges.clone();
        let n = old.len();
        let chord = self.edges.len();
        self.edges.push(BspEdge {
            v: [lp[i], lp[j]],
            faces: Vec::new(),
        });
        let f2 = self.faces.len();

        // edges[k] joins lp[k - 1] and lp[k].
        let mut keep: Vec<usize> = (i + 1..=j).map(|k| old[k % n]).collect();
        keep.push(chord);
        let mut other: Vec<usize> = (j + 1..n + i + 1).map(|k| old[k % n]).collect();
        other.push(chord);

        for &e in &other[..other.len() - 1] {
            for g in self.edges[e].faces.iter_mut() {
                if *g == f {
                    *g = f2;
                }
            }
        }
        self.edges[chord].faces = vec![f, f2];
        let nodes = self.faces[f].nodes.clone();
        self.faces[f].edges = keep;
        self.faces.push(BspFace {
            edges: other,
            nodes: nodes.clone(),
        });
        for nd in nodes {
            self.nodes[nd].faces.push(f2);
        }
        f2
    }

    /// Cut cell `n` by `plane`. Returns the `[front, back]` children, or
    /// `None` when the plane does not cross the cell's interior.
    pub fn split_node(&mut self, n: usize, plane: &Plane) -> Option<[usize; 2]> {
        let verts = self.node_vertices(n);
        let mut side: AHashMap<usize, i8> = verts.iter().map(|&v| (v, plane.side(&self.vertices[v]))).collect();
        if !side.values().any(|&s| s > 0) || !side.values().any(|&s| s < 0) {
            return None;
        }

        for e in self.node_edges(n) {
            let [a, b] = self.edges[e].v;
            if side[&a] * side[&b] < 0 {
                let p = plane.intersect_segment(&self.vertices[a], &self.vertices[b])?;
                let m = self.vertices.len();
                self.vertices.push(p);
                side.insert(m, 0);
                self.split_edge(e, m);
            }
        }

        for f in self.nodes[n].faces.clone() {
            let lp = self.face_vertices(f);
            let s: Vec<i8> = lp.iter().map(|v| side[v]).collect();
            if s.iter().any(|&x| x > 0) && s.iter().any(|&x| x < 0) {
                let zeros: Vec<usize> = (0..lp.len()).filter(|&k| s[k] == 0).collect();
                let [i, j] = zeros[..] else {
                    return None;
                };
                self.split_face(f, i, j);
            }
        }

        let front = self.nodes.len();
        let back = front + 1;
        let mut front_faces = Vec::new();
        let mut back_faces = Vec::new();
        let mut cap_edges = Vec::new();
        for f in self.nodes[n].faces.clone() {
            let lp = self.face_vertices(f);
            let is_front = lp.iter().any(|v| side[v] > 0);
            let child = if is_front { front } else { back };
            if is_front {
                front_faces.push(f);
            } else {
                back_faces.push(f);
            }
            for nd in self.faces[f].nodes.iter_mut() {
                if *nd == n {
                    *nd = child;
                }
            }
            for &e in &self.faces[f].edges {
                let [a, b] = self.edges[e].v;
                if side[&a] == 0 && side[&b] == 0 {
                    cap_edges.push(e);
                }
            }
        }
        cap_edges.sort_unstable();
        cap_edges.dedup();
        let cap_edges = self.chain_edges(cap_edges)?;

        let cap = self.faces.len();
        for &e in &cap_edges {
            self.edges[e].faces.push(cap);
        }
        self.faces.push(BspFace {
            edges: cap_edges,
            nodes: vec![front, back],
        });
        front_faces.push(cap);
        back_faces.push(cap);

        self.nodes.push(BspNode {
            faces: front_faces,
            ..Default::default()
        });
        self.nodes.push(BspNode {
            faces: back_faces,
            ..Default::default()
        });
        self.nodes[n].children = Some([front, back]);
        self.nodes[n].faces.clear();
        Some([front, back])
    }

    /// Order edges into one closed loop.
    fn chain_edges(&self, mut pool: Vec<usize>) -> Option<Vec<usize>> {
        if pool.len() < 3 {
            return None;
        }
        let first = pool.swap_remove(0);
        let mut out = vec![first];
        let start = self.edges[first].v[0];
        let mut cur = self.edges[first].v[1];
        while cur != start {
            let k = pool.iter().position(|&e| self.edges[e].v.contains(&cur))?;
            let e = pool.swap_remove(k);
            let [a, b] = self.edges[e].v;
            cur = if a == cur { b } else { a };
            out.push(e);
        }
        pool.is_empty().then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point3;
    use rug::Rational;

    fn single_tet() -> BspArena {
        let dt = Delaunay {
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            tets: vec![[0, 1, 2, 3]],
        };
        BspArena::from_delaunay(&dt).unwrap()
    }

    fn z_plane(z: i32, over: i32) -> Plane {
        Plane::new(
            [Rational::new(), Rational::new(), Rational::from(1)],
            -Rational::from((z, over)),
        )
    }

    #[test]
    fn face_loops_are_closed() {
        let arena = single_tet();
        assert_eq!(arena.faces.len(), 4);
        assert_eq!(arena.edges.len(), 6);
        for f in 0..4 {
            let lp = arena.face_vertices(f);
            assert_eq!(lp.len(), 3);
        }
    }

    #[test]
    fn cutting_off_the_apex() {
        let mut arena = single_tet();
        let [front, back] = arena.split_node(0, &z_plane(1, 2)).unwrap();
        // A small tet above, a prism below.
        assert_eq!(arena.nodes[front].faces.len(), 4);
        assert_eq!(arena.nodes[back].faces.len(), 5);
        assert_eq!(arena.node_vertices(front).len(), 4);
        assert_eq!(arena.node_vertices(back).len(), 6);
        // Euler: V - E + F = 2 for both children.
        for n in [front, back] {
            let v = arena.node_vertices(n).len() as i64;
            let e = arena.node_edges(n).len() as i64;
            let f = arena.nodes[n].faces.len() as i64;
            assert_eq!(v - e + f, 2);
        }
        assert!(!arena.nodes[0].is_leaf());
    }

    #[test]
    fn plane_through_a_face_does_not_cut() {
        let mut arena = single_tet();
        assert!(arena.split_node(0, &z_plane(0, 1)).is_none());
        assert!(arena.split_node(0, &z_plane(2, 1)).is_none());
    }
}
