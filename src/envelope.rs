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

//! Distance queries against the original input surface.

use crate::geometry::{
    aabb::Aabb,
    aabb_tree::AabbTree,
    point::Point3,
    util::{closest_point_on_triangle, point_triangle_squared_distance, sample_triangle},
};

/// The epsilon-envelope of a triangle surface. Immutable once built; all
/// queries compare squared distances, so the answers are monotone in epsilon.
pub struct Envelope {
    vertices: Vec<Point3>,
    faces: Vec<[usize; 3]>,
    tree: Option<AabbTree<usize>>,
}

impl Envelope {
    pub fn new(vertices: Vec<Point3>, faces: Vec<[usize; 3]>) -> Self {
        let items = faces
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                let b = Aabb::from_points(f.iter().map(|&v| &vertices[v]))?;
                Some((b, i))
            })
            .collect();
        let tree = AabbTree::build(items);
        Self {
            vertices,
            faces,
            tree,
        }
    }

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_none()
    }

    pub fn triangle(&self, f: usize) -> [Point3; 3] {
        let [a, b, c] = self.faces[f];
        [self.vertices[a], self.vertices[b], self.vertices[c]]
    }

    /// Nearest input face and its squared distance.
    pub fn nearest_face(&self, p: &Point3) -> Option<(usize, f64)> {
        let tree = self.tree.as_ref()?;
        let dist2 = |f: &usize| point_triangle_squared_distance(p, &self.triangle(*f));
        tree.nearest(p, &dist2).map(|(d, f)| (*f, d))
    }

    pub fn squared_distance(&self, p: &Point3) -> f64 {
        self.nearest_face(p).map_or(f64::INFINITY, |(_, d)| d)
    }

    /// Closest point on the input surface.
    pub fn closest_point(&self, p: &Point3) -> Option<Point3> {
        let (f, _) = self.nearest_face(p)?;
        let [a, b, c] = self.triangle(f);
        Some(closest_point_on_triangle(p, &a, &b, &c))
    }

    pub fn point_within(&self, p: &Point3, eps_2: f64) -> bool {
        match &self.tree {
            Some(tree) => {
                let dist2 = |f: &usize| point_triangle_squared_distance(p, &self.triangle(*f));
                tree.any_within(p, eps_2, &dist2)
            }
            None => false,
        }
    }

    /// Is the whole facet inside the envelope? Vertices are always tested;
    /// with `sampling = Some(d)` a barycentric grid of spacing `d` is tested too.
    pub fn facet_within(&self, tri: &[Point3; 3], eps_2: f64, sampling: Option<f64>) -> bool {
        if !tri.iter().all(|p| self.point_within(p, eps_2)) {
            return false;
        }
        let Some(spacing) = sampling else {
            return true;
        };
        // Distance to a triangle is convex, so corners within eps of one common
        // input triangle put the whole facet within eps of it.
        if self.single_face_covers(tri, eps_2) {
            return true;
        }
        let mut samples = Vec::new();
        sample_triangle(tri, spacing, &mut samples);
        samples.iter().all(|p| self.point_within(p, eps_2))
    }

    fn single_face_covers(&self, tri: &[Point3; 3], eps_2: f64) -> bool {
        let Some(tree) = &self.tree else {
            return false;
        };
        let Some(bounds) = Aabb::from_points(tri.iter()) else {
            return false;
        };
        let mut hits = Vec::new();
        tree.query(&bounds.enlarged(eps_2.sqrt()), &mut hits);
        hits.into_iter().any(|&f| {
            let t = self.triangle(f);
            tri.iter().all(|p| point_triangle_squared_distance(p, &t) <= eps_2)
        })
    }
}

/// An envelope together with the tolerance a caller tests against.
#[derive(Clone, Copy)]
pub struct EnvelopeCheck<'a> {
    pub envelope: &'a Envelope,
    pub eps_2: f64,
    pub sampling: Option<f64>,
}

impl<'a> EnvelopeCheck<'a> {
    pub fn new(envelope: &'a Envelope, eps_2: f64, sampling: Option<f64>) -> Self {
        Self {
            envelope,
            eps_2,
            sampling,
        }
    }

    #[inline]
    pub fn facet_ok(&self, tri: &[Point3; 3]) -> bool {
        self.envelope.facet_within(tri, self.eps_2, self.sampling)
    }

    #[inline]
    pub fn point_ok(&self, p: &Point3) -> bool {
        self.envelope.point_within(p, self.eps_2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Envelope {
        Envelope::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn point_queries() {
        let env = unit_square();
        assert!(env.point_within(&Point3::new(0.5, 0.5, 0.05), 0.01));
        assert!(!env.point_within(&Point3::new(0.5, 0.5, 0.2), 0.01));
        let c = env.closest_point(&Point3::new(0.25, 0.75, 3.0)).unwrap();
        assert_eq!(c, Point3::new(0.25, 0.75, 0.0));
        assert!((env.squared_distance(&Point3::new(2.0, 0.5, 0.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn facet_spanning_both_faces_is_inside() {
        let env = unit_square();
        let tri = [
            Point3::new(0.1, 0.1, 0.01),
            Point3::new(0.9, 0.2, 0.01),
            Point3::new(0.2, 0.9, -0.01),
        ];
        assert!(env.facet_within(&tri, 0.02 * 0.02, Some(0.01)));
    }

    #[test]
    fn sampling_catches_a_bulging_facet() {
        // Corners sit on two separated strips; the middle of the facet is far away.
        let env = Envelope::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 0.1, 0.0),
                Point3::new(0.0, 2.0, 0.0),
                Point3::new(1.0, 2.0, 0.0),
                Point3::new(0.0, 2.1, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        let tri = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.1, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let eps_2 = 1e-4;
        assert!(env.facet_within(&tri, eps_2, None));
        assert!(!env.facet_within(&tri, eps_2, Some(0.01)));
    }

    #[test]
    fn empty_envelope_contains_nothing() {
        let env = Envelope::new(Vec::new(), Vec::new());
        assert!(env.is_empty());
        assert!(!env.point_within(&Point3::new(0.0, 0.0, 0.0), 1.0));
    }
}
