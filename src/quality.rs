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

//! Per-tetrahedron quality: AMIPS distortion energy and dihedral angles.

use serde::{Deserialize, Serialize};

use crate::geometry::point::{Point3, Vector3};

/// Energy assigned to inverted, flat or non-finite elements.
pub const MAX_ENERGY: f64 = 1e50;

// Inverse of the edge matrix of a unit regular tetrahedron with vertices
// (0,0,0), (1,0,0), (1/2,√3/2,0), (1/2,√3/6,√(2/3)); upper triangular.
const W_INV: [[f64; 3]; 3] = [
    [1.0, -0.577_350_269_189_625_8, -0.408_248_290_463_863],
    [0.0, 1.154_700_538_379_251_7, -0.408_248_290_463_863],
    [0.0, 0.0, 1.224_744_871_391_589],
];
// det(W) = √2 / 2
const W_DET: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Outward-facing facets of a positively oriented tet: entry `i` is the facet
/// opposite vertex `i`.
pub const FACETS: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// The six edges as local index pairs.
pub const EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TetQuality {
    pub energy: f64,
    /// Radians.
    pub min_d_angle: f64,
    /// Radians.
    pub max_d_angle: f64,
}

impl Default for TetQuality {
    fn default() -> Self {
        Self {
            energy: MAX_ENERGY,
            min_d_angle: 0.0,
            max_d_angle: std::f64::consts::PI,
        }
    }
}

/// AMIPS energy `tr(JᵀJ) / (3 det(J)^(2/3))` with `J = E W⁻¹`; 1 for a regular tet.
pub fn amips_energy(p: &[Point3; 4]) -> f64 {
    let e = [p[1] - p[0], p[2] - p[0], p[3] - p[0]];
    let det_e = e[0].cross(&e[1]).dot(&e[2]);
    if !(det_e > 0.0) || !det_e.is_finite() {
        return MAX_ENERGY;
    }
    // J[i][j] = Σ_k E[k][i] * W⁻¹[k][j], E[k] being the k-th edge column.
    let mut fro = 0.0;
    for i in 0..3 {
        for j in 0..3 {
            let mut v = 0.0;
            for k in 0..3 {
                v += e[k][i] * W_INV[k][j];
            }
            fro += v * v;
        }
    }
    let det_j = det_e / W_DET;
    let energy = fro / (3.0 * det_j.powf(2.0 / 3.0));
    if energy.is_finite() && energy < MAX_ENERGY { energy } else { MAX_ENERGY }
}

/// (min, max) dihedral angle in radians; (0, π) when degenerate.
pub fn dihedral_angles(p: &[Point3; 4]) -> (f64, f64) {
    let normals: [Option<Vector3>; 4] = std::array::from_fn(|i| {
        let [a, b, c] = FACETS[i];
        (p[b] - p[a]).cross(&(p[c] - p[a])).normalized()
    });
    let mut min = std::f64::consts::PI;
    let mut max: f64 = 0.0;
    for [i, j] in EDGES {
        // The two facets sharing edge (i, j) are the ones opposite the other two vertices.
        let others: Vec<usize> = (0..4).filter(|&k| k != i && k != j).collect();
        let (Some(n0), Some(n1)) = (normals[others[0]], normals[others[1]]) else {
            return (0.0, std::f64::consts::PI);
        };
        let angle = std::f64::consts::PI - n0.dot(&n1).clamp(-1.0, 1.0).acos();
        min = min.min(angle);
        max = max.max(angle);
    }
    (min, max)
}

pub fn tet_quality(p: &[Point3; 4]) -> TetQuality {
    let energy = amips_energy(p);
    let (min_d_angle, max_d_angle) = if energy >= MAX_ENERGY {
        (0.0, std::f64::consts::PI)
    } else {
        dihedral_angles(p)
    };
    TetQuality {
        energy,
        min_d_angle,
        max_d_angle,
    }
}

/// Aggregate statistics over a set of tet qualities.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub min_min_d_angle: f64,
    pub avg_min_d_angle: f64,
    pub max_max_d_angle: f64,
    pub avg_max_d_angle: f64,
    pub max_energy: f64,
    pub avg_energy: f64,
}

impl QualitySummary {
    /// `None` for an empty set.
    pub fn from_qualities<'a, I>(qualities: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a TetQuality>,
    {
        let mut n = 0usize;
        let mut s = QualitySummary {
            min_min_d_angle: f64::INFINITY,
            avg_min_d_angle: 0.0,
            max_max_d_angle: 0.0,
            avg_max_d_angle: 0.0,
            max_energy: 0.0,
            avg_energy: 0.0,
        };
        for q in qualities {
            n += 1;
            s.min_min_d_angle = s.min_min_d_angle.min(q.min_d_angle);
            s.max_max_d_angle = s.max_max_d_angle.max(q.max_d_angle);
            s.max_energy = s.max_energy.max(q.energy);
            s.avg_min_d_angle += q.min_d_angle;
            s.avg_max_d_angle += q.max_d_angle;
            s.avg_energy += q.energy;
        }
        if n == 0 {
            return None;
        }
        let inv = 1.0 / n as f64;
        s.avg_min_d_angle *= inv;
        s.avg_max_d_angle *= inv;
        s.avg_energy *= inv;
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn regular() -> [Point3; 4] {
        let s3 = 3f64.sqrt();
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, s3 / 2.0, 0.0),
            Point3::new(0.5, s3 / 6.0, (2.0f64 / 3.0).sqrt()),
        ]
    }

    #[test]
    fn regular_tet_has_unit_energy() {
        assert_relative_eq!(amips_energy(&regular()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn energy_is_scale_invariant() {
        let p = regular().map(|v| Point3::new(v.x * 7.5, v.y * 7.5, v.z * 7.5));
        assert_relative_eq!(amips_energy(&p), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn inverted_and_flat_tets_hit_the_cap() {
        let mut p = regular();
        p.swap(0, 1);
        assert_eq!(amips_energy(&p), MAX_ENERGY);
        let flat = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        assert_eq!(amips_energy(&flat), MAX_ENERGY);
    }

    #[test]
    fn regular_dihedral_angle() {
        let (min, max) = dihedral_angles(&regular());
        let expected = (1.0f64 / 3.0).acos();
        assert_relative_eq!(min, expected, epsilon = 1e-12);
        assert_relative_eq!(max, expected, epsilon = 1e-12);
    }

    #[test]
    fn corner_tet_angles() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let (min, max) = dihedral_angles(&p);
        assert_relative_eq!(max, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(min, (1.0f64 / 3f64.sqrt()).acos(), epsilon = 1e-12);
    }

    #[test]
    fn summary_of_nothing_is_none() {
        assert!(QualitySummary::from_qualities(std::iter::empty::<&TetQuality>()).is_none());
    }
}
