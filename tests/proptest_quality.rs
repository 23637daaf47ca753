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


//! Property tests for the AMIPS energy and dihedral angles.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use envtet::geometry::point::Point3;
use envtet::kernel::orientation::orient3d;
use envtet::quality::{MAX_ENERGY, amips_energy, dihedral_angles, tet_quality};
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Point3> {
    (-10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64).prop_map(|(x, y, z)| Point3::new(x, y, z))
}

/// Four points forming a tet that is not close to flat.
fn fat_tet() -> impl Strategy<Value = [Point3; 4]> {
    prop::array::uniform4(point()).prop_filter("needs a non-degenerate tet", |p| {
        let e = [p[1] - p[0], p[2] - p[0], p[3] - p[0]];
        let vol = e[0].cross(&e[1]).dot(&e[2]).abs();
        let longest = e.iter().map(|v| v.norm()).fold(0.0, f64::max);
        vol > 1e-3 * longest.powi(3)
    })
}

fn positive(mut p: [Point3; 4]) -> [Point3; 4] {
    if orient3d(&p[0], &p[1], &p[2], &p[3]) < 0 {
        p.swap(0, 1);
    }
    p
}

#[test]
fn regular_tet_has_unit_energy() {
    let s = 1.0 / 2f64.sqrt();
    let p = [
        Point3::new(1.0, 0.0, -s),
        Point3::new(-1.0, 0.0, -s),
        Point3::new(0.0, 1.0, s),
        Point3::new(0.0, -1.0, s),
    ];
    let p = positive(p);
    assert_relative_eq!(amips_energy(&p), 1.0, epsilon = 1e-9);
    let (min, max) = dihedral_angles(&p);
    assert_relative_eq!(min, (1.0f64 / 3.0).acos(), epsilon = 1e-9);
    assert_relative_eq!(max, (1.0f64 / 3.0).acos(), epsilon = 1e-9);
}

proptest! {
    #[test]
    fn energy_is_at_least_one(p in fat_tet()) {
        let e = amips_energy(&positive(p));
        prop_assert!(e >= 1.0 - 1e-9, "energy {e} below the regular tet");
    }

    #[test]
    fn inverted_tets_get_the_maximum(p in fat_tet()) {
        let mut p = positive(p);
        p.swap(2, 3);
        prop_assert_eq!(amips_energy(&p), MAX_ENERGY);
        let q = tet_quality(&p);
        prop_assert_eq!(q.min_d_angle, 0.0);
        prop_assert_eq!(q.max_d_angle, PI);
    }

    #[test]
    fn energy_ignores_scale_and_translation(p in fat_tet(), scale in 0.1..10.0f64, shift in point()) {
        let p = positive(p);
        let moved = p.map(|q| Point3::new(q.x * scale + shift.x, q.y * scale + shift.y, q.z * scale + shift.z));
        let (e0, e1) = (amips_energy(&p), amips_energy(&moved));
        prop_assert!((e0 - e1).abs() <= 1e-6 * e0, "{e0} vs {e1}");
    }

    #[test]
    fn dihedral_angles_are_ordered(p in fat_tet()) {
        let (min, max) = dihedral_angles(&positive(p));
        prop_assert!(min > 0.0);
        prop_assert!(min <= max);
        prop_assert!(max < PI);
        // Six dihedral angles of a tet always exceed 2π in total, so the largest tops π/3.
        prop_assert!(max >= PI / 3.0 - 1e-9);
    }
}
