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


mod common;

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use envtet::mesh::checkpoint::Checkpoint;
use envtet::{OpType, Step, TetConfig, TetError, Tetrahedralizer, extract_surface_mesh, tetrahedralize};

use common::{
    CUBE_ROTATION, coarse_config, cube_faces, cube_vertices, point_triangle_distance2, rotated_cube_vertices,
    signed_volume, unrotate,
};

fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("envtet-{}-{name}.bin", std::process::id()))
}

#[test]
fn cube_output_is_positive_and_fills_the_cube() {
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &coarse_config()).unwrap();
    assert!(!out.tets.is_empty());
    assert_eq!(out.min_dihedral_angles.len(), out.tets.len());

    for t in &out.tets {
        assert!(signed_volume(&out.vertices, t) > 0.0, "inverted tet {t:?}");
    }
    let volume: f64 = out.tets.iter().map(|t| signed_volume(&out.vertices, t)).sum();
    assert_relative_eq!(volume, 1.0, epsilon = 0.05);

    for v in &out.vertices {
        for c in v {
            assert!((-0.01..=1.01).contains(c), "vertex {v:?} left the cube");
        }
    }
}

#[test]
fn rotated_cube_output_is_positive_and_fills_the_cube() {
    let cfg = coarse_config().with_max_passes(3);
    let out = tetrahedralize(&rotated_cube_vertices(), &cube_faces(), &cfg).unwrap();
    assert!(!out.tets.is_empty());

    // Exact cut vertices may stay unrounded; their doubles must still give positive tets.
    for t in &out.tets {
        assert!(signed_volume(&out.vertices, t) > 0.0, "inverted tet {t:?}");
    }
    let volume: f64 = out.tets.iter().map(|t| signed_volume(&out.vertices, t)).sum();
    assert_relative_eq!(volume, 1.0, epsilon = 0.05);

    for v in &out.vertices {
        let u = unrotate(*v, CUBE_ROTATION);
        for c in u {
            assert!((-0.01..=1.01).contains(&c), "vertex {v:?} left the cube");
        }
    }
}

#[test]
fn cube_boundary_stays_in_the_envelope() {
    let cfg = coarse_config();
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &cfg).unwrap();
    let (vertices, faces) = extract_surface_mesh(&out.vertices, &out.tets).unwrap();

    let input = cube_vertices();
    let triangles: Vec<[[f64; 3]; 3]> = cube_faces().iter().map(|f| f.map(|v| input[v])).collect();
    let eps = 3f64.sqrt() / cfg.eps_rel;

    const N: usize = 8;
    let mut worst = 0.0f64;
    for f in &faces {
        let [a, b, c] = f.map(|v| vertices[v]);
        for i in 0..=N {
            for j in 0..=N - i {
                let (s, t) = (i as f64 / N as f64, j as f64 / N as f64);
                let p: [f64; 3] = std::array::from_fn(|k| a[k] + s * (b[k] - a[k]) + t * (c[k] - a[k]));
                let d2 = triangles
                    .iter()
                    .map(|&tri| point_triangle_distance2(p, tri))
                    .fold(f64::INFINITY, f64::min);
                worst = worst.max(d2.sqrt());
            }
        }
    }
    assert!(worst <= eps * (1.0 + 1e-9), "boundary strays {worst} from the input (eps {eps})");
}

#[test]
fn cube_boundary_is_closed() {
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &coarse_config()).unwrap();
    let (_, faces) = extract_surface_mesh(&out.vertices, &out.tets).unwrap();
    assert!(faces.len() >= 12);

    let mut edges: BTreeMap<[usize; 2], usize> = BTreeMap::new();
    for f in &faces {
        for i in 0..3 {
            let (a, b) = (f[i], f[(i + 1) % 3]);
            *edges.entry([a.min(b), a.max(b)]).or_default() += 1;
        }
    }
    assert!(edges.values().all(|&n| n == 2));
}

#[test]
fn extracting_twice_gives_identical_results() {
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &coarse_config()).unwrap();
    let first = extract_surface_mesh(&out.vertices, &out.tets).unwrap();
    let second = extract_surface_mesh(&out.vertices, &out.tets).unwrap();
    assert_eq!(first, second);
}

#[test]
fn runs_are_deterministic() {
    let cfg = coarse_config().with_quiet(true);
    let a = tetrahedralize(&cube_vertices(), &cube_faces(), &cfg).unwrap();
    let b = tetrahedralize(&cube_vertices(), &cube_faces(), &cfg).unwrap();
    assert_eq!(a.vertices, b.vertices);
    assert_eq!(a.tets, b.tets);
}

#[test]
fn max_energy_never_increases_during_refinement() {
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &coarse_config()).unwrap();
    let maxima: Vec<f64> = out
        .records
        .iter()
        .filter(|r| {
            matches!(
                r.op,
                OpType::OptInit | OpType::Split | OpType::Collapse | OpType::Swap | OpType::Smooth
            )
        })
        .filter_map(|r| r.quality.as_ref().map(|q| q.max_energy))
        .collect();
    assert!(!maxima.is_empty());
    for w in maxima.windows(2) {
        assert!(w[1] <= w[0] * (1.0 + 1e-12), "max energy rose from {} to {}", w[0], w[1]);
    }
}

#[test]
fn quiet_runs_keep_no_records() {
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &coarse_config().with_quiet(true)).unwrap();
    assert!(out.records.is_empty());
}

#[test]
fn records_follow_the_pipeline_order() {
    let out = tetrahedralize(&cube_vertices(), &cube_faces(), &coarse_config()).unwrap();
    let ops: Vec<OpType> = out.records.iter().map(|r| r.op).collect();
    assert_eq!(
        &ops[..7],
        &[
            OpType::Init,
            OpType::Preprocessing,
            OpType::DelaunayTetra,
            OpType::DivfaceMatch,
            OpType::Bsp,
            OpType::SimpleTetra,
            OpType::OptInit,
        ]
    );
    assert_eq!(&ops[ops.len() - 2..], &[OpType::Wn, OpType::Unrounded]);
}

#[test]
fn progress_reports_every_phase_once() {
    let mut steps = Vec::new();
    Tetrahedralizer::new(coarse_config())
        .with_progress(|step, progress| steps.push((step, progress)))
        .run(&cube_vertices(), &cube_faces())
        .unwrap();
    assert_eq!(
        steps,
        vec![
            (Step::Preprocess, 0.0),
            (Step::Delaunay, 0.0),
            (Step::FaceMatching, 0.0),
            (Step::Bsp, 0.0),
            (Step::Tetra, 0.0),
            (Step::Optimize, 0.0),
        ]
    );
}

#[test]
fn resuming_from_a_checkpoint_matches_a_full_run() {
    let path = scratch_path("resume");
    let cfg = coarse_config().with_checkpoint(&path);
    let full = tetrahedralize(&cube_vertices(), &cube_faces(), &cfg).unwrap();

    let mut steps = Vec::new();
    let resumed = Tetrahedralizer::new(cfg.with_stage(2))
        .with_progress(|step, _| steps.push(step))
        .run(&cube_vertices(), &cube_faces())
        .unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(steps, vec![Step::Optimize]);
    assert_eq!(full.tets.len(), resumed.tets.len());
    assert_eq!(full.vertices.len(), resumed.vertices.len());
    let sum = |a: &[f64]| a.iter().sum::<f64>();
    assert_relative_eq!(
        sum(&full.min_dihedral_angles),
        sum(&resumed.min_dihedral_angles),
        max_relative = 1e-9
    );
}

#[test]
fn missing_checkpoint_is_an_io_error() {
    let cfg = coarse_config()
        .with_checkpoint(scratch_path("does-not-exist"))
        .with_stage(2);
    let err = tetrahedralize(&cube_vertices(), &cube_faces(), &cfg).unwrap_err();
    assert!(matches!(err, TetError::Io(_)));
}

#[test]
fn degenerate_input_is_an_empty_mesh() {
    let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
    let err = tetrahedralize(&vertices, &[[0, 1, 2]], &TetConfig::default()).unwrap_err();
    assert!(matches!(err, TetError::EmptyMesh));

    let err = tetrahedralize(&[], &[], &TetConfig::default()).unwrap_err();
    assert!(matches!(err, TetError::EmptyMesh));
}

#[test]
fn empty_mesh_still_writes_a_checkpoint() {
    let path = scratch_path("empty");
    let cfg = TetConfig::default().with_checkpoint(&path);
    let vertices = vec![[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
    let err = tetrahedralize(&vertices, &[[0, 1, 2]], &cfg).unwrap_err();
    assert!(matches!(err, TetError::EmptyMesh));

    let cp = Checkpoint::read(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert!(cp.mesh.tets.is_empty());
    assert!(cp.mesh.vertices.is_empty());
}

#[test]
fn bad_indices_are_rejected() {
    let err = tetrahedralize(&cube_vertices(), &[[0, 1, 8]], &TetConfig::default()).unwrap_err();
    assert!(matches!(err, TetError::InvalidInput(_)));
}

#[test]
fn bad_config_is_rejected() {
    let cfg = TetConfig::default().with_eps_rel(-1.0);
    let err = tetrahedralize(&cube_vertices(), &cube_faces(), &cfg).unwrap_err();
    assert!(matches!(err, TetError::InvalidConfig(_)));
}
