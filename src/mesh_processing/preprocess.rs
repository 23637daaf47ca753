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

use tracing::{debug, info, trace, warn};

use crate::envelope::{Envelope, EnvelopeCheck};
use crate::error::{TetError, TetResult};
use crate::geometry::util::{tri_min_angle_cos, triangle_normal};
use crate::kernel::predicates::is_degenerate_triangle;
use crate::mesh_processing::edge_collapse::{CollapseOpts, KeepVertex, WorkingSurface};
use crate::mesh_processing::remesh::{RemeshError, RemeshOptions, SurfaceRemesher, validate_surface};
use crate::mesh_processing::surface::SurfaceMesh;
use crate::state::RunState;

/// Simplification stays this far inside the envelope so that later stages
/// keep some slack.
const SIMPLIFY_EPS_FACTOR: f64 = 0.8;
const MAX_SIMPLIFY_PASSES: usize = 10;

/// The cleaned and simplified input the rest of the pipeline works on.
#[derive(Debug, Clone)]
pub struct ProxySurface {
    pub mesh: SurfaceMesh,
    pub is_closed: bool,
    pub boundary_edges: Vec<[usize; 2]>,
}

/// Simplify `input` (already cleaned) within the envelope of the original surface.
///
/// # Errors
///
/// Returns [`TetError::EmptyMesh`] when nothing survives.
pub fn preprocess(
    input: &SurfaceMesh,
    envelope: &Envelope,
    state: &RunState,
    remesher: Option<&dyn SurfaceRemesher>,
) -> TetResult<ProxySurface> {
    if input.is_empty() {
        return Err(TetError::EmptyMesh);
    }

    let remeshed = remesher.and_then(|r| match run_remesher(r, input, state) {
        Ok(mesh) => Some(mesh),
        Err(err) => {
            warn!("surface remesher failed ({err}), falling back to internal preprocessing");
            None
        }
    });

    let mesh = match remeshed {
        Some(mesh) => mesh,
        None => {
            let eps = state.eps * SIMPLIFY_EPS_FACTOR;
            let sampling = state.use_sampling.then_some(state.sampling_dist);
            let check = EnvelopeCheck::new(envelope, eps * eps, sampling);
            simplify(input.clone(), &check)
        }
    };

    if mesh.is_empty() {
        return Err(TetError::EmptyMesh);
    }
    let boundary_edges = mesh.boundary_edges();
    let is_closed = mesh.is_closed();
    info!(
        n_v = mesh.vertices.len(),
        n_f = mesh.faces.len(),
        is_closed,
        "preprocessing done"
    );
    Ok(ProxySurface {
        mesh,
        is_closed,
        boundary_edges,
    })
}

fn run_remesher(r: &dyn SurfaceRemesher, input: &SurfaceMesh, state: &RunState) -> Result<SurfaceMesh, RemeshError> {
    let opts = RemeshOptions::from_state(state);
    opts.validate()?;
    let out = r.remesh_surface(input, &opts)?;
    validate_surface(&out)?;
    let out = out.clean();
    if out.is_empty() {
        return Err(RemeshError::Degenerate("every face was degenerate".into()));
    }
    Ok(out)
}

/// Alternate collapse and swap passes until a pass changes nothing.
pub fn simplify(mesh: SurfaceMesh, check: &EnvelopeCheck<'_>) -> SurfaceMesh {
    let mut ws = WorkingSurface::new(mesh);
    for pass in 0..MAX_SIMPLIFY_PASSES {
        let collapsed = collapse_pass(&mut ws, check);
        let swapped = swap_pass(&mut ws, check);
        debug!(pass, collapsed, swapped, "simplification pass");
        if collapsed == 0 && swapped == 0 {
            break;
        }
    }
    ws.into_mesh()
}

fn collapse_pass(ws: &mut WorkingSurface, check: &EnvelopeCheck<'_>) -> usize {
    let mut edges: Vec<(f64, [usize; 2])> = ws
        .live_edges()
        .into_iter()
        .map(|[a, b]| (ws.vertices[a].distance_squared_to(&ws.vertices[b]), [a, b]))
        .collect();
    edges.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

    let opts = CollapseOpts::default();
    let mut count = 0;
    for (_, [a, b]) in edges {
        if ws.vertex_removed[a] || ws.vertex_removed[b] {
            continue;
        }
        let plan = ws
            .begin_collapse(a, b, &KeepVertex, &opts, check)
            .or_else(|_| ws.begin_collapse(b, a, &KeepVertex, &opts, check));
        match plan {
            Ok(plan) => {
                ws.commit_collapse(plan);
                count += 1;
            }
            Err(reason) => trace!(a, b, ?reason, "surface collapse rejected"),
        }
    }
    count
}

fn swap_pass(ws: &mut WorkingSurface, check: &EnvelopeCheck<'_>) -> usize {
    let mut count = 0;
    for [a, b] in ws.live_edges() {
        if try_swap(ws, a, b, check) {
            count += 1;
        }
    }
    count
}

/// Flip edge `ab` shared by `[a, b, c]` and `[b, a, d]` into `[a, d, c]` and
/// `[b, c, d]` when the smallest angle strictly grows.
fn try_swap(ws: &mut WorkingSurface, a: usize, b: usize, check: &EnvelopeCheck<'_>) -> bool {
    let faces = ws.edge_faces(a, b);
    let [f1, f2] = faces[..] else {
        return false;
    };
    // Orient so that f1 walks a -> b.
    let (a, b) = if has_directed_edge(&ws.faces[f1], a, b) { (a, b) } else { (b, a) };
    if !has_directed_edge(&ws.faces[f2], b, a) {
        return false;
    }
    let (Some(c), Some(d)) = (apex(&ws.faces[f1], a, b), apex(&ws.faces[f2], a, b)) else {
        return false;
    };
    if c == d || !ws.edge_faces(c, d).is_empty() {
        return false;
    }

    let p = |v: usize| ws.vertices[v];
    let old_cos = tri_min_angle_cos(&p(a), &p(b), &p(c)).max(tri_min_angle_cos(&p(b), &p(a), &p(d)));
    let new_faces = [[a, d, c], [b, c, d]];
    let new_pts = new_faces.map(|f| [p(f[0]), p(f[1]), p(f[2])]);
    let new_cos = tri_min_angle_cos(&new_pts[0][0], &new_pts[0][1], &new_pts[0][2])
        .max(tri_min_angle_cos(&new_pts[1][0], &new_pts[1][1], &new_pts[1][2]));
    if new_cos + 1e-12 >= old_cos {
        return false;
    }

    let n1 = triangle_normal(&p(a), &p(b), &p(c));
    let n2 = triangle_normal(&p(b), &p(a), &p(d));
    for t in &new_pts {
        if is_degenerate_triangle(&t[0], &t[1], &t[2]) {
            return false;
        }
        let n = triangle_normal(&t[0], &t[1], &t[2]);
        if n.dot(&n1) <= 0.0 || n.dot(&n2) <= 0.0 {
            return false;
        }
        if !check.facet_ok(t) {
            return false;
        }
    }
    if ws.conflicts(&new_faces, None, &[f1, f2]) {
        return false;
    }
    ws.replace_faces(&[f1, f2], new_faces.to_vec());
    true
}

fn has_directed_edge(f: &[usize; 3], a: usize, b: usize) -> bool {
    (0..3).any(|k| f[k] == a && f[(k + 1) % 3] == b)
}

fn apex(f: &[usize; 3], a: usize, b: usize) -> Option<usize> {
    f.iter().copied().find(|&v| v != a && v != b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TetConfig;
    use crate::geometry::point::Point3;

    fn square_with_sliver_diagonal() -> SurfaceMesh {
        SurfaceMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(4.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    #[test]
    fn swap_improves_min_angle_on_a_plane() {
        // Thin triangles sharing the long diagonal of a 1x4 rectangle with a
        // bump vertex; swapping toward the short diagonal is a strict improvement.
        let mesh = SurfaceMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, -0.2, 0.0),
                Point3::new(4.0, 0.0, 0.0),
                Point3::new(2.0, 0.2, 0.0),
            ],
            faces: vec![[0, 1, 2], [2, 3, 0]],
        };
        let env = Envelope::new(mesh.vertices.clone(), mesh.faces.clone());
        let check = EnvelopeCheck::new(&env, 1e-8, None);
        let mut ws = WorkingSurface::new(mesh);
        assert!(try_swap(&mut ws, 0, 2, &check));
        let out = ws.into_mesh();
        assert_eq!(out.faces.len(), 2);
        assert!(out.faces.iter().all(|f| f.contains(&1) && f.contains(&3)));
    }

    #[test]
    fn empty_input_is_fatal() {
        let mesh = SurfaceMesh::default();
        let env = Envelope::new(Vec::new(), Vec::new());
        let state = RunState::new(1.0, &TetConfig::default(), false);
        let err = preprocess(&mesh, &env, &state, None).unwrap_err();
        assert!(matches!(err, TetError::EmptyMesh));
    }

    struct Broken;
    impl SurfaceRemesher for Broken {
        fn remesh_surface(&self, _: &SurfaceMesh, _: &RemeshOptions) -> Result<SurfaceMesh, RemeshError> {
            Err(RemeshError::Failed("not today".into()))
        }
    }

    #[test]
    fn failed_remesher_falls_back() {
        let mesh = square_with_sliver_diagonal();
        let env = Envelope::new(mesh.vertices.clone(), mesh.faces.clone());
        let state = RunState::new(4.2, &TetConfig::default(), false);
        let out = preprocess(&mesh, &env, &state, Some(&Broken)).expect("fallback succeeds");
        assert!(!out.is_closed);
        assert_eq!(out.boundary_edges.len(), 4);
        assert_eq!(out.mesh.faces.len(), 2);
    }
}
