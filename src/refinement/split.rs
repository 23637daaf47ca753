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

//! Edge splitting at the midpoint.

use crate::mesh::{FacetTag, TetVertex, VertexPos};
use crate::numeric::rational::ExactPoint3;
use crate::quality::{EDGES, MAX_ENERGY};

use super::{NEW_VERTEX, PassStats, Patch, Refiner, Reject};

/// Edges longer than this multiple of their target length are split.
pub const SPLIT_RATIO: f64 = 4.0 / 3.0;

/// Midpoint of the doubles, whatever the endpoints are stored as.
fn midpoint(a: &VertexPos, b: &VertexPos) -> VertexPos {
    VertexPos::Float(a.posf().midpoint(&b.posf()))
}

fn exact_midpoint(a: &VertexPos, b: &VertexPos) -> Option<VertexPos> {
    let (x, y) = (a.to_exact()?, b.to_exact()?);
    Some(VertexPos::from_exact(ExactPoint3::midpoint(&x, &y)))
}

/// Replace every tet around `(a, b)` by its two halves.
pub(crate) fn plan_split(r: &Refiner<'_>, a: usize, b: usize, pos: VertexPos) -> Result<Patch, Reject> {
    let tets = r.mesh.edge_tets(a, b);
    if a == b || tets.is_empty() {
        return Err(Reject::Topology);
    }
    let (va, vb) = (&r.mesh.vertices[a], &r.mesh.vertices[b]);

    let mut surface_edge = false;
    let mut bbox_edge = false;
    let mut new_tets = Vec::with_capacity(2 * tets.len());
    for &t in &tets {
        let tet = &r.mesh.tets[t];
        let (Some(ia), Some(ib)) = (tet.local(a), tet.local(b)) else {
            return Err(Reject::Topology);
        };
        for i in (0..4).filter(|&i| i != ia && i != ib) {
            match tet.tags[i] {
                FacetTag::Surface(_) => surface_edge = true,
                FacetTag::BoundingBox => bbox_edge = true,
                FacetTag::Interior => {}
            }
        }
        let mut near_a = tet.v;
        near_a[ib] = NEW_VERTEX;
        let mut tags_a = tet.tags;
        tags_a[ia] = FacetTag::Interior;
        let mut near_b = tet.v;
        near_b[ia] = NEW_VERTEX;
        let mut tags_b = tet.tags;
        tags_b[ib] = FacetTag::Interior;
        new_tets.push((near_a, tags_a));
        new_tets.push((near_b, tags_b));
    }

    let mut nv = TetVertex::new(pos);
    nv.on_surface = surface_edge;
    nv.on_bbox = bbox_edge;
    nv.on_boundary = surface_edge && va.on_boundary && vb.on_boundary;
    nv.scale = 0.5 * (va.scale + vb.scale);

    let patch = Patch {
        old_tets: tets,
        new_tets,
        new_vertex: Some(nv),
        focus: Some(NEW_VERTEX),
        ..Patch::default()
    };
    let old = r.energy_of(&patch.old_tets);
    let new = r.evaluate(&patch)?;
    // The worst element may not get worse, and no tet may come out flat in doubles.
    if new.max > old.max || new.max >= MAX_ENERGY {
        return Err(Reject::Energy);
    }
    Ok(patch)
}

/// Split `(a, b)` if admissible. Surface edges first try the midpoint
/// projected onto the input. The exact midpoint is only used when the
/// rounded one inverts a tet.
pub(crate) fn try_split(r: &mut Refiner<'_>, a: usize, b: usize) -> Result<(), Reject> {
    let (pa, pb) = (r.mesh.vertices[a].pos.clone(), r.mesh.vertices[b].pos.clone());
    let mid = midpoint(&pa, &pb);

    let edge = r.mesh.edge_tets(a, b);
    if r.is_surface_edge(&edge, a, b) {
        if let Some(p) = r.envelope().closest_point(&mid.posf()) {
            if let Ok(patch) = plan_split(r, a, b, VertexPos::Float(p)) {
                r.commit(patch);
                return Ok(());
            }
        }
    }

    let patch = match plan_split(r, a, b, mid.clone()) {
        Ok(p) => p,
        Err(Reject::Orientation) => {
            let exact = exact_midpoint(&pa, &pb).ok_or(Reject::Orientation)?;
            if exact == mid {
                return Err(Reject::Orientation);
            }
            plan_split(r, a, b, exact)?
        }
        Err(e) => return Err(e),
    };
    r.commit(patch);
    Ok(())
}

/// Split every edge above [`SPLIT_RATIO`] times its target, longest first.
/// Edges created during the pass wait for the next one.
pub fn split_pass(r: &mut Refiner<'_>) -> PassStats {
    let mut edges: Vec<[usize; 2]> = r
        .mesh
        .live_tets()
        .flat_map(|t| {
            let v = r.mesh.tets[t].v;
            EDGES.map(|[i, j]| if v[i] < v[j] { [v[i], v[j]] } else { [v[j], v[i]] })
        })
        .collect();
    edges.sort_unstable();
    edges.dedup();

    let mut candidates: Vec<(f64, [usize; 2])> = edges
        .into_iter()
        .filter_map(|[a, b]| {
            let len = r.mesh.posf(a).distance_to(&r.mesh.posf(b));
            (len > SPLIT_RATIO * r.target_length(a, b)).then_some((len, [a, b]))
        })
        .collect();
    candidates.sort_by(|x, y| y.0.total_cmp(&x.0).then(x.1.cmp(&y.1)));

    let mut stats = PassStats::default();
    for (_, [a, b]) in candidates {
        stats.note(try_split(r, a, b));
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TetConfig;
    use crate::geometry::point::Point3;
    use crate::mesh::TetMesh;
    use crate::refinement::tests::{far_envelope, five_ring};
    use crate::state::RunState;

    fn wedge() -> TetMesh {
        let mut m = TetMesh::new(None);
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
            Point3::new(2.0, 1.2, 0.0),
            Point3::new(2.0, 0.6, 1.0),
        ] {
            m.add_vertex(TetVertex::new(VertexPos::Float(p)));
        }
        m.add_tet([0, 1, 2, 3], [FacetTag::BoundingBox; 4]);
        m
    }

    #[test]
    fn wedge_split_improves() {
        let mut m = wedge();
        let old = m.max_energy();
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(1.0, &cfg, true);
        let mut r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        assert_eq!(try_split(&mut r, 0, 1), Ok(()));
        assert_eq!(m.n_live_tets(), 2);
        assert_eq!(m.vertices[4].posf(), Point3::new(2.0, 0.0, 0.0));
        assert!(m.vertices[4].on_bbox);
        assert!(m.live_tets().all(|t| m.orient(&m.tets[t].v) > 0));
        assert!(m.max_energy() < old);
        // The internal facet between the halves is untagged.
        let interior: usize = m
            .live_tets()
            .map(|t| m.tets[t].tags.iter().filter(|&&g| g == FacetTag::Interior).count())
            .sum();
        assert_eq!(interior, 2);
    }

    #[test]
    fn exact_endpoint_splits_at_a_double() {
        use rug::Rational;
        let mut m = wedge();
        let x = Rational::from(4) + Rational::from((1i64, 1i64 << 60));
        m.vertices[1].pos = VertexPos::from_exact(ExactPoint3([x, Rational::new(), Rational::new()]));
        assert!(!m.vertices[1].pos.is_rounded());
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(1.0, &cfg, true);
        let mut r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        assert_eq!(try_split(&mut r, 0, 1), Ok(()));
        assert_eq!(m.vertices[4].pos, VertexPos::Float(Point3::new(2.0, 0.0, 0.0)));
        assert!(m.live_tets().all(|t| m.orient(&m.tets[t].v) > 0));
    }

    #[test]
    fn split_of_central_edge_is_rejected() {
        let mut m = five_ring();
        let before = m.clone();
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(1.0, &cfg, true);
        let mut r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        assert_eq!(try_split(&mut r, 0, 1), Err(Reject::Energy));
        assert_eq!(m, before);
    }
}
