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

//! Edge collapse: one endpoint is merged into the other.

use ahash::AHashSet;

use crate::mesh::FacetTag;

use super::{Energy, PassStats, Patch, Refiner, Reject, current_ring, edge_rings};

/// Edges shorter than this multiple of their target length are collapsed.
pub const COLLAPSE_RATIO: f64 = 4.0 / 5.0;

/// Tag of a facet that absorbs another one when the tet between them vanishes.
fn merge_tags(x: FacetTag, y: FacetTag) -> Result<FacetTag, Reject> {
    match (x, y) {
        (x, y) if x == y => Ok(x),
        (FacetTag::Interior, y) => Ok(y),
        (x, FacetTag::Interior) => Ok(x),
        _ => Err(Reject::SurfaceTag),
    }
}

/// The tet across facet `local` of `t`, if any.
fn across(r: &Refiner<'_>, t: usize, local: usize) -> Option<(usize, usize)> {
    let f = r.mesh.tets[t].facet(local);
    let other = r.mesh.face_tets(&f).into_iter().find(|&o| o != t)?;
    let opp = r.mesh.tets[other].facet_of(&f)?;
    Some((other, opp))
}

/// Move `gone` onto `keep`, dropping every tet that contains both.
pub(crate) fn plan_collapse(r: &Refiner<'_>, gone: usize, keep: usize) -> Result<(Patch, Energy), Reject> {
    if gone == keep || r.mesh.vertices[gone].removed || r.mesh.vertices[keep].removed {
        return Err(Reject::Topology);
    }
    let edge = r.mesh.edge_tets(gone, keep);
    if edge.is_empty() {
        return Err(Reject::Topology);
    }
    let (vg, vk) = (&r.mesh.vertices[gone], &r.mesh.vertices[keep]);

    if vg.on_bbox {
        let (mg, mk) = (r.mesh.bbox_planes(gone), r.mesh.bbox_planes(keep));
        if !vk.on_bbox || mg == 0 || mg & mk != mg {
            return Err(Reject::BoundingBox);
        }
    }
    let surface_edge = r.is_surface_edge(&edge, gone, keep);
    if vg.on_surface && !surface_edge {
        return Err(Reject::SurfaceTag);
    }
    if vg.on_boundary && !(vk.on_boundary && surface_edge) {
        return Err(Reject::SurfaceTag);
    }

    let star = r.mesh.vertices[gone].conn_tets.clone();
    let changed: Vec<usize> = star.iter().copied().filter(|t| edge.binary_search(t).is_err()).collect();
    if changed.is_empty() {
        return Err(Reject::Topology);
    }

    // Facet tags that change: `(tet, local facet, tag)`.
    let mut overrides: Vec<(usize, usize, FacetTag)> = Vec::new();
    for &e in &edge {
        let tet = &r.mesh.tets[e];
        let (Some(ig), Some(ik)) = (tet.local(gone), tet.local(keep)) else {
            return Err(Reject::Topology);
        };
        match (across(r, e, ik), across(r, e, ig)) {
            (None, None) => return Err(Reject::Topology),
            (Some((t1, l1)), t2) => {
                let merged = merge_tags(r.mesh.tets[t1].tags[l1], tet.tags[ig])?;
                overrides.push((t1, l1, merged));
                if let Some((t2, l2)) = t2 {
                    overrides.push((t2, l2, merged.flipped()));
                }
            }
            (None, Some((t2, l2))) => {
                let merged = merge_tags(r.mesh.tets[t2].tags[l2], tet.tags[ik])?;
                overrides.push((t2, l2, merged));
            }
        }
    }

    let mut keep_star: AHashSet<[usize; 4]> = r.mesh.vertices[keep]
        .conn_tets
        .iter()
        .filter(|t| edge.binary_search(t).is_err())
        .map(|&t| sorted(r.mesh.tets[t].v))
        .collect();
    let mut new_tets = Vec::with_capacity(changed.len());
    for &t in &changed {
        let tet = &r.mesh.tets[t];
        let v = tet.v.map(|x| if x == gone { keep } else { x });
        if !keep_star.insert(sorted(v)) {
            return Err(Reject::Topology);
        }
        let mut tags = tet.tags;
        for &(ot, l, tag) in &overrides {
            if ot == t {
                tags[l] = tag;
            }
        }
        new_tets.push((v, tags));
    }
    let retag: Vec<(usize, usize, FacetTag)> = overrides
        .into_iter()
        .filter(|(t, _, _)| changed.binary_search(t).is_err())
        .collect();

    let check = r.check();
    for &(t, l, tag) in &retag {
        if tag.is_surface() {
            let f = r.mesh.tets[t].facet(l).map(|v| r.mesh.posf(v));
            if !check.facet_ok(&f) {
                return Err(Reject::Envelope);
            }
        }
    }

    let patch = Patch {
        old_tets: star,
        new_tets,
        removed_vertex: Some(gone),
        retag,
        focus: Some(keep),
        ..Patch::default()
    };
    let old = r.energy_of(&patch.old_tets);
    let new = r.evaluate(&patch)?;
    if !r.improves(old, new, true) {
        return Err(Reject::Energy);
    }
    Ok((patch, new))
}

fn sorted(mut v: [usize; 4]) -> [usize; 4] {
    v.sort_unstable();
    v
}

pub(crate) fn try_collapse(r: &mut Refiner<'_>, gone: usize, keep: usize) -> Result<(), Reject> {
    let (patch, _) = plan_collapse(r, gone, keep)?;
    r.commit(patch);
    Ok(())
}

/// Collapse `(a, b)` in whichever direction leaves the better patch.
pub(crate) fn collapse_edge(r: &mut Refiner<'_>, a: usize, b: usize) -> Result<(), Reject> {
    let best = match (plan_collapse(r, a, b), plan_collapse(r, b, a)) {
        (Ok(x), Ok(y)) => {
            if r.improves(x.1, y.1, true) { y } else { x }
        }
        (Ok(x), Err(_)) | (Err(_), Ok(x)) => x,
        (Err(e), Err(_)) => return Err(e),
    };
    r.commit(best.0);
    Ok(())
}

/// Collapse every edge below [`COLLAPSE_RATIO`] times its target, shortest first.
pub fn collapse_pass(r: &mut Refiner<'_>) -> PassStats {
    let mut candidates: Vec<(f64, [usize; 2], Vec<usize>)> = edge_rings(r.mesh)
        .into_iter()
        .filter_map(|([a, b], ring)| {
            let len = r.mesh.posf(a).distance_to(&r.mesh.posf(b));
            (len < COLLAPSE_RATIO * r.target_length(a, b)).then_some((len, [a, b], ring))
        })
        .collect();
    candidates.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)));

    let mut stats = PassStats::default();
    for (_, [a, b], ring) in candidates {
        if r.mesh.vertices[a].removed || r.mesh.vertices[b].removed {
            continue;
        }
        if current_ring(r.mesh, a, b, ring).is_empty() {
            continue;
        }
        stats.note(collapse_edge(r, a, b));
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TetConfig;
    use crate::geometry::point::Point3;
    use crate::refinement::tests::{far_envelope, five_ring, octahedron};
    use crate::state::RunState;

    #[test]
    fn tag_merging() {
        use crate::mesh::Side;
        let s = FacetTag::Surface(Side::Back);
        assert_eq!(merge_tags(FacetTag::Interior, s), Ok(s));
        assert_eq!(merge_tags(s, s), Ok(s));
        assert_eq!(merge_tags(s, s.flipped()), Err(Reject::SurfaceTag));
        assert_eq!(merge_tags(s, FacetTag::BoundingBox), Err(Reject::SurfaceTag));
    }

    #[test]
    fn five_ring_collapses_are_all_rejected() {
        let mut m = five_ring();
        let before = m.clone();
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(1.0, &cfg, true);
        let mut r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        assert_eq!(try_collapse(&mut r, 0, 1), Err(Reject::Topology));
        for a in 0..7 {
            for b in 0..7 {
                if a != b {
                    assert!(try_collapse(&mut r, a, b).is_err());
                }
            }
        }
        assert_eq!(m, before);
    }

    #[test]
    fn interior_vertex_collapses_to_hull() {
        let mut m = octahedron(Point3::new(0.3, 0.1, 0.05));
        let old = m.max_energy();
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(1.0, &cfg, true);
        let mut r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        // Hull vertices stay put.
        assert_eq!(try_collapse(&mut r, 0, 6), Err(Reject::BoundingBox));
        assert_eq!(try_collapse(&mut r, 6, 0), Ok(()));
        assert!(m.vertices[6].removed);
        assert_eq!(m.n_live_tets(), 4);
        assert!(m.max_energy() < old);
        assert!(m.live_tets().all(|t| m.orient(&m.tets[t].v) > 0));
        // Every hull facet is still on the box.
        let bbox_facets: usize = m
            .live_tets()
            .map(|t| m.tets[t].tags.iter().filter(|&&g| g == FacetTag::BoundingBox).count())
            .sum();
        assert_eq!(bbox_facets, 8);
    }

    #[test]
    fn pass_takes_the_short_edge() {
        let mut m = octahedron(Point3::new(0.3, 0.1, 0.05));
        let env = far_envelope();
        let cfg = TetConfig::default();
        // Target length 2, so every edge is short.
        let mut st = RunState::new(40.0, &cfg, true);
        let mut r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        let stats = collapse_pass(&mut r);
        assert_eq!(stats.committed, 1);
        assert!(m.vertices[6].removed);
        assert_eq!(m.n_live_vertices(), 6);
    }
}
