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

//! Topological flips: edge removal for rings of three to five tets, and the
//! two-to-three face flip.

use crate::mesh::{FacetTag, TetMesh};
use crate::quality::FACETS;

use super::{Energy, PassStats, Patch, Refiner, Reject, current_ring, edge_rings};

/// Largest ring handled by edge removal.
pub const MAX_RING: usize = 5;

fn facet_key(mut f: [usize; 3]) -> [usize; 3] {
    f.sort_unstable();
    f
}

/// Tags of the facets bounding a set of tets, keyed by sorted vertex triple.
fn outer_tags(mesh: &TetMesh, tets: &[usize]) -> Vec<([usize; 3], FacetTag)> {
    let mut out = Vec::with_capacity(4 * tets.len());
    for &t in tets {
        let tet = &mesh.tets[t];
        for i in 0..4 {
            out.push((facet_key(tet.facet(i)), tet.tags[i]));
        }
    }
    out.sort_by(|x, y| x.0.cmp(&y.0));
    out
}

fn tags_for(v: &[usize; 4], outer: &[([usize; 3], FacetTag)]) -> [FacetTag; 4] {
    std::array::from_fn(|i| {
        let key = facet_key(FACETS[i].map(|j| v[j]));
        outer
            .binary_search_by(|probe| probe.0.cmp(&key))
            .map_or(FacetTag::Interior, |k| outer[k].1)
    })
}

/// Vertices around edge `(a, b)` in cyclic order; `None` when the ring is open.
fn edge_ring(mesh: &TetMesh, a: usize, b: usize, tets: &[usize]) -> Option<Vec<usize>> {
    let pairs: Vec<[usize; 2]> = tets
        .iter()
        .map(|&t| {
            let mut o = mesh.tets[t].v.into_iter().filter(|&x| x != a && x != b);
            Some([o.next()?, o.next()?])
        })
        .collect::<Option<_>>()?;
    let mut ring = vec![pairs[0][0], pairs[0][1]];
    let mut used = vec![false; pairs.len()];
    used[0] = true;
    while ring.len() < pairs.len() {
        let last = ring[ring.len() - 1];
        let k = (0..pairs.len()).find(|&k| !used[k] && pairs[k].contains(&last))?;
        used[k] = true;
        let next = if pairs[k][0] == last { pairs[k][1] } else { pairs[k][0] };
        if ring.contains(&next) {
            return None;
        }
        ring.push(next);
    }
    // Closing pair.
    let k = (0..pairs.len()).find(|&k| !used[k])?;
    let (first, last) = (ring[0], ring[ring.len() - 1]);
    (pairs[k].contains(&first) && pairs[k].contains(&last)).then_some(ring)
}

/// Tet `[p, q, s, apex]` with positive orientation, or `None` if flat.
fn oriented(mesh: &TetMesh, tri: [usize; 3], apex: usize) -> Option<([usize; 4], i8)> {
    let v = [tri[0], tri[1], tri[2], apex];
    match mesh.orient(&v) {
        0 => None,
        s if s > 0 => Some((v, s)),
        s => Some(([tri[1], tri[0], tri[2], apex], s)),
    }
}

/// Replace the ring of tets around `(a, b)` by the best triangulation of
/// the ring polygon coned to `a` and `b`.
pub(crate) fn plan_edge_swap(r: &Refiner<'_>, a: usize, b: usize) -> Result<(Patch, Energy), Reject> {
    plan_edge_swap_in(r, a, b, r.mesh.edge_tets(a, b))
}

/// [`plan_edge_swap`] with the ring already known.
fn plan_edge_swap_in(r: &Refiner<'_>, a: usize, b: usize, tets: Vec<usize>) -> Result<(Patch, Energy), Reject> {
    let n = tets.len();
    if !(3..=MAX_RING).contains(&n) {
        return Err(Reject::Topology);
    }
    for &t in &tets {
        let tet = &r.mesh.tets[t];
        if (0..4).any(|i| tet.v[i] != a && tet.v[i] != b && tet.tags[i] != FacetTag::Interior) {
            return Err(Reject::SurfaceTag);
        }
    }
    let ring = edge_ring(r.mesh, a, b, &tets).ok_or(Reject::Topology)?;
    let outer = outer_tags(r.mesh, &tets);
    let old = r.energy_of(&tets);

    let pivots = if n == 3 { 1 } else { n };
    let mut best: Option<(Energy, usize, Patch)> = None;
    let mut last_err = Reject::Energy;
    for k in 0..pivots {
        let mut new_tets = Vec::with_capacity(2 * (n - 2));
        let mut flat = false;
        for i in 1..n - 1 {
            let tri = [ring[k], ring[(k + i) % n], ring[(k + i + 1) % n]];
            match (oriented(r.mesh, tri, a), oriented(r.mesh, tri, b)) {
                (Some((va, sa)), Some((vb, sb))) if sa != sb => {
                    new_tets.push((va, tags_for(&va, &outer)));
                    new_tets.push((vb, tags_for(&vb, &outer)));
                }
                _ => {
                    flat = true;
                    break;
                }
            }
        }
        if flat {
            last_err = Reject::Orientation;
            continue;
        }
        let patch = Patch {
            old_tets: tets.clone(),
            new_tets,
            ..Patch::default()
        };
        let energy = match r.evaluate(&patch) {
            Ok(e) => e,
            Err(e) => {
                last_err = e;
                continue;
            }
        };
        if !r.improves(old, energy, true) {
            continue;
        }
        let pivot = ring[k];
        let better = match &best {
            None => true,
            Some((be, bp, _)) => r.improves(*be, energy, true) || (!r.improves(energy, *be, true) && pivot < *bp),
        };
        if better {
            best = Some((energy, pivot, patch));
        }
    }
    best.map(|(e, _, p)| (p, e)).ok_or(last_err)
}

/// Two tets sharing `f` become three around the edge joining their apexes.
pub(crate) fn plan_face_swap(r: &Refiner<'_>, f: [usize; 3]) -> Result<(Patch, Energy), Reject> {
    let [t0, t1] = r.mesh.face_tets(&f)[..] else {
        return Err(Reject::Topology);
    };
    plan_face_swap_in(r, f, [t0, t1])
}

/// [`plan_face_swap`] with the two tets already known, in index order.
fn plan_face_swap_in(r: &Refiner<'_>, f: [usize; 3], [t0, t1]: [usize; 2]) -> Result<(Patch, Energy), Reject> {
    let tets = vec![t0, t1];
    let local = r.mesh.tets[t0].facet_of(&f).ok_or(Reject::Topology)?;
    if r.mesh.tets[t0].tags[local] != FacetTag::Interior {
        return Err(Reject::SurfaceTag);
    }
    let d = r.mesh.tets[t0].v[local];
    let e = r.mesh.tets[t1].v.into_iter().find(|x| !f.contains(x)).ok_or(Reject::Topology)?;

    let outer = outer_tags(r.mesh, &tets);
    let mut new_tets = Vec::with_capacity(3);
    let mut sign = None;
    for k in 0..3 {
        let v = [f[k], f[(k + 1) % 3], d, e];
        let s = r.mesh.orient(&v);
        // `d e` must pierce the shared face.
        if s == 0 || sign.is_some_and(|x| x != s) {
            return Err(Reject::Orientation);
        }
        sign = Some(s);
        let v = if s > 0 { v } else { [v[1], v[0], v[2], v[3]] };
        new_tets.push((v, tags_for(&v, &outer)));
    }
    let patch = Patch {
        old_tets: tets,
        new_tets,
        ..Patch::default()
    };
    let old = r.energy_of(&patch.old_tets);
    let new = r.evaluate(&patch)?;
    if !r.improves(old, new, true) {
        return Err(Reject::Energy);
    }
    Ok((patch, new))
}

pub(crate) fn try_edge_swap(r: &mut Refiner<'_>, a: usize, b: usize) -> Result<(), Reject> {
    let (patch, _) = plan_edge_swap(r, a, b)?;
    r.commit(patch);
    Ok(())
}

pub(crate) fn try_face_swap(r: &mut Refiner<'_>, f: [usize; 3]) -> Result<(), Reject> {
    let (patch, _) = plan_face_swap(r, f)?;
    r.commit(patch);
    Ok(())
}

/// Interior facets with the two tets sharing them, in facet key order.
fn interior_faces(mesh: &TetMesh) -> Vec<([usize; 3], [usize; 2])> {
    let mut pairs: Vec<([usize; 3], usize)> = Vec::with_capacity(4 * mesh.tets.len());
    for t in mesh.live_tets() {
        let tet = &mesh.tets[t];
        for i in (0..4).filter(|&i| tet.tags[i] == FacetTag::Interior) {
            pairs.push((facet_key(tet.facet(i)), t));
        }
    }
    pairs.sort_unstable();
    pairs
        .windows(2)
        .filter(|w| w[0].0 == w[1].0)
        .map(|w| (w[0].0, [w[0].1, w[1].1]))
        .collect()
}

/// Edge removals over all ring edges, then face flips over all interior faces,
/// both in sorted key order. Rings and facet pairs come from one sweep per
/// sub-pass and are only re-queried after a flip has removed one of their tets.
pub fn swap_pass(r: &mut Refiner<'_>) -> PassStats {
    let mut stats = PassStats::default();
    for ([a, b], cached) in edge_rings(r.mesh) {
        let ring = current_ring(r.mesh, a, b, cached);
        if (3..=MAX_RING).contains(&ring.len()) {
            stats.note(plan_edge_swap_in(r, a, b, ring).map(|(patch, _)| {
                r.commit(patch);
            }));
        }
    }

    for (f, pair) in interior_faces(r.mesh) {
        let pair = if pair.iter().all(|&t| !r.mesh.tets[t].removed) {
            pair
        } else {
            match r.mesh.face_tets(&f)[..] {
                [t0, t1] => [t0, t1],
                _ => continue,
            }
        };
        stats.note(plan_face_swap_in(r, f, pair).map(|(patch, _)| {
            r.commit(patch);
        }));
    }
    stats
}
