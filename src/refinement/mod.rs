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

//! Envelope-constrained mesh improvement.
//!
//! Every local operation is a transaction: a [`Patch`] is planned against the
//! current mesh, evaluated without touching it, and only committed when it is
//! admissible. A rejected candidate leaves the mesh exactly as it was.

pub mod collapse;
pub mod degenerate;
pub mod sizing;
pub mod smooth;
pub mod split;
pub mod swap;

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::TetConfig;
use crate::envelope::{Envelope, EnvelopeCheck};
use crate::geometry::point::Point3;
use crate::mesh::{FacetTag, TetMesh, TetVertex, VertexPos};
use crate::quality::{EDGES, FACETS, amips_energy};
use crate::record::{OpType, RecordLog};
use crate::state::RunState;

pub use sizing::BackgroundSizing;

/// Placeholder index for the vertex a patch introduces.
pub(crate) const NEW_VERTEX: usize = usize::MAX;

/// Why a candidate operation was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reject {
    Orientation,
    Envelope,
    Energy,
    SurfaceTag,
    BoundingBox,
    Topology,
}

/// Worst and total AMIPS energy over a set of tets.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Energy {
    pub max: f64,
    pub sum: f64,
}

impl Energy {
    fn add(&mut self, e: f64) {
        self.max = self.max.max(e);
        self.sum += e;
    }
}

/// A planned local change. Tet vertex arrays may reference [`NEW_VERTEX`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Patch {
    pub old_tets: Vec<usize>,
    pub new_tets: Vec<([usize; 4], [FacetTag; 4])>,
    pub new_vertex: Option<TetVertex>,
    pub moved: Option<(usize, VertexPos)>,
    pub removed_vertex: Option<usize>,
    /// `(tet, local facet, tag)` updates on tets that otherwise survive.
    pub retag: Vec<(usize, usize, FacetTag)>,
    /// Only surface facets through this vertex are re-tested against the envelope.
    pub focus: Option<usize>,
}

impl Patch {
    fn pos(&self, mesh: &TetMesh, v: usize) -> VertexPos {
        if v == NEW_VERTEX {
            return self
                .new_vertex
                .as_ref()
                .map_or(VertexPos::Float(Point3::new(f64::NAN, f64::NAN, f64::NAN)), |nv| {
                    nv.pos.clone()
                });
        }
        match &self.moved {
            Some((m, pos)) if *m == v => pos.clone(),
            _ => mesh.vertices[v].pos.clone(),
        }
    }

    fn posf(&self, mesh: &TetMesh, v: usize) -> Point3 {
        if v == NEW_VERTEX {
            return self
                .new_vertex
                .as_ref()
                .map_or(Point3::new(f64::NAN, f64::NAN, f64::NAN), TetVertex::posf);
        }
        match &self.moved {
            Some((m, pos)) if *m == v => pos.posf(),
            _ => mesh.posf(v),
        }
    }
}

/// Tally of one pass of one operation.
#[derive(Clone, Debug, Default)]
pub struct PassStats {
    pub attempted: usize,
    pub committed: usize,
    pub rejected: BTreeMap<Reject, usize>,
}

impl PassStats {
    pub(crate) fn note(&mut self, outcome: Result<(), Reject>) {
        self.attempted += 1;
        match outcome {
            Ok(()) => self.committed += 1,
            Err(r) => *self.rejected.entry(r).or_default() += 1,
        }
    }
}

/// The mesh under refinement together with everything admissibility depends on.
pub struct Refiner<'a> {
    pub mesh: &'a mut TetMesh,
    pub state: &'a mut RunState,
    envelope: &'a Envelope,
    config: &'a TetConfig,
    sizing: Option<&'a BackgroundSizing>,
}

impl<'a> Refiner<'a> {
    pub fn new(
        mesh: &'a mut TetMesh,
        state: &'a mut RunState,
        envelope: &'a Envelope,
        config: &'a TetConfig,
        sizing: Option<&'a BackgroundSizing>,
    ) -> Self {
        Self {
            mesh,
            state,
            envelope,
            config,
            sizing,
        }
    }

    pub(crate) fn check(&self) -> EnvelopeCheck<'a> {
        EnvelopeCheck::new(
            self.envelope,
            self.state.eps_2,
            self.state.use_sampling.then_some(self.state.sampling_dist),
        )
    }

    pub(crate) fn envelope(&self) -> &'a Envelope {
        self.envelope
    }

    pub(crate) fn config(&self) -> &'a TetConfig {
        self.config
    }

    /// Does a surface facet around `(a, b)` contain the edge?
    pub(crate) fn is_surface_edge(&self, edge_tets: &[usize], a: usize, b: usize) -> bool {
        edge_tets.iter().any(|&t| {
            let tet = &self.mesh.tets[t];
            (0..4).any(|i| tet.v[i] != a && tet.v[i] != b && tet.tags[i].is_surface())
        })
    }

    /// Energy of existing tets.
    pub(crate) fn energy_of(&self, tets: &[usize]) -> Energy {
        let mut e = Energy::default();
        for &t in tets {
            e.add(self.mesh.tets[t].quality.energy);
        }
        e
    }

    /// Whether `new` is better than `old` under the configured comparison.
    pub(crate) fn improves(&self, old: Energy, new: Energy, strict: bool) -> bool {
        let (o, n) = if self.config.use_energy_max {
            (old.max, new.max)
        } else {
            (old.sum, new.sum)
        };
        if strict { n < o } else { n <= o }
    }

    /// Orientation and envelope tests on the new tets; their energy on success.
    pub(crate) fn evaluate(&self, patch: &Patch) -> Result<Energy, Reject> {
        if patch.new_vertex.is_none() && patch.new_tets.iter().any(|(v, _)| v.contains(&NEW_VERTEX)) {
            return Err(Reject::Topology);
        }
        for (v, _) in &patch.new_tets {
            if TetMesh::orient_with(v, |i| patch.pos(self.mesh, i)) <= 0 {
                return Err(Reject::Orientation);
            }
        }
        let check = self.check();
        let mut energy = Energy::default();
        for (v, tags) in &patch.new_tets {
            let p = v.map(|i| patch.posf(self.mesh, i));
            for (i, facet) in FACETS.iter().enumerate() {
                if !tags[i].is_surface() || patch.focus.is_none_or(|f| v[i] == f || !v.contains(&f)) {
                    continue;
                }
                if !check.facet_ok(&facet.map(|j| p[j])) {
                    return Err(Reject::Envelope);
                }
            }
            energy.add(amips_energy(&p));
        }
        Ok(energy)
    }

    /// Apply an admissible patch. Returns the index of the new vertex, if any.
    pub(crate) fn commit(&mut self, patch: Patch) -> Option<usize> {
        let nv = patch.new_vertex.map(|v| self.mesh.add_vertex(v));
        let moved = patch.moved.as_ref().map(|&(v, _)| v);
        if let Some((v, pos)) = patch.moved {
            self.mesh.vertices[v].pos = pos;
        }
        for &t in &patch.old_tets {
            self.mesh.remove_tet(t);
        }
        for (v, tags) in patch.new_tets {
            let v = v.map(|i| if i == NEW_VERTEX { nv.unwrap_or(i) } else { i });
            self.mesh.add_tet(v, tags);
        }
        for (t, i, tag) in patch.retag {
            self.mesh.tets[t].tags[i] = tag;
        }
        if let Some(v) = patch.removed_vertex {
            self.mesh.vertices[v].removed = true;
        }
        if let Some(v) = moved {
            for t in self.mesh.vertices[v].conn_tets.clone() {
                self.mesh.recompute_quality(t);
            }
        }
        nv
    }

    fn record(&self, records: &mut RecordLog, op: OpType) {
        let summary = if records.is_enabled() {
            self.mesh.quality_summary()
        } else {
            None
        };
        records.push(op, self.mesh.n_live_vertices(), self.mesh.n_live_tets(), summary);
    }
}

/// Every edge of the live tets with the sorted tets around it, in edge order.
///
/// Built once per pass from a single sweep. A ring whose tets are all still
/// live is current; otherwise re-query it with [`TetMesh::edge_tets`].
pub(crate) fn edge_rings(mesh: &TetMesh) -> Vec<([usize; 2], Vec<usize>)> {
    let mut pairs: Vec<([usize; 2], usize)> = Vec::with_capacity(6 * mesh.tets.len());
    for t in mesh.live_tets() {
        let v = mesh.tets[t].v;
        for [i, j] in EDGES {
            pairs.push((if v[i] < v[j] { [v[i], v[j]] } else { [v[j], v[i]] }, t));
        }
    }
    pairs.sort_unstable();
    let mut out: Vec<([usize; 2], Vec<usize>)> = Vec::new();
    for (e, t) in pairs {
        match out.last_mut() {
            Some((last, ring)) if *last == e => ring.push(t),
            _ => out.push((e, vec![t])),
        }
    }
    out
}

/// The tets around `(a, b)`, reusing `cached` while none of them was removed.
pub(crate) fn current_ring(mesh: &TetMesh, a: usize, b: usize, cached: Vec<usize>) -> Vec<usize> {
    if cached.iter().all(|&t| !mesh.tets[t].removed) {
        cached
    } else {
        mesh.edge_tets(a, b)
    }
}

/// Outcome of [`optimize`].
#[derive(Clone, Debug, Default)]
pub struct OptimizeReport {
    pub passes: usize,
    /// Worst energy before the first pass and after each pass.
    pub max_energy: Vec<f64>,
    /// Tets still flat in doubles once refinement stops.
    pub flat_tets: usize,
}

fn average_energy(mesh: &TetMesh) -> f64 {
    let n = mesh.n_live_tets();
    if n == 0 {
        return 0.0;
    }
    mesh.live_tets().map(|t| mesh.tets[t].quality.energy).sum::<f64>() / n as f64
}

/// Run split, collapse, swap and smooth passes until the worst element is good
/// enough, the pass budget runs out, or nothing changes any more. Each pass
/// starts by repairing tets that are flat in doubles.
pub fn optimize(
    mesh: &mut TetMesh,
    state: &mut RunState,
    envelope: &Envelope,
    config: &TetConfig,
    sizing: Option<&BackgroundSizing>,
    records: &mut RecordLog,
) -> OptimizeReport {
    let mut r = Refiner::new(mesh, state, envelope, config, sizing);
    r.record(records, OpType::OptInit);

    let mut report = OptimizeReport {
        passes: 0,
        max_energy: vec![r.mesh.max_energy()],
        flat_tets: 0,
    };
    let ops = config.operations;
    let mut prev_max = r.mesh.max_energy();
    let mut prev_avg = average_energy(r.mesh);

    while report.passes < config.max_num_passes && prev_max >= config.filter_energy_thres {
        report.passes += 1;
        let mut committed = 0;
        let s = degenerate::degenerate_pass(&mut r);
        if s.attempted > 0 {
            debug!(pass = report.passes, ?s, "flat tets");
        }
        committed += s.committed;
        if ops.split {
            let s = split::split_pass(&mut r);
            debug!(pass = report.passes, ?s, "split");
            committed += s.committed;
            r.record(records, OpType::Split);
        }
        if ops.collapse {
            let s = collapse::collapse_pass(&mut r);
            debug!(pass = report.passes, ?s, "collapse");
            committed += s.committed;
            r.record(records, OpType::Collapse);
        }
        if ops.swap {
            let s = swap::swap_pass(&mut r);
            debug!(pass = report.passes, ?s, "swap");
            committed += s.committed;
            r.record(records, OpType::Swap);
        }
        if ops.smooth {
            let s = smooth::smooth_pass(&mut r);
            debug!(pass = report.passes, ?s, "smooth");
            committed += s.committed;
            r.record(records, OpType::Smooth);
        }

        let unrounded = r.mesh.round_vertices();
        let max = r.mesh.max_energy();
        let avg = average_energy(r.mesh);
        report.max_energy.push(max);
        info!(
            pass = report.passes,
            n_v = r.mesh.n_live_vertices(),
            n_t = r.mesh.n_live_tets(),
            max_energy = max,
            avg_energy = avg,
            unrounded,
            "optimization pass"
        );
        if max < config.filter_energy_thres {
            break;
        }

        let mut changed = false;
        if prev_max - max < config.delta_energy_thres && prev_avg - avg < config.delta_energy_thres {
            changed |= r.update_scaling();
            r.record(records, OpType::AdapUpdate);
        }
        changed |= r.nudge_toward_target();
        if committed == 0 && !changed {
            debug!(pass = report.passes, "no further progress");
            break;
        }
        prev_max = max;
        prev_avg = avg;
    }

    report.flat_tets = degenerate::settle(&mut r);
    let unrounded = r.mesh.round_vertices();
    if report.flat_tets > 0 {
        debug!(flat = report.flat_tets, unrounded, "flat tets left after refinement");
    }
    report
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::geometry::aabb::Aabb;

    /// Five tets around the edge between apexes 0 and 1, hull facets on the box.
    pub(crate) fn five_ring() -> TetMesh {
        let mut m = TetMesh::new(None);
        m.add_vertex(TetVertex::new(VertexPos::Float(Point3::new(0.0, 0.0, -0.6))));
        m.add_vertex(TetVertex::new(VertexPos::Float(Point3::new(0.0, 0.0, 0.6))));
        for k in 0..5 {
            let a = 2.0 * std::f64::consts::PI * k as f64 / 5.0;
            m.add_vertex(TetVertex::new(VertexPos::Float(Point3::new(a.cos(), a.sin(), 0.0))));
        }
        for k in 0..5 {
            let r0 = 2 + k;
            let r1 = 2 + (k + 1) % 5;
            let mut v = [0, 1, r0, r1];
            if m.orient(&v) < 0 {
                v.swap(2, 3);
            }
            let mut tags = [FacetTag::Interior; 4];
            // Facets opposite the apexes are the hull.
            tags[0] = FacetTag::BoundingBox;
            tags[1] = FacetTag::BoundingBox;
            m.add_tet(v, tags);
        }
        m
    }

    /// Octahedron `±x, ±y, ±z` (vertices 0..6) around an interior vertex 6.
    pub(crate) fn octahedron(center: Point3) -> TetMesh {
        let mut m = TetMesh::new(Some(Aabb::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        )));
        for p in [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ] {
            let mut v = TetVertex::new(VertexPos::Float(p));
            v.on_bbox = true;
            m.add_vertex(v);
        }
        m.add_vertex(TetVertex::new(VertexPos::Float(center)));
        for x in [0, 1] {
            for y in [2, 3] {
                for z in [4, 5] {
                    let mut v = [6, x, y, z];
                    if m.orient(&v) < 0 {
                        v.swap(2, 3);
                    }
                    let mut tags = [FacetTag::Interior; 4];
                    tags[0] = FacetTag::BoundingBox;
                    m.add_tet(v, tags);
                }
            }
        }
        m
    }

    pub(crate) fn far_envelope() -> Envelope {
        Envelope::new(
            vec![
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(11.0, 0.0, 0.0),
                Point3::new(10.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn five_ring_is_valid() {
        let m = five_ring();
        assert_eq!(m.n_live_tets(), 5);
        assert!(m.live_tets().all(|t| m.orient(&m.tets[t].v) > 0));
        assert_eq!(m.edge_tets(0, 1).len(), 5);
        assert!(m.max_energy() < 1.01);
    }

    #[test]
    fn rejected_patch_leaves_mesh_untouched() {
        let mut m = five_ring();
        let before = m.clone();
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(2.0, &cfg, true);
        let r = Refiner::new(&mut m, &mut st, &env, &cfg, None);
        // Flattening tet 0 by moving one ring vertex onto the axis.
        let v = r.mesh.tets[0].v[2];
        let patch = Patch {
            moved: Some((v, VertexPos::Float(Point3::new(0.0, 0.0, 0.0)))),
            new_tets: vec![(r.mesh.tets[0].v, r.mesh.tets[0].tags)],
            ..Patch::default()
        };
        assert_eq!(r.evaluate(&patch), Err(Reject::Orientation));
        drop(r);
        assert_eq!(m, before);
    }

    #[test]
    fn edge_rings_match_direct_queries() {
        let mut m = five_ring();
        let rings = edge_rings(&m);
        // The axis, 5 rim edges and 10 apex-to-rim edges.
        assert_eq!(rings.len(), 16);
        for ([a, b], ring) in &rings {
            assert_eq!(ring, &m.edge_tets(*a, *b));
        }
        let (e, cached) = rings.iter().find(|(e, _)| *e == [0, 1]).cloned().unwrap();
        assert_eq!(current_ring(&m, e[0], e[1], cached.clone()), cached);
        m.remove_tet(cached[0]);
        assert_eq!(current_ring(&m, e[0], e[1], cached.clone()), cached[1..].to_vec());
    }

    #[test]
    fn optimize_stops_on_good_mesh() {
        let mut m = five_ring();
        let env = far_envelope();
        let cfg = TetConfig::default();
        let mut st = RunState::new(2.0, &cfg, true);
        let mut log = RecordLog::new(true);
        let report = optimize(&mut m, &mut st, &env, &cfg, None, &mut log);
        assert_eq!(report.passes, 0);
        assert_eq!(report.max_energy.len(), 1);
        assert_eq!(log.records()[0].op, OpType::OptInit);
    }
}
