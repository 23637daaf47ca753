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


//! Repair of tets that are positive with exact coordinates but flat once the
//! coordinates are read as doubles.
//!
//! Rounding never changes a double, so such a tet keeps its capped energy and
//! blocks the rounding of its own vertices until a local operation removes it.

use tracing::debug;

use crate::quality::{EDGES, MAX_ENERGY};

use super::{PassStats, Refiner, Reject, collapse, smooth, swap};

/// Passes [`settle`] runs before leaving the rest to the caller.
const SETTLE_ROUNDS: usize = 4;

fn is_flat(r: &Refiner<'_>, t: usize) -> bool {
    let tet = &r.mesh.tets[t];
    !tet.removed && tet.quality.energy >= MAX_ENERGY
}

/// Collapse, swap or smooth until `t` is gone or has volume. Every rejected
/// attempt leaves `t` in place, so its vertices stay valid throughout.
fn repair(r: &mut Refiner<'_>, t: usize) -> Result<(), Reject> {
    let ops = r.config().operations;
    let v = r.mesh.tets[t].v;
    let mut edges = EDGES.map(|[i, j]| {
        let (a, b) = if v[i] < v[j] { (v[i], v[j]) } else { (v[j], v[i]) };
        (r.mesh.posf(a).distance_to(&r.mesh.posf(b)), a, b)
    });
    edges.sort_by(|x, y| x.0.total_cmp(&y.0).then((x.1, x.2).cmp(&(y.1, y.2))));

    let mut last = Reject::Topology;
    if ops.collapse {
        for &(_, a, b) in &edges {
            match collapse::collapse_edge(r, a, b) {
                Ok(()) => return Ok(()),
                Err(e) => last = e,
            }
        }
    }
    if ops.swap {
        for &(_, a, b) in &edges {
            match swap::try_edge_swap(r, a, b) {
                Ok(()) => return Ok(()),
                Err(e) => last = e,
            }
        }
        for i in 0..4 {
            let f = r.mesh.tets[t].facet(i);
            match swap::try_face_swap(r, f) {
                Ok(()) => return Ok(()),
                Err(e) => last = e,
            }
        }
    }
    if ops.smooth {
        let mut free = v;
        free.sort_unstable();
        for u in free {
            let vx = &r.mesh.vertices[u];
            if vx.on_bbox || vx.on_boundary {
                continue;
            }
            match smooth::try_smooth(r, u) {
                Ok(()) if !is_flat(r, t) => return Ok(()),
                Ok(()) => last = Reject::Energy,
                Err(e) => last = e,
            }
        }
    }
    Err(last)
}

/// One attempt on every tet that is flat in doubles, in index order. The
/// vertices of a repaired tet are rounded where they now can be.
pub fn degenerate_pass(r: &mut Refiner<'_>) -> PassStats {
    let mut stats = PassStats::default();
    for t in r.mesh.flat_tets() {
        if !is_flat(r, t) {
            continue;
        }
        let v = r.mesh.tets[t].v;
        let outcome = repair(r, t);
        if outcome.is_ok() {
            for u in v {
                if !r.mesh.vertices[u].removed {
                    r.mesh.try_round(u);
                }
            }
        }
        stats.note(outcome);
    }
    stats
}

/// Repeat [`degenerate_pass`] until no flat tet is left or a pass changes
/// nothing. Returns the number of flat tets remaining.
pub fn settle(r: &mut Refiner<'_>) -> usize {
    for round in 0..SETTLE_ROUNDS {
        if r.mesh.flat_tets().is_empty() {
            break;
        }
        let s = degenerate_pass(r);
        debug!(round, ?s, "flat tet repair");
        if s.committed == 0 {
            break;
        }
    }
    r.mesh.flat_tets().len()
}
