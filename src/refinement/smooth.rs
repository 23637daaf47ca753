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

//! Vertex smoothing toward the one-ring average.

use crate::geometry::point::{Point3, Vector3};
use crate::geometry::util::triangle_normal;
use crate::mesh::{FacetTag, Side, VertexPos};

use super::{Energy, PassStats, Patch, Refiner, Reject};

/// Fractions of the way to the target tried in order.
const STEPS: [f64; 3] = [1.0, 0.5, 0.25];

/// Vertices sharing a surface facet with `v`, sorted.
fn surface_neighbors(r: &Refiner<'_>, v: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for &t in &r.mesh.vertices[v].conn_tets {
        let tet = &r.mesh.tets[t];
        for i in 0..4 {
            if tet.v[i] != v && tet.tags[i].is_surface() {
                out.extend(tet.facet(i).into_iter().filter(|&u| u != v));
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Area-weighted normal of the tracked surface around `v`.
fn onering_normal(r: &Refiner<'_>, v: usize) -> Option<Vector3> {
    let mut n = Vector3::default();
    for &t in &r.mesh.vertices[v].conn_tets {
        let tet = &r.mesh.tets[t];
        for i in 0..4 {
            if tet.v[i] != v && tet.tags[i] == FacetTag::Surface(Side::Back) {
                let [a, b, c] = tet.facet(i).map(|u| r.mesh.posf(u));
                n += triangle_normal(&a, &b, &c);
            }
        }
    }
    n.normalized()
}

fn project(r: &Refiner<'_>, v: usize, p: Point3) -> Point3 {
    if r.config().use_onering_projection {
        let origin = r.mesh.posf(v);
        return match onering_normal(r, v) {
            Some(n) => p - n * (p - origin).dot(&n),
            None => p,
        };
    }
    r.envelope().closest_point(&p).unwrap_or(p)
}

/// Move `v` toward the average of its neighbours, backing off until the
/// star improves.
pub(crate) fn plan_smooth(r: &Refiner<'_>, v: usize) -> Result<(Patch, Energy), Reject> {
    let vx = &r.mesh.vertices[v];
    if vx.removed || vx.conn_tets.is_empty() {
        return Err(Reject::Topology);
    }
    if vx.on_bbox {
        return Err(Reject::BoundingBox);
    }
    if vx.on_boundary {
        return Err(Reject::SurfaceTag);
    }
    let ring = if vx.on_surface {
        surface_neighbors(r, v)
    } else {
        r.mesh.neighbors(v)
    };
    let points: Vec<Point3> = ring.iter().map(|&u| r.mesh.posf(u)).collect();
    let target = Point3::centroid(&points).ok_or(Reject::Topology)?;

    let star = vx.conn_tets.clone();
    let old = r.energy_of(&star);
    let origin = vx.posf();
    let mut last_err = Reject::Energy;
    for t in STEPS {
        let mut p = origin.lerp(&target, t);
        if vx.on_surface {
            p = project(r, v, p);
        }
        if !p.is_finite() || p == origin {
            continue;
        }
        let trial = Patch {
            new_tets: star.iter().map(|&t| (r.mesh.tets[t].v, r.mesh.tets[t].tags)).collect(),
            moved: Some((v, VertexPos::Float(p))),
            focus: Some(v),
            ..Patch::default()
        };
        match r.evaluate(&trial) {
            Ok(energy) if r.improves(old, energy, true) => {
                let patch = Patch {
                    moved: trial.moved,
                    ..Patch::default()
                };
                return Ok((patch, energy));
            }
            Ok(_) => last_err = Reject::Energy,
            Err(e) => last_err = e,
        }
    }
    Err(last_err)
}

pub(crate) fn try_smooth(r: &mut Refiner<'_>, v: usize) -> Result<(), Reject> {
    let (patch, _) = plan_smooth(r, v)?;
    r.commit(patch);
    Ok(())
}

/// One sweep over the free vertices in index order.
pub fn smooth_pass(r: &mut Refiner<'_>) -> PassStats {
    let mut stats = PassStats::default();
    for v in 0..r.mesh.vertices.len() {
        let vx = &r.mesh.vertices[v];
        if vx.removed || vx.on_bbox || vx.on_boundary {
            continue;
        }
        stats.note(try_smooth(r, v));
    }
    stats
}
