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

//! The two-stage driver: initial conforming tetrahedralization, then
//! envelope-constrained refinement and inside/outside filtering.

use std::time::Instant;

use tracing::{info, warn};

use crate::bsp::{match_faces, split_cells, tetrahedralize as tetrahedralize_cells};
use crate::config::{Step, TetConfig};
use crate::envelope::Envelope;
use crate::error::{TetError, TetResult};
use crate::inout::filter_outside;
use crate::mesh::TetMesh;
use crate::mesh::checkpoint::Checkpoint;
use crate::mesh::extract::{ExtractedMesh, extract_volume};
use crate::mesh_processing::preprocess::preprocess;
use crate::mesh_processing::remesh::{RemeshError, RemeshOptions, SurfaceRemesher, VolumeRemesher, validate_volume};
use crate::mesh_processing::surface::SurfaceMesh;
use crate::operations::triangulation::{Delaunay, voxel_points};
use crate::quality::dihedral_angles;
use crate::record::{MeshRecord, OpType, RecordLog};
use crate::refinement::{BackgroundSizing, optimize};
use crate::state::RunState;

/// Number of box corners the Delaunay step puts before the input points.
const BOX_CORNERS: usize = 8;

/// Result of a successful run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TetOutput {
    pub vertices: Vec<[f64; 3]>,
    pub tets: Vec<[usize; 4]>,
    /// Radians, one per tet.
    pub min_dihedral_angles: Vec<f64>,
    /// Empty when the run is quiet.
    pub records: Vec<MeshRecord>,
    /// Vertices whose double coordinates are only an approximation.
    pub unrounded_vertices: usize,
}

/// Tetrahedralize a triangle soup with the given configuration.
///
/// # Errors
///
/// See [`Tetrahedralizer::run`].
pub fn tetrahedralize(vertices: &[[f64; 3]], triangles: &[[usize; 3]], config: &TetConfig) -> TetResult<TetOutput> {
    Tetrahedralizer::new(config.clone()).run(vertices, triangles)
}

/// A configured run with optional progress reporting and external remeshers.
pub struct Tetrahedralizer<'a> {
    config: TetConfig,
    progress: Option<Box<dyn FnMut(Step, f64) + 'a>>,
    surface_remesher: Option<&'a dyn SurfaceRemesher>,
    volume_remesher: Option<&'a dyn VolumeRemesher>,
    current: Option<(Step, Instant)>,
}

impl<'a> Tetrahedralizer<'a> {
    pub fn new(config: TetConfig) -> Self {
        Self {
            config,
            progress: None,
            surface_remesher: None,
            volume_remesher: None,
            current: None,
        }
    }

    /// Called once at the start of every phase with progress 0.
    #[must_use]
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Step, f64) + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn with_surface_remesher(mut self, remesher: &'a dyn SurfaceRemesher) -> Self {
        self.surface_remesher = Some(remesher);
        self
    }

    #[must_use]
    pub fn with_volume_remesher(mut self, remesher: &'a dyn VolumeRemesher) -> Self {
        self.volume_remesher = Some(remesher);
        self
    }

    pub fn config(&self) -> &TetConfig {
        &self.config
    }

    fn phase(&mut self, step: Step) {
        self.finish_phase();
        self.current = Some((step, Instant::now()));
        info!(?step, "phase started");
        if let Some(cb) = self.progress.as_mut() {
            cb(step, 0.0);
        }
    }

    fn finish_phase(&mut self) {
        if let Some((step, started)) = self.current.take() {
            info!(?step, elapsed_s = started.elapsed().as_secs_f64(), "phase done");
        }
    }

    /// Run both stages, or stage two only when resuming from a checkpoint.
    ///
    /// # Errors
    ///
    /// - [`TetError::InvalidConfig`] / [`TetError::InvalidInput`] for bad arguments.
    /// - [`TetError::EmptyMesh`] when nothing is left after preprocessing; an
    ///   empty checkpoint is written first if stage one has a checkpoint path.
    /// - [`TetError::Io`] / [`TetError::Checkpoint`] for checkpoint failures.
    pub fn run(mut self, vertices: &[[f64; 3]], triangles: &[[usize; 3]]) -> TetResult<TetOutput> {
        self.config.validate()?;
        let clock = Instant::now();
        let mut records = RecordLog::new(!self.config.is_quiet);

        let input = SurfaceMesh::from_arrays(vertices, triangles)?.clean();
        records.push(OpType::Init, input.vertices.len(), input.faces.len(), None);
        let envelope = Envelope::new(input.vertices.clone(), input.faces.clone());

        let (mesh, state) = if self.config.resumes_from_checkpoint() {
            let path = self.config.checkpoint.clone().unwrap_or_default();
            let cp = Checkpoint::read(&path)?;
            (cp.mesh, cp.state)
        } else {
            let (mesh, state) = match self.stage_one(&input, &envelope, &mut records) {
                Err(TetError::EmptyMesh) => {
                    self.write_empty_checkpoint()?;
                    return Err(TetError::EmptyMesh);
                }
                other => other?,
            };
            if self.config.stage == 1 {
                if let Some(path) = &self.config.checkpoint {
                    Checkpoint::new(state.clone(), mesh.clone()).write(path)?;
                }
            }
            (mesh, state)
        };

        let out = self.stage_two(mesh, state, &envelope, records)?;
        self.finish_phase();
        info!(
            n_v = out.vertices.len(),
            n_t = out.tets.len(),
            unrounded = out.unrounded_vertices,
            elapsed_s = clock.elapsed().as_secs_f64(),
            "tetrahedralization done"
        );
        Ok(out)
    }

    fn write_empty_checkpoint(&self) -> TetResult<()> {
        if self.config.stage != 1 {
            return Ok(());
        }
        if let Some(path) = &self.config.checkpoint {
            let state = RunState::new(0.0, &self.config, false);
            Checkpoint::new(state, TetMesh::default()).write(path)?;
        }
        Ok(())
    }

    /// Preprocess, Delaunay, BSP and cell tetrahedralization.
    fn stage_one(
        &mut self,
        input: &SurfaceMesh,
        envelope: &Envelope,
        records: &mut RecordLog,
    ) -> TetResult<(TetMesh, RunState)> {
        self.phase(Step::Preprocess);
        let diag = input.bbox().ok_or(TetError::EmptyMesh)?.diagonal();
        let mut state = RunState::new(diag, &self.config, false);
        let proxy = preprocess(input, envelope, &state, self.surface_remesher)?;
        state.is_mesh_closed = proxy.is_closed;
        records.push(
            OpType::Preprocessing,
            proxy.mesh.vertices.len(),
            proxy.mesh.faces.len(),
            None,
        );

        self.phase(Step::Delaunay);
        let margin = state.initial_edge_len.max(2.0 * state.eps);
        let bbox = proxy.mesh.bbox().ok_or(TetError::EmptyMesh)?.enlarged(margin);
        let mut points = proxy.mesh.vertices.clone();
        if self.config.use_voxel_stuffing {
            let proxy_env = Envelope::new(proxy.mesh.vertices.clone(), proxy.mesh.faces.clone());
            points.extend(voxel_points(&bbox, state.initial_edge_len, &proxy_env));
        }
        let dt = Delaunay::build(&bbox, &points)?;
        records.push(OpType::DelaunayTetra, dt.points.len(), dt.tets.len(), None);

        self.phase(Step::FaceMatching);
        let triangles: Vec<[usize; 3]> = proxy
            .mesh
            .faces
            .iter()
            .map(|f| f.map(|v| v + BOX_CORNERS))
            .collect();
        let mut bsp = match_faces(&dt, &triangles)?;
        records.push(
            OpType::DivfaceMatch,
            bsp.arena.vertices.len(),
            bsp.matched.iter().filter(|&&m| m).count(),
            None,
        );

        self.phase(Step::Bsp);
        split_cells(&mut bsp);
        records.push(OpType::Bsp, bsp.arena.vertices.len(), bsp.arena.nodes.len(), None);

        self.phase(Step::Tetra);
        let boundary: Vec<[usize; 2]> = proxy
            .boundary_edges
            .iter()
            .map(|e| e.map(|v| v + BOX_CORNERS))
            .collect();
        let mut mesh = tetrahedralize_cells(&bsp, bbox, &boundary)?;
        mesh.compact();
        let summary = if records.is_enabled() { mesh.quality_summary() } else { None };
        records.push(OpType::SimpleTetra, mesh.vertices.len(), mesh.tets.len(), summary);
        Ok((mesh, state))
    }

    /// Refinement, winding-number filter and extraction.
    fn stage_two(
        &mut self,
        mut mesh: TetMesh,
        mut state: RunState,
        envelope: &Envelope,
        mut records: RecordLog,
    ) -> TetResult<TetOutput> {
        self.phase(Step::Optimize);
        let sizing = self.config.background_mesh.as_ref().map(BackgroundSizing::new);
        let report = optimize(
            &mut mesh,
            &mut state,
            envelope,
            &self.config,
            sizing.as_ref(),
            &mut records,
        );
        info!(
            passes = report.passes,
            max_energy = report.max_energy.last().copied().unwrap_or_default(),
            flat_tets = report.flat_tets,
            "refinement done"
        );

        filter_outside(&mut mesh, self.config.smooth_open_boundary && !state.is_mesh_closed);
        let dropped = mesh.remove_flat_tets();
        if dropped > 0 {
            warn!(dropped, "dropped tets that are flat in double precision");
        }
        records.push(OpType::Wn, mesh.n_live_vertices(), mesh.n_live_tets(), None);

        let mut extracted = extract_volume(&mesh);
        records.push(OpType::Unrounded, extracted.unrounded_vertices, extracted.tets.len(), None);

        if let Some(remesher) = self.volume_remesher {
            match run_volume_remesher(remesher, &extracted, &state) {
                Ok(remeshed) => extracted = remeshed,
                Err(err) => warn!("volume remesher failed ({err}), reverting to internal refinement"),
            }
        }

        Ok(TetOutput {
            vertices: extracted.vertices.iter().map(|p| p.to_array()).collect(),
            tets: extracted.tets,
            min_dihedral_angles: extracted.min_dihedral_angles,
            records: records.into_records(),
            unrounded_vertices: extracted.unrounded_vertices,
        })
    }
}

fn run_volume_remesher(
    remesher: &dyn VolumeRemesher,
    mesh: &ExtractedMesh,
    state: &RunState,
) -> Result<ExtractedMesh, RemeshError> {
    let opts = RemeshOptions::from_state(state);
    opts.validate()?;
    let (vertices, tets) = remesher.remesh_volume(&mesh.vertices, &mesh.tets, &opts)?;
    validate_volume(&vertices, &tets)?;
    let min_dihedral_angles = tets
        .iter()
        .map(|t| dihedral_angles(&t.map(|v| vertices[v])).0)
        .collect();
    Ok(ExtractedMesh {
        vertices,
        tets,
        min_dihedral_angles,
        unrounded_vertices: 0,
    })
}
