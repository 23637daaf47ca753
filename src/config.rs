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

//! Run configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{TetError, TetResult};

/// Pipeline phases reported through the progress callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    Preprocess,
    Delaunay,
    FaceMatching,
    Bsp,
    Tetra,
    Optimize,
}

/// Which local operations the refinement engine runs each pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct OptimizationOps {
    pub split: bool,
    pub collapse: bool,
    pub swap: bool,
    pub smooth: bool,
}

impl Default for OptimizationOps {
    fn default() -> Self {
        Self {
            split: true,
            collapse: true,
            swap: true,
            smooth: true,
        }
    }
}

/// Sizing field given on a separate tet mesh: one target edge length per vertex,
/// interpolated linearly inside each tet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackgroundMesh {
    pub vertices: Vec<[f64; 3]>,
    pub tets: Vec<[usize; 4]>,
    pub sizing: Vec<f64>,
}

/// Immutable configuration of one tetrahedralization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct TetConfig {
    /// Initial target edge length as a fraction of the bounding-box diagonal (diag / value).
    pub initial_edge_len_rel: f64,

    /// Envelope epsilon as a fraction of the bounding-box diagonal (diag / value).
    pub eps_rel: f64,

    /// Explicit sampling distance (diag / value); derived from the stage when `None`.
    pub sampling_dist_rel: Option<f64>,

    /// Envelope schedule stage; `>= 2` together with `checkpoint` resumes from it.
    pub stage: u32,

    /// Multiplier applied to the sizing field where quality stalls.
    pub adaptive_scalar: f64,

    /// Refinement stops once the worst energy drops below this.
    pub filter_energy_thres: f64,

    /// Energy improvement per pass below which the sizing field is rescaled.
    pub delta_energy_thres: f64,

    pub max_num_passes: usize,

    /// Seed the Delaunay step with a voxel grid of interior points.
    pub use_voxel_stuffing: bool,

    /// Laplacian smoothing of open-boundary vertices before the winding filter.
    pub smooth_open_boundary: bool,

    /// Best-effort vertex budget (5% tolerance).
    pub target_num_vertices: Option<usize>,

    pub background_mesh: Option<BackgroundMesh>,

    /// Checkpoint written after stage one (`stage == 1`) or read to resume (`stage >= 2`).
    pub checkpoint: Option<PathBuf>,

    /// Skip the mesh record log.
    pub is_quiet: bool,

    /// Compare patch energies by their maximum (otherwise by their sum).
    pub use_energy_max: bool,

    /// Test surface facets against the envelope by dense sampling (otherwise vertices only).
    pub use_sampling: bool,

    /// Project smoothed surface vertices onto their one-ring tangent plane instead of the input.
    pub use_onering_projection: bool,

    pub operations: OptimizationOps,
}

impl Default for TetConfig {
    fn default() -> Self {
        Self {
            initial_edge_len_rel: 20.0,
            eps_rel: 1000.0,
            sampling_dist_rel: None,
            stage: 1,
            adaptive_scalar: 0.6,
            filter_energy_thres: 10.0,
            delta_energy_thres: 0.1,
            max_num_passes: 80,
            use_voxel_stuffing: true,
            smooth_open_boundary: false,
            target_num_vertices: None,
            background_mesh: None,
            checkpoint: None,
            is_quiet: false,
            use_energy_max: true,
            use_sampling: true,
            use_onering_projection: false,
            operations: OptimizationOps::default(),
        }
    }
}

impl TetConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative target edge length.
    #[must_use]
    pub const fn with_edge_length_rel(mut self, rel: f64) -> Self {
        self.initial_edge_len_rel = rel;
        self
    }

    /// Set the relative envelope size.
    #[must_use]
    pub const fn with_eps_rel(mut self, rel: f64) -> Self {
        self.eps_rel = rel;
        self
    }

    #[must_use]
    pub const fn with_stage(mut self, stage: u32) -> Self {
        self.stage = stage;
        self
    }

    #[must_use]
    pub const fn with_max_passes(mut self, passes: usize) -> Self {
        self.max_num_passes = passes;
        self
    }

    #[must_use]
    pub const fn with_voxel_stuffing(mut self, on: bool) -> Self {
        self.use_voxel_stuffing = on;
        self
    }

    #[must_use]
    pub const fn with_quiet(mut self, quiet: bool) -> Self {
        self.is_quiet = quiet;
        self
    }

    #[must_use]
    pub const fn with_operations(mut self, ops: OptimizationOps) -> Self {
        self.operations = ops;
        self
    }

    #[must_use]
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_target_vertices(mut self, n: usize) -> Self {
        self.target_num_vertices = Some(n);
        self
    }

    #[must_use]
    pub fn with_background_mesh(mut self, mesh: BackgroundMesh) -> Self {
        self.background_mesh = Some(mesh);
        self
    }

    /// Check value ranges before a run.
    ///
    /// # Errors
    ///
    /// Returns [`TetError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> TetResult<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(TetError::InvalidConfig(format!("{name} must be positive and finite, got {v}")))
            }
        };
        positive("initial_edge_len_rel", self.initial_edge_len_rel)?;
        positive("eps_rel", self.eps_rel)?;
        positive("filter_energy_thres", self.filter_energy_thres)?;
        positive("delta_energy_thres", self.delta_energy_thres)?;
        if let Some(rel) = self.sampling_dist_rel {
            positive("sampling_dist_rel", rel)?;
        }
        if !(self.adaptive_scalar > 0.0 && self.adaptive_scalar < 1.0) {
            return Err(TetError::InvalidConfig(format!(
                "adaptive_scalar must lie in (0, 1), got {}",
                self.adaptive_scalar
            )));
        }
        if self.stage == 0 {
            return Err(TetError::InvalidConfig("stage must be at least 1".into()));
        }
        if let Some(bg) = &self.background_mesh {
            if bg.sizing.len() != bg.vertices.len() {
                return Err(TetError::InvalidConfig(
                    "background mesh needs one sizing value per vertex".into(),
                ));
            }
            if bg.tets.iter().flatten().any(|&v| v >= bg.vertices.len()) {
                return Err(TetError::InvalidConfig(
                    "background mesh tet references a missing vertex".into(),
                ));
            }
        }
        Ok(())
    }

    /// Whether this configuration resumes from a stage-one checkpoint.
    pub fn resumes_from_checkpoint(&self) -> bool {
        self.stage >= 2 && self.checkpoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = TetConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.stage, 1);
        assert!(!cfg.resumes_from_checkpoint());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(TetConfig::new().with_eps_rel(0.0).validate().is_err());
        assert!(TetConfig::new().with_stage(0).validate().is_err());
        let cfg = TetConfig {
            adaptive_scalar: 1.5,
            ..TetConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resume_needs_stage_and_path() {
        let cfg = TetConfig::new().with_checkpoint("/tmp/x.bin");
        assert!(!cfg.resumes_from_checkpoint());
        assert!(cfg.with_stage(2).resumes_from_checkpoint());
    }
}
