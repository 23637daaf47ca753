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

use thiserror::Error;

use crate::geometry::point::Point3;
use crate::kernel::orientation::orient3d;
use crate::mesh_processing::surface::SurfaceMesh;
use crate::state::RunState;

/// Parameters handed to an external remesher.
#[derive(Debug, Clone, PartialEq)]
pub struct RemeshOptions {
    pub target_edge_length: f64,
    pub min_edge_length: f64,
    pub max_edge_length: f64,
    /// Hausdorff bound the result must respect.
    pub hausdorff: f64,
    pub angle_detection: bool,
    /// Sharp-feature threshold in degrees.
    pub angle_value: f64,
    pub verbose: bool,
}

impl RemeshOptions {
    pub fn new(target_length: f64) -> Self {
        Self {
            target_edge_length: target_length,
            min_edge_length: target_length * 4.0 / 5.0,
            max_edge_length: target_length * 4.0 / 3.0,
            hausdorff: target_length / 100.0,
            angle_detection: true,
            angle_value: 45.0,
            verbose: false,
        }
    }

    /// Options matching the sizing and envelope of a run.
    pub fn from_state(state: &RunState) -> Self {
        Self {
            hausdorff: state.eps,
            ..Self::new(state.initial_edge_len)
        }
    }

    pub fn validate(&self) -> Result<(), RemeshError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !(ok(self.target_edge_length) && ok(self.min_edge_length) && ok(self.max_edge_length) && ok(self.hausdorff))
            || self.min_edge_length > self.max_edge_length
        {
            return Err(RemeshError::InvalidOptions);
        }
        Ok(())
    }
}

/// Why an external remesher's result was not used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemeshError {
    #[error("invalid remesh options")]
    InvalidOptions,

    #[error("degenerate remesh output: {0}")]
    Degenerate(String),

    #[error("remesher failed: {0}")]
    Failed(String),
}

/// Surface remeshing hook run during preprocessing.
pub trait SurfaceRemesher {
    fn remesh_surface(&self, mesh: &SurfaceMesh, opts: &RemeshOptions) -> Result<SurfaceMesh, RemeshError>;
}

/// Volume remeshing hook run on the final tetrahedral mesh.
pub trait VolumeRemesher {
    fn remesh_volume(
        &self,
        vertices: &[Point3],
        tets: &[[usize; 4]],
        opts: &RemeshOptions,
    ) -> Result<(Vec<Point3>, Vec<[usize; 4]>), RemeshError>;
}

/// Reject remesher output that the rest of the pipeline cannot consume.
pub fn validate_surface(mesh: &SurfaceMesh) -> Result<(), RemeshError> {
    if mesh.faces.is_empty() {
        return Err(RemeshError::Degenerate("no faces".into()));
    }
    if let Some(p) = mesh.vertices.iter().find(|p| !p.is_finite()) {
        return Err(RemeshError::Degenerate(format!("non-finite vertex {p:?}")));
    }
    let n = mesh.vertices.len();
    for f in &mesh.faces {
        if f.iter().any(|&v| v >= n) {
            return Err(RemeshError::Degenerate(format!("face {f:?} out of range")));
        }
        if f[0] == f[1] || f[1] == f[2] || f[0] == f[2] {
            return Err(RemeshError::Degenerate(format!("face {f:?} repeats a vertex")));
        }
    }
    Ok(())
}

pub fn validate_volume(vertices: &[Point3], tets: &[[usize; 4]]) -> Result<(), RemeshError> {
    if tets.is_empty() {
        return Err(RemeshError::Degenerate("no tetrahedra".into()));
    }
    if vertices.iter().any(|p| !p.is_finite()) {
        return Err(RemeshError::Degenerate("non-finite vertex".into()));
    }
    for t in tets {
        if t.iter().any(|&v| v >= vertices.len()) {
            return Err(RemeshError::Degenerate(format!("tet {t:?} out of range")));
        }
        let [a, b, c, d] = t.map(|v| vertices[v]);
        if orient3d(&a, &b, &c, &d) <= 0 {
            return Err(RemeshError::Degenerate(format!("tet {t:?} is inverted or flat")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remesh_error_display() {
        assert_eq!(RemeshError::InvalidOptions.to_string(), "invalid remesh options");
        let err = RemeshError::Degenerate("no faces".into());
        assert_eq!(format!("{err}"), "degenerate remesh output: no faces");
        let boxed: Box<dyn std::error::Error> = Box::new(RemeshError::Failed("timeout".into()));
        assert!(boxed.to_string().ends_with("timeout"));
    }

    #[test]
    fn options_bracket_the_target() {
        let o = RemeshOptions::new(1.5);
        assert!(o.min_edge_length < o.target_edge_length);
        assert!(o.max_edge_length > o.target_edge_length);
        assert!(o.validate().is_ok());

        let bad = RemeshOptions {
            hausdorff: 0.0,
            ..RemeshOptions::new(1.0)
        };
        assert_eq!(bad.validate(), Err(RemeshError::InvalidOptions));
    }

    #[test]
    fn inverted_volume_output_is_rejected() {
        let v = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        assert!(validate_volume(&v, &[[0, 1, 2, 3]]).is_ok());
        assert!(validate_volume(&v, &[[1, 0, 2, 3]]).is_err());
        assert!(validate_volume(&v, &[[0, 1, 2, 7]]).is_err());
    }
}
