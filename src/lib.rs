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


//! Envelope-constrained tetrahedral meshing of triangle soups.
//!
//! The entry point is [`tetrahedralize`], or [`Tetrahedralizer`] when a
//! progress callback or an external remesher is wanted.

pub mod bsp;
pub mod config;
pub mod envelope;
pub mod error;
pub mod geometry;
pub mod inout;
pub mod kernel;
pub mod mesh;
pub mod mesh_processing;
pub mod numeric;
pub mod operations;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod refinement;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::{BackgroundMesh, OptimizationOps, Step, TetConfig};
pub use error::{TetError, TetResult};
pub use mesh::extract::extract_surface_mesh;
pub use mesh_processing::remesh::{RemeshError, RemeshOptions, SurfaceRemesher, VolumeRemesher};
pub use pipeline::{TetOutput, Tetrahedralizer, tetrahedralize};
pub use record::{MeshRecord, OpType};
