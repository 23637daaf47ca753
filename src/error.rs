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

//! Error types for the tetrahedralization pipeline.

use thiserror::Error;

/// Errors that abort a tetrahedralization run.
#[derive(Debug, Error)]
pub enum TetError {
    /// Preprocessing left no triangles to mesh.
    #[error("Empty mesh")]
    EmptyMesh,

    /// Input arrays are malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The Delaunay tetrahedralization could not place a point.
    #[error("Delaunay tetrahedralization failed: {0}")]
    Delaunay(String),

    /// Reading or writing the checkpoint file failed.
    #[error("Checkpoint I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The checkpoint could not be encoded or decoded.
    #[error("Checkpoint encoding failed: {0}")]
    Checkpoint(#[from] bincode::Error),
}

/// Result type for tetrahedralization operations.
pub type TetResult<T> = std::result::Result<T, TetError>;
