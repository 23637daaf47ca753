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

use serde::{Deserialize, Serialize};

use crate::geometry::point::Point3;
use crate::numeric::rational::ExactPoint3;

/// Position of a tet-mesh vertex: a trusted double, or an authoritative
/// rational with its nearest double kept for fast queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VertexPos {
    Float(Point3),
    Exact { exact: ExactPoint3, approx: Point3 },
}

impl VertexPos {
    /// Exact coordinates collapse to `Float` when the double is exact.
    pub fn from_exact(exact: ExactPoint3) -> Self {
        let approx = exact.to_point();
        if exact.is_float_exact() {
            VertexPos::Float(approx)
        } else {
            VertexPos::Exact { exact, approx }
        }
    }

    #[inline]
    pub fn posf(&self) -> Point3 {
        match self {
            VertexPos::Float(p) => *p,
            VertexPos::Exact { approx, .. } => *approx,
        }
    }

    #[inline]
    pub fn is_rounded(&self) -> bool {
        matches!(self, VertexPos::Float(_))
    }

    /// Exact coordinates of either variant.
    pub fn to_exact(&self) -> Option<ExactPoint3> {
        match self {
            VertexPos::Float(p) => ExactPoint3::from_point(p),
            VertexPos::Exact { exact, .. } => Some(exact.clone()),
        }
    }

    /// The float variant this position would round to.
    pub fn rounded(&self) -> VertexPos {
        VertexPos::Float(self.posf())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TetVertex {
    pub pos: VertexPos,
    pub on_surface: bool,
    pub on_bbox: bool,
    /// Lies on an open-boundary edge of the input.
    pub on_boundary: bool,
    /// Sizing multiplier applied to the initial target edge length.
    pub scale: f64,
    /// Sorted indices of live incident tets.
    pub conn_tets: Vec<usize>,
    pub removed: bool,
}

impl TetVertex {
    pub fn new(pos: VertexPos) -> Self {
        Self {
            pos,
            on_surface: false,
            on_bbox: false,
            on_boundary: false,
            scale: 1.0,
            conn_tets: Vec::new(),
            removed: false,
        }
    }

    #[inline]
    pub fn posf(&self) -> Point3 {
        self.pos.posf()
    }

    /// Same vertex at another position, flags and sizing kept.
    pub fn moved_to(&self, pos: VertexPos) -> Self {
        Self {
            pos,
            conn_tets: Vec::new(),
            ..self.clone()
        }
    }
}
