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

//! Append-only statistics log. Nothing in the pipeline reads it back.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::quality::QualitySummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    Init,
    Preprocessing,
    DelaunayTetra,
    DivfaceMatch,
    Bsp,
    SimpleTetra,
    OptInit,
    Split,
    Collapse,
    Swap,
    Smooth,
    AdapUpdate,
    Wn,
    Unrounded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshRecord {
    pub op: OpType,
    /// Seconds spent in the operation.
    pub timing: f64,
    pub n_v: usize,
    pub n_t: usize,
    pub quality: Option<QualitySummary>,
}

#[derive(Debug)]
pub struct RecordLog {
    enabled: bool,
    records: Vec<MeshRecord>,
    clock: Instant,
}

impl RecordLog {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            records: Vec::new(),
            clock: Instant::now(),
        }
    }

    /// Seconds since the last `push` (or creation), restarting the clock.
    pub fn lap(&mut self) -> f64 {
        let t = self.clock.elapsed().as_secs_f64();
        self.clock = Instant::now();
        t
    }

    pub fn push(&mut self, op: OpType, n_v: usize, n_t: usize, quality: Option<QualitySummary>) {
        let timing = self.lap();
        if self.enabled {
            self.records.push(MeshRecord {
                op,
                timing,
                n_v,
                n_t,
                quality,
            });
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn records(&self) -> &[MeshRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MeshRecord> {
        self.records
    }
}
