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

//! Parameters derived once per run from the input and the configuration.

use serde::{Deserialize, Serialize};

use crate::config::TetConfig;

/// Mutable run state. Only `sub_stage` and the effective epsilon change after
/// construction; everything else is read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub bbox_diag: f64,
    pub eps_input: f64,
    pub sampling_dist: f64,
    pub eps_delta: f64,
    /// Effective envelope epsilon at the current sub-stage.
    pub eps: f64,
    pub eps_2: f64,
    pub initial_edge_len: f64,
    pub is_mesh_closed: bool,
    pub stage: u32,
    pub sub_stage: u32,
    pub use_sampling: bool,
}

impl RunState {
    pub fn new(bbox_diag: f64, config: &TetConfig, is_mesh_closed: bool) -> Self {
        let eps_input = bbox_diag / config.eps_rel;
        let stage = config.stage.max(1);
        let sampling_dist = match config.sampling_dist_rel {
            Some(rel) => bbox_diag / rel,
            None => eps_input / stage as f64,
        };
        let eps_delta = if config.use_sampling {
            sampling_dist / 3f64.sqrt()
        } else {
            0.0
        };
        let mut state = RunState {
            bbox_diag,
            eps_input,
            sampling_dist,
            eps_delta,
            eps: eps_input,
            eps_2: eps_input * eps_input,
            initial_edge_len: bbox_diag / config.initial_edge_len_rel,
            is_mesh_closed,
            stage,
            sub_stage: 1,
            use_sampling: config.use_sampling,
        };
        state.update_eps();
        state
    }

    fn update_eps(&mut self) {
        let eps = if self.use_sampling {
            let steps = f64::from(self.stage + 1 - self.sub_stage.min(self.stage));
            self.eps_input - self.eps_delta * steps
        } else {
            self.eps_input
        };
        // An oversized sampling override must not turn the envelope inside out.
        self.eps = eps.max(self.eps_input * 1e-3);
        self.eps_2 = self.eps * self.eps;
    }

    /// Relax the envelope by one sub-stage. Returns `false` once the last
    /// sub-stage is reached.
    pub fn advance_sub_stage(&mut self) -> bool {
        if self.sub_stage >= self.stage {
            return false;
        }
        self.sub_stage += 1;
        self.update_eps();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derived_values_follow_the_config() {
        let cfg = TetConfig::default();
        let st = RunState::new(10.0, &cfg, true);
        assert_relative_eq!(st.eps_input, 0.01);
        assert_relative_eq!(st.initial_edge_len, 0.5);
        assert_relative_eq!(st.sampling_dist, 0.01);
        assert_relative_eq!(st.eps, 0.01 - 0.01 / 3f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(st.eps_2, st.eps * st.eps);
    }

    #[test]
    fn sub_stages_relax_monotonically() {
        let cfg = TetConfig::default().with_stage(3);
        let mut st = RunState::new(1.0, &cfg, true);
        let mut last = st.eps;
        while st.advance_sub_stage() {
            assert!(st.eps > last);
            assert!(st.eps < st.eps_input);
            last = st.eps;
        }
        assert_eq!(st.sub_stage, 3);
    }

    #[test]
    fn vertex_only_mode_uses_full_epsilon() {
        let cfg = TetConfig {
            use_sampling: false,
            ..TetConfig::default()
        };
        let st = RunState::new(2.0, &cfg, false);
        assert_relative_eq!(st.eps, st.eps_input);
    }
}
