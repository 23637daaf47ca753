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

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{TetError, TetResult};
use crate::mesh::tet_mesh::TetMesh;
use crate::state::RunState;

const CHECKPOINT_VERSION: u32 = 1;

/// Snapshot of the mesh after stage one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub state: RunState,
    pub mesh: TetMesh,
}

impl Checkpoint {
    pub fn new(state: RunState, mesh: TetMesh) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            state,
            mesh,
        }
    }

    pub fn write(&self, path: &Path) -> TetResult<()> {
        let mut w = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut w, self)?;
        w.flush()?;
        info!(path = %path.display(), n_t = self.mesh.tets.len(), "checkpoint written");
        Ok(())
    }

    pub fn read(path: &Path) -> TetResult<Self> {
        let cp: Checkpoint = bincode::deserialize_from(BufReader::new(File::open(path)?))?;
        if cp.version != CHECKPOINT_VERSION {
            return Err(TetError::InvalidInput(format!(
                "checkpoint version {} is not supported",
                cp.version
            )));
        }
        info!(path = %path.display(), n_t = cp.mesh.tets.len(), "checkpoint loaded");
        Ok(cp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TetConfig;
    use crate::geometry::point::Point3;
    use crate::mesh::tet_mesh::FacetTag;
    use crate::mesh::vertex::{TetVertex, VertexPos};
    use crate::numeric::rational::ExactPoint3;
    use rug::Rational;

    #[test]
    fn exact_vertices_survive_round_trip() {
        let mut mesh = TetMesh::new(None);
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ] {
            mesh.add_vertex(TetVertex::new(VertexPos::Float(p)));
        }
        let third = Rational::from((1, 3));
        mesh.add_vertex(TetVertex::new(VertexPos::from_exact(ExactPoint3([
            third.clone(),
            third.clone(),
            third,
        ]))));
        mesh.add_tet([0, 1, 2, 3], [FacetTag::Interior; 4]);

        let state = RunState::new(2.0, &TetConfig::default(), true);
        let cp = Checkpoint::new(state, mesh);
        let path = std::env::temp_dir().join(format!("envtet-checkpoint-{}.bin", std::process::id()));
        cp.write(&path).unwrap();
        let back = Checkpoint::read(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back, cp);
        assert!(!back.mesh.vertices[3].pos.is_rounded());
    }
}
