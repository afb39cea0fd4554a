use std::path::Path;

use airtrend_core::{AirtrendError, AirtrendResult};
use serde::{Deserialize, Serialize};

use super::{
    check_input, check_len, default_threshold, not_ready, read_state, sigmoid, ModelHandle,
    ModelKind, Prediction,
};
use crate::features::{Dimensionality, ModelInput};

/// Term embeddings for the last branch, linear weights for any branch before it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalState {
    /// One embedding row per column of the last branch
    pub embeddings: Vec<Vec<f64>>,
    pub projection: Vec<f64>,
    #[serde(default)]
    pub static_weights: Vec<Vec<f64>>,
    pub recurrent: f64,
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Embeds each step's trend intensities as a weighted sum of term vectors and
/// folds the steps with a leaky recurrence.
pub struct LexicalModel {
    dims: Dimensionality,
    state: Option<LexicalState>,
}

impl LexicalModel {
    pub fn new(dims: Dimensionality) -> Self {
        Self { dims, state: None }
    }

    fn lexical_width(&self) -> usize {
        self.dims.widths.last().copied().unwrap_or(0)
    }

    fn check(&self, state: &LexicalState) -> AirtrendResult<()> {
        check_len("dllstm vocabulary", state.embeddings.len(), self.lexical_width())?;
        let dim = state.projection.len();
        if dim == 0 {
            return Err(AirtrendError::SchemaMismatch(
                "dllstm projection is empty".into(),
            ));
        }
        for row in &state.embeddings {
            check_len("dllstm embedding", row.len(), dim)?;
        }
        let statics = &self.dims.widths[..self.dims.widths.len().saturating_sub(1)];
        check_len("dllstm static branches", state.static_weights.len(), statics.len())?;
        for (weights, &width) in state.static_weights.iter().zip(statics) {
            check_len("dllstm static branch", weights.len(), width)?;
        }
        Ok(())
    }
}

impl ModelHandle for LexicalModel {
    fn kind(&self) -> ModelKind {
        ModelKind::LexicalEmbedding
    }

    fn dimensionality(&self) -> &Dimensionality {
        &self.dims
    }

    fn build(&mut self) {
        let statics = &self.dims.widths[..self.dims.widths.len().saturating_sub(1)];
        self.state = Some(LexicalState {
            embeddings: vec![vec![0.0; 1]; self.lexical_width()],
            projection: vec![0.0; 1],
            static_weights: statics.iter().map(|&w| vec![0.0; w]).collect(),
            recurrent: 0.0,
            bias: 0.0,
            threshold: default_threshold(),
        });
    }

    fn load(&mut self, path: &Path) -> AirtrendResult<()> {
        let state: LexicalState = read_state(path)?;
        self.check(&state)?;
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, input: &ModelInput) -> AirtrendResult<Prediction> {
        let state = self.state.as_ref().ok_or_else(|| not_ready(self.kind()))?;
        check_input(&self.dims, input)?;
        let (lexical, statics) = input
            .branches
            .split_last()
            .ok_or_else(|| AirtrendError::SchemaMismatch("dllstm input has no branches".into()))?;
        let dim = state.projection.len();

        let mut scores = Vec::with_capacity(input.samples());
        for s in 0..input.samples() {
            let mut h = 0.0;
            for t in 0..self.dims.window {
                let mut embedded = vec![0.0; dim];
                for (j, row) in state.embeddings.iter().enumerate() {
                    let x = lexical[[s, t, j]];
                    for (e, v) in embedded.iter_mut().zip(row) {
                        *e += x * v;
                    }
                }
                let lexical_drive: f64 = embedded
                    .iter()
                    .zip(&state.projection)
                    .map(|(e, p)| e * p)
                    .sum();
                let static_drive: f64 = statics
                    .iter()
                    .zip(&state.static_weights)
                    .map(|(block, weights)| {
                        weights
                            .iter()
                            .enumerate()
                            .map(|(j, w)| w * block[[s, t, j]])
                            .sum::<f64>()
                    })
                    .sum();
                h = (state.recurrent * h + lexical_drive + static_drive).tanh();
            }
            scores.push(sigmoid(h + state.bias));
        }
        Ok(Prediction::from_scores(scores, state.threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("dllstm.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn embeddings_drive_the_score() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{"embeddings": [[1.0, 0.0], [0.0, 1.0]], "projection": [2.0, -2.0],
                "recurrent": 0.0, "bias": 0.0}"#,
        );
        let dims = Dimensionality {
            window: 1,
            widths: vec![2],
        };
        let mut model = LexicalModel::new(dims);
        model.build();
        model.load(&path).unwrap();
        let block = Array3::from_shape_vec((2, 1, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let pred = model
            .predict(&ModelInput {
                branches: vec![block],
            })
            .unwrap();
        assert_eq!(pred.classes, vec![1, 0]);
    }

    #[test]
    fn two_branch_needs_static_weights() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{"embeddings": [[1.0]], "projection": [1.0], "recurrent": 0.0, "bias": 0.0}"#,
        );
        let dims = Dimensionality {
            window: 2,
            widths: vec![3, 1],
        };
        let mut model = LexicalModel::new(dims);
        model.build();
        assert!(matches!(
            model.load(&path).unwrap_err(),
            AirtrendError::SchemaMismatch(_)
        ));
    }

    #[test]
    fn vocabulary_size_must_match() {
        let dir = tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"{"embeddings": [[1.0], [1.0], [1.0]], "projection": [1.0],
                "recurrent": 0.0, "bias": 0.0}"#,
        );
        let mut model = LexicalModel::new(Dimensionality {
            window: 1,
            widths: vec![2],
        });
        assert!(model.load(&path).is_err());
    }
}
