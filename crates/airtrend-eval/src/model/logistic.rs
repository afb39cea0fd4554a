use std::path::Path;

use airtrend_core::{AirtrendError, AirtrendResult};
use serde::{Deserialize, Serialize};

use super::{
    check_input, check_len, default_threshold, not_ready, read_state, sigmoid, ModelHandle,
    ModelKind, Prediction,
};
use crate::features::{Dimensionality, ModelInput};

/// Persisted weights: one weight vector per branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticState {
    pub weights: Vec<Vec<f64>>,
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Logistic regression over a single row per sample.
pub struct LogisticModel {
    dims: Dimensionality,
    state: Option<LogisticState>,
}

impl LogisticModel {
    pub fn new(dims: Dimensionality) -> AirtrendResult<Self> {
        if dims.window != 1 {
            return Err(AirtrendError::SchemaMismatch(format!(
                "logistic models read one row per sample, got {dims}"
            )));
        }
        Ok(Self { dims, state: None })
    }

    fn check(&self, state: &LogisticState) -> AirtrendResult<()> {
        check_len("logistic branches", state.weights.len(), self.dims.widths.len())?;
        for (b, (weights, &width)) in state.weights.iter().zip(&self.dims.widths).enumerate() {
            check_len(&format!("logistic branch {b}"), weights.len(), width)?;
        }
        Ok(())
    }
}

impl ModelHandle for LogisticModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Logistic
    }

    fn dimensionality(&self) -> &Dimensionality {
        &self.dims
    }

    fn build(&mut self) {
        self.state = Some(LogisticState {
            weights: self.dims.widths.iter().map(|&w| vec![0.0; w]).collect(),
            bias: 0.0,
            threshold: default_threshold(),
        });
    }

    fn load(&mut self, path: &Path) -> AirtrendResult<()> {
        let state: LogisticState = read_state(path)?;
        self.check(&state)?;
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, input: &ModelInput) -> AirtrendResult<Prediction> {
        let state = self.state.as_ref().ok_or_else(|| not_ready(self.kind()))?;
        check_input(&self.dims, input)?;
        let scores = (0..input.samples())
            .map(|s| {
                let z = input
                    .branches
                    .iter()
                    .zip(&state.weights)
                    .map(|(block, weights)| {
                        weights
                            .iter()
                            .enumerate()
                            .map(|(j, w)| w * block[[s, 0, j]])
                            .sum::<f64>()
                    })
                    .sum::<f64>();
                sigmoid(z + state.bias)
            })
            .collect();
        Ok(Prediction::from_scores(scores, state.threshold))
    }
}
