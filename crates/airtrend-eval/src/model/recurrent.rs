use std::path::Path;

use airtrend_core::AirtrendResult;
use serde::{Deserialize, Serialize};

use super::{
    check_input, check_len, default_threshold, not_ready, read_state, sigmoid, ModelHandle,
    ModelKind, Prediction,
};
use crate::features::{Dimensionality, ModelInput};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentState {
    /// Input weights per branch
    pub input_weights: Vec<Vec<f64>>,
    pub recurrent: f64,
    pub output_weight: f64,
    pub bias: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

/// Single-unit recurrent cell: `h_t = tanh(r * h_{t-1} + w . x_t)`.
pub struct RecurrentModel {
    dims: Dimensionality,
    state: Option<RecurrentState>,
}

impl RecurrentModel {
    pub fn new(dims: Dimensionality) -> Self {
        Self { dims, state: None }
    }
}

impl ModelHandle for RecurrentModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Recurrent
    }

    fn dimensionality(&self) -> &Dimensionality {
        &self.dims
    }

    fn build(&mut self) {
        self.state = Some(RecurrentState {
            input_weights: self.dims.widths.iter().map(|&w| vec![0.0; w]).collect(),
            recurrent: 0.0,
            output_weight: 0.0,
            bias: 0.0,
            threshold: default_threshold(),
        });
    }

    fn load(&mut self, path: &Path) -> AirtrendResult<()> {
        let state: RecurrentState = read_state(path)?;
        check_len("lstm branches", state.input_weights.len(), self.dims.widths.len())?;
        for (b, (weights, &width)) in state.input_weights.iter().zip(&self.dims.widths).enumerate()
        {
            check_len(&format!("lstm branch {b}"), weights.len(), width)?;
        }
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, input: &ModelInput) -> AirtrendResult<Prediction> {
        let state = self.state.as_ref().ok_or_else(|| not_ready(self.kind()))?;
        check_input(&self.dims, input)?;
        let mut scores = Vec::with_capacity(input.samples());
        for s in 0..input.samples() {
            let mut h = 0.0;
            for t in 0..self.dims.window {
                let drive: f64 = input
                    .branches
                    .iter()
                    .zip(&state.input_weights)
                    .map(|(block, weights)| {
                        weights
                            .iter()
                            .enumerate()
                            .map(|(j, w)| w * block[[s, t, j]])
                            .sum::<f64>()
                    })
                    .sum();
                h = (state.recurrent * h + drive).tanh();
            }
            scores.push(sigmoid(state.output_weight * h + state.bias));
        }
        Ok(Prediction::from_scores(scores, state.threshold))
    }
}
