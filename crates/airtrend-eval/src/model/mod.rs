//! Scoring models consumed by the evaluation harness.
//!
//! Models are never trained here: each handle allocates its parameters for a
//! given [`Dimensionality`], restores weights from a JSON artifact and
//! predicts a class plus a score per sample.

use std::fs::File;
use std::path::Path;

use airtrend_core::{AirtrendError, AirtrendResult};
use serde::de::DeserializeOwned;

use crate::features::{Dimensionality, ModelInput};

pub mod lexical;
pub mod logistic;
pub mod recurrent;

pub use lexical::LexicalModel;
pub use logistic::LogisticModel;
pub use recurrent::RecurrentModel;

/// Closed set of model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Tabular classifier over the current row
    Logistic,
    /// Recurrent model over a trailing window
    Recurrent,
    /// Recurrent model with term embeddings for trend columns
    LexicalEmbedding,
}

/// Model-type tags accepted in feature configurations.
pub const MODEL_KINDS: &[(&str, ModelKind)] = &[
    ("logistic", ModelKind::Logistic),
    ("lstm", ModelKind::Recurrent),
    ("dllstm", ModelKind::LexicalEmbedding),
];

impl ModelKind {
    pub fn from_tag(tag: &str) -> AirtrendResult<Self> {
        MODEL_KINDS
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| AirtrendError::Configuration(format!("unknown model type '{tag}'")))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::Recurrent => "lstm",
            ModelKind::LexicalEmbedding => "dllstm",
        }
    }
}

/// Predicted class and positive-class score, one entry per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub classes: Vec<u8>,
    pub scores: Vec<f64>,
}

impl Prediction {
    pub fn from_scores(scores: Vec<f64>, threshold: f64) -> Self {
        let classes = scores.iter().map(|&s| u8::from(s >= threshold)).collect();
        Self { classes, scores }
    }
}

pub trait ModelHandle {
    fn kind(&self) -> ModelKind;

    fn dimensionality(&self) -> &Dimensionality;

    /// Allocate zeroed parameters for the model's dimensionality.
    fn build(&mut self);

    /// Restore persisted weights; shapes must match the dimensionality.
    fn load(&mut self, path: &Path) -> AirtrendResult<()>;

    fn predict(&self, input: &ModelInput) -> AirtrendResult<Prediction>;
}

/// Construct an unloaded model handle for `kind`.
pub fn create_model(kind: ModelKind, dims: &Dimensionality) -> AirtrendResult<Box<dyn ModelHandle>> {
    if dims.widths.is_empty() || dims.window == 0 {
        return Err(AirtrendError::SchemaMismatch(format!(
            "cannot construct a {} model for {dims}",
            kind.as_str()
        )));
    }
    let model: Box<dyn ModelHandle> = match kind {
        ModelKind::Logistic => Box::new(LogisticModel::new(dims.clone())?),
        ModelKind::Recurrent => Box::new(RecurrentModel::new(dims.clone())),
        ModelKind::LexicalEmbedding => Box::new(LexicalModel::new(dims.clone())),
    };
    Ok(model)
}

pub(crate) fn read_state<T: DeserializeOwned>(path: &Path) -> AirtrendResult<T> {
    let file = File::open(path).map_err(|_| AirtrendError::missing("model weights", path))?;
    Ok(serde_json::from_reader(file)?)
}

pub(crate) fn check_len(what: &str, got: usize, expected: usize) -> AirtrendResult<()> {
    if got != expected {
        return Err(AirtrendError::SchemaMismatch(format!(
            "{what}: weights have {got} entries, features have {expected}"
        )));
    }
    Ok(())
}

pub(crate) fn check_input(dims: &Dimensionality, input: &ModelInput) -> AirtrendResult<()> {
    let got = input.dimensionality();
    if &got != dims {
        return Err(AirtrendError::SchemaMismatch(format!(
            "model built for {dims}, input is {got}"
        )));
    }
    Ok(())
}

pub(crate) fn not_ready(kind: ModelKind) -> AirtrendError {
    AirtrendError::Configuration(format!(
        "{} model used before build or load",
        kind.as_str()
    ))
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub(crate) fn default_threshold() -> f64 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_map_to_kinds() {
        for (tag, kind) in MODEL_KINDS {
            assert_eq!(ModelKind::from_tag(tag).unwrap(), *kind);
            assert_eq!(kind.as_str(), *tag);
        }
        assert!(ModelKind::from_tag("forest").is_err());
    }

    #[test]
    fn factory_rejects_empty_dimensionality() {
        let dims = Dimensionality {
            window: 1,
            widths: vec![],
        };
        assert!(create_model(ModelKind::Recurrent, &dims).is_err());
    }

    #[test]
    fn thresholding() {
        let pred = Prediction::from_scores(vec![0.2, 0.5, 0.9], 0.5);
        assert_eq!(pred.classes, vec![0, 1, 1]);
    }
}
