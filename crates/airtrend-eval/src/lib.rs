//! # airtrend-eval: feature-set evaluation harness
//!
//! Each configured feature set names a model kind, the column groups it
//! reads and a weights artifact. The harness builds that feature set from the
//! test table, loads the pretrained model, scores its predictions and records
//! one row per feature set in a CSV report.
//!
//! ## Modules
//!
//! - [`features`]: column groups, sample windows and the three feature recipes
//! - [`model`]: the model kinds and their weight files
//! - [`scoring`]: accuracy, precision, recall, F1 and ROC AUC
//! - [`ledger`]: the append-only report
//! - [`resolver`]: feature-set id to model kind and recipe
//! - [`harness`]: the per-entry pipeline

pub mod features;
pub mod harness;
pub mod ledger;
pub mod model;
pub mod resolver;
pub mod scoring;

pub use features::{
    ColumnLayout, Dimensionality, FeatureGroups, FeatureRecipe, FeatureTable, ModelInput,
};
pub use harness::{run_evaluation, EvaluationSummary};
pub use ledger::{EvaluationRecord, ResultLedger, CONFIG_COPY_NAME, RECORD_COLUMNS};
pub use model::{create_model, ModelHandle, ModelKind, Prediction, MODEL_KINDS};
pub use resolver::{resolve, ResolvedFeature};
pub use scoring::ScoreStats;
