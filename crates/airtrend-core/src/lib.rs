//! # airtrend-core
//!
//! Shared building blocks for the airtrend workspace: the run configuration,
//! the error taxonomy, per-city path derivation and the seed term list.
//!
//! The partition engine lives in `airtrend-ts`, the evaluation harness in
//! `airtrend-eval`.

pub mod config;
pub mod error;
pub mod paths;
pub mod terms;

pub use config::{
    load_config, FeatureColumnsConfig, FeatureConfiguration, GlobalConfig, RunConfig,
    KNOWN_MODEL_TYPES,
};
pub use error::{AirtrendError, AirtrendResult};
pub use paths::city_output_path;
pub use terms::load_term_list;
