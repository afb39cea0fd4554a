//! Run configuration
//!
//! A [`RunConfig`] is loaded once at process start, validated, and then only
//! ever passed around by shared reference.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AirtrendError, AirtrendResult};

/// Model type tags the evaluation harness knows how to construct.
pub const KNOWN_MODEL_TYPES: &[&str] = &["logistic", "lstm", "dllstm"];

/// Complete configuration for a split or predict run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub global: GlobalConfig,
    pub search_trend: SearchTrendConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub feature_columns: FeatureColumnsConfig,
    #[serde(default)]
    pub train_model: TrainModelConfig,
    #[serde(default)]
    pub predict_model: PredictModelConfig,
    /// Named feature/model combinations, keyed by feature-set id
    #[serde(default)]
    pub features: BTreeMap<String, FeatureConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// City list, year windows and reserved column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub cities: Vec<String>,
    #[serde(default)]
    pub train_years: BTreeSet<i32>,
    #[serde(default)]
    pub valid_years: BTreeSet<i32>,
    #[serde(default)]
    pub test_years: BTreeSet<i32>,
    /// Fixed seed for the train shuffle; entropy when absent
    #[serde(default)]
    pub shuffle_seed: Option<u64>,
    #[serde(default = "default_date_column")]
    pub date_column: String,
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default = "default_split_label_column")]
    pub split_label_column: String,
}

fn default_date_column() -> String {
    "DATE".to_string()
}

fn default_year_column() -> String {
    "year".to_string()
}

fn default_split_label_column() -> String {
    "split_label".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTrendConfig {
    /// Header-less CSV whose first field lists the search terms
    pub term_list_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Label columns; the first one is the prediction target
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Static (non-trend) feature groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureColumnsConfig {
    #[serde(default)]
    pub pollution: Vec<String>,
    #[serde(default)]
    pub physical: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainModelConfig {
    #[serde(default = "default_seq_length")]
    pub seq_length: usize,
    #[serde(default)]
    pub search_lag: usize,
    /// Feature-set ids to evaluate, in order
    #[serde(default)]
    pub use_feature: Vec<String>,
}

impl Default for TrainModelConfig {
    fn default() -> Self {
        Self {
            seq_length: default_seq_length(),
            search_lag: 0,
            use_feature: Vec::new(),
        }
    }
}

fn default_seq_length() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictModelConfig {
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    #[serde(default)]
    pub append_mode: bool,
    /// Evaluate the per-city test table of `city` instead of the merged one
    #[serde(default)]
    pub city_mode: bool,
    #[serde(default)]
    pub city: String,
}

impl Default for PredictModelConfig {
    fn default() -> Self {
        Self {
            report_path: default_report_path(),
            append_mode: false,
            city_mode: false,
            city: String::new(),
        }
    }
}

fn default_report_path() -> PathBuf {
    PathBuf::from("reports/report.csv")
}

/// One model/feature combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfiguration {
    pub model_type: String,
    /// Feature-group identifier such as `pol_phys_trend`
    pub feature: String,
    #[serde(default)]
    pub is_two_branch: bool,
    pub save_model_path: PathBuf,
    /// Common-vocabulary artifact, required by `dllstm`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_word_path: Option<PathBuf>,
    /// Declared total input width, checked against the built features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dim: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
}

impl RunConfig {
    pub fn from_toml_str(text: &str) -> AirtrendResult<Self> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Stamp the commit id; done once before the config is shared.
    pub fn with_commit_id(mut self, commit_id: Option<String>) -> Self {
        if let Some(id) = commit_id.filter(|id| !id.is_empty()) {
            self.provenance = Some(Provenance {
                commit_id: Some(id),
            });
        }
        self
    }

    pub fn validate(&self) -> AirtrendResult<()> {
        if self.global.cities.is_empty() {
            return Err(AirtrendError::Configuration(
                "global.cities must list at least one city".into(),
            ));
        }
        if self.train_model.seq_length == 0 {
            return Err(AirtrendError::Configuration(
                "train_model.seq_length must be at least 1".into(),
            ));
        }
        for id in &self.train_model.use_feature {
            let entry = self.features.get(id).ok_or_else(|| {
                AirtrendError::Configuration(format!(
                    "train_model.use_feature names unknown feature set '{id}'"
                ))
            })?;
            if !KNOWN_MODEL_TYPES.contains(&entry.model_type.as_str()) {
                return Err(AirtrendError::Configuration(format!(
                    "feature set '{id}' uses unknown model type '{}'; expected one of {}",
                    entry.model_type,
                    KNOWN_MODEL_TYPES.join(", ")
                )));
            }
            if entry.model_type == "dllstm" && entry.current_word_path.is_none() {
                return Err(AirtrendError::Configuration(format!(
                    "feature set '{id}' uses dllstm but has no current_word_path"
                )));
            }
        }
        if self.predict_model.city_mode && self.predict_model.city.is_empty() {
            return Err(AirtrendError::Configuration(
                "predict_model.city is required when city_mode is on".into(),
            ));
        }
        // TODO: decide whether overlapping windows should become a hard error
        for (a, b, name) in [
            (&self.global.train_years, &self.global.valid_years, "train/valid"),
            (&self.global.train_years, &self.global.test_years, "train/test"),
            (&self.global.valid_years, &self.global.test_years, "valid/test"),
        ] {
            let shared: Vec<i32> = a.intersection(b).copied().collect();
            if !shared.is_empty() {
                warn!(years = ?shared, "{name} year windows overlap");
            }
        }
        Ok(())
    }

    /// Label columns, search terms and the reserved date/year/split columns.
    pub fn seed_columns(&self, terms: &[String]) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let reserved = [
            &self.global.date_column,
            &self.global.year_column,
            &self.global.split_label_column,
        ];
        for name in self
            .labels
            .columns
            .iter()
            .chain(terms.iter())
            .chain(reserved.into_iter())
        {
            if !columns.contains(name) {
                columns.push(name.clone());
            }
        }
        columns
    }

    pub fn to_toml_string(&self) -> AirtrendResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Read and validate a TOML run configuration.
pub fn load_config(path: &Path) -> AirtrendResult<RunConfig> {
    let text = fs::read_to_string(path)
        .map_err(|_| AirtrendError::missing("configuration file", path))?;
    RunConfig::from_toml_str(&text)
}
