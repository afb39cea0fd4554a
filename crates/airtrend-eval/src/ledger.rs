//! Append-only result ledger backed by a CSV report.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use airtrend_core::{AirtrendError, AirtrendResult, RunConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scoring::ScoreStats;

/// Fixed report header, in column order.
pub const RECORD_COLUMNS: &[&str] = &[
    "city",
    "model_type",
    "feature",
    "is_two_branch",
    "search_lag",
    "n_samples",
    "accuracy",
    "precision",
    "recall",
    "f1",
    "auc",
];

/// File name of the configuration copy written next to the report.
pub const CONFIG_COPY_NAME: &str = "config.toml";

/// One evaluated feature configuration. Field order matches [`RECORD_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub city: String,
    pub model_type: String,
    pub feature: String,
    pub is_two_branch: bool,
    pub search_lag: usize,
    pub n_samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: Option<f64>,
}

impl EvaluationRecord {
    pub fn new(
        city: &str,
        model_type: &str,
        feature: &str,
        is_two_branch: bool,
        search_lag: usize,
        stats: &ScoreStats,
    ) -> Self {
        Self {
            city: city.to_string(),
            model_type: model_type.to_string(),
            feature: feature.to_string(),
            is_two_branch,
            search_lag,
            n_samples: stats.n_samples,
            accuracy: stats.accuracy,
            precision: stats.precision,
            recall: stats.recall,
            f1: stats.f1,
            auc: stats.auc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultLedger {
    rows: Vec<EvaluationRecord>,
}

impl ResultLedger {
    /// Open an existing report for appending, or start an empty ledger.
    ///
    /// An existing report without `append_mode` is refused untouched.
    /// Returns the ledger and the index the next row goes to.
    pub fn load_or_create(path: &Path, append_mode: bool) -> AirtrendResult<(Self, usize)> {
        if !path.exists() {
            return Ok((Self::default(), 0));
        }
        if !append_mode {
            return Err(AirtrendError::PreexistingOutput(path.display().to_string()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let header: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if header != RECORD_COLUMNS {
            return Err(AirtrendError::SchemaMismatch(format!(
                "report '{}' has columns {:?}, expected {:?}",
                path.display(),
                header,
                RECORD_COLUMNS
            )));
        }
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<EvaluationRecord>, _>>()?;
        let next = rows.len();
        info!(report = %path.display(), rows = next, "appending to existing report");
        Ok((Self { rows }, next))
    }

    /// Insert `record` at `index`; the ledger grows by one row.
    pub fn append(&mut self, record: EvaluationRecord, index: usize) -> AirtrendResult<()> {
        if index > self.rows.len() {
            return Err(AirtrendError::Other(format!(
                "ledger row index {index} is past the end ({} rows)",
                self.rows.len()
            )));
        }
        self.rows.insert(index, record);
        Ok(())
    }

    pub fn rows(&self) -> &[EvaluationRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the report and a copy of `config` beside it.
    pub fn persist(&self, path: &Path, config: &RunConfig) -> AirtrendResult<PathBuf> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(File::create(path)?);
        writer.write_record(RECORD_COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let config_path = dir.join(CONFIG_COPY_NAME);
        fs::write(&config_path, config.to_toml_string()?)?;
        Ok(config_path)
    }
}
