use std::path::{Path, PathBuf};

use airtrend_core::{city_output_path, load_term_list, AirtrendError, AirtrendResult, RunConfig};
use airtrend_ts::read_frame;
use tracing::{debug, info};

use crate::features::{ColumnLayout, FeatureTable};
use crate::ledger::{EvaluationRecord, ResultLedger};
use crate::model::create_model;
use crate::resolver::{resolve, ResolvedFeature};
use crate::scoring::ScoreStats;

/// Outcome of one harness run.
#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub test_path: PathBuf,
    pub report_path: PathBuf,
    pub config_copy: PathBuf,
    /// Rows appended by this run, in order
    pub records: Vec<EvaluationRecord>,
    /// Ledger index of the first appended row
    pub first_row: usize,
}

/// Score every configured feature set against the test table.
///
/// **Algorithm:**
/// 1. Resolve all `use_feature` entries and open the ledger before any work.
/// 2. Load the test table once and fix the sample rows and labels.
/// 3. Per entry: build features, construct the model, load weights, predict,
///    score, append a ledger row.
/// 4. Persist the ledger and the configuration copy.
///
/// Any failure aborts the batch; nothing is written in that case.
pub fn run_evaluation(config: &RunConfig, test_path: &Path) -> AirtrendResult<EvaluationSummary> {
    let predict = &config.predict_model;
    let test_path = if predict.city_mode {
        city_output_path(test_path, &predict.city)
    } else {
        test_path.to_path_buf()
    };

    let entries = config
        .train_model
        .use_feature
        .iter()
        .map(|id| resolve(config, id))
        .collect::<AirtrendResult<Vec<ResolvedFeature>>>()?;
    let (mut ledger, mut row) =
        ResultLedger::load_or_create(&predict.report_path, predict.append_mode)?;
    let first_row = row;

    let terms = load_term_list(&config.search_trend.term_list_path)?;
    let layout = ColumnLayout::from_config(config, terms)?;
    let frame = read_frame(&test_path)?;
    let table = FeatureTable::from_frame(&frame, &layout)?;
    let seq_length = config.train_model.seq_length;
    let search_lag = config.train_model.search_lag;
    let samples = table.sample_rows(seq_length, search_lag);
    if samples.is_empty() {
        return Err(AirtrendError::SchemaMismatch(format!(
            "test table '{}' has no rows with a labelled {seq_length}-row window at lag {search_lag}",
            test_path.display()
        )));
    }
    let labels = table.labels(&samples);
    info!(
        test = %test_path.display(),
        samples = samples.len(),
        entries = entries.len(),
        "evaluating feature sets"
    );

    let mut records = Vec::with_capacity(entries.len());
    for entry in &entries {
        let record = evaluate_entry(config, entry, &table, &samples, &labels)?;
        ledger.append(record.clone(), row)?;
        row += 1;
        records.push(record);
    }

    let config_copy = ledger.persist(&predict.report_path, config)?;
    info!(
        report = %predict.report_path.display(),
        rows = ledger.len(),
        "wrote report"
    );
    Ok(EvaluationSummary {
        test_path,
        report_path: predict.report_path.clone(),
        config_copy,
        records,
        first_row,
    })
}

fn evaluate_entry(
    config: &RunConfig,
    entry: &ResolvedFeature,
    table: &FeatureTable,
    samples: &[usize],
    labels: &[u8],
) -> AirtrendResult<EvaluationRecord> {
    let settings = &entry.configuration;
    let recipe = entry.recipe(config)?;
    let (input, dims) = recipe.build(table, samples, entry.groups, settings.is_two_branch)?;
    if let Some(expected) = settings.input_dim {
        if expected != dims.total_width() {
            return Err(AirtrendError::SchemaMismatch(format!(
                "feature set '{}' declares input_dim {expected}, features have {}",
                entry.id,
                dims.total_width()
            )));
        }
    }
    debug!(feature = %entry.id, %dims, "built features");

    let mut model = create_model(entry.kind, &dims)?;
    model.build();
    model.load(&settings.save_model_path)?;
    let prediction = model.predict(&input)?;
    let stats = ScoreStats::compute(labels, &prediction)?;
    info!(
        feature = %entry.id,
        model = entry.kind.as_str(),
        accuracy = stats.accuracy,
        f1 = stats.f1,
        "scored feature set"
    );

    Ok(EvaluationRecord::new(
        &config.predict_model.city,
        &settings.model_type,
        &settings.feature,
        settings.is_two_branch,
        config.train_model.search_lag,
        &stats,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::RECORD_COLUMNS;
    use std::fs;
    use tempfile::tempdir;

    const TEST_TABLE: &str = "DATE,year,pm25,temp,mask,smog,pol_label\n\
        2021-01-01,2021,10,1,0.1,5,0\n\
        2021-01-02,2021,80,2,0.9,4,1\n\
        2021-01-03,2021,15,3,,3,0\n\
        2021-01-04,2021,90,4,0.8,2,1\n\
        2021-01-05,2021,12,5,0.2,1,0\n\
        2021-01-06,2021,85,6,0.7,1,1\n";

    fn setup(dir: &Path, extra: &str, append: bool) -> RunConfig {
        fs::write(dir.join("terms.csv"), "mask\nsmog\n").unwrap();
        fs::write(dir.join("test.csv"), TEST_TABLE).unwrap();
        fs::write(dir.join("test_x.csv"), TEST_TABLE).unwrap();
        fs::write(
            dir.join("lr.json"),
            r#"{"weights": [[0.2, 0.0]], "bias": -10.0}"#,
        )
        .unwrap();
        fs::write(
            dir.join("lstm.json"),
            r#"{"input_weights": [[0.05, 0.0], [1.0, 0.0]], "recurrent": 0.0,
                "output_weight": 4.0, "bias": -2.0}"#,
        )
        .unwrap();
        fs::write(dir.join("vocab.json"), r#"["mask"]"#).unwrap();
        fs::write(
            dir.join("lex.json"),
            r#"{"embeddings": [[1.0]], "projection": [1.0], "recurrent": 0.0, "bias": -0.5}"#,
        )
        .unwrap();
        let d = dir.display();
        let text = format!(
            r#"
[global]
cities = ["x"]

[search_trend]
term_list_path = "{d}/terms.csv"

[labels]
columns = ["pol_label"]

[feature_columns]
pollution = ["pm25"]
physical = ["temp"]

[train_model]
seq_length = 2
search_lag = 0
use_feature = ["lr", "lstm", "lex"]

[predict_model]
report_path = "{d}/reports/report.csv"
append_mode = {append}
city = "x"
{extra}

[features.lr]
model_type = "logistic"
feature = "pol_phys"
save_model_path = "{d}/lr.json"
input_dim = 2

[features.lstm]
model_type = "lstm"
feature = "pol_phys_trend"
is_two_branch = true
save_model_path = "{d}/lstm.json"

[features.lex]
model_type = "dllstm"
feature = "trend"
save_model_path = "{d}/lex.json"
current_word_path = "{d}/vocab.json"
"#
        );
        RunConfig::from_toml_str(&text).unwrap()
    }

    #[test]
    fn appends_one_row_per_feature_set() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), "", false);
        let summary = run_evaluation(&config, &dir.path().join("test.csv")).unwrap();
        assert_eq!(summary.records.len(), 3);
        assert_eq!(summary.first_row, 0);
        assert!(summary.records.iter().all(|r| r.n_samples == 5));
        assert_eq!(summary.records[0].model_type, "logistic");
        assert_eq!(summary.records[0].accuracy, 1.0);
        assert!(summary.records[1].is_two_branch);
        assert!(summary.config_copy.exists());

        let report = fs::read_to_string(&summary.report_path).unwrap();
        let mut lines = report.lines();
        assert_eq!(lines.next().unwrap(), RECORD_COLUMNS.join(","));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn rerun_in_append_mode_grows_the_report() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), "", true);
        run_evaluation(&config, &dir.path().join("test.csv")).unwrap();
        let second = run_evaluation(&config, &dir.path().join("test.csv")).unwrap();
        assert_eq!(second.first_row, 3);
        let (ledger, next) = ResultLedger::load_or_create(&second.report_path, true).unwrap();
        assert_eq!(ledger.len(), 6);
        assert_eq!(next, 6);
    }

    #[test]
    fn existing_report_without_append_aborts_before_work() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), "", false);
        run_evaluation(&config, &dir.path().join("test.csv")).unwrap();
        let before = fs::read(&config.predict_model.report_path).unwrap();
        let err = run_evaluation(&config, &dir.path().join("test.csv")).unwrap_err();
        assert!(matches!(err, AirtrendError::PreexistingOutput(_)));
        assert_eq!(fs::read(&config.predict_model.report_path).unwrap(), before);
    }

    #[test]
    fn declared_width_mismatch_aborts_the_batch() {
        let dir = tempdir().unwrap();
        let mut config = setup(dir.path(), "", false);
        config.features.get_mut("lr").unwrap().input_dim = Some(7);
        let err = run_evaluation(&config, &dir.path().join("test.csv")).unwrap_err();
        assert!(matches!(err, AirtrendError::SchemaMismatch(_)));
        assert!(!config.predict_model.report_path.exists());
    }

    #[test]
    fn missing_weights_abort_the_batch() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), "", false);
        fs::remove_file(dir.path().join("lstm.json")).unwrap();
        let err = run_evaluation(&config, &dir.path().join("test.csv")).unwrap_err();
        assert!(matches!(err, AirtrendError::MissingArtifact { .. }));
        assert!(!config.predict_model.report_path.exists());
    }

    #[test]
    fn city_mode_reads_the_city_table() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), "city_mode = true", false);
        let summary = run_evaluation(&config, &dir.path().join("test.csv")).unwrap();
        assert!(summary.test_path.ends_with("test_x.csv"));
        assert_eq!(summary.records[0].city, "x");
    }
}
