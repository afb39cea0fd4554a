use std::path::Path;

use airtrend_core::RunConfig;
use airtrend_eval::{run_evaluation, EvaluationSummary};
use anyhow::Result;

pub fn handle(config: &RunConfig, test: &Path) -> Result<EvaluationSummary> {
    let summary = run_evaluation(config, test)?;
    for (offset, record) in summary.records.iter().enumerate() {
        let auc = record
            .auc
            .map_or_else(|| "n/a".to_string(), |auc| format!("{auc:.4}"));
        println!(
            "[{}] {} {} two_branch={} acc={:.4} f1={:.4} auc={}",
            summary.first_row + offset,
            record.model_type,
            record.feature,
            record.is_two_branch,
            record.accuracy,
            record.f1,
            auc
        );
    }
    println!(
        "report -> {} (config copy {})",
        summary.report_path.display(),
        summary.config_copy.display()
    );
    Ok(summary)
}
