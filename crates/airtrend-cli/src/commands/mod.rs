pub mod predict;
pub mod split;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use airtrend_core::{load_config, RunConfig};
use anyhow::{Context, Result};
use tracing::{debug, warn};

use airtrend_cli::manifest::{manifest_dir, record_manifest, RunOutcome};

/// Load the run configuration and stamp the current commit into it.
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let config = load_config(path)
        .with_context(|| format!("loading configuration {}", path.display()))?;
    Ok(config.with_commit_id(current_commit()))
}

/// `git rev-parse HEAD`, if the working directory is a repository.
fn current_commit() -> Option<String> {
    let output = Command::new("git").args(["rev-parse", "HEAD"]).output().ok()?;
    if !output.status.success() {
        debug!("no git commit id available");
        return None;
    }
    let id = String::from_utf8(output.stdout).ok()?;
    Some(id.trim().to_string())
}

/// Record a run manifest next to `anchor`. Failures are logged, not raised.
pub fn record_run<T>(
    anchor: &Path,
    command: &str,
    config: &RunConfig,
    params: &[(&str, String)],
    outputs: &[PathBuf],
    start: Instant,
    result: &Result<T>,
) {
    let commit_id = config
        .provenance
        .as_ref()
        .and_then(|p| p.commit_id.as_deref());
    let outcome = RunOutcome {
        command,
        commit_id,
        params,
        outputs,
        success: result.is_ok(),
        duration_ms: start.elapsed().as_millis(),
    };
    match record_manifest(&manifest_dir(anchor), &outcome) {
        Ok(path) => debug!(manifest = %path.display(), "recorded run manifest"),
        Err(err) => warn!("failed to record run manifest: {err:#}"),
    }
}
