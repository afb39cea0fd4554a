use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub run_id: String,
    pub command: String,
    pub version: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    pub outputs: Vec<String>,
    pub params: Vec<Param>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

/// What a finished command reports about itself.
pub struct RunOutcome<'a> {
    pub command: &'a str,
    pub commit_id: Option<&'a str>,
    pub params: &'a [(&'a str, String)],
    pub outputs: &'a [PathBuf],
    pub success: bool,
    pub duration_ms: u128,
}

/// Write `run-<uuid>.json` into `dir` and return its path.
pub fn record_manifest(dir: &Path, outcome: &RunOutcome<'_>) -> Result<PathBuf> {
    let run_id = Uuid::new_v4().to_string();
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let manifest = ManifestEntry {
        run_id: run_id.clone(),
        command: outcome.command.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        commit_id: outcome.commit_id.map(String::from),
        outputs: outcome
            .outputs
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        params: outcome
            .params
            .iter()
            .map(|(k, v)| Param {
                name: k.to_string(),
                value: v.clone(),
            })
            .collect(),
        status: if outcome.success { "success" } else { "failure" }.to_string(),
        duration_ms: Some(outcome.duration_ms),
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    let path = dir.join(format!("run-{run_id}.json"));
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<ManifestEntry> {
    let json = fs::read_to_string(path)?;
    let manifest = serde_json::from_str(&json)?;
    Ok(manifest)
}

/// Directory a manifest for `output` goes into.
pub fn manifest_dir(output: &Path) -> PathBuf {
    output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_round_trips() {
        let dir = tempdir().unwrap();
        let outputs = vec![dir.path().join("report.csv")];
        let params = [("config", "run.toml".to_string())];
        let path = record_manifest(
            dir.path(),
            &RunOutcome {
                command: "predict",
                commit_id: Some("abc123"),
                params: &params,
                outputs: &outputs,
                success: true,
                duration_ms: 12,
            },
        )
        .unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("run-") && name.ends_with(".json"));

        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.command, "predict");
        assert_eq!(manifest.status, "success");
        assert_eq!(manifest.commit_id.as_deref(), Some("abc123"));
        assert_eq!(manifest.params[0].value, "run.toml");
        assert_eq!(manifest.duration_ms, Some(12));
    }

    #[test]
    fn bare_file_name_lands_in_current_dir() {
        assert_eq!(manifest_dir(Path::new("report.csv")), PathBuf::from("."));
        assert_eq!(
            manifest_dir(Path::new("out/report.csv")),
            PathBuf::from("out")
        );
    }
}
