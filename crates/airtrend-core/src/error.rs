//! Unified error type for the airtrend crates
//!
//! Every failure in the partition engine and the evaluation harness is fatal
//! for the run. The variants below carry the taxonomy the CLI uses to pick an
//! exit status, so library code should prefer the specific variant over
//! [`AirtrendError::Other`].

use thiserror::Error;

/// Unified error type for all airtrend operations.
#[derive(Error, Debug)]
pub enum AirtrendError {
    /// Unknown feature id, malformed year sets, missing required keys
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Absent per-city input, vocabulary file or model weights
    #[error("Missing artifact '{path}': {what}")]
    MissingArtifact { what: String, path: String },

    /// Feature width or table layout disagrees with what a consumer expects
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Report already present and append mode is off
    #[error("Report file '{0}' already exists; change the report path or enable append mode")]
    PreexistingOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Frame error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using AirtrendError.
pub type AirtrendResult<T> = Result<T, AirtrendError>;

impl AirtrendError {
    pub fn missing(what: impl Into<String>, path: impl AsRef<std::path::Path>) -> Self {
        AirtrendError::MissingArtifact {
            what: what.into(),
            path: path.as_ref().display().to_string(),
        }
    }

    /// Errors the user can fix by editing the configuration or the report path.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AirtrendError::Configuration(_) | AirtrendError::PreexistingOutput(_)
        )
    }
}

impl From<serde_json::Error> for AirtrendError {
    fn from(err: serde_json::Error) -> Self {
        AirtrendError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for AirtrendError {
    fn from(err: toml::de::Error) -> Self {
        AirtrendError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for AirtrendError {
    fn from(err: toml::ser::Error) -> Self {
        AirtrendError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_names_path() {
        let err = AirtrendError::missing("vocabulary", "models/vocab.json");
        let text = err.to_string();
        assert!(text.contains("models/vocab.json"));
        assert!(text.contains("vocabulary"));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AirtrendError = io_err.into();
        assert!(matches!(err, AirtrendError::Io(_)));
    }

    #[test]
    fn preexisting_output_is_user_facing() {
        assert!(AirtrendError::PreexistingOutput("r.csv".into()).is_user_facing());
        assert!(!AirtrendError::SchemaMismatch("width".into()).is_user_facing());
    }
}
