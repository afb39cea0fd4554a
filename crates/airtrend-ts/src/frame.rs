use std::fs::{self, File};
use std::path::Path;

use airtrend_core::{AirtrendError, AirtrendResult};
use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::{ParquetReader, ParquetWriter};

/// Read a CSV (or, with the `parquet` feature, Parquet) table.
///
/// A missing file is reported as [`AirtrendError::MissingArtifact`].
pub fn read_frame(path: &Path) -> AirtrendResult<DataFrame> {
    if !path.exists() {
        return Err(AirtrendError::missing("input table", path));
    }
    let mut file = File::open(path)?;
    match extension(path).as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => Ok(ParquetReader::new(&mut file).finish()?),
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(AirtrendError::Configuration(
            "parquet support is disabled; rebuild with the 'parquet' feature".into(),
        )),
        "csv" => Ok(CsvReader::new(&mut file)
            .has_header(true)
            .infer_schema(None)
            .finish()?),
        other => Err(AirtrendError::Configuration(format!(
            "unsupported file extension '{other}' for {}; use .csv or .parquet",
            path.display()
        ))),
    }
}

/// Write a table, creating the parent directory on demand.
pub fn write_frame(df: &mut DataFrame, path: &Path) -> AirtrendResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path)?;
    match extension(path).as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => {
            ParquetWriter::new(&mut file).finish(df)?;
        }
        #[cfg(not(feature = "parquet"))]
        "parquet" => {
            return Err(AirtrendError::Configuration(
                "parquet support is disabled; rebuild with the 'parquet' feature".into(),
            ))
        }
        "csv" => CsvWriter::new(&mut file).finish(df)?,
        other => {
            return Err(AirtrendError::Configuration(format!(
                "unsupported output extension '{other}' for {}; use .csv or .parquet",
                path.display()
            )))
        }
    }
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default()
}
