use airtrend_core::AirtrendResult;
use polars::prelude::*;
use tracing::debug;

/// Zero-row accumulator carrying the expected header.
pub fn seed_frame(columns: &[String]) -> AirtrendResult<DataFrame> {
    let series: Vec<Series> = columns
        .iter()
        .map(|name| Series::full_null(name, 0, &DataType::Utf8))
        .collect();
    Ok(DataFrame::new(series)?)
}

/// Fold one partition into a cross-city accumulator.
///
/// An accumulator without rows is replaced by a copy of `partition`.
/// Otherwise rows are stacked under the union of both column sets; cells a
/// source did not provide become null, never zero.
pub fn concat_aligned(accumulator: &DataFrame, partition: &DataFrame) -> AirtrendResult<DataFrame> {
    if accumulator.height() == 0 {
        return Ok(partition.clone());
    }

    let mut union: Vec<String> = accumulator
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for name in partition.get_column_names() {
        if !union.iter().any(|c| c == name) {
            union.push(name.to_string());
        }
    }

    let mut top = accumulator.clone();
    let mut bottom = partition.clone();
    for name in &union {
        let dtype = match (top.column(name).ok(), bottom.column(name).ok()) {
            (Some(a), Some(b)) => reconcile(a.dtype(), b.dtype()),
            (Some(a), None) => a.dtype().clone(),
            (None, Some(b)) => b.dtype().clone(),
            (None, None) => continue,
        };
        align_column(&mut top, name, &dtype)?;
        align_column(&mut bottom, name, &dtype)?;
    }

    let top = top.select(&union)?;
    let bottom = bottom.select(&union)?;
    debug!(
        rows = top.height() + bottom.height(),
        columns = union.len(),
        "concatenated partition"
    );
    Ok(top.vstack(&bottom)?)
}

/// Common dtype for a column shared by two sources.
fn reconcile(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        _ if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        _ if a.is_numeric() && b.is_numeric() => DataType::Float64,
        _ => DataType::Utf8,
    }
}

fn align_column(df: &mut DataFrame, name: &str, dtype: &DataType) -> AirtrendResult<()> {
    let aligned = match df.column(name) {
        Ok(series) if series.dtype() == dtype => return Ok(()),
        Ok(series) => series.cast(dtype)?,
        Err(_) => Series::full_null(name, df.height(), dtype),
    };
    df.with_column(aligned)?;
    Ok(())
}

/// Drop every column that is null in every row.
///
/// Runs once per split, after all cities have been folded in. A table
/// without rows keeps its header.
pub fn drop_all_missing_columns(df: &DataFrame) -> AirtrendResult<DataFrame> {
    if df.height() == 0 {
        return Ok(df.clone());
    }
    let keep: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|series| series.null_count() < series.len())
        .map(|series| series.name().to_string())
        .collect();
    let dropped = df.width() - keep.len();
    if dropped > 0 {
        debug!(dropped, "dropping all-missing columns");
    }
    Ok(df.select(&keep)?)
}
