use std::collections::BTreeSet;

use airtrend_core::{AirtrendError, AirtrendResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::datatypes::IdxSize;
use polars::prelude::*;

/// Sort a city table by its date column and (re)derive the year column.
///
/// **Algorithm:**
/// 1. Parse every date cell as `%Y-%m-%d` or `%Y-%m-%d %H:%M:%S`.
/// 2. Stable-sort rows by date.
/// 3. Reject duplicate dates: a city holds exactly one record per date.
/// 4. Overwrite `year_column` with the calendar year of each date.
pub fn index_by_date(
    df: &DataFrame,
    date_column: &str,
    year_column: &str,
) -> AirtrendResult<DataFrame> {
    let dates = df
        .column(date_column)
        .map_err(|_| {
            AirtrendError::SchemaMismatch(format!("table has no '{date_column}' column"))
        })?
        .cast(&DataType::Utf8)?;
    let dates = dates.utf8()?;

    let mut parsed = Vec::with_capacity(df.height());
    for (row, cell) in dates.into_iter().enumerate() {
        let cell = cell.ok_or_else(|| {
            AirtrendError::SchemaMismatch(format!("row {row} has an empty '{date_column}'"))
        })?;
        parsed.push(parse_date(cell).ok_or_else(|| {
            AirtrendError::SchemaMismatch(format!("row {row}: cannot parse date '{cell}'"))
        })?);
    }

    let mut order: Vec<usize> = (0..parsed.len()).collect();
    order.sort_by_key(|&idx| parsed[idx]);
    if let Some(pair) = order.windows(2).find(|w| parsed[w[0]] == parsed[w[1]]) {
        return Err(AirtrendError::SchemaMismatch(format!(
            "duplicate date {} in '{date_column}'",
            parsed[pair[0]]
        )));
    }

    let idx: Vec<IdxSize> = order.iter().map(|&i| i as IdxSize).collect();
    let idx_ca = IdxCa::new("row_idx", idx.as_slice());
    let mut sorted = df.take(&idx_ca)?;
    let years: Vec<i32> = order.iter().map(|&i| parsed[i].year()).collect();
    sorted.with_column(Series::new(year_column, years))?;
    Ok(sorted)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Rows whose year is a member of `years`, in their original order.
///
/// An empty year set yields an empty table with the same columns.
pub fn select_years(
    df: &DataFrame,
    year_column: &str,
    years: &BTreeSet<i32>,
) -> AirtrendResult<DataFrame> {
    let year_series = df
        .column(year_column)
        .map_err(|_| {
            AirtrendError::SchemaMismatch(format!("table has no '{year_column}' column"))
        })?
        .cast(&DataType::Int32)?;
    let flags: Vec<bool> = year_series
        .i32()?
        .into_iter()
        .map(|year| year.map_or(false, |y| years.contains(&y)))
        .collect();
    let mask = BooleanChunked::new("mask", flags.as_slice());
    Ok(df.filter(&mask)?)
}
