//! # airtrend-ts: temporal partitioning
//!
//! Splits per-city time series into train/valid/test windows by calendar
//! year and merges cities into dataset-wide tables whose column set is the
//! union of every city's columns. Cells a city did not contribute are polars
//! nulls; columns that end up null everywhere are dropped once, at the end.

pub mod concat;
pub mod frame;
pub mod pipeline;
pub mod shuffle;
pub mod window;

pub use concat::{concat_aligned, drop_all_missing_columns, seed_frame};
pub use frame::{read_frame, write_frame};
pub use pipeline::{split_cities, CitySplit, SplitPaths, SplitSummary};
pub use shuffle::{partition_rng, shuffle_partition};
pub use window::{index_by_date, select_years};
