use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "airtrend", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split per-city series into year windows and merge them across cities
    Split {
        /// Run configuration (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Per-city input template, e.g. data/merged.csv -> data/merged_<city>.csv
        #[arg(value_hint = ValueHint::FilePath)]
        merged: PathBuf,
        /// Merged train output (also the per-city train template)
        #[arg(value_hint = ValueHint::FilePath)]
        train: PathBuf,
        /// Merged validation output
        #[arg(value_hint = ValueHint::FilePath)]
        valid: PathBuf,
        /// Merged test output
        #[arg(value_hint = ValueHint::FilePath)]
        test: PathBuf,
    },
    /// Score every configured feature set against a test table
    Predict {
        /// Run configuration (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
        /// Test table; the city is appended in city mode
        #[arg(value_hint = ValueHint::FilePath)]
        test: PathBuf,
    },
}
