use std::process;
use std::time::Instant;

use airtrend_cli::cli::{Cli, Commands};
use airtrend_core::AirtrendError;
use airtrend_ts::SplitPaths;
use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::{load_run_config, predict, record_run, split};

/// Exit status for a report that already exists without append mode.
const EXIT_PREEXISTING_OUTPUT: i32 = 2;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    if let Err(err) = run(&cli.command) {
        eprintln!("error: {err:#}");
        process::exit(exit_code(&err));
    }
}

fn run(command: &Commands) -> Result<()> {
    match command {
        Commands::Split {
            config,
            merged,
            train,
            valid,
            test,
        } => {
            let run_config = load_run_config(config)?;
            let start = Instant::now();
            let paths = SplitPaths {
                merged_input: merged.clone(),
                train: train.clone(),
                valid: valid.clone(),
                test: test.clone(),
            };
            let result = split::handle(&run_config, paths);
            let outputs = result
                .as_ref()
                .map(|summary| summary.outputs.clone())
                .unwrap_or_default();
            record_run(
                train,
                "split",
                &run_config,
                &[
                    ("config", config.display().to_string()),
                    ("merged", merged.display().to_string()),
                    ("train", train.display().to_string()),
                    ("valid", valid.display().to_string()),
                    ("test", test.display().to_string()),
                ],
                &outputs,
                start,
                &result,
            );
            let summary = result?;
            info!(cities = summary.cities.len(), "split finished");
            Ok(())
        }
        Commands::Predict { config, test } => {
            let run_config = load_run_config(config)?;
            let start = Instant::now();
            let result = predict::handle(&run_config, test);
            let outputs = result
                .as_ref()
                .map(|summary| vec![summary.report_path.clone(), summary.config_copy.clone()])
                .unwrap_or_default();
            record_run(
                &run_config.predict_model.report_path,
                "predict",
                &run_config,
                &[
                    ("config", config.display().to_string()),
                    ("test", test.display().to_string()),
                ],
                &outputs,
                start,
                &result,
            );
            let summary = result?;
            info!(rows = summary.records.len(), "predict finished");
            Ok(())
        }
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    let preexisting = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<AirtrendError>(),
            Some(AirtrendError::PreexistingOutput(_))
        )
    });
    if preexisting {
        EXIT_PREEXISTING_OUTPUT
    } else {
        1
    }
}
