use airtrend_core::RunConfig;
use airtrend_ts::{split_cities, SplitPaths, SplitSummary};
use anyhow::Result;
use tracing::info;

pub fn handle(config: &RunConfig, paths: SplitPaths) -> Result<SplitSummary> {
    info!(
        cities = config.global.cities.len(),
        input = %paths.merged_input.display(),
        "splitting cities into year windows"
    );
    let summary = split_cities(config, &paths)?;
    for city in &summary.cities {
        println!(
            "{}: train {} / valid {} / test {} rows",
            city.city, city.train_rows, city.valid_rows, city.test_rows
        );
    }
    for (name, shape, path) in [
        ("train", summary.train_shape, &paths.train),
        ("valid", summary.valid_shape, &paths.valid),
        ("test", summary.test_shape, &paths.test),
    ] {
        println!(
            "merged {name}: {} rows x {} columns -> {}",
            shape.0,
            shape.1,
            path.display()
        );
    }
    Ok(summary)
}
