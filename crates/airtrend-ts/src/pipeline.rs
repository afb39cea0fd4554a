use std::path::PathBuf;

use airtrend_core::{city_output_path, load_term_list, AirtrendResult, RunConfig};
use polars::prelude::DataFrame;
use tracing::{debug, info};

use crate::concat::{concat_aligned, drop_all_missing_columns, seed_frame};
use crate::frame::{read_frame, write_frame};
use crate::shuffle::{partition_rng, shuffle_partition};
use crate::window::{index_by_date, select_years};

/// Input template and output locations for one split run.
///
/// Each path doubles as a per-city template (see [`city_output_path`]).
#[derive(Debug, Clone)]
pub struct SplitPaths {
    pub merged_input: PathBuf,
    pub train: PathBuf,
    pub valid: PathBuf,
    pub test: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitySplit {
    pub city: String,
    pub train_rows: usize,
    pub valid_rows: usize,
    pub test_rows: usize,
}

/// Row counts per city and the shape of the merged tables.
#[derive(Debug, Clone)]
pub struct SplitSummary {
    pub cities: Vec<CitySplit>,
    pub train_shape: (usize, usize),
    pub valid_shape: (usize, usize),
    pub test_shape: (usize, usize),
    pub outputs: Vec<PathBuf>,
}

struct Accumulators {
    train: DataFrame,
    valid: DataFrame,
    test: DataFrame,
}

/// Split every configured city into year windows and merge them.
///
/// **Algorithm:**
/// 1. Seed the three accumulators with labels, search terms and reserved columns.
/// 2. Per city: load, index by date, select train/valid/test years.
/// 3. Persist the per-city partitions, shuffle train, fold all three in.
/// 4. Drop all-missing columns and persist the merged tables.
///
/// A missing city input aborts the run; per-city files already written stay.
pub fn split_cities(config: &RunConfig, paths: &SplitPaths) -> AirtrendResult<SplitSummary> {
    let global = &config.global;
    let terms = load_term_list(&config.search_trend.term_list_path)?;
    let seed = seed_frame(&config.seed_columns(&terms))?;
    let mut acc = Accumulators {
        train: seed.clone(),
        valid: seed.clone(),
        test: seed,
    };
    let mut rng = partition_rng(global.shuffle_seed);
    let mut cities = Vec::with_capacity(global.cities.len());

    for city in &global.cities {
        let input = city_output_path(&paths.merged_input, city);
        info!(city = %city, input = %input.display(), "splitting city");
        let raw = read_frame(&input)?;
        let indexed = index_by_date(&raw, &global.date_column, &global.year_column)?;

        let mut train = select_years(&indexed, &global.year_column, &global.train_years)?;
        let mut valid = select_years(&indexed, &global.year_column, &global.valid_years)?;
        let mut test = select_years(&indexed, &global.year_column, &global.test_years)?;
        write_frame(&mut train, &city_output_path(&paths.train, city))?;
        write_frame(&mut valid, &city_output_path(&paths.valid, city))?;
        write_frame(&mut test, &city_output_path(&paths.test, city))?;

        let train_shuffled = shuffle_partition(&train, &mut rng)?;
        acc.train = concat_aligned(&acc.train, &train_shuffled)?;
        acc.valid = concat_aligned(&acc.valid, &valid)?;
        acc.test = concat_aligned(&acc.test, &test)?;

        debug!(
            city = %city,
            train = train.height(),
            valid = valid.height(),
            test = test.height(),
            "city partitions folded"
        );
        cities.push(CitySplit {
            city: city.clone(),
            train_rows: train.height(),
            valid_rows: valid.height(),
            test_rows: test.height(),
        });
    }

    let mut train = drop_all_missing_columns(&acc.train)?;
    let mut valid = drop_all_missing_columns(&acc.valid)?;
    let mut test = drop_all_missing_columns(&acc.test)?;
    write_frame(&mut train, &paths.train)?;
    write_frame(&mut valid, &paths.valid)?;
    write_frame(&mut test, &paths.test)?;
    info!(
        train = train.height(),
        valid = valid.height(),
        test = test.height(),
        "wrote merged partitions"
    );

    Ok(SplitSummary {
        cities,
        train_shape: train.shape(),
        valid_shape: valid.shape(),
        test_shape: test.shape(),
        outputs: vec![paths.train.clone(), paths.valid.clone(), paths.test.clone()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use airtrend_core::AirtrendError;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_config(dir: &Path, cities: &str, seed: &str) -> RunConfig {
        let terms = dir.join("terms.csv");
        fs::write(&terms, "Mask\nsmog\n").unwrap();
        let text = format!(
            r#"
[global]
cities = [{cities}]
train_years = [2018, 2019]
valid_years = [2020]
test_years = [2021]
{seed}

[search_trend]
term_list_path = "{}"

[labels]
columns = ["pol_label"]
"#,
            terms.display()
        );
        RunConfig::from_toml_str(&text).unwrap()
    }

    fn paths(dir: &Path) -> SplitPaths {
        SplitPaths {
            merged_input: dir.join("raw/merged.csv"),
            train: dir.join("out/train.csv"),
            valid: dir.join("out/valid.csv"),
            test: dir.join("out/test.csv"),
        }
    }

    fn write_inputs(dir: &Path) {
        fs::create_dir_all(dir.join("raw")).unwrap();
        fs::write(
            dir.join("raw/merged_x.csv"),
            "DATE,pm25,mask,pol_label\n\
             2021-01-01,5,0.5,1\n\
             2018-01-01,1,0.1,0\n\
             2019-01-01,2,0.2,0\n\
             2020-01-01,3,0.3,1\n\
             2018-06-01,1.5,,0\n",
        )
        .unwrap();
        fs::write(
            dir.join("raw/merged_y.csv"),
            "DATE,pm25,smog,pol_label\n\
             2018-02-01,7,0.9,1\n\
             2021-02-01,8,0.8,1\n",
        )
        .unwrap();
    }

    #[test]
    fn splits_and_merges_cities() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = write_config(dir.path(), "\"x\", \"y\"", "shuffle_seed = 1");
        let summary = split_cities(&config, &paths(dir.path())).unwrap();

        assert_eq!(
            summary.cities[0],
            CitySplit {
                city: "x".into(),
                train_rows: 3,
                valid_rows: 1,
                test_rows: 1
            }
        );
        assert_eq!(summary.train_shape.0, 4);
        assert_eq!(summary.test_shape.0, 2);
        assert!(dir.path().join("out/train_x.csv").exists());
        assert!(dir.path().join("out/test_y.csv").exists());

        let test = read_frame(&dir.path().join("out/test.csv")).unwrap();
        let names = test.get_column_names();
        assert!(names.contains(&"mask"));
        assert!(names.contains(&"smog"));
        assert_eq!(test.column("smog").unwrap().null_count(), 1);
    }

    #[test]
    fn all_missing_columns_are_dropped_per_split() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = write_config(dir.path(), "\"x\", \"y\"", "shuffle_seed = 1");
        split_cities(&config, &paths(dir.path())).unwrap();
        // city y has no valid rows, so smog never gets a value there
        let valid = read_frame(&dir.path().join("out/valid.csv")).unwrap();
        assert!(!valid.get_column_names().contains(&"smog"));
        assert!(valid.get_column_names().contains(&"mask"));
    }

    #[test]
    fn seeded_runs_are_byte_identical() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = write_config(dir.path(), "\"x\", \"y\"", "shuffle_seed = 42");
        let first = paths(dir.path());
        split_cities(&config, &first).unwrap();
        let a = fs::read(&first.train).unwrap();
        split_cities(&config, &first).unwrap();
        let b = fs::read(&first.train).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_city_input_is_fatal() {
        let dir = tempdir().unwrap();
        write_inputs(dir.path());
        let config = write_config(dir.path(), "\"x\", \"z\"", "");
        let err = split_cities(&config, &paths(dir.path())).unwrap_err();
        assert!(matches!(err, AirtrendError::MissingArtifact { .. }));
        assert!(dir.path().join("out/train_x.csv").exists());
        assert!(!dir.path().join("out/train.csv").exists());
    }
}
