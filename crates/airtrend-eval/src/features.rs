//! Feature construction from the raw test table.
//!
//! The raw table is split once into a target label and three column groups
//! (pollution, physical, trend). A [`FeatureRecipe`] then turns the groups a
//! feature set asks for into a [`ModelInput`]: one `(samples, window, width)`
//! block per model branch.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use airtrend_core::{AirtrendError, AirtrendResult, RunConfig};
use ndarray::{Array2, Array3};
use polars::prelude::*;
use tracing::warn;

/// Which columns of the raw table play which role.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    pub target: String,
    pub pollution: Vec<String>,
    pub physical: Vec<String>,
    pub terms: Vec<String>,
    pub reserved: Vec<String>,
}

impl ColumnLayout {
    pub fn from_config(config: &RunConfig, terms: Vec<String>) -> AirtrendResult<Self> {
        let target = config.labels.columns.first().cloned().ok_or_else(|| {
            AirtrendError::Configuration("labels.columns must name the target column".into())
        })?;
        Ok(Self {
            target,
            pollution: config.feature_columns.pollution.clone(),
            physical: config.feature_columns.physical.clone(),
            terms,
            reserved: vec![
                config.global.date_column.clone(),
                config.global.year_column.clone(),
                config.global.split_label_column.clone(),
            ],
        })
    }
}

/// A dense column group; missing cells are stored as `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl NamedMatrix {
    fn from_frame(df: &DataFrame, names: Vec<String>) -> AirtrendResult<Self> {
        let mut values = Array2::zeros((df.height(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let series = df.column(name)?.cast(&DataType::Float64)?;
            for (i, cell) in series.f64()?.into_iter().enumerate() {
                values[[i, j]] = cell.unwrap_or(0.0);
            }
        }
        Ok(Self { names, values })
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Columns restricted to `names`, in that order.
    pub fn subset(&self, names: &[String]) -> AirtrendResult<Self> {
        let mut positions = Vec::with_capacity(names.len());
        let mut absent = Vec::new();
        for name in names {
            match self.names.iter().position(|n| n == name) {
                Some(pos) => positions.push(pos),
                None => absent.push(name.as_str()),
            }
        }
        if !absent.is_empty() {
            return Err(AirtrendError::SchemaMismatch(format!(
                "vocabulary terms missing from the test table: {}",
                absent.join(", ")
            )));
        }
        let mut values = Array2::zeros((self.values.nrows(), positions.len()));
        for (j, &pos) in positions.iter().enumerate() {
            values.column_mut(j).assign(&self.values.column(pos));
        }
        Ok(Self {
            names: names.to_vec(),
            values,
        })
    }

    fn concat(parts: &[&NamedMatrix], rows: usize) -> Self {
        let width = parts.iter().map(|m| m.width()).sum();
        let mut values = Array2::zeros((rows, width));
        let mut names = Vec::with_capacity(width);
        let mut offset = 0;
        for part in parts {
            for j in 0..part.width() {
                values.column_mut(offset + j).assign(&part.values.column(j));
            }
            names.extend(part.names.iter().cloned());
            offset += part.width();
        }
        Self { names, values }
    }
}

/// The raw test table split into target and feature groups.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub target: Vec<Option<f64>>,
    pub pollution: NamedMatrix,
    pub physical: NamedMatrix,
    pub trend: NamedMatrix,
}

impl FeatureTable {
    pub fn from_frame(df: &DataFrame, layout: &ColumnLayout) -> AirtrendResult<Self> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let target = df
            .column(&layout.target)
            .map_err(|_| {
                AirtrendError::SchemaMismatch(format!(
                    "test table has no target column '{}'",
                    layout.target
                ))
            })?
            .cast(&DataType::Float64)?;
        let target: Vec<Option<f64>> = target.f64()?.into_iter().collect();

        let keep_present = |group: &str, names: &[String]| -> Vec<String> {
            names
                .iter()
                .filter(|name| {
                    let found = present.contains(*name);
                    if !found {
                        warn!(column = %name, group, "configured column absent from test table");
                    }
                    found
                })
                .cloned()
                .collect()
        };
        let pollution = keep_present("pollution", &layout.pollution);
        let physical = keep_present("physical", &layout.physical);

        let terms: HashSet<&String> = layout.terms.iter().collect();
        let trend: Vec<String> = present
            .iter()
            .filter(|name| terms.contains(name))
            .filter(|name| {
                **name != layout.target
                    && !layout.reserved.contains(*name)
                    && !pollution.contains(*name)
                    && !physical.contains(*name)
            })
            .cloned()
            .collect();

        Ok(Self {
            target,
            pollution: NamedMatrix::from_frame(df, pollution)?,
            physical: NamedMatrix::from_frame(df, physical)?,
            trend: NamedMatrix::from_frame(df, trend)?,
        })
    }

    pub fn rows(&self) -> usize {
        self.target.len()
    }

    /// Rows usable as samples: the window and the lagged trend window both
    /// fit, and the target is present.
    pub fn sample_rows(&self, seq_length: usize, search_lag: usize) -> Vec<usize> {
        let first = seq_length.saturating_sub(1) + search_lag;
        (first..self.rows())
            .filter(|&t| self.target[t].is_some())
            .collect()
    }

    /// Binary class per sample; a target of 0.5 or above is positive.
    pub fn labels(&self, samples: &[usize]) -> Vec<u8> {
        samples
            .iter()
            .map(|&t| u8::from(self.target[t].unwrap_or(0.0) >= 0.5))
            .collect()
    }
}

/// Column groups a feature set draws from, e.g. `pol_phys_trend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureGroups {
    pub pollution: bool,
    pub physical: bool,
    pub trend: bool,
}

impl FromStr for FeatureGroups {
    type Err = AirtrendError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut groups = FeatureGroups::default();
        for token in text.split(['_', '+']).filter(|t| !t.is_empty()) {
            match token.to_ascii_lowercase().as_str() {
                "pol" | "pollution" => groups.pollution = true,
                "phys" | "physical" => groups.physical = true,
                "trend" | "search" => groups.trend = true,
                other => {
                    return Err(AirtrendError::Configuration(format!(
                        "unknown feature group '{other}' in '{text}'; use pol, phys or trend"
                    )))
                }
            }
        }
        if groups == FeatureGroups::default() {
            return Err(AirtrendError::Configuration(format!(
                "feature '{text}' selects no column group"
            )));
        }
        Ok(groups)
    }
}

/// Model-ready input: one `(samples, window, width)` block per branch.
#[derive(Debug, Clone)]
pub struct ModelInput {
    pub branches: Vec<Array3<f64>>,
}

impl ModelInput {
    pub fn samples(&self) -> usize {
        self.branches.first().map_or(0, |b| b.dim().0)
    }

    pub fn dimensionality(&self) -> Dimensionality {
        Dimensionality {
            window: self.branches.first().map_or(0, |b| b.dim().1),
            widths: self.branches.iter().map(|b| b.dim().2).collect(),
        }
    }
}

/// Window length and per-branch widths a model must be built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensionality {
    pub window: usize,
    pub widths: Vec<usize>,
}

impl Dimensionality {
    pub fn total_width(&self) -> usize {
        self.widths.iter().sum()
    }
}

impl std::fmt::Display for Dimensionality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "window {} x widths {:?}", self.window, self.widths)
    }
}

/// How a feature set turns table rows into model input.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureRecipe {
    /// One row per sample; trend columns read `search_lag` rows earlier.
    Tabular { search_lag: usize },
    /// Trailing `seq_length` rows per sample.
    Sequence { seq_length: usize, search_lag: usize },
    /// As `Sequence`, with trend columns limited to a learned vocabulary.
    VocabularySubset {
        seq_length: usize,
        search_lag: usize,
        vocabulary: Vec<String>,
    },
}

impl FeatureRecipe {
    pub fn window(&self) -> usize {
        match self {
            FeatureRecipe::Tabular { .. } => 1,
            FeatureRecipe::Sequence { seq_length, .. }
            | FeatureRecipe::VocabularySubset { seq_length, .. } => *seq_length,
        }
    }

    fn search_lag(&self) -> usize {
        match self {
            FeatureRecipe::Tabular { search_lag }
            | FeatureRecipe::Sequence { search_lag, .. }
            | FeatureRecipe::VocabularySubset { search_lag, .. } => *search_lag,
        }
    }

    /// Build model input for `samples` (see [`FeatureTable::sample_rows`]).
    ///
    /// Single-branch input concatenates static and trend columns; two-branch
    /// input keeps static columns in branch 0 and trend columns in branch 1.
    pub fn build(
        &self,
        table: &FeatureTable,
        samples: &[usize],
        groups: FeatureGroups,
        two_branch: bool,
    ) -> AirtrendResult<(ModelInput, Dimensionality)> {
        let window = self.window();
        let lag = self.search_lag();
        if let Some(&first) = samples.first() {
            if first + 1 < window + lag {
                return Err(AirtrendError::Configuration(format!(
                    "sample row {first} precedes a {window}-row window lagged by {lag}"
                )));
            }
        }

        let rows = table.rows();
        let mut statics: Vec<&NamedMatrix> = Vec::new();
        if groups.pollution {
            statics.push(&table.pollution);
        }
        if groups.physical {
            statics.push(&table.physical);
        }
        let static_block = NamedMatrix::concat(&statics, rows);
        let trend_block = match (groups.trend, self) {
            (false, _) => NamedMatrix::concat(&[], rows),
            (true, FeatureRecipe::VocabularySubset { vocabulary, .. }) => {
                table.trend.subset(vocabulary)?
            }
            (true, _) => table.trend.clone(),
        };

        let branches = if two_branch {
            if static_block.width() == 0 || trend_block.width() == 0 {
                return Err(AirtrendError::Configuration(
                    "two-branch models need both static and trend columns".into(),
                ));
            }
            vec![
                window_block(&[(&static_block, 0)], samples, window),
                window_block(&[(&trend_block, lag)], samples, window),
            ]
        } else {
            vec![window_block(
                &[(&static_block, 0), (&trend_block, lag)],
                samples,
                window,
            )]
        };

        let input = ModelInput { branches };
        let dims = input.dimensionality();
        if dims.total_width() == 0 {
            return Err(AirtrendError::SchemaMismatch(
                "feature set produced no columns from the test table".into(),
            ));
        }
        Ok((input, dims))
    }
}

/// Stack lagged windows of several groups side by side.
fn window_block(parts: &[(&NamedMatrix, usize)], samples: &[usize], window: usize) -> Array3<f64> {
    let width: usize = parts.iter().map(|(m, _)| m.width()).sum();
    let mut block = Array3::zeros((samples.len(), window, width));
    for (s, &t) in samples.iter().enumerate() {
        let mut offset = 0;
        for (matrix, lag) in parts {
            let end = t - lag;
            for w in 0..window {
                let row = end + 1 + w - window;
                for j in 0..matrix.width() {
                    block[[s, w, offset + j]] = matrix.values[[row, j]];
                }
            }
            offset += matrix.width();
        }
    }
    block
}

/// Read the common-vocabulary side artifact (a JSON array of terms).
pub fn load_vocabulary(path: &Path) -> AirtrendResult<Vec<String>> {
    let file = File::open(path).map_err(|_| AirtrendError::missing("vocabulary", path))?;
    let vocabulary: Vec<String> = serde_json::from_reader(file)?;
    if vocabulary.is_empty() {
        return Err(AirtrendError::SchemaMismatch(format!(
            "vocabulary '{}' is empty",
            path.display()
        )));
    }
    Ok(vocabulary)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    pub(crate) fn layout() -> ColumnLayout {
        ColumnLayout {
            target: "pol_label".into(),
            pollution: vec!["pm25".into()],
            physical: vec!["temp".into(), "wind".into()],
            terms: vec!["mask".into(), "smog".into(), "cough".into()],
            reserved: vec!["DATE".into(), "year".into(), "split_label".into()],
        }
    }

    pub(crate) fn frame() -> DataFrame {
        df![
            "DATE" => &["2021-01-01", "2021-01-02", "2021-01-03", "2021-01-04", "2021-01-05"],
            "year" => &[2021i32, 2021, 2021, 2021, 2021],
            "pm25" => &[10.0f64, 20.0, 30.0, 40.0, 50.0],
            "temp" => &[1.0f64, 2.0, 3.0, 4.0, 5.0],
            "mask" => &[Some(0.1f64), Some(0.2), None, Some(0.4), Some(0.5)],
            "smog" => &[5.0f64, 4.0, 3.0, 2.0, 1.0],
            "pol_label" => &[Some(0i64), Some(1), Some(0), None, Some(1)],
        ]
        .unwrap()
    }

    #[test]
    fn table_splits_groups_and_skips_absent_columns() {
        let table = FeatureTable::from_frame(&frame(), &layout()).unwrap();
        assert_eq!(table.pollution.names, vec!["pm25"]);
        assert_eq!(table.physical.names, vec!["temp"]);
        assert_eq!(table.trend.names, vec!["mask", "smog"]);
        assert_eq!(table.trend.values[[2, 0]], 0.0);
    }

    #[test]
    fn samples_skip_short_windows_and_missing_targets() {
        let table = FeatureTable::from_frame(&frame(), &layout()).unwrap();
        assert_eq!(table.sample_rows(1, 0), vec![0, 1, 2, 4]);
        assert_eq!(table.sample_rows(2, 1), vec![2, 4]);
        assert_eq!(table.labels(&[2, 4]), vec![0, 1]);
    }

    #[test]
    fn feature_groups_parse() {
        let groups: FeatureGroups = "pol_phys+trend".parse().unwrap();
        assert!(groups.pollution && groups.physical && groups.trend);
        assert!("pol_weather".parse::<FeatureGroups>().is_err());
        assert!("".parse::<FeatureGroups>().is_err());
    }

    #[test]
    fn tabular_reads_lagged_trend() {
        let table = FeatureTable::from_frame(&frame(), &layout()).unwrap();
        let samples = table.sample_rows(2, 1);
        let recipe = FeatureRecipe::Tabular { search_lag: 1 };
        let groups = "pol_trend".parse().unwrap();
        let (input, dims) = recipe.build(&table, &samples, groups, false).unwrap();
        assert_eq!(dims, Dimensionality { window: 1, widths: vec![3] });
        let block = &input.branches[0];
        // sample row 2: pm25 from row 2, trend from row 1
        assert_eq!(block[[0, 0, 0]], 30.0);
        assert_eq!(block[[0, 0, 1]], 0.2);
        assert_eq!(block[[0, 0, 2]], 4.0);
    }

    #[test]
    fn sequence_two_branch_windows() {
        let table = FeatureTable::from_frame(&frame(), &layout()).unwrap();
        let samples = table.sample_rows(2, 1);
        let recipe = FeatureRecipe::Sequence {
            seq_length: 2,
            search_lag: 1,
        };
        let groups = "pol_phys_trend".parse().unwrap();
        let (input, dims) = recipe.build(&table, &samples, groups, true).unwrap();
        assert_eq!(dims.widths, vec![2, 2]);
        assert_eq!(dims.window, 2);
        assert_eq!(input.samples(), 2);
        let statics = &input.branches[0];
        assert_eq!(statics[[1, 0, 0]], 40.0);
        assert_eq!(statics[[1, 1, 0]], 50.0);
        let trend = &input.branches[1];
        // sample row 4 with lag 1: trend rows 2 and 3
        assert_eq!(trend[[1, 0, 1]], 3.0);
        assert_eq!(trend[[1, 1, 1]], 2.0);
    }

    #[test]
    fn two_branch_without_trend_is_rejected() {
        let table = FeatureTable::from_frame(&frame(), &layout()).unwrap();
        let samples = table.sample_rows(1, 0);
        let recipe = FeatureRecipe::Tabular { search_lag: 0 };
        let err = recipe
            .build(&table, &samples, "pol".parse().unwrap(), true)
            .unwrap_err();
        assert!(matches!(err, AirtrendError::Configuration(_)));
    }

    #[test]
    fn vocabulary_subset_orders_and_validates() {
        let table = FeatureTable::from_frame(&frame(), &layout()).unwrap();
        let samples = table.sample_rows(1, 0);
        let recipe = FeatureRecipe::VocabularySubset {
            seq_length: 1,
            search_lag: 0,
            vocabulary: vec!["smog".into()],
        };
        let (input, dims) = recipe
            .build(&table, &samples, "trend".parse().unwrap(), false)
            .unwrap();
        assert_eq!(dims.widths, vec![1]);
        assert_eq!(input.branches[0][[0, 0, 0]], 5.0);

        let missing = FeatureRecipe::VocabularySubset {
            seq_length: 1,
            search_lag: 0,
            vocabulary: vec!["cough".into()],
        };
        let err = missing
            .build(&table, &samples, "trend".parse().unwrap(), false)
            .unwrap_err();
        assert!(matches!(err, AirtrendError::SchemaMismatch(_)));
    }

    #[test]
    fn vocabulary_file_must_exist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        assert!(matches!(
            load_vocabulary(&path).unwrap_err(),
            AirtrendError::MissingArtifact { .. }
        ));
        fs::write(&path, r#"["mask", "smog"]"#).unwrap();
        assert_eq!(load_vocabulary(&path).unwrap(), vec!["mask", "smog"]);
    }
}
