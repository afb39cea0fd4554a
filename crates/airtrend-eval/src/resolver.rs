use airtrend_core::{AirtrendError, AirtrendResult, FeatureConfiguration, RunConfig};

use crate::features::{load_vocabulary, FeatureGroups, FeatureRecipe};
use crate::model::ModelKind;

/// A feature-set entry with its model kind and column groups looked up.
#[derive(Debug, Clone)]
pub struct ResolvedFeature {
    pub id: String,
    pub configuration: FeatureConfiguration,
    pub kind: ModelKind,
    pub groups: FeatureGroups,
}

/// Look up feature set `feature_id` in the run configuration.
pub fn resolve(config: &RunConfig, feature_id: &str) -> AirtrendResult<ResolvedFeature> {
    let configuration = config.features.get(feature_id).cloned().ok_or_else(|| {
        AirtrendError::Configuration(format!("unknown feature set '{feature_id}'"))
    })?;
    let kind = ModelKind::from_tag(&configuration.model_type)?;
    let groups = configuration.feature.parse()?;
    Ok(ResolvedFeature {
        id: feature_id.to_string(),
        configuration,
        kind,
        groups,
    })
}

impl ResolvedFeature {
    /// The recipe matching this entry's model kind.
    ///
    /// The lexical-embedding kind loads its vocabulary artifact here.
    pub fn recipe(&self, config: &RunConfig) -> AirtrendResult<FeatureRecipe> {
        let seq_length = config.train_model.seq_length;
        let search_lag = config.train_model.search_lag;
        Ok(match self.kind {
            ModelKind::Logistic => FeatureRecipe::Tabular { search_lag },
            ModelKind::Recurrent => FeatureRecipe::Sequence {
                seq_length,
                search_lag,
            },
            ModelKind::LexicalEmbedding => {
                let path = self
                    .configuration
                    .current_word_path
                    .as_ref()
                    .ok_or_else(|| {
                        AirtrendError::Configuration(format!(
                            "feature set '{}' needs current_word_path",
                            self.id
                        ))
                    })?;
                FeatureRecipe::VocabularySubset {
                    seq_length,
                    search_lag,
                    vocabulary: load_vocabulary(path)?,
                }
            }
        })
    }
}
