//! Trainer: fits the forest on a training set and persists the artifact

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use tracing::info;

use super::{ForestConfig, RandomForestRegressor};
use crate::data::{DataLoader, TrainingSet};
use crate::error::{HousingError, Result};
use crate::model::{ModelArtifact, ModelMetadata, TrainedModel, TrainingMetrics};
use crate::schema::{FeatureSchema, TARGET_COLUMN};

/// Configuration for a training run
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Forest hyperparameters
    pub forest: ForestConfig,
    /// Target column in the dataset
    pub target_column: String,
    /// Name recorded in the model metadata
    pub model_name: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            target_column: TARGET_COLUMN.to_string(),
            model_name: "miami-housing-random-forest".to_string(),
        }
    }
}

impl TrainingConfig {
    pub fn new(forest: ForestConfig) -> Self {
        Self {
            forest,
            ..Default::default()
        }
    }

    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }
}

/// Fits random forest models on housing data
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit a model on every row of `set`; no hold-out split is made
    pub fn train(&self, set: &TrainingSet) -> Result<TrainedModel> {
        let start = Instant::now();
        info!(
            samples = set.n_samples(),
            features = set.n_features(),
            n_estimators = self.config.forest.n_estimators,
            random_state = ?self.config.forest.random_state,
            "Training random forest"
        );

        let mut forest = RandomForestRegressor::new(self.config.forest.clone());
        forest.fit(set.x(), set.y())?;
        let seed = forest.seed().ok_or(HousingError::ModelNotFitted)?;
        let training_time_secs = start.elapsed().as_secs_f64();

        let in_sample = forest.predict(set.x())?;
        let metrics = TrainingMetrics::from_predictions(set.y(), &in_sample, training_time_secs);

        let schema = set.schema().clone();
        let metadata = ModelMetadata {
            name: self.config.model_name.clone(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            schema_fingerprint: schema.fingerprint(),
            feature_names: schema.names(),
            target_name: self.config.target_column.clone(),
            n_samples: set.n_samples(),
            forest: self.config.forest.clone(),
            seed,
            feature_summaries: set.feature_summaries(),
            metrics,
        };

        info!(
            seed,
            r2 = metadata.metrics.r2,
            rmse = metadata.metrics.rmse,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Training complete"
        );

        TrainedModel::new(metadata, schema, forest)
    }

    /// Train and write the artifact to `path`, replacing any prior artifact
    pub fn train_and_save(&self, set: &TrainingSet, path: impl AsRef<Path>) -> Result<TrainedModel> {
        let model = self.train(set)?;
        ModelArtifact::save(&model, path)?;
        Ok(model)
    }

    /// Load the dataset CSV and train on the columns of `schema`
    pub fn train_from_csv(&self, path: impl AsRef<Path>, schema: &FeatureSchema) -> Result<TrainedModel> {
        let set = DataLoader::new().load_training_set(path, schema, &self.config.target_column)?;
        self.train(&set)
    }
}

/// Fit a model with the given forest configuration
pub fn train(set: &TrainingSet, forest: ForestConfig) -> Result<TrainedModel> {
    Trainer::new(TrainingConfig::new(forest)).train(set)
}
