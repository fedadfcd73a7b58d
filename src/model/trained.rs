//! Fitted model and its metadata

use crate::error::{HousingError, Result};
use crate::schema::{FeatureSchema, FeatureSummary, SchemaFingerprint};
use crate::training::{ForestConfig, RandomForestRegressor};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// In-sample fit statistics, informational only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    pub training_time_secs: f64,
}

impl TrainingMetrics {
    /// Compare predictions against targets
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>, training_time_secs: f64) -> Self {
        let n = y_true.len().max(1) as f64;
        let mean = y_true.mean().unwrap_or(0.0);

        let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
        let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
        let abs_err: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();

        Self {
            r2: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
            rmse: (ss_res / n).sqrt(),
            mae: abs_err / n,
            training_time_secs,
        }
    }
}

/// Description of how and on what a model was trained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    /// Version of this crate that produced the model
    pub crate_version: String,
    pub trained_at: DateTime<Utc>,
    pub schema_fingerprint: SchemaFingerprint,
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub n_samples: usize,
    pub forest: ForestConfig,
    /// Seed the forest was derived from; reuse it to reproduce the model
    pub seed: u64,
    pub feature_summaries: Vec<FeatureSummary>,
    pub metrics: TrainingMetrics,
}

/// Immutable fitted model: schema, forest and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    metadata: ModelMetadata,
    schema: FeatureSchema,
    forest: RandomForestRegressor,
}

impl TrainedModel {
    pub(crate) fn new(metadata: ModelMetadata, schema: FeatureSchema, forest: RandomForestRegressor) -> Result<Self> {
        if forest.n_trees() == 0 {
            return Err(HousingError::ModelNotFitted);
        }
        if forest.n_features() != schema.len() {
            return Err(HousingError::DataShape(format!(
                "forest has {} features, schema has {}",
                forest.n_features(),
                schema.len()
            )));
        }
        Ok(Self { metadata, schema, forest })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn forest(&self) -> &RandomForestRegressor {
        &self.forest
    }

    pub fn fingerprint(&self) -> SchemaFingerprint {
        self.schema.fingerprint()
    }

    /// Predict one schema-ordered row. Never negative.
    pub fn predict_row(&self, values: &[f64]) -> Result<f64> {
        self.schema.check_row(values)?;
        Ok(self.forest.predict_row(values)?.max(0.0))
    }

    /// Predict each row of a schema-ordered matrix
    pub fn predict_matrix(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.schema.len() {
            return Err(HousingError::SchemaMismatch(format!(
                "expected {} feature columns, got {}",
                self.schema.len(),
                x.ncols()
            )));
        }
        Ok(self.forest.predict(x)?.mapv(|p| p.max(0.0)))
    }

    /// Impurity-based importances paired with feature names, descending
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = match self.forest.feature_importances() {
            Some(imp) => self.schema.names().into_iter().zip(imp.iter().copied()).collect(),
            None => Vec::new(),
        };
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}
