//! Predictor: scores feature vectors against a loaded model

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ndarray::{Array1, Array2};
use tracing::{debug, warn};

use crate::error::{HousingError, Result};
use crate::model::{ModelArtifact, TrainedModel};
use crate::schema::{FeatureSchema, FeatureVector, HousingFeatures};

/// Shared, read-only handle to a trained model.
///
/// Cloning is cheap; every clone scores against the same model.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: Arc<TrainedModel>,
}

impl Predictor {
    pub fn new(model: Arc<TrainedModel>) -> Self {
        Self { model }
    }

    /// Load the artifact once; share the returned predictor across callers
    pub fn load(path: impl AsRef<Path>, schema: &FeatureSchema) -> Result<Self> {
        let model = ModelArtifact::load(path, schema)?;
        Ok(Self::new(Arc::new(model)))
    }

    pub fn model(&self) -> &Arc<TrainedModel> {
        &self.model
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.model.schema()
    }

    /// Predict the sale price for one row
    pub fn predict(&self, vector: &FeatureVector) -> Result<f64> {
        predict(&self.model, vector)
    }

    /// Predict from values addressed by field name
    pub fn predict_named(&self, named: &BTreeMap<String, f64>) -> Result<f64> {
        let vector = FeatureVector::from_named(self.schema(), named)?;
        self.predict(&vector)
    }

    /// Predict from a JSON object keyed by field name
    pub fn predict_json(&self, json: &str) -> Result<f64> {
        let named: BTreeMap<String, f64> =
            serde_json::from_str(json).map_err(|e| HousingError::SchemaMismatch(e.to_string()))?;
        self.predict_named(&named)
    }

    /// Predict from the fixed Miami record
    pub fn predict_features(&self, features: &HousingFeatures) -> Result<f64> {
        self.predict(&features.to_vector()?)
    }

    /// Predict every row of a schema-ordered matrix
    pub fn predict_batch(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if let Some((row, _)) = x
            .rows()
            .into_iter()
            .enumerate()
            .find(|(_, r)| r.iter().any(|v| !v.is_finite()))
        {
            return Err(HousingError::SchemaMismatch(format!(
                "row {} contains a non-finite value",
                row
            )));
        }
        self.model.predict_matrix(x)
    }
}

/// Predict the sale price of `vector` under `model`
pub fn predict(model: &TrainedModel, vector: &FeatureVector) -> Result<f64> {
    let expected = model.fingerprint();
    if vector.fingerprint() != &expected {
        warn!(
            expected = %expected,
            found = %vector.fingerprint(),
            "Feature vector built for another schema"
        );
        return Err(HousingError::SchemaMismatch(format!(
            "feature vector schema {} does not match model schema {}",
            vector.fingerprint(),
            expected
        )));
    }

    let price = model.predict_row(vector.values())?;
    debug!(price, "Prediction");
    Ok(price)
}
