//! Forest-level explainer built on per-tree TreeSHAP

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use ndarray::{s, Array1, Array2};
use rayon::prelude::*;
use tracing::{debug, info};

use super::report::{FeatureContribution, ImportanceReport, LocalExplanation};
use super::tree_shap::tree_shap;
use crate::error::{HousingError, Result};
use crate::model::TrainedModel;
use crate::schema::FeatureVector;

/// Computes additive feature contributions for a trained forest.
///
/// Cost grows with samples × trees × tree depth², so this is meant for
/// batch use over a reference set, not per request.
pub struct TreeExplainer<'a> {
    model: &'a TrainedModel,
    /// Abort when the batch runs longer than this
    timeout: Option<Duration>,
    /// Explain at most this many leading rows of the reference set
    max_samples: Option<usize>,
}

impl<'a> TreeExplainer<'a> {
    pub fn new(model: &'a TrainedModel) -> Self {
        Self {
            model,
            timeout: None,
            max_samples: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = Some(n.max(1));
        self
    }

    /// Expected forest output; the base every explanation adds up from
    pub fn base_value(&self) -> Result<f64> {
        self.model.forest().expected_value()
    }

    /// Contributions of each feature for one schema-ordered row
    pub fn shap_values(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.model.schema().check_row(row)?;
        let forest = self.model.forest();
        let mut phi = vec![0.0; row.len()];
        for tree in forest.trees() {
            tree_shap(tree, row, &mut phi);
        }
        let n_trees = forest.n_trees() as f64;
        for p in &mut phi {
            *p /= n_trees;
        }
        Ok(phi)
    }

    /// Explain every row of a reference matrix
    pub fn explain(&self, reference: &Array2<f64>) -> Result<ImportanceReport> {
        let n_features = self.model.schema().len();
        if reference.ncols() != n_features {
            return Err(HousingError::SchemaMismatch(format!(
                "reference set has {} columns, model expects {}",
                reference.ncols(),
                n_features
            )));
        }

        let n_rows = self
            .max_samples
            .map_or(reference.nrows(), |m| m.min(reference.nrows()));
        let reference = reference.slice(s![..n_rows, ..]).to_owned();

        let start = Instant::now();
        let deadline = self.timeout.map(|t| start + t);
        let processed = AtomicUsize::new(0);
        let forest = self.model.forest();

        let rows: Vec<(Vec<f64>, f64)> = (0..n_rows)
            .into_par_iter()
            .map(|i| -> Result<(Vec<f64>, f64)> {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(HousingError::ExplanationTimeout {
                        processed: processed.load(Ordering::Relaxed),
                        total: n_rows,
                    });
                }
                let row = reference.row(i).to_vec();
                let phi = self.shap_values(&row)?;
                let prediction = forest.predict_row(&row)?;
                processed.fetch_add(1, Ordering::Relaxed);
                Ok((phi, prediction))
            })
            .collect::<Result<_>>()?;

        let mut contributions = Array2::zeros((n_rows, n_features));
        let mut predictions = Array1::zeros(n_rows);
        for (i, (phi, prediction)) in rows.into_iter().enumerate() {
            contributions.row_mut(i).assign(&Array1::from_vec(phi));
            predictions[i] = prediction;
        }

        let report = ImportanceReport {
            feature_names: self.model.schema().names(),
            base_value: self.base_value()?,
            contributions,
            feature_values: reference,
            predictions,
        };

        info!(
            samples = n_rows,
            trees = forest.n_trees(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Explanation complete"
        );
        debug!(max_additivity_error = report.max_additivity_error(), "Attribution check");
        Ok(report)
    }

    /// Explain a single feature vector
    pub fn explain_vector(&self, vector: &FeatureVector) -> Result<LocalExplanation> {
        if vector.fingerprint() != &self.model.fingerprint() {
            return Err(HousingError::SchemaMismatch(
                "feature vector was built for a different schema".to_string(),
            ));
        }
        let values = vector.values();
        let phi = self.shap_values(values)?;
        let contributions = self
            .model
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(j, field)| FeatureContribution {
                feature_index: j,
                feature_name: field.name.clone(),
                feature_value: values[j],
                contribution: phi[j],
            })
            .collect();

        Ok(LocalExplanation {
            instance_index: 0,
            base_value: self.base_value()?,
            prediction: self.model.forest().predict_row(values)?,
            contributions,
        })
    }
}

/// Explain every row of `reference` under `model`
pub fn explain(model: &TrainedModel, reference: &Array2<f64>) -> Result<ImportanceReport> {
    TreeExplainer::new(model).explain(reference)
}
