//! Per-feature statistics of the training matrix

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::FeatureSchema;

/// Observed domain of one feature in the training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl FeatureSummary {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Summarize each column of `x` under the names of `schema`
pub fn summarize(schema: &FeatureSchema, x: &Array2<f64>) -> Vec<FeatureSummary> {
    schema
        .fields()
        .iter()
        .zip(x.axis_iter(Axis(1)))
        .map(|(field, column)| {
            let min = column.iter().copied().fold(f64::INFINITY, f64::min);
            let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = column.mean().unwrap_or(0.0);
            FeatureSummary {
                name: field.name.clone(),
                min,
                max,
                mean,
            }
        })
        .collect()
}
