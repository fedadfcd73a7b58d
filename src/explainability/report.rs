//! Explanation results

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Feature contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureContribution {
    /// Feature index
    pub feature_index: usize,
    /// Feature name
    pub feature_name: String,
    /// Feature value for this instance
    pub feature_value: f64,
    /// Contribution to prediction (SHAP value)
    pub contribution: f64,
}

/// Local explanation for a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalExplanation {
    /// Instance index
    pub instance_index: usize,
    /// Base value (expected prediction)
    pub base_value: f64,
    /// Actual prediction
    pub prediction: f64,
    /// Feature contributions
    pub contributions: Vec<FeatureContribution>,
}

impl LocalExplanation {
    /// Get sum of contributions
    pub fn sum_contributions(&self) -> f64 {
        self.contributions.iter().map(|c| c.contribution).sum()
    }

    /// Get sorted contributions (by absolute value, descending)
    pub fn sorted_contributions(&self) -> Vec<&FeatureContribution> {
        let mut sorted: Vec<&FeatureContribution> = self.contributions.iter().collect();
        sorted.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        sorted
    }

    /// Get top k contributors
    pub fn top_k_contributors(&self, k: usize) -> Vec<&FeatureContribution> {
        self.sorted_contributions().into_iter().take(k).collect()
    }

    /// Get positive contributors
    pub fn positive_contributors(&self) -> Vec<&FeatureContribution> {
        self.contributions
            .iter()
            .filter(|c| c.contribution > 0.0)
            .collect()
    }

    /// Get negative contributors
    pub fn negative_contributors(&self) -> Vec<&FeatureContribution> {
        self.contributions
            .iter()
            .filter(|c| c.contribution < 0.0)
            .collect()
    }
}

/// Global importance of one feature over a reference set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature_name: String,
    /// Mean absolute contribution
    pub mean_abs_contribution: f64,
    /// Mean signed contribution
    pub mean_contribution: f64,
}

/// Per-sample, per-feature contributions over a reference set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceReport {
    pub feature_names: Vec<String>,
    /// Expected model output over the training data
    pub base_value: f64,
    /// samples × features
    pub contributions: Array2<f64>,
    /// samples × features, the explained inputs
    pub feature_values: Array2<f64>,
    /// Model prediction per sample
    pub predictions: Array1<f64>,
}

impl ImportanceReport {
    pub fn n_samples(&self) -> usize {
        self.contributions.nrows()
    }

    /// Mean signed contribution per feature, in schema order
    pub fn mean_contributions(&self) -> Array1<f64> {
        self.contributions
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.feature_names.len()))
    }

    /// Features ranked by mean absolute contribution, descending
    pub fn global_ranking(&self) -> Vec<FeatureImportance> {
        let mean_abs = self
            .contributions
            .mapv(f64::abs)
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.feature_names.len()));
        let mean = self.mean_contributions();

        let mut ranking: Vec<FeatureImportance> = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| FeatureImportance {
                feature_name: name.clone(),
                mean_abs_contribution: mean_abs[i],
                mean_contribution: mean[i],
            })
            .collect();
        ranking.sort_by(|a, b| b.mean_abs_contribution.total_cmp(&a.mean_abs_contribution));
        ranking
    }

    /// Detail for sample `index`
    pub fn sample(&self, index: usize) -> Option<LocalExplanation> {
        if index >= self.n_samples() {
            return None;
        }
        let contributions = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(j, name)| FeatureContribution {
                feature_index: j,
                feature_name: name.clone(),
                feature_value: self.feature_values[[index, j]],
                contribution: self.contributions[[index, j]],
            })
            .collect();

        Some(LocalExplanation {
            instance_index: index,
            base_value: self.base_value,
            prediction: self.predictions[index],
            contributions,
        })
    }

    /// Largest |base + Σ contributions − prediction| over all samples
    pub fn max_additivity_error(&self) -> f64 {
        self.contributions
            .axis_iter(Axis(0))
            .zip(self.predictions.iter())
            .map(|(row, p)| (self.base_value + row.sum() - p).abs())
            .fold(0.0, f64::max)
    }
}
