//! Model explainability module
//!
//! Provides exact TreeSHAP feature contributions for the trained forest:
//! - per-sample contributions that add up to the prediction
//! - global ranking by mean absolute contribution

mod explainer;
mod report;
mod tree_shap;

pub use explainer::{explain, TreeExplainer};
pub use report::{FeatureContribution, FeatureImportance, ImportanceReport, LocalExplanation};
