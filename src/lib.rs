//! Miami Housing - sale price prediction for Miami single-family homes
//!
//! This crate provides the full model pipeline:
//! - Loading the cleaned housing CSV into a validated training set
//! - Training a random forest regressor with a reproducible seed
//! - Persisting the fitted model as a checksummed, schema-stamped artifact
//! - Predicting prices for single feature vectors or batches
//! - Explaining predictions with exact TreeSHAP contributions
//!
//! # Modules
//!
//! - [`schema`] - Feature names, order and fingerprint
//! - [`data`] - CSV loading and training set validation
//! - [`training`] - Regression trees, random forest, trainer
//! - [`model`] - Trained model and artifact persistence
//! - [`inference`] - Price prediction
//! - [`explainability`] - Feature contribution reports
//! - [`controls`] - Input form bounds for a front end
//! - [`config`] - Environment-driven runtime configuration
//! - [`cli`] - Command-line interface

pub mod error;

pub mod schema;
pub mod data;
pub mod training;
pub mod model;
pub mod inference;
pub mod explainability;

pub mod controls;
pub mod config;
pub mod cli;

pub use error::{HousingError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::HousingConfig;
    pub use crate::controls::{ControlKind, InputControl, InputForm};
    pub use crate::data::{DataLoader, TrainingSet};
    pub use crate::error::{HousingError, Result};
    pub use crate::explainability::{explain, ImportanceReport, LocalExplanation, TreeExplainer};
    pub use crate::inference::{predict, Predictor};
    pub use crate::model::{ModelArtifact, ModelMetadata, TrainedModel};
    pub use crate::schema::{FeatureSchema, FeatureVector, HousingFeatures, TARGET_COLUMN};
    pub use crate::training::{train, ForestConfig, MaxFeatures, Trainer, TrainingConfig};
}
