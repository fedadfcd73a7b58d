//! Feature schema module
//!
//! The schema fixes the names and order of the model inputs. Training
//! matrices, persisted models and inference rows all carry its
//! fingerprint so a row built for one schema is never scored by a model
//! trained on another.

mod features;
mod summary;

pub use features::{
    FeatureField, FeatureSchema, FeatureVector, HousingFeatures, SchemaFingerprint, TARGET_COLUMN,
};
pub use summary::{summarize, FeatureSummary};
