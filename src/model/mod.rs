//! Trained model and artifact persistence

mod artifact;
mod trained;

pub use artifact::{ModelArtifact, SerializationFormat, ARTIFACT_FORMAT_VERSION};
pub use trained::{ModelMetadata, TrainedModel, TrainingMetrics};
