//! Model artifact persistence
//!
//! The artifact is an envelope holding the metadata, the bincode encoding
//! of the [`TrainedModel`] and a SHA-256 checksum of those bytes. Loading
//! verifies the envelope version, the checksum and the schema fingerprint
//! before handing the model out.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{ModelMetadata, TrainedModel};
use crate::error::{HousingError, Result};
use crate::schema::FeatureSchema;

/// Bumped whenever the envelope or model encoding changes incompatibly
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerializationFormat {
    /// Binary format using bincode (compact)
    #[default]
    Binary,
    /// JSON format (portable, human-readable)
    Json,
}

impl SerializationFormat {
    /// `.json` paths are JSON, everything else binary
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SerializationFormat::Json,
            _ => SerializationFormat::Binary,
        }
    }
}

/// On-disk envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedModel {
    format_version: u32,
    metadata: ModelMetadata,
    model_data: Vec<u8>,
    checksum: String,
}

impl SerializedModel {
    fn new(model: &TrainedModel) -> Result<Self> {
        let model_data = bincode::serialize(model)
            .map_err(|e| HousingError::Serialization(format!("failed to encode model: {}", e)))?;
        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            metadata: model.metadata().clone(),
            checksum: compute_sha256(&model_data),
            model_data,
        })
    }

    fn verify_checksum(&self) -> bool {
        compute_sha256(&self.model_data) == self.checksum
    }
}

/// Compute SHA-256 hash of data
fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Reads and writes model artifacts
pub struct ModelArtifact;

impl ModelArtifact {
    /// Write `model` to `path`, replacing any previous artifact.
    ///
    /// The bytes go to a sibling temporary file first and are renamed into
    /// place, so readers never observe a half-written artifact.
    pub fn save(model: &TrainedModel, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = SerializationFormat::from_path(path);
        let serialized = SerializedModel::new(model)?;

        let tmp_path = temp_path(path);
        let write = || -> Result<()> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            match format {
                SerializationFormat::Binary => {
                    bincode::serialize_into(&mut writer, &serialized).map_err(|e| {
                        HousingError::Serialization(format!("failed to write artifact: {}", e))
                    })?;
                }
                SerializationFormat::Json => {
                    serde_json::to_writer_pretty(&mut writer, &serialized)?;
                }
            }
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            fs::rename(&tmp_path, path)?;
            Ok(())
        };

        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        info!(
            path = %path.display(),
            format = ?format,
            bytes = serialized.model_data.len(),
            fingerprint = %serialized.metadata.schema_fingerprint,
            "Model artifact written"
        );
        Ok(())
    }

    /// Read the artifact at `path` and check it was built for `expected_schema`
    pub fn load(path: impl AsRef<Path>, expected_schema: &FeatureSchema) -> Result<TrainedModel> {
        let path = path.as_ref();
        let serialized = Self::read_envelope(path)?;

        if !serialized.verify_checksum() {
            return Err(HousingError::ModelLoad(format!(
                "checksum verification failed for {}; the file may be corrupted",
                path.display()
            )));
        }

        let model: TrainedModel = bincode::deserialize(&serialized.model_data).map_err(|e| {
            HousingError::ModelLoad(format!("failed to decode model in {}: {}", path.display(), e))
        })?;

        let expected = expected_schema.fingerprint();
        if model.fingerprint() != expected || serialized.metadata.schema_fingerprint != expected {
            warn!(
                path = %path.display(),
                expected = %expected,
                found = %serialized.metadata.schema_fingerprint,
                "Model artifact schema fingerprint mismatch"
            );
            return Err(HousingError::ModelLoad(format!(
                "artifact {} was trained for schema {} but {} is expected; retrain the model",
                path.display(),
                serialized.metadata.schema_fingerprint,
                expected
            )));
        }

        debug!(
            path = %path.display(),
            trees = model.forest().n_trees(),
            trained_at = %model.metadata().trained_at,
            "Model artifact loaded"
        );
        Ok(model)
    }

    /// Read only the metadata of an artifact, without schema checks
    pub fn read_metadata(path: impl AsRef<Path>) -> Result<ModelMetadata> {
        Ok(Self::read_envelope(path.as_ref())?.metadata)
    }

    fn read_envelope(path: &Path) -> Result<SerializedModel> {
        // Decoding from a slice bounds every length prefix by the bytes on disk
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                HousingError::ModelLoad(format!("artifact not found: {}", path.display()))
            }
            _ => HousingError::ModelLoad(format!("cannot open {}: {}", path.display(), e)),
        })?;

        let serialized: SerializedModel = match SerializationFormat::from_path(path) {
            SerializationFormat::Binary => bincode::deserialize(&bytes).map_err(|e| {
                HousingError::ModelLoad(format!("corrupt artifact {}: {}", path.display(), e))
            })?,
            SerializationFormat::Json => serde_json::from_slice(&bytes).map_err(|e| {
                HousingError::ModelLoad(format!("corrupt artifact {}: {}", path.display(), e))
            })?,
        };

        if serialized.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(HousingError::ModelLoad(format!(
                "artifact format version {} is not supported (expected {})",
                serialized.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        Ok(serialized)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
