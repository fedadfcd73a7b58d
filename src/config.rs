//! Runtime configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HousingError, Result};
use crate::training::ForestConfig;

pub const DEFAULT_DATA_PATH: &str = "cleaned_miami_housing.csv";
pub const DEFAULT_MODEL_PATH: &str = "short_cleaned_miami_housing.bin";
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Paths and knobs shared by the training, prediction and explanation commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HousingConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    /// `None` draws a fresh seed per training run
    pub seed: Option<u64>,
    pub n_estimators: usize,
    pub explain_timeout: Option<Duration>,
    pub explain_max_samples: Option<usize>,
}

impl Default for HousingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            seed: None,
            n_estimators: DEFAULT_N_ESTIMATORS,
            explain_timeout: None,
            explain_max_samples: None,
        }
    }
}

/// Parse a present key, rejecting values that do not parse or are zero when
/// `positive` is set
fn parse_key<F, T>(lookup: &F, key: &str, positive: bool) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| HousingError::invalid_parameter(key, &raw, "expected a non-negative integer"))?;
    if positive && value == T::default() {
        return Err(HousingError::invalid_parameter(key, &raw, "must be greater than zero"));
    }
    Ok(Some(value))
}

impl HousingConfig {
    /// Read the `HOUSING_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Unset keys keep their defaults, a set key
    /// that does not parse is an `InvalidParameter` error
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            data_path: lookup("HOUSING_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            model_path: lookup("HOUSING_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            seed: parse_key(&lookup, "HOUSING_SEED", false)?,
            n_estimators: parse_key(&lookup, "HOUSING_N_ESTIMATORS", true)?
                .unwrap_or(defaults.n_estimators),
            explain_timeout: parse_key(&lookup, "HOUSING_EXPLAIN_TIMEOUT_SECS", false)?
                .map(Duration::from_secs),
            explain_max_samples: parse_key(&lookup, "HOUSING_EXPLAIN_MAX_SAMPLES", true)?,
        })
    }

    /// Forest hyperparameters implied by this configuration
    pub fn forest_config(&self) -> ForestConfig {
        let config = ForestConfig::default().with_n_estimators(self.n_estimators);
        match self.seed {
            Some(seed) => config.with_random_state(seed),
            None => config,
        }
    }
}
