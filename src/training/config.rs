//! Training configuration

use crate::error::{HousingError, Result};
use serde::{Deserialize, Serialize};

/// Strategy for the number of candidate features per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Number of candidate features for a matrix with `n_features` columns
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Candidate features per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed for reproducibility (None = fresh entropy per fit)
    pub random_state: Option<u64>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: None,
        }
    }
}

impl ForestConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(HousingError::invalid_parameter(
                "n_estimators",
                self.n_estimators,
                "must be at least 1",
            ));
        }
        if self.min_samples_split < 2 {
            return Err(HousingError::invalid_parameter(
                "min_samples_split",
                self.min_samples_split,
                "must be at least 2",
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(HousingError::invalid_parameter(
                "min_samples_leaf",
                self.min_samples_leaf,
                "must be at least 1",
            ));
        }
        if self.max_depth == Some(0) {
            return Err(HousingError::invalid_parameter(
                "max_depth",
                0,
                "must be at least 1 when set",
            ));
        }
        match self.max_features {
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                return Err(HousingError::invalid_parameter(
                    "max_features",
                    f,
                    "fraction must be in (0, 1]",
                ));
            }
            MaxFeatures::Fixed(0) => {
                return Err(HousingError::invalid_parameter(
                    "max_features",
                    0,
                    "must be at least 1",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}
