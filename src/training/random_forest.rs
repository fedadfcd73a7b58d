//! Random forest regressor (bagging of randomized regression trees)

use crate::error::{HousingError, Result};
use super::config::ForestConfig;
use super::decision_tree::RegressionTree;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Random forest regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    /// Individual trees
    trees: Vec<RegressionTree>,
    /// Hyperparameters used for fitting
    config: ForestConfig,
    /// Seed the trees were derived from
    seed: Option<u64>,
    /// Feature importances
    feature_importances: Option<Vec<f64>>,
    /// Number of features
    n_features: usize,
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            trees: Vec::new(),
            config,
            seed: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Seed used by the last fit
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HousingError::DataShape(format!(
                "feature rows ({}) and target length ({}) differ",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(HousingError::DataShape("cannot fit a forest on zero rows".to_string()));
        }

        let base_seed = self
            .config
            .random_state
            .unwrap_or_else(|| rand::thread_rng().gen());
        let max_features = self.config.max_features.resolve(n_features);
        let config = &self.config;

        // Tree i always draws from seed + i, so the forest does not depend on scheduling
        let trees: Vec<RegressionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<RegressionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = RegressionTree::new()
                    .with_min_samples_split(config.min_samples_split)
                    .with_min_samples_leaf(config.min_samples_leaf);
                if let Some(d) = config.max_depth {
                    tree = tree.with_max_depth(d);
                }
                if max_features < n_features {
                    tree = tree.with_max_features(max_features);
                }

                tree.fit_rows(x, y, &sample_indices, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<_>>()?;

        self.trees = trees;
        self.seed = Some(base_seed);
        self.n_features = n_features;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (total, &val) in total_importances.iter_mut().zip(imp) {
                    *total += val;
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for imp in &mut total_importances {
            *imp /= n_trees;
        }

        // Normalize
        let total: f64 = total_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut total_importances {
                *imp /= total;
            }
        }

        self.feature_importances = Some(total_importances);
    }

    /// Predict a single row given in feature order
    pub fn predict_row(&self, sample: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(HousingError::ModelNotFitted);
        }
        let sum = self
            .trees
            .iter()
            .map(|tree| tree.predict_row(sample))
            .sum::<Result<f64>>()?;
        Ok(sum / self.trees.len() as f64)
    }

    /// Make predictions (mean over trees)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(HousingError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(HousingError::SchemaMismatch(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        let predictions: Vec<f64> = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|row| {
                let row = row.to_vec();
                self.predict_row(&row)
            })
            .collect::<Result<_>>()?;

        Ok(Array1::from_vec(predictions))
    }

    /// Mean over trees of each tree's cover-weighted leaf mean
    pub fn expected_value(&self) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(HousingError::ModelNotFitted);
        }
        let sum: f64 = self
            .trees
            .iter()
            .map(|t| t.expected_value().ok_or(HousingError::ModelNotFitted))
            .sum::<Result<f64>>()?;
        Ok(sum / self.trees.len() as f64)
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn seeded(n_estimators: usize) -> RandomForestRegressor {
        RandomForestRegressor::new(
            ForestConfig::default()
                .with_n_estimators(n_estimators)
                .with_random_state(42),
        )
    }

    #[test]
    fn test_regressor() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut rf = seeded(10);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;

        assert!(mse < 2.0, "MSE too high: {}", mse);
        assert_eq!(rf.n_trees(), 10);
        assert_eq!(rf.seed(), Some(42));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let x = array![[1.0, 5.0], [2.0, 3.0], [3.0, 8.0], [4.0, 1.0], [5.0, 9.0], [6.0, 2.0]];
        let y = array![10.0, 25.0, 31.0, 38.0, 52.0, 61.0];

        let mut a = seeded(20);
        a.fit(&x, &y).unwrap();
        let mut b = seeded(20);
        b.fit(&x, &y).unwrap();

        let probe = array![[2.5, 4.0], [5.5, 0.0]];
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }

    #[test]
    fn test_unseeded_records_seed() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0, 3.0];

        let mut rf = RandomForestRegressor::new(ForestConfig::default().with_n_estimators(3));
        rf.fit(&x, &y).unwrap();
        assert!(rf.seed().is_some());
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut rf = seeded(10);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_expected_value_is_mean_of_bootstrap_means() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![4.0, 8.0, 12.0, 16.0];

        let mut rf = RandomForestRegressor::new(
            ForestConfig::default()
                .with_n_estimators(5)
                .with_random_state(3)
                .with_bootstrap(false),
        );
        rf.fit(&x, &y).unwrap();
        assert!((rf.expected_value().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForestRegressor::default();
        assert!(matches!(rf.predict_row(&[1.0]), Err(HousingError::ModelNotFitted)));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let x = array![[1.0, 2.0], [2.0, 3.0]];
        let y = array![1.0, 2.0];
        let mut rf = seeded(2);
        rf.fit(&x, &y).unwrap();
        assert!(matches!(
            rf.predict(&array![[1.0]]),
            Err(HousingError::SchemaMismatch(_))
        ));
    }
}
