//! Regression tree (CART with squared-error criterion)

use crate::error::{HousingError, Result};
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Nodes with at least this many rows scan candidate features in parallel
const PARALLEL_SPLIT_ROWS: usize = 4096;

/// Regression tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        /// Mean target of the rows reaching this node
        value: f64,
        impurity: f64,
    },
}

impl TreeNode {
    /// Number of training rows that reached this node
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    /// Mean target of the rows that reached this node
    pub fn value(&self) -> f64 {
        match self {
            TreeNode::Leaf { value, .. } | TreeNode::Split { value, .. } => *value,
        }
    }

    fn predict(&self, sample: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Running sums of a target subset, shifted by the parent mean for stability
#[derive(Debug, Clone, Copy, Default)]
struct TargetStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
}

impl TargetStats {
    fn push(&mut self, y: f64) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0)
    }
}

/// Regression tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn as split candidates at each node (None = all)
    pub max_features: Option<usize>,
    /// Number of features
    n_features: usize,
    /// Impurity-decrease importances, normalized
    feature_importances: Option<Vec<f64>>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of candidate features per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Fit the tree on every row of `x`
    pub fn fit<R: Rng>(&mut self, x: &Array2<f64>, y: &Array1<f64>, rng: &mut R) -> Result<&mut Self> {
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &indices, rng)
    }

    /// Fit the tree on the rows listed in `indices` (repeats allowed)
    pub fn fit_rows<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut R,
    ) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(HousingError::DataShape(format!(
                "feature rows ({}) and target length ({}) differ",
                x.nrows(),
                y.len()
            )));
        }
        if indices.is_empty() {
            return Err(HousingError::DataShape("cannot fit a tree on zero rows".to_string()));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        self.root = Some(self.build_tree(x, y, indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(importances);

        Ok(self)
    }

    fn build_tree<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let value = indices.iter().map(|&i| y[i]).sum::<f64>() / n_samples as f64;

        let mut stats = TargetStats::default();
        for &i in indices {
            stats.push(y[i] - value);
        }
        let impurity = stats.variance();

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_pure(y, indices);

        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        let Some(best) = self.find_best_split(x, y, indices, value, impurity, rng) else {
            return TreeNode::Leaf { value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            value,
            impurity,
        }
    }

    fn find_best_split<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        shift: f64,
        parent_impurity: f64,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let candidates: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => sample(rng, n_features, k.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };

        let scan = |&feature_idx: &usize| {
            self.best_split_for_feature(x, y, indices, feature_idx, shift, parent_impurity)
        };
        let per_feature: Vec<Option<SplitCandidate>> = if indices.len() >= PARALLEL_SPLIT_ROWS {
            candidates.par_iter().map(scan).collect()
        } else {
            candidates.iter().map(scan).collect()
        };

        // First best wins on ties so the result is independent of scheduling
        per_feature.into_iter().flatten().fold(None, |best, cand| match best {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        })
    }

    /// Sweep sorted values of one feature, evaluating midpoints between distinct values
    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        shift: f64,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i] - shift))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let mut total = TargetStats::default();
        for &(_, yi) in &pairs {
            total.push(yi);
        }

        let min_gain = parent_impurity * 1e-12;
        let mut left = TargetStats::default();
        let mut best: Option<SplitCandidate> = None;

        for i in 0..n - 1 {
            let (xi, yi) = pairs[i];
            left.push(yi);

            let next = pairs[i + 1].0;
            if next <= xi {
                continue;
            }

            let right_count = n - left.count;
            if left.count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                continue;
            }

            let right = TargetStats {
                count: right_count,
                sum: total.sum - left.sum,
                sq_sum: total.sq_sum - left.sq_sum,
            };
            let weighted = (left.count as f64 * left.variance()
                + right.count as f64 * right.variance())
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > min_gain && best.map_or(true, |b| gain > b.gain) {
                let mid = xi + (next - xi) / 2.0;
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold: if mid < next { mid } else { xi },
                    gain,
                });
            }
        }

        best
    }

    /// Predict a single row given in feature order
    pub fn predict_row(&self, sample: &[f64]) -> Result<f64> {
        let root = self.root.as_ref().ok_or(HousingError::ModelNotFitted)?;
        if sample.len() != self.n_features {
            return Err(HousingError::SchemaMismatch(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        Ok(root.predict(sample))
    }

    /// Predict every row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(HousingError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(HousingError::SchemaMismatch(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| match row.as_slice() {
                Some(s) => root.predict(s),
                None => root.predict(&row.to_vec()),
            })
            .collect())
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    /// Cover-weighted mean of the leaf values
    pub fn expected_value(&self) -> Option<f64> {
        self.root.as_ref().map(TreeNode::value)
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => node_depth(node),
        }
    }

    /// Get number of leaves
    pub fn n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => count_leaves(node),
        }
    }
}

fn is_pure(y: &Array1<f64>, indices: &[usize]) -> bool {
    let first = y[indices[0]];
    indices.iter().all(|&i| (y[i] - first).abs() < 1e-10)
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}
