//! Exact path-dependent TreeSHAP for regression trees
//!
//! Implements the polynomial-time Shapley value recursion of Lundberg et
//! al. ("Consistent Individualized Feature Attribution for Tree
//! Ensembles"), using node covers as the background distribution. For
//! each tree, `expected_value + sum(phi) == tree prediction`.

use crate::training::{RegressionTree, TreeNode};

/// One element of the unique feature path from the root to a node
#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// Feature split on; `None` for the root sentinel
    feature: Option<usize>,
    /// Fraction of "feature absent" paths flowing through
    zero_fraction: f64,
    /// Whether the "feature present" path flows through (0 or 1)
    one_fraction: f64,
    /// Permutation weight
    pweight: f64,
}

/// Add `phi` (one slot per feature) for `sample` under `tree`
pub(crate) fn tree_shap(tree: &RegressionTree, sample: &[f64], phi: &mut [f64]) {
    if let Some(root) = tree.root() {
        recurse(root, sample, phi, Vec::with_capacity(32), 1.0, 1.0, None);
    }
}

fn recurse(
    node: &TreeNode,
    sample: &[f64],
    phi: &mut [f64],
    mut path: Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    extend_path(&mut path, zero_fraction, one_fraction, feature);

    match node {
        TreeNode::Leaf { value, .. } => {
            for i in 1..path.len() {
                let w = unwound_path_sum(&path, i);
                let el = path[i];
                if let Some(f) = el.feature {
                    phi[f] += w * (el.one_fraction - el.zero_fraction) * value;
                }
            }
        }
        TreeNode::Split { feature_idx, threshold, left, right, n_samples, .. } => {
            let (hot, cold) = if sample[*feature_idx] <= *threshold {
                (left, right)
            } else {
                (right, left)
            };
            let cover = *n_samples as f64;
            let hot_fraction = hot.n_samples() as f64 / cover;
            let cold_fraction = cold.n_samples() as f64 / cover;

            // A feature seen earlier on the path is folded into this split
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = (1..path.len()).find(|&k| path[k].feature == Some(*feature_idx)) {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            recurse(
                hot,
                sample,
                phi,
                path.clone(),
                hot_fraction * incoming_zero,
                incoming_one,
                Some(*feature_idx),
            );
            recurse(
                cold,
                sample,
                phi,
                path,
                cold_fraction * incoming_zero,
                0.0,
                Some(*feature_idx),
            );
        }
    }
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });

    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path if element `index` were unwound
fn unwound_path_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one_fraction = path[index].one_fraction;
    let zero_fraction = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64 / denom;
        } else if zero_fraction != 0.0 {
            total += (path[i].pweight / zero_fraction) / ((depth - i) as f64 / denom);
        }
    }

    total
}
