//! Model training module
//!
//! Provides the regression tree, the random forest built from it, and the
//! [`Trainer`] that turns a [`TrainingSet`](crate::data::TrainingSet) into
//! a [`TrainedModel`](crate::model::TrainedModel).

mod config;
pub mod decision_tree;
pub mod random_forest;
mod trainer;

pub use config::{ForestConfig, MaxFeatures};
pub use decision_tree::{RegressionTree, TreeNode};
pub use random_forest::RandomForestRegressor;
pub use trainer::{train, Trainer, TrainingConfig};
