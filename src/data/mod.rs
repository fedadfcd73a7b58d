//! Dataset loading and training set extraction

mod loader;
mod training_set;

pub use loader::DataLoader;
pub use training_set::{columns_to_array2, TrainingSet};
