//! Inference module
//!
//! A [`Predictor`] holds the loaded model behind an `Arc`. It keeps no
//! per-call state, so one instance can serve concurrent callers without
//! locking.

mod predictor;

pub use predictor::{predict, Predictor};
