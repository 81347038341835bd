//! Prediction and inference
//!
//! Load trained checkpoints and score upcoming games.

pub mod inference;

pub use inference::{GamePrediction, Predictor};
