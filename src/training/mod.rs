//! Model training
//!
//! The scaler, the model contract and burn-backed trainer, the sequential
//! training strategies, and results analysis.

pub mod analyzer;
pub mod scaler;
pub mod trainer;
pub mod walk_forward;

pub use analyzer::ResultsAnalyzer;
pub use scaler::StandardScaler;
pub use trainer::{Evaluation, TrainableModel, Trainer};
pub use walk_forward::{IncrementalStrategy, OneSplitStrategy, StrategyOutcome};
