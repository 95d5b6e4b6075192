//! Evaluation of predictors on the tickseq example stream.
//!
//! This crate provides:
//! - The `Predictor` seam toward the external model
//! - Baseline predictors (uniform, class prior)
//! - Fixed-size batching of examples
//! - Classification metrics (cross-entropy, accuracy)

pub mod batch;
pub mod metrics;
pub mod predictor;

pub use batch::{Batch, Batcher};
pub use metrics::{argmax, evaluate, evaluate_examples, EvalMetrics, MetricsCalculator};
pub use predictor::{Predictor, PriorPredictor, UniformPredictor};
