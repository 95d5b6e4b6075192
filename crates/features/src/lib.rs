//! Feature computation for the tickseq pipeline.
//!
//! This crate handles:
//! - Per-bucket feature and forward-horizon outcome derivation
//! - Outcome quantization into ordered classes
//! - Sliding-window example generation over a ring buffer
//! - The end-to-end pipeline and outcome summaries

pub mod derive;
pub mod pipeline;
pub mod quantizer;
pub mod ring;
pub mod summary;
pub mod window;

pub use derive::{derive_features, derive_outcomes, pct_change};
pub use pipeline::{get_data, window_gen, Pipeline, PipelineStats, PreparedData};
pub use quantizer::{quantize, Quantizer};
pub use ring::RingBuffer;
pub use summary::OutcomeSummary;
pub use window::{Example, ExampleView, Window, WindowGenerator, WindowView};
