//! Core types and configuration for the tickseq pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (trades, buckets, feature vectors)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{AggregationConfig, PipelineConfig, QuantizerConfig, TargetConfig, WindowConfig};
pub use error::{Error, Result};
pub use types::*;
