//! Data ingestion and regularization for the tickseq pipeline.
//!
//! This crate handles:
//! - Trade record loading from CSV
//! - Fixed-interval bucket building (volume-weighted price)
//! - Forward-filling of empty buckets

pub mod bucket_builder;
pub mod gap_fill;
pub mod reader;

pub use bucket_builder::{BucketBuilder, MAX_BUCKETS};
pub use gap_fill::{drop_leading_gaps, forward_fill};
pub use reader::{parse_timestamp, read_trades, read_trades_from_path};
