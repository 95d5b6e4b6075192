//! Core data types for the tickseq pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Quantized outcome class index.
pub type ClassId = u32;

/// Floor a timestamp onto a fixed-width grid anchored at `origin_ms`.
///
/// Works for timestamps before the origin as well (floors towards -inf).
/// Returns `None` when the arithmetic overflows `i64` or `width_ms` is not
/// positive.
#[inline]
pub fn floor_to_interval(
    ts_ms: TimestampMs,
    origin_ms: TimestampMs,
    width_ms: i64,
) -> Option<TimestampMs> {
    if width_ms <= 0 {
        return None;
    }
    let offset = ts_ms.checked_sub(origin_ms)?.div_euclid(width_ms);
    origin_ms.checked_add(offset.checked_mul(width_ms)?)
}

/// A single trade record as read from the source file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique row identity.
    pub sequence_id: i64,
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Trade price.
    pub price: f64,
    /// Trade volume.
    pub volume: f64,
}

impl Trade {
    /// Trade time as a UTC datetime, if representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.ts_ms)
    }
}

/// One fixed-interval (or exact-timestamp) aggregation bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket start (or the shared timestamp when grouping by exact time).
    pub ts_ms: TimestampMs,
    /// Sum of trade volumes in the bucket.
    pub volume: f64,
    /// Volume-weighted mean price; `None` when the bucket has no volume.
    pub price: Option<f64>,
}

impl Bucket {
    /// An interval with no trading activity.
    pub fn empty(ts_ms: TimestampMs) -> Self {
        Self {
            ts_ms,
            volume: 0.0,
            price: None,
        }
    }

    /// Whether this bucket had any volume.
    #[inline]
    pub fn has_volume(&self) -> bool {
        self.volume > 0.0
    }
}

/// Per-bucket feature vector: `(volume, price, change)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Bucket timestamp.
    pub ts_ms: TimestampMs,
    /// Total bucket volume (0 for gap-filled buckets).
    pub volume: f64,
    /// Gap-filled price.
    pub price: f64,
    /// Fractional price change from the preceding bucket.
    /// Non-finite when the preceding price was zero.
    pub change: f64,
}

impl FeatureVector {
    /// Read a single column.
    #[inline]
    pub fn get(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::Volume => self.volume,
            FeatureColumn::Price => self.price,
            FeatureColumn::Change => self.change,
        }
    }

    /// The `(volume, price, change)` triple.
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        (self.volume, self.price, self.change)
    }
}

/// A column of the feature vector that can be selected into a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Volume,
    Price,
    Change,
}

impl FeatureColumn {
    /// Column name as used in configuration and reports.
    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Volume => "volume",
            FeatureColumn::Price => "price",
            FeatureColumn::Change => "change",
        }
    }
}

/// How fixed-width buckets are anchored in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketOrigin {
    /// Intervals start at the first trade's timestamp.
    #[default]
    FirstTrade,
    /// Intervals are aligned to multiples of the width since the Unix epoch.
    Epoch,
}

/// What to do with non-finite changes and outcomes (zero prices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Keep the IEEE sentinel; the quantizer maps it to a boundary class.
    #[default]
    Propagate,
    /// Reject the data set with an error naming the offending index.
    FailFast,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_to_interval() {
        assert_eq!(floor_to_interval(1_500, 0, 1_000), Some(1_000));
        assert_eq!(floor_to_interval(2_000, 0, 1_000), Some(2_000));
        // Anchored at a non-aligned origin
        assert_eq!(floor_to_interval(1_750, 250, 1_000), Some(1_250));
        // Before the origin floors downwards
        assert_eq!(floor_to_interval(-1, 0, 1_000), Some(-1_000));
    }

    #[test]
    fn test_floor_to_interval_overflow() {
        assert_eq!(floor_to_interval(i64::MAX, i64::MIN, 1_000), None);
        // Flooring below i64::MIN
        assert_eq!(floor_to_interval(i64::MIN, 0, 1_000), None);
        assert_eq!(floor_to_interval(0, 0, 0), None);
        assert_eq!(floor_to_interval(i64::MAX, i64::MAX, 1_000), Some(i64::MAX));
    }

    #[test]
    fn test_feature_column_access() {
        let fv = FeatureVector {
            ts_ms: 0,
            volume: 3.0,
            price: 101.0,
            change: 0.01,
        };
        assert_eq!(fv.get(FeatureColumn::Volume), 3.0);
        assert_eq!(fv.get(FeatureColumn::Price), 101.0);
        assert_eq!(fv.get(FeatureColumn::Change), 0.01);
        assert_eq!(fv.as_tuple(), (3.0, 101.0, 0.01));
    }

    #[test]
    fn test_feature_column_names() {
        let names: Vec<&str> = [FeatureColumn::Volume, FeatureColumn::Price, FeatureColumn::Change]
            .into_iter()
            .map(FeatureColumn::name)
            .collect();
        assert_eq!(names, vec!["volume", "price", "change"]);
        // Names match the configuration spelling
        let parsed: FeatureColumn = serde_json::from_str("\"change\"").unwrap();
        assert_eq!(parsed.name(), "change");
    }

    #[test]
    fn test_empty_bucket() {
        let b = Bucket::empty(5_000);
        assert!(!b.has_volume());
        assert!(b.price.is_none());
    }

    #[test]
    fn test_trade_datetime() {
        let trade = Trade {
            sequence_id: 1,
            ts_ms: 1_704_067_200_000,
            price: 1.0,
            volume: 1.0,
        };
        let dt = trade.datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
