//! Fixed-interval bucket building from trades.
//!
//! Groups irregularly timed trades into buckets holding total volume and
//! volume-weighted mean price. With a positive width every interval between
//! the first and last trade is emitted, so quiet intervals show up as empty
//! buckets for the gap filler.

use std::collections::BTreeMap;
use tickseq_core::{
    floor_to_interval, AggregationConfig, Bucket, BucketOrigin, Error, Result, TimestampMs, Trade,
};
use tracing::debug;

/// Upper bound on the number of buckets a single series may resample into.
pub const MAX_BUCKETS: usize = 100_000_000;

/// A bucket that's currently being accumulated.
#[derive(Debug, Clone, Default)]
struct BucketInProgress {
    volume: f64,
    vwap_numerator: f64,
    trade_count: u32,
}

impl BucketInProgress {
    fn add_trade(&mut self, price: f64, volume: f64) {
        self.volume += volume;
        self.vwap_numerator += price * volume;
        self.trade_count += 1;
    }

    fn vwap(&self) -> Option<f64> {
        if self.volume > 0.0 {
            Some(self.vwap_numerator / self.volume)
        } else {
            None
        }
    }

    fn to_bucket(&self, ts_ms: TimestampMs) -> Bucket {
        Bucket {
            ts_ms,
            volume: self.volume,
            price: self.vwap(),
        }
    }
}

/// Builder for time buckets from raw trades.
#[derive(Debug, Clone)]
pub struct BucketBuilder {
    /// Bucket width in ms; `None` groups by identical timestamp.
    width_ms: Option<i64>,
    /// Grid anchor.
    origin: BucketOrigin,
}

impl BucketBuilder {
    /// Create a builder from configuration.
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            width_ms: config.width_ms(),
            origin: config.origin,
        }
    }

    /// Create a builder grouping by exact timestamp.
    pub fn exact() -> Self {
        Self {
            width_ms: None,
            origin: BucketOrigin::FirstTrade,
        }
    }

    /// Create a builder with a fixed width in seconds anchored at the first trade.
    pub fn with_interval_secs(secs: u64) -> Self {
        Self::new(&AggregationConfig {
            interval_length_secs: secs,
            origin: BucketOrigin::FirstTrade,
        })
    }

    /// Aggregate trades into time-ascending buckets.
    ///
    /// Trades need not be sorted; they are ordered by time and then sequence id
    /// so the floating-point sums are reproducible. Fails when a timestamp
    /// cannot be placed on the grid without overflow, or when the trades span
    /// more than [`MAX_BUCKETS`] intervals.
    pub fn build(&self, trades: &[Trade]) -> Result<Vec<Bucket>> {
        let mut ordered: Vec<&Trade> = trades.iter().collect();
        ordered.sort_by_key(|t| (t.ts_ms, t.sequence_id));

        let Some(first) = ordered.first() else {
            return Ok(Vec::new());
        };
        let origin_ms = match self.origin {
            BucketOrigin::FirstTrade => first.ts_ms,
            BucketOrigin::Epoch => 0,
        };

        let mut groups: BTreeMap<TimestampMs, BucketInProgress> = BTreeMap::new();
        for trade in &ordered {
            let key = match self.width_ms {
                Some(width) => floor_to_interval(trade.ts_ms, origin_ms, width).ok_or_else(|| {
                    Error::data(format!(
                        "trade {} at {} ms cannot be placed on a {width} ms grid from {origin_ms}",
                        trade.sequence_id, trade.ts_ms
                    ))
                })?,
                None => trade.ts_ms,
            };
            groups
                .entry(key)
                .or_default()
                .add_trade(trade.price, trade.volume);
        }

        let buckets = match self.width_ms {
            Some(width) => Self::resample(&groups, width)?,
            None => groups
                .iter()
                .map(|(&ts, bucket)| bucket.to_bucket(ts))
                .collect(),
        };

        debug!(
            trades = trades.len(),
            occupied = groups.len(),
            buckets = buckets.len(),
            "aggregated trades into buckets"
        );
        Ok(buckets)
    }

    /// Emit one bucket per interval from the first to the last occupied one.
    fn resample(
        groups: &BTreeMap<TimestampMs, BucketInProgress>,
        width: i64,
    ) -> Result<Vec<Bucket>> {
        let (Some((&first, _)), Some((&last, _))) =
            (groups.first_key_value(), groups.last_key_value())
        else {
            return Ok(Vec::new());
        };

        // Keys share the grid, so the span is an exact multiple of the width
        let count = last
            .checked_sub(first)
            .map(|span| span / width)
            .and_then(|steps| usize::try_from(steps).ok())
            .and_then(|steps| steps.checked_add(1))
            .filter(|&count| count <= MAX_BUCKETS)
            .ok_or_else(|| {
                Error::data(format!(
                    "trades from {first} to {last} ms span more than {MAX_BUCKETS} intervals of {width} ms"
                ))
            })?;

        Ok((0..count)
            .map(|k| {
                // first + k * width <= last, so this cannot overflow
                let ts = first + k as i64 * width;
                groups
                    .get(&ts)
                    .map(|b| b.to_bucket(ts))
                    .unwrap_or_else(|| Bucket::empty(ts))
            })
            .collect())
    }
}

impl Default for BucketBuilder {
    fn default() -> Self {
        Self::new(&AggregationConfig::default())
    }
}
