//! End-to-end pipeline: trades to quantized sliding-window examples.
//!
//! Trades → buckets → forward-fill → features and outcomes → quantized
//! targets → [`WindowGenerator`].

use crate::derive::{check_finite, derive_features, derive_outcomes};
use crate::quantizer::Quantizer;
use crate::window::WindowGenerator;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tickseq_core::{
    AggregationConfig, ClassId, FeatureVector, PipelineConfig, Result, Trade,
};
use tickseq_ingestion::{drop_leading_gaps, forward_fill, read_trades_from_path, BucketBuilder};
use tracing::{debug, info, warn};

/// Data-quality counters collected while preparing a series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Trade records consumed.
    pub trades: usize,
    /// Buckets produced by aggregation.
    pub buckets: usize,
    /// Buckets without volume whose price was carried forward.
    pub filled_buckets: usize,
    /// Leading buckets dropped for lack of any prior price.
    pub dropped_leading: usize,
    /// Non-finite per-bucket changes (zero previous price).
    pub non_finite_changes: usize,
    /// Non-finite outcomes (zero reference price).
    pub non_finite_outcomes: usize,
    /// Outcomes outside the quantizer range.
    pub clipped_outcomes: usize,
}

impl PipelineStats {
    /// Fraction of outcomes clipped by the quantizer.
    pub fn clipped_frac(&self, outcomes: usize) -> f64 {
        if outcomes > 0 {
            self.clipped_outcomes as f64 / outcomes as f64
        } else {
            0.0
        }
    }
}

/// Features and horizon outcomes, aligned by index.
#[derive(Debug, Clone, Default)]
pub struct PreparedData {
    /// One `(volume, price, change)` vector per bucket after the first.
    pub features: Vec<FeatureVector>,
    /// `outcomes[k]` is the change from feature `k` to `k + predict_length`.
    pub outcomes: Vec<f64>,
    /// Data-quality counters.
    pub stats: PipelineStats,
}

/// Configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    builder: BucketBuilder,
    quantizer: Quantizer,
}

impl Pipeline {
    /// Create a pipeline, validating the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            builder: BucketBuilder::new(&config.aggregation),
            quantizer: Quantizer::new(config.quantizer)?,
            config,
        })
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The outcome quantizer.
    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// Aggregate, gap-fill and derive features and outcomes from trades.
    pub fn prepare(&self, trades: &[Trade]) -> Result<PreparedData> {
        let mut stats = PipelineStats {
            trades: trades.len(),
            ..PipelineStats::default()
        };

        let start = trades.iter().min_by_key(|t| t.ts_ms).and_then(Trade::datetime);
        let end = trades.iter().max_by_key(|t| t.ts_ms).and_then(Trade::datetime);
        if let (Some(start), Some(end)) = (start, end) {
            debug!(%start, %end, "trade span");
        }

        let mut buckets = self.builder.build(trades)?;
        stats.buckets = buckets.len();
        stats.filled_buckets = buckets.iter().filter(|b| b.price.is_none()).count();

        forward_fill(&mut buckets);
        stats.dropped_leading = drop_leading_gaps(&mut buckets);
        stats.filled_buckets -= stats.dropped_leading;
        if stats.dropped_leading > 0 {
            warn!(
                dropped = stats.dropped_leading,
                "dropped leading buckets without a price"
            );
        }

        let features = derive_features(&buckets)?;
        let changes: Vec<f64> = features.iter().map(|f| f.change).collect();
        stats.non_finite_changes = check_finite(&changes, "change", self.config.non_finite)?;

        let outcomes = derive_outcomes(&features, self.config.target.predict_length)?;
        stats.non_finite_outcomes = check_finite(&outcomes, "outcome", self.config.non_finite)?;
        stats.clipped_outcomes = outcomes
            .iter()
            .filter(|&&o| self.quantizer.is_clipped(o))
            .count();

        info!(
            trades = stats.trades,
            buckets = stats.buckets,
            filled = stats.filled_buckets,
            features = features.len(),
            outcomes = outcomes.len(),
            "prepared series"
        );
        if stats.clipped_outcomes > 0 {
            warn!(
                clipped = stats.clipped_outcomes,
                frac = stats.clipped_frac(outcomes.len()),
                "outcomes outside quantizer range"
            );
        }

        Ok(PreparedData {
            features,
            outcomes,
            stats,
        })
    }

    /// Read trades from a CSV file and prepare them.
    pub fn prepare_path(&self, path: impl AsRef<Path>) -> Result<PreparedData> {
        let trades = read_trades_from_path(path)?;
        self.prepare(&trades)
    }

    /// Quantize outcomes into class indices.
    pub fn quantize(&self, outcomes: &[f64]) -> Vec<ClassId> {
        self.quantizer.quantize(outcomes)
    }

    /// Turn prepared data into an example generator.
    pub fn examples(&self, data: PreparedData) -> Result<WindowGenerator> {
        let targets = self.quantize(&data.outcomes);
        WindowGenerator::new(
            data.features,
            targets,
            &self.config.window,
            self.config.target.predict_length,
        )
    }

    /// Read, prepare, quantize and window a CSV file in one go.
    pub fn run(&self, path: impl AsRef<Path>) -> Result<WindowGenerator> {
        let data = self.prepare_path(path)?;
        self.examples(data)
    }
}

/// Load features and outcomes from a CSV file with default quantization and
/// window settings.
pub fn get_data(
    path: impl AsRef<Path>,
    interval_length: u64,
    predict_length: usize,
) -> Result<(Vec<FeatureVector>, Vec<f64>)> {
    let mut config = PipelineConfig {
        aggregation: AggregationConfig {
            interval_length_secs: interval_length,
            ..AggregationConfig::default()
        },
        ..PipelineConfig::default()
    };
    config.target.predict_length = predict_length;

    let data = Pipeline::new(config)?.prepare_path(path)?;
    Ok((data.features, data.outcomes))
}

/// Build a generator over `(volume, change)` windows.
pub fn window_gen(
    features: Vec<FeatureVector>,
    quantized_outcomes: Vec<ClassId>,
    window_length: usize,
    predict_length: usize,
) -> Result<WindowGenerator> {
    WindowGenerator::with_lengths(features, quantized_outcomes, window_length, predict_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::pct_change;
    use approx::assert_relative_eq;
    use tickseq_core::{Error, NonFinitePolicy};

    fn make_trade(sequence_id: i64, ts_ms: i64, price: f64, volume: f64) -> Trade {
        Trade {
            sequence_id,
            ts_ms,
            price,
            volume,
        }
    }

    fn config(predict_length: usize, window_length: usize) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.target.predict_length = predict_length;
        config.window.window_length = window_length;
        config
    }

    /// One trade per second, leaving seconds 1, 5, 9, ... empty.
    fn synthetic_trades(buckets: usize) -> Vec<Trade> {
        (0..buckets)
            .filter(|i| i % 4 != 1)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.7).sin();
                make_trade(i as i64, i as i64 * 1000 + 250, price, 1.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn test_alignment_invariant() {
        let (n_buckets, p, w) = (20, 3, 4);
        let trades = synthetic_trades(n_buckets);

        // Independent gap-filled bucket prices
        let mut prices = Vec::new();
        let mut last = f64::NAN;
        for i in 0..n_buckets {
            if i % 4 != 1 {
                last = 100.0 + (i as f64 * 0.7).sin();
            }
            prices.push(last);
        }

        let pipeline = Pipeline::new(config(p, w)).unwrap();
        let data = pipeline.prepare(&trades).unwrap();
        assert_eq!(data.stats.buckets, n_buckets);
        assert_eq!(data.features.len(), n_buckets - 1);
        assert_eq!(data.outcomes.len(), n_buckets - 1 - p);

        let generator = WindowGenerator::new(
            data.features.clone(),
            data.outcomes.clone(),
            &pipeline.config().window,
            p,
        )
        .unwrap();

        let mut count = 0;
        for (k, example) in generator.enumerate() {
            // Window covers features k..k+w, i.e. buckets k+1..=k+w
            let last_bucket = k + w;
            let next_bucket = last_bucket + 1;
            let expected = pct_change(prices[next_bucket], prices[next_bucket + p]);
            assert_relative_eq!(example.target, expected, epsilon = 1e-12);
            assert_relative_eq!(example.reference_price, prices[last_bucket], epsilon = 1e-12);
            count += 1;
        }
        assert_eq!(count, n_buckets - 1 - p - w);
    }

    #[test]
    fn test_filled_buckets_keep_zero_volume() {
        let pipeline = Pipeline::new(config(2, 3)).unwrap();
        let data = pipeline.prepare(&synthetic_trades(12)).unwrap();

        assert_eq!(data.stats.buckets, 12);
        assert_eq!(data.stats.filled_buckets, 3);
        // Bucket 1 is feature 0, bucket 5 is feature 4
        assert_eq!(data.features[0].volume, 0.0);
        assert_eq!(data.features[0].change, 0.0);
        assert_eq!(data.features[4].volume, 0.0);
        assert_eq!(data.features[4].price, data.features[3].price);
    }

    #[test]
    fn test_empty_trades() {
        let pipeline = Pipeline::new(config(10, 100)).unwrap();
        let data = pipeline.prepare(&[]).unwrap();
        assert!(data.features.is_empty());
        assert!(data.outcomes.is_empty());

        let mut examples = pipeline.examples(data).unwrap();
        assert!(examples.next().is_none());
    }

    #[test]
    fn test_leading_zero_volume_dropped() {
        let trades = vec![
            make_trade(1, 0, 50.0, 0.0),
            make_trade(2, 1000, 100.0, 1.0),
            make_trade(3, 2000, 110.0, 1.0),
            make_trade(4, 3000, 121.0, 1.0),
        ];
        let pipeline = Pipeline::new(config(1, 1)).unwrap();
        let data = pipeline.prepare(&trades).unwrap();

        assert_eq!(data.stats.dropped_leading, 1);
        assert_eq!(data.stats.filled_buckets, 0);
        assert_eq!(data.features.len(), 2);
        assert_relative_eq!(data.features[0].change, 0.1);
    }

    #[test]
    fn test_zero_price_policies() {
        let trades = vec![
            make_trade(1, 0, 0.0, 1.0),
            make_trade(2, 1000, 0.0, 1.0),
            make_trade(3, 2000, 1.0, 1.0),
            make_trade(4, 3000, 1.0, 1.0),
        ];

        let data = Pipeline::new(config(1, 1)).unwrap().prepare(&trades).unwrap();
        assert_eq!(data.stats.non_finite_changes, 2);
        assert_eq!(data.stats.non_finite_outcomes, 1);

        let mut strict = config(1, 1);
        strict.non_finite = NonFinitePolicy::FailFast;
        let err = Pipeline::new(strict).unwrap().prepare(&trades).unwrap_err();
        assert!(matches!(err, Error::NonFinite { stage: "change", index: 0, .. }));
    }

    #[test]
    fn test_examples_quantized() {
        let trades: Vec<Trade> = (0..40)
            .map(|i| make_trade(i, i * 1000, 100.0 * (1.0 + 0.001 * i as f64), 1.0))
            .collect();
        let pipeline = Pipeline::new(config(2, 5)).unwrap();
        let data = pipeline.prepare(&trades).unwrap();
        let expected_targets = pipeline.quantize(&data.outcomes);

        let examples: Vec<_> = pipeline.examples(data).unwrap().collect();
        assert_eq!(examples.len(), 39 - 2 - 5);
        for (k, example) in examples.iter().enumerate() {
            assert_eq!(example.target, expected_targets[k + 5]);
            assert_eq!(example.window.len(), 5);
            assert_eq!(example.window.width(), 2);
        }
        // Prices rise ~0.1% per second: two steps ahead is ~+0.2%, mid-upper classes
        assert!(examples.iter().all(|e| e.target > 1000 && e.target < 2000));
    }

    #[test]
    fn test_window_gen_entry_point() {
        let trades: Vec<Trade> = (0..30).map(|i| make_trade(i, i * 1000, 10.0, 1.0)).collect();
        let data = Pipeline::new(config(3, 4)).unwrap().prepare(&trades).unwrap();
        let targets = crate::quantizer::quantize(&data.outcomes, Default::default()).unwrap();

        let generator = window_gen(data.features, targets, 4, 3).unwrap();
        assert_eq!(generator.len(), 29 - 3 - 4);
        // Flat prices: every target is the zero-change class
        assert!(generator.into_iter().all(|e| e.target == 1000));
    }
}
