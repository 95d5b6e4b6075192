//! Feature and target derivation from gap-filled buckets.
//!
//! Index bookkeeping: the first bucket has no predecessor and is dropped, so
//! feature `k` describes bucket `k + 1`. Outcomes live in feature index space:
//! `outcome[k]` is the change from feature `k` to feature `k + predict_length`.
//! In bucket space that is a `predict_length`-period percentage change sliced
//! from `predict_length + DROPPED_HEAD`.

use tickseq_core::{Bucket, Error, FeatureVector, NonFinitePolicy, Result};
use tracing::warn;

/// Buckets dropped at the head of the series by feature derivation.
pub const DROPPED_HEAD: usize = 1;

/// Fractional change from `from` to `to`. Non-finite when `from` is zero.
#[inline]
pub fn pct_change(from: f64, to: f64) -> f64 {
    (to - from) / from
}

/// Build `(volume, price, change)` for every bucket but the first.
///
/// Every bucket must already carry a price (see `forward_fill` and
/// `drop_leading_gaps`).
pub fn derive_features(buckets: &[Bucket]) -> Result<Vec<FeatureVector>> {
    let prices = buckets
        .iter()
        .enumerate()
        .map(|(i, b)| {
            b.price.ok_or_else(|| {
                Error::data(format!(
                    "bucket {i} (ts {}) has no price; forward-fill and drop leading gaps first",
                    b.ts_ms
                ))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    Ok(buckets
        .iter()
        .zip(prices.iter())
        .skip(DROPPED_HEAD)
        .zip(prices.iter())
        .map(|((bucket, &price), &prev)| FeatureVector {
            ts_ms: bucket.ts_ms,
            volume: bucket.volume,
            price,
            change: pct_change(prev, price),
        })
        .collect())
}

/// Forward-horizon outcomes aligned to feature indices.
///
/// The result has `features.len() - predict_length` entries (empty when the
/// series is not longer than the horizon).
pub fn derive_outcomes(features: &[FeatureVector], predict_length: usize) -> Result<Vec<f64>> {
    if predict_length == 0 {
        return Err(Error::config("predict_length must be positive"));
    }

    Ok(features
        .iter()
        .zip(features.iter().skip(predict_length))
        .map(|(now, ahead)| pct_change(now.price, ahead.price))
        .collect())
}

/// Count non-finite values, or reject them under the fail-fast policy.
pub fn check_finite(values: &[f64], stage: &'static str, policy: NonFinitePolicy) -> Result<usize> {
    let mut count = 0;
    for (index, &value) in values.iter().enumerate() {
        if value.is_finite() {
            continue;
        }
        if policy == NonFinitePolicy::FailFast {
            return Err(Error::non_finite(stage, index, value));
        }
        count += 1;
    }

    if count > 0 {
        warn!(stage, count, "non-finite values propagated (zero prices in input)");
    }
    Ok(count)
}
