//! Configuration structures for the tickseq pipeline.

use crate::error::{Error, Result};
use crate::types::{BucketOrigin, FeatureColumn, NonFinitePolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trade aggregation configuration.
    pub aggregation: AggregationConfig,
    /// Prediction target configuration.
    pub target: TargetConfig,
    /// Sliding window configuration.
    pub window: WindowConfig,
    /// Outcome quantization configuration.
    pub quantizer: QuantizerConfig,
    /// Handling of non-finite changes and outcomes.
    pub non_finite: NonFinitePolicy,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check all sections for consistency.
    pub fn validate(&self) -> Result<()> {
        self.aggregation.validate()?;
        self.target.validate()?;
        self.window.validate()?;
        self.quantizer.validate()
    }
}

/// Trade aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Bucket width in seconds. Zero groups trades by identical timestamp.
    pub interval_length_secs: u64,
    /// Anchor of the bucket grid.
    pub origin: BucketOrigin,
}

impl AggregationConfig {
    /// Reject widths that do not fit a millisecond timestamp.
    pub fn validate(&self) -> Result<()> {
        let fits = i64::try_from(self.interval_length_secs)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .is_some();
        if !fits {
            return Err(Error::config(format!(
                "interval_length_secs ({}) overflows a millisecond width",
                self.interval_length_secs
            )));
        }
        Ok(())
    }

    /// Bucket width in milliseconds, `None` for exact-timestamp grouping.
    ///
    /// Saturates at `i64::MAX` for widths that `validate` rejects.
    pub fn width_ms(&self) -> Option<i64> {
        match self.interval_length_secs {
            0 => None,
            secs => Some(i64::try_from(secs).unwrap_or(i64::MAX).saturating_mul(1000)),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            interval_length_secs: 1,
            origin: BucketOrigin::FirstTrade,
        }
    }
}

/// Prediction target configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Number of buckets ahead to predict.
    pub predict_length: usize,
}

impl TargetConfig {
    fn validate(&self) -> Result<()> {
        if self.predict_length == 0 {
            return Err(Error::config("predict_length must be positive"));
        }
        Ok(())
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self { predict_length: 10 }
    }
}

/// Sliding window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Number of buckets per window.
    pub window_length: usize,
    /// Feature columns copied into each window row.
    pub columns: Vec<FeatureColumn>,
    /// Emit every `stride`-th window.
    pub stride: usize,
}

impl WindowConfig {
    /// Validate the window shape.
    pub fn validate(&self) -> Result<()> {
        if self.window_length == 0 {
            return Err(Error::config("window_length must be positive"));
        }
        if self.columns.is_empty() {
            return Err(Error::config("at least one feature column must be selected"));
        }
        if self.stride == 0 {
            return Err(Error::config("stride must be positive"));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_length: 100,
            columns: vec![FeatureColumn::Volume, FeatureColumn::Change],
            stride: 1,
        }
    }
}

/// Upper bound on quantizer bins.
pub const MAX_BINS: usize = 1 << 24;

/// Bin counts within this relative distance of an integer count as exact.
const BIN_COUNT_TOLERANCE: f64 = 1e-9;

/// Fixed-width binning of fractional price changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    /// Lower clip bound.
    pub amin: f64,
    /// Upper clip bound.
    pub amax: f64,
    /// Bin width.
    pub step: f64,
}

impl QuantizerConfig {
    /// Validate bounds and step.
    pub fn validate(&self) -> Result<()> {
        if !(self.amin.is_finite() && self.amax.is_finite() && self.step.is_finite()) {
            return Err(Error::config("quantizer bounds and step must be finite"));
        }
        if self.amax <= self.amin {
            return Err(Error::config(format!(
                "quantizer amax ({}) must exceed amin ({})",
                self.amax, self.amin
            )));
        }
        if self.step <= 0.0 {
            return Err(Error::config("quantizer step must be positive"));
        }
        let ratio = (self.amax - self.amin) / self.step;
        if !ratio.is_finite() || ratio > MAX_BINS as f64 {
            return Err(Error::config(format!(
                "quantizer step {} gives more than {MAX_BINS} bins over [{}, {}]",
                self.step, self.amin, self.amax
            )));
        }
        Ok(())
    }

    /// Number of bins `[amin + k*step, amin + (k+1)*step)` needed to cover
    /// `[amin, amax)`, i.e. `ceil((amax - amin) / step)`. The last bin is cut
    /// short at `amax` when `step` does not divide the range.
    ///
    /// Class indices run over `0..=num_bins`.
    pub fn num_bins(&self) -> usize {
        let ratio = (self.amax - self.amin) / self.step;
        let nearest = ratio.round();
        let bins = if (ratio - nearest).abs() <= BIN_COUNT_TOLERANCE * nearest.max(1.0) {
            nearest
        } else {
            ratio.ceil()
        };
        bins.max(1.0) as usize
    }

    /// Number of distinct classes.
    pub fn num_classes(&self) -> usize {
        self.num_bins() + 1
    }
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            amin: -0.01,
            amax: 0.01,
            step: 1e-5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.aggregation.interval_length_secs, 1);
        assert_eq!(config.target.predict_length, 10);
        assert_eq!(config.window.window_length, 100);
        assert_eq!(
            config.window.columns,
            vec![FeatureColumn::Volume, FeatureColumn::Change]
        );
        assert_eq!(config.quantizer.amin, -0.01);
        assert_eq!(config.non_finite, NonFinitePolicy::Propagate);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_quantizer_bins() {
        let q = QuantizerConfig::default();
        assert_eq!(q.num_bins(), 2000);
        assert_eq!(q.num_classes(), 2001);
    }

    #[test]
    fn test_uneven_step_bins() {
        let q = QuantizerConfig {
            step: 0.003,
            ..QuantizerConfig::default()
        };
        // 0.02 / 0.003 = 6.67 -> six full bins and a short one
        assert_eq!(q.num_bins(), 7);
        assert!(q.validate().is_ok());

        let wide = QuantizerConfig {
            step: 0.05,
            ..QuantizerConfig::default()
        };
        assert_eq!(wide.num_bins(), 1);
        assert_eq!(wide.num_classes(), 2);
        assert!(wide.validate().is_ok());
    }

    #[test]
    fn test_too_many_bins() {
        let q = QuantizerConfig {
            step: 1e-12,
            ..QuantizerConfig::default()
        };
        assert!(matches!(q.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_width_ms() {
        let mut agg = AggregationConfig::default();
        assert_eq!(agg.width_ms(), Some(1000));
        agg.interval_length_secs = 0;
        assert_eq!(agg.width_ms(), None);
    }

    #[test]
    fn test_width_overflow_rejected() {
        let mut config = PipelineConfig::default();
        config.aggregation.interval_length_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        assert_eq!(config.aggregation.width_ms(), Some(i64::MAX));

        config.aggregation.interval_length_secs = (i64::MAX / 1000) as u64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs() {
        let mut config = PipelineConfig::default();
        config.target.predict_length = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = PipelineConfig::default();
        config.window.columns.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.quantizer.amax = config.quantizer.amin;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.quantizer.step = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{"target": {"predict_length": 3}, "non_finite": "fail_fast"}"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.target.predict_length, 3);
        assert_eq!(config.window.window_length, 100);
        assert_eq!(config.non_finite, NonFinitePolicy::FailFast);
    }
}
