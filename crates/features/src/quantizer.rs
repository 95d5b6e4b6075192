//! Discretization of fractional price changes into ordered classes.
//!
//! Values are clipped to `[amin, amax]` and assigned to right-open bins
//! `[amin + k*step, amin + (k+1)*step)`. The last edge is pinned to `amax`,
//! so the final bin is cut short when `step` does not divide the range,
//! `amin` lands in class 0 and anything at or above `amax` lands in class
//! `num_bins`.
//!
//! Non-finite inputs: `-inf` clips to class 0, `+inf` and `NaN` go to the
//! final class (NaN sorts after every edge).

use tickseq_core::{ClassId, QuantizerConfig, Result};

/// Fixed-width binning with clipping.
#[derive(Debug, Clone)]
pub struct Quantizer {
    config: QuantizerConfig,
    /// `num_bins + 1` ascending edges from `amin` to `amax`.
    edges: Vec<f64>,
}

impl Quantizer {
    /// Create a quantizer, validating the configuration.
    pub fn new(config: QuantizerConfig) -> Result<Self> {
        config.validate()?;

        let mut edges: Vec<f64> = (0..config.num_bins())
            .map(|k| config.amin + k as f64 * config.step)
            .take_while(|&edge| edge < config.amax)
            .collect();
        edges.push(config.amax);

        Ok(Self { config, edges })
    }

    /// The configuration this quantizer was built from.
    pub fn config(&self) -> &QuantizerConfig {
        &self.config
    }

    /// Number of bins; the largest class index.
    pub fn num_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Number of distinct classes.
    pub fn num_classes(&self) -> usize {
        self.edges.len()
    }

    /// Whether a value falls outside `[amin, amax]` (non-finite counts as outside).
    pub fn is_clipped(&self, value: f64) -> bool {
        !(self.config.amin..=self.config.amax).contains(&value)
    }

    /// Class of a single value.
    pub fn quantize_one(&self, value: f64) -> ClassId {
        if value.is_nan() {
            return self.num_bins() as ClassId;
        }
        let clipped = value.clamp(self.config.amin, self.config.amax);
        let at_or_below = self.edges.partition_point(|&edge| edge <= clipped);
        at_or_below.saturating_sub(1).min(self.num_bins()) as ClassId
    }

    /// Classes of a sequence of values, same length as the input.
    pub fn quantize(&self, values: &[f64]) -> Vec<ClassId> {
        values.iter().map(|&v| self.quantize_one(v)).collect()
    }

    /// Representative change value for a class (bin midpoint; `amax` for the
    /// final class).
    pub fn bin_center(&self, class: ClassId) -> f64 {
        let k = class as usize;
        if k >= self.num_bins() {
            return self.config.amax;
        }
        (self.edges[k] + self.edges[k + 1]) / 2.0
    }
}

/// Quantize with a one-off quantizer.
pub fn quantize(values: &[f64], config: QuantizerConfig) -> Result<Vec<ClassId>> {
    Ok(Quantizer::new(config)?.quantize(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_quantizer() -> Quantizer {
        Quantizer::new(QuantizerConfig::default()).unwrap()
    }

    #[test]
    fn test_boundaries() {
        let classes = quantize(&[-0.01, 0.0, 0.01], QuantizerConfig::default()).unwrap();
        assert_eq!(classes, vec![0, 1000, 2000]);
    }

    #[test]
    fn test_clipping() {
        let q = default_quantizer();
        assert_eq!(q.quantize_one(-5.0), 0);
        assert_eq!(q.quantize_one(5.0), 2000);
        assert!(q.is_clipped(0.02));
        assert!(!q.is_clipped(0.01));
    }

    #[test]
    fn test_non_finite() {
        let q = default_quantizer();
        assert_eq!(q.quantize_one(f64::NEG_INFINITY), 0);
        assert_eq!(q.quantize_one(f64::INFINITY), 2000);
        assert_eq!(q.quantize_one(f64::NAN), 2000);
        assert!(q.is_clipped(f64::NAN));
    }

    #[test]
    fn test_monotonic() {
        let q = default_quantizer();
        let mut prev = 0;
        let mut x = -0.015;
        while x <= 0.015 {
            let class = q.quantize_one(x);
            assert!(class >= prev, "class dropped at {x}");
            prev = class;
            x += 3.3e-6;
        }
        assert_eq!(prev, 2000);
    }

    #[test]
    fn test_coarse_bins() {
        let config = QuantizerConfig {
            amin: -1.0,
            amax: 1.0,
            step: 0.5,
        };
        let q = Quantizer::new(config).unwrap();
        assert_eq!(q.num_classes(), 5);
        // [-1,-0.5) [-0.5,0) [0,0.5) [0.5,1) {1}
        assert_eq!(q.quantize(&[-1.0, -0.75, -0.5, -0.1, 0.0, 0.7, 1.0]), vec![0, 0, 1, 1, 2, 3, 4]);
        assert_relative_eq!(q.bin_center(0), -0.75);
        assert_relative_eq!(q.bin_center(2), 0.25);
        assert_relative_eq!(q.bin_center(4), 1.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = QuantizerConfig {
            amin: 0.0,
            amax: 0.0,
            step: 0.1,
        };
        assert!(Quantizer::new(config).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(default_quantizer().quantize(&[]).is_empty());
    }

    #[test]
    fn test_uneven_step() {
        let config = QuantizerConfig {
            amin: -0.01,
            amax: 0.01,
            step: 0.003,
        };
        let q = Quantizer::new(config).unwrap();
        // Edges -0.01, -0.007, ..., 0.008 and the short bin [0.008, 0.01)
        assert_eq!(q.num_bins(), 7);
        assert_eq!(q.num_classes(), 8);
        assert_eq!(q.quantize_one(-0.0071), 0);
        assert_eq!(q.quantize_one(-0.0069), 1);
        assert_eq!(q.quantize_one(0.0079), 5);
        assert_eq!(q.quantize_one(0.0081), 6);
        assert_eq!(q.quantize_one(0.0099), 6);
        assert_eq!(q.quantize_one(0.01), 7);
        assert_relative_eq!(q.bin_center(6), 0.009, epsilon = 1e-12);
    }

    #[test]
    fn test_step_wider_than_range() {
        let config = QuantizerConfig {
            amin: -0.01,
            amax: 0.01,
            step: 0.05,
        };
        let q = Quantizer::new(config).unwrap();
        assert_eq!(q.num_classes(), 2);
        assert_eq!(q.quantize(&[-1.0, -0.01, 0.0, 0.0099, 0.01, 1.0]), vec![0, 0, 0, 0, 1, 1]);
    }
}
