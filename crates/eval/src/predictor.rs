//! The predictor seam toward the (external) model.
//!
//! A predictor maps a feature window and the window's reference price to a
//! probability vector over the quantized outcome classes.

use tickseq_core::{ClassId, Error, Result};
use tickseq_features::WindowView;

/// Opaque class-probability model.
pub trait Predictor {
    /// Length of the probability vectors produced.
    fn num_classes(&self) -> usize;

    /// Class probabilities for one window.
    fn predict(&self, window: WindowView<'_>, reference_price: f64) -> Vec<f64>;
}

/// Assigns the same probability to every class.
#[derive(Debug, Clone)]
pub struct UniformPredictor {
    num_classes: usize,
}

impl UniformPredictor {
    /// Create a uniform predictor.
    pub fn new(num_classes: usize) -> Self {
        Self { num_classes }
    }
}

impl Predictor for UniformPredictor {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, _window: WindowView<'_>, _reference_price: f64) -> Vec<f64> {
        vec![1.0 / self.num_classes as f64; self.num_classes]
    }
}

/// Predicts the (smoothed) class frequencies seen during fitting.
#[derive(Debug, Clone)]
pub struct PriorPredictor {
    probs: Vec<f64>,
}

impl PriorPredictor {
    /// Fit class frequencies with additive (Laplace) smoothing.
    pub fn fit(
        targets: impl IntoIterator<Item = ClassId>,
        num_classes: usize,
        smoothing: f64,
    ) -> Result<Self> {
        if num_classes == 0 {
            return Err(Error::config("num_classes must be positive"));
        }
        if smoothing < 0.0 {
            return Err(Error::config("smoothing must be non-negative"));
        }

        let mut counts = vec![smoothing; num_classes];
        for target in targets {
            let slot = counts.get_mut(target as usize).ok_or_else(|| {
                Error::data(format!("target {target} outside {num_classes} classes"))
            })?;
            *slot += 1.0;
        }

        let total: f64 = counts.iter().sum();
        if total <= 0.0 {
            return Err(Error::data("no targets to fit and no smoothing"));
        }
        Ok(Self {
            probs: counts.into_iter().map(|c| c / total).collect(),
        })
    }

    /// The fitted probabilities.
    pub fn probs(&self) -> &[f64] {
        &self.probs
    }
}

impl Predictor for PriorPredictor {
    fn num_classes(&self) -> usize {
        self.probs.len()
    }

    fn predict(&self, _window: WindowView<'_>, _reference_price: f64) -> Vec<f64> {
        self.probs.clone()
    }
}
