//! Classification metrics for a predictor over an example stream.

use crate::predictor::Predictor;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tickseq_core::{ClassId, Error, Result};
use tickseq_features::{Example, WindowGenerator};
use tracing::info;

/// Probability floor used when taking logs.
const PROB_FLOOR: f64 = 1e-12;

/// Evaluation metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalMetrics {
    /// Number of examples scored.
    pub examples: usize,
    /// Mean of `-ln p[target]`.
    pub mean_cross_entropy: f64,
    /// Fraction of examples whose argmax class equals the target.
    pub accuracy: f64,
    /// Mean absolute distance between argmax class and target, in classes.
    pub mean_abs_class_error: f64,
}

/// Index of the largest probability (first one on ties).
pub fn argmax(probs: &[f64]) -> Option<ClassId> {
    probs
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|&(_, &p)| OrderedFloat(p))
        .map(|(i, _)| i as ClassId)
}

/// Running metrics accumulator.
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    num_classes: usize,
    examples: usize,
    cross_entropy_sum: f64,
    correct: usize,
    abs_class_error_sum: f64,
}

impl MetricsCalculator {
    /// Create a calculator for `num_classes`-way predictions.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            examples: 0,
            cross_entropy_sum: 0.0,
            correct: 0,
            abs_class_error_sum: 0.0,
        }
    }

    /// Score one prediction.
    pub fn add(&mut self, probs: &[f64], target: ClassId) -> Result<()> {
        if probs.len() != self.num_classes {
            return Err(Error::data(format!(
                "prediction has {} classes, expected {}",
                probs.len(),
                self.num_classes
            )));
        }
        let p = probs.get(target as usize).copied().ok_or_else(|| {
            Error::data(format!("target {target} outside {} classes", self.num_classes))
        })?;

        self.examples += 1;
        self.cross_entropy_sum -= p.max(PROB_FLOOR).ln();
        if let Some(predicted) = argmax(probs) {
            if predicted == target {
                self.correct += 1;
            }
            self.abs_class_error_sum += (predicted as f64 - target as f64).abs();
        }
        Ok(())
    }

    /// Metrics over everything scored so far.
    pub fn finish(&self) -> EvalMetrics {
        if self.examples == 0 {
            return EvalMetrics::default();
        }
        let n = self.examples as f64;
        EvalMetrics {
            examples: self.examples,
            mean_cross_entropy: self.cross_entropy_sum / n,
            accuracy: self.correct as f64 / n,
            mean_abs_class_error: self.abs_class_error_sum / n,
        }
    }
}

/// Score a predictor on a generator, borrowing each window in place.
pub fn evaluate<P: Predictor>(predictor: &P, generator: &mut WindowGenerator) -> Result<EvalMetrics> {
    let mut calculator = MetricsCalculator::new(predictor.num_classes());
    while let Some(example) = generator.next_view() {
        let probs = predictor.predict(example.window, example.reference_price);
        calculator.add(&probs, example.target)?;
    }

    let metrics = calculator.finish();
    info!(
        examples = metrics.examples,
        cross_entropy = metrics.mean_cross_entropy,
        accuracy = metrics.accuracy,
        "evaluation finished"
    );
    Ok(metrics)
}

/// Score a predictor on owned examples.
pub fn evaluate_examples<'a, P: Predictor>(
    predictor: &P,
    examples: impl IntoIterator<Item = &'a Example>,
) -> Result<EvalMetrics> {
    let mut calculator = MetricsCalculator::new(predictor.num_classes());
    for example in examples {
        let probs = predictor.predict(example.window.view(), example.reference_price);
        calculator.add(&probs, example.target)?;
    }
    Ok(calculator.finish())
}
