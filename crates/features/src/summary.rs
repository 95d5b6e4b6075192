//! Distribution summary of horizon outcomes.
//!
//! Used to check how much of the outcome mass the quantizer range covers.

use crate::quantizer::Quantizer;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Summary statistics over the finite outcomes of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Number of outcomes, including non-finite ones.
    pub count: usize,
    /// Number of non-finite outcomes (excluded from the statistics below).
    pub non_finite: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub q05: f64,
    pub median: f64,
    pub q95: f64,
    /// Fraction of all outcomes the quantizer clips.
    pub clipped_frac: f64,
}

impl OutcomeSummary {
    /// Summarise outcomes against a quantizer's range.
    ///
    /// Returns `None` when there is no finite outcome.
    pub fn from_outcomes(outcomes: &[f64], quantizer: &Quantizer) -> Option<Self> {
        let finite: Vec<f64> = outcomes.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let clipped = outcomes.iter().filter(|&&v| quantizer.is_clipped(v)).count();
        let std_dev = if finite.len() > 1 {
            (&finite).std_dev()
        } else {
            0.0
        };

        let mut data = Data::new(finite.clone());
        Some(Self {
            count: outcomes.len(),
            non_finite: outcomes.len() - finite.len(),
            mean: (&finite).mean(),
            std_dev,
            min: Statistics::min(&finite),
            max: Statistics::max(&finite),
            q05: data.quantile(0.05),
            median: data.median(),
            q95: data.quantile(0.95),
            clipped_frac: clipped as f64 / outcomes.len() as f64,
        })
    }
}
