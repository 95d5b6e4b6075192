//! Fixed-size batching of examples for model consumption.

use tickseq_core::ClassId;
use tickseq_features::Example;

/// A batch of examples.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub examples: Vec<Example>,
}

impl Batch {
    /// Number of examples.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// `(batch, window_length, width)`; zeros for an empty batch.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.examples
            .first()
            .map(|e| (self.len(), e.window.len(), e.window.width()))
            .unwrap_or((0, 0, 0))
    }

    /// All window values, example-major then row-major.
    pub fn flat_inputs(&self) -> Vec<f64> {
        let (b, w, c) = self.shape();
        let mut out = Vec::with_capacity(b * w * c);
        for example in &self.examples {
            out.extend_from_slice(example.window.values());
        }
        out
    }

    /// Reference price per example.
    pub fn reference_prices(&self) -> Vec<f64> {
        self.examples.iter().map(|e| e.reference_price).collect()
    }

    /// Target class per example.
    pub fn targets(&self) -> Vec<ClassId> {
        self.examples.iter().map(|e| e.target).collect()
    }
}

/// Groups an example stream into batches of `batch_size`.
#[derive(Debug)]
pub struct Batcher<I> {
    inner: I,
    batch_size: usize,
    drop_last: bool,
}

impl<I: Iterator<Item = Example>> Batcher<I> {
    /// Create a batcher. A `batch_size` of zero is treated as one.
    pub fn new(inner: I, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
            drop_last: false,
        }
    }

    /// Drop a trailing batch smaller than `batch_size`.
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }
}

impl<I: Iterator<Item = Example>> Iterator for Batcher<I> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        let examples: Vec<Example> = self.inner.by_ref().take(self.batch_size).collect();
        if examples.is_empty() || (self.drop_last && examples.len() < self.batch_size) {
            return None;
        }
        Some(Batch { examples })
    }
}
