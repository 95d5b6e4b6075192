//! Sliding-window example generation.
//!
//! The generator walks the feature series once. At step `i` the window holds
//! feature rows `i - window_length .. i` (selected columns only), the target is
//! `targets[i]` (the outcome of the first feature after the window) and the
//! reference price is the raw price of row `i - 1`. After each step one row is
//! evicted and one appended; the window is never rebuilt.
//!
//! `Iterator::next` hands out owned snapshots. `next_view` lends the live
//! buffer instead and is valid until the next call.

use crate::ring::RingBuffer;
use serde::{Deserialize, Serialize};
use tickseq_core::{ClassId, Error, FeatureColumn, FeatureVector, Result, WindowConfig};
use tracing::debug;

/// Read-only view of a window: rows of `width` values, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct WindowView<'a> {
    first: &'a [f64],
    second: &'a [f64],
    width: usize,
}

impl<'a> WindowView<'a> {
    fn new(first: &'a [f64], second: &'a [f64], width: usize) -> Self {
        Self {
            first,
            second,
            width,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        (self.first.len() + self.second.len()) / self.width
    }

    /// Whether the window has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row `i`, oldest first.
    pub fn row(&self, i: usize) -> Option<&'a [f64]> {
        let start = i * self.width;
        if start < self.first.len() {
            Some(&self.first[start..start + self.width])
        } else {
            let start = start - self.first.len();
            self.second.get(start..start + self.width)
        }
    }

    /// All rows, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> + 'a {
        self.first
            .chunks_exact(self.width)
            .chain(self.second.chunks_exact(self.width))
    }

    /// Values of one column across all rows.
    pub fn column(&self, c: usize) -> impl Iterator<Item = f64> + 'a {
        self.rows().map(move |row| row[c])
    }

    /// Copy into an owned window.
    pub fn to_window(&self) -> Window {
        let mut values = Vec::with_capacity(self.first.len() + self.second.len());
        values.extend_from_slice(self.first);
        values.extend_from_slice(self.second);
        Window {
            values,
            width: self.width,
        }
    }
}

/// Owned window snapshot stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    values: Vec<f64>,
    width: usize,
}

impl Window {
    /// Build a window from row-major values.
    pub fn new(values: Vec<f64>, width: usize) -> Result<Self> {
        if width == 0 || values.len() % width != 0 {
            return Err(Error::data(format!(
                "{} values do not form rows of width {width}",
                values.len()
            )));
        }
        Ok(Self { values, width })
    }

    /// Borrow as a view.
    pub fn view(&self) -> WindowView<'_> {
        WindowView::new(&self.values, &[], self.width)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.len() / self.width
    }

    /// Whether the window has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Row `i`, oldest first.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.values.chunks_exact(self.width).nth(i)
    }

    /// Flat row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Rows as nested vectors.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .chunks_exact(self.width)
            .map(|row| row.to_vec())
            .collect()
    }
}

/// One training example borrowing the generator's buffer.
#[derive(Debug, Clone, Copy)]
pub struct ExampleView<'a, T = ClassId> {
    pub window: WindowView<'a>,
    pub target: T,
    pub reference_price: f64,
}

impl<T: Copy> ExampleView<'_, T> {
    /// Copy into an owned example.
    pub fn to_example(&self) -> Example<T> {
        Example {
            window: self.window.to_window(),
            target: self.target,
            reference_price: self.reference_price,
        }
    }
}

/// One owned training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example<T = ClassId> {
    /// `window_length` most recent rows of the selected columns.
    pub window: Window,
    /// Target of the feature right after the window.
    pub target: T,
    /// Raw price of the most recent row in the window.
    pub reference_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    /// Buffer not seeded yet.
    AwaitingInit,
    /// Buffer holds rows `next - window_length .. next`.
    Streaming { next: usize, emitted: bool },
    /// No further examples.
    Exhausted,
}

/// One-shot generator of sliding-window examples.
///
/// Produces `ceil(max(0, N - predict_length - window_length) / stride)`
/// examples for `N` features. Not restartable; build a new generator to
/// iterate again.
#[derive(Debug, Clone)]
pub struct WindowGenerator<T = ClassId> {
    features: Vec<FeatureVector>,
    targets: Vec<T>,
    columns: Vec<FeatureColumn>,
    window_length: usize,
    stride: usize,
    /// First step index without a target.
    end: usize,
    ring: RingBuffer,
    last_price: f64,
    state: WindowState,
}

impl<T: Copy> WindowGenerator<T> {
    /// Create a generator.
    ///
    /// `targets` must cover every feature with a future reference, i.e. at
    /// least `features.len() - predict_length` entries.
    pub fn new(
        features: Vec<FeatureVector>,
        targets: Vec<T>,
        config: &WindowConfig,
        predict_length: usize,
    ) -> Result<Self> {
        config.validate()?;
        if predict_length == 0 {
            return Err(Error::config("predict_length must be positive"));
        }

        let end = features.len().saturating_sub(predict_length);
        if targets.len() < end {
            return Err(Error::data(format!(
                "{} targets cannot cover {} features with predict_length {}",
                targets.len(),
                features.len(),
                predict_length
            )));
        }

        Ok(Self {
            ring: RingBuffer::new(config.window_length, config.columns.len()),
            features,
            targets,
            columns: config.columns.clone(),
            window_length: config.window_length,
            stride: config.stride,
            end,
            last_price: f64::NAN,
            state: WindowState::AwaitingInit,
        })
    }

    /// Create a generator over `(volume, change)` rows with stride 1.
    pub fn with_lengths(
        features: Vec<FeatureVector>,
        targets: Vec<T>,
        window_length: usize,
        predict_length: usize,
    ) -> Result<Self> {
        let config = WindowConfig {
            window_length,
            ..WindowConfig::default()
        };
        Self::new(features, targets, &config, predict_length)
    }

    /// Selected columns, in row order.
    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    /// Whether another example will be produced.
    pub fn has_next(&self) -> bool {
        self.remaining() > 0
    }

    /// Number of examples still to be produced.
    pub fn remaining(&self) -> usize {
        let steps_from = |next: usize| (self.end - next).div_ceil(self.stride);
        match self.state {
            WindowState::AwaitingInit if self.window_length < self.end => {
                steps_from(self.window_length)
            }
            WindowState::AwaitingInit => 0,
            WindowState::Streaming { next, emitted } => steps_from(next) - usize::from(emitted),
            WindowState::Exhausted => 0,
        }
    }

    /// Produce the next example as a view into the live buffer.
    pub fn next_view(&mut self) -> Option<ExampleView<'_, T>> {
        loop {
            match self.state {
                WindowState::AwaitingInit => {
                    if self.window_length < self.end {
                        self.seed();
                        self.state = WindowState::Streaming {
                            next: self.window_length,
                            emitted: false,
                        };
                    } else {
                        debug!(
                            features = self.features.len(),
                            window_length = self.window_length,
                            "series too short for a single window"
                        );
                        self.state = WindowState::Exhausted;
                    }
                }
                WindowState::Streaming {
                    next,
                    emitted: true,
                } => {
                    let to = next.saturating_add(self.stride);
                    if to >= self.end {
                        self.state = WindowState::Exhausted;
                    } else {
                        for i in next..to {
                            self.push_row(i);
                        }
                        self.state = WindowState::Streaming {
                            next: to,
                            emitted: false,
                        };
                    }
                }
                WindowState::Streaming {
                    next,
                    emitted: false,
                } => {
                    self.state = WindowState::Streaming {
                        next,
                        emitted: true,
                    };
                    let (first, second) = self.ring.as_slices();
                    return Some(ExampleView {
                        window: WindowView::new(first, second, self.ring.width()),
                        target: self.targets[next],
                        reference_price: self.last_price,
                    });
                }
                WindowState::Exhausted => return None,
            }
        }
    }

    /// Fill the buffer with the first `window_length` rows.
    fn seed(&mut self) {
        self.ring.clear();
        for i in 0..self.window_length {
            self.push_row(i);
        }
    }

    /// Append feature row `i`, evicting the oldest row once full.
    fn push_row(&mut self, i: usize) {
        let feature = &self.features[i];
        let slot = self.ring.push_slot();
        for (value, &column) in slot.iter_mut().zip(self.columns.iter()) {
            *value = feature.get(column);
        }
        self.last_price = feature.price;
    }
}

impl<T: Copy> Iterator for WindowGenerator<T> {
    type Item = Example<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_view().map(|view| view.to_example())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<T: Copy> ExactSizeIterator for WindowGenerator<T> {}
