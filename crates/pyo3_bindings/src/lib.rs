//! PyO3 bindings for the tickseq data pipeline.
//!
//! Exposes the pipeline to a Python training loop:
//! - `get_data` (features and horizon outcomes from a CSV file)
//! - `quantize` and `bin_center` (outcome discretization)
//! - `WindowGenerator` (sliding-window examples as a Python iterator)
//! - `run` (all of the above in one call)

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

use tickseq_core::{
    AggregationConfig, Error as RustError, FeatureVector as RustFeatureVector, PipelineConfig,
    QuantizerConfig,
};
use tickseq_features::{Pipeline, Quantizer, WindowGenerator as RustWindowGenerator};

fn to_py_err(err: RustError) -> PyErr {
    match err {
        RustError::Io(e) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// Per-bucket `(volume, price, change)` feature vector.
#[pyclass]
#[derive(Clone)]
pub struct FeatureVector {
    #[pyo3(get)]
    pub ts_ms: i64,
    #[pyo3(get)]
    pub volume: f64,
    #[pyo3(get)]
    pub price: f64,
    #[pyo3(get)]
    pub change: f64,
}

#[pymethods]
impl FeatureVector {
    #[new]
    fn new(ts_ms: i64, volume: f64, price: f64, change: f64) -> Self {
        FeatureVector {
            ts_ms,
            volume,
            price,
            change,
        }
    }

    /// The `(volume, price, change)` triple.
    fn as_tuple(&self) -> (f64, f64, f64) {
        (self.volume, self.price, self.change)
    }

    fn __repr__(&self) -> String {
        format!(
            "FeatureVector(ts_ms={}, volume={}, price={}, change={})",
            self.ts_ms, self.volume, self.price, self.change
        )
    }
}

impl From<FeatureVector> for RustFeatureVector {
    fn from(f: FeatureVector) -> Self {
        RustFeatureVector {
            ts_ms: f.ts_ms,
            volume: f.volume,
            price: f.price,
            change: f.change,
        }
    }
}

impl From<RustFeatureVector> for FeatureVector {
    fn from(f: RustFeatureVector) -> Self {
        FeatureVector {
            ts_ms: f.ts_ms,
            volume: f.volume,
            price: f.price,
            change: f.change,
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Sliding-window example generator.
///
/// Iterating yields `(window, target, reference_price)` where `window` is a
/// list of `[volume, change]` rows.
#[pyclass(name = "WindowGenerator")]
pub struct PyWindowGenerator {
    inner: RustWindowGenerator,
}

#[pymethods]
impl PyWindowGenerator {
    #[new]
    #[pyo3(signature = (features, outcomes, window_length=100, predict_length=10))]
    fn new(
        features: Vec<FeatureVector>,
        outcomes: Vec<u32>,
        window_length: usize,
        predict_length: usize,
    ) -> PyResult<Self> {
        let features = features.into_iter().map(|f| f.into()).collect();
        let inner = RustWindowGenerator::with_lengths(features, outcomes, window_length, predict_length)
            .map_err(to_py_err)?;
        Ok(PyWindowGenerator { inner })
    }

    /// Whether another example will be produced.
    fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    fn __len__(&self) -> usize {
        self.inner.remaining()
    }

    fn __iter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __next__(mut slf: PyRefMut<'_, Self>) -> Option<(Vec<Vec<f64>>, u32, f64)> {
        slf.inner
            .next()
            .map(|example| (example.window.to_rows(), example.target, example.reference_price))
    }
}

// ============================================================================
// Functions
// ============================================================================

fn pipeline_config(interval_length: u64, predict_length: usize, window_length: usize) -> PipelineConfig {
    let mut config = PipelineConfig {
        aggregation: AggregationConfig {
            interval_length_secs: interval_length,
            ..AggregationConfig::default()
        },
        ..PipelineConfig::default()
    };
    config.target.predict_length = predict_length;
    config.window.window_length = window_length;
    config
}

/// Features and horizon outcomes from a trade CSV file.
#[pyfunction]
#[pyo3(signature = (path, interval_length=1, predict_length=10))]
fn get_data(
    path: PathBuf,
    interval_length: u64,
    predict_length: usize,
) -> PyResult<(Vec<FeatureVector>, Vec<f64>)> {
    let (features, outcomes) =
        tickseq_features::get_data(path, interval_length, predict_length).map_err(to_py_err)?;
    Ok((features.into_iter().map(|f| f.into()).collect(), outcomes))
}

/// Clip and bin outcomes into class indices.
#[pyfunction]
#[pyo3(signature = (items, amin=-0.01, amax=0.01, step=1e-5))]
fn quantize(items: Vec<f64>, amin: f64, amax: f64, step: f64) -> PyResult<Vec<u32>> {
    tickseq_features::quantize(&items, QuantizerConfig { amin, amax, step }).map_err(to_py_err)
}

/// Representative change value of a class (bin midpoint; `amax` for the
/// final class).
#[pyfunction]
#[pyo3(signature = (class_id, amin=-0.01, amax=0.01, step=1e-5))]
fn bin_center(class_id: u32, amin: f64, amax: f64, step: f64) -> PyResult<f64> {
    let quantizer = Quantizer::new(QuantizerConfig { amin, amax, step }).map_err(to_py_err)?;
    Ok(quantizer.bin_center(class_id))
}

/// Build a window generator from features and quantized outcomes.
#[pyfunction]
#[pyo3(signature = (features, outcomes, window_length=100, predict_length=10))]
fn window_gen(
    features: Vec<FeatureVector>,
    outcomes: Vec<u32>,
    window_length: usize,
    predict_length: usize,
) -> PyResult<PyWindowGenerator> {
    PyWindowGenerator::new(features, outcomes, window_length, predict_length)
}

/// Read, prepare, quantize and window a trade CSV file.
#[pyfunction]
#[pyo3(signature = (path, predict_length=10, interval_length=1, window_length=100))]
fn run(
    path: PathBuf,
    predict_length: usize,
    interval_length: u64,
    window_length: usize,
) -> PyResult<PyWindowGenerator> {
    let pipeline = Pipeline::new(pipeline_config(interval_length, predict_length, window_length))
        .map_err(to_py_err)?;
    let inner = pipeline.run(path).map_err(to_py_err)?;
    Ok(PyWindowGenerator { inner })
}

// ============================================================================
// Module Definition
// ============================================================================

/// tickseq - tick data to sliding-window training examples.
#[pymodule]
fn tickseq(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<FeatureVector>()?;
    m.add_class::<PyWindowGenerator>()?;

    // Functions
    m.add_function(wrap_pyfunction!(get_data, m)?)?;
    m.add_function(wrap_pyfunction!(quantize, m)?)?;
    m.add_function(wrap_pyfunction!(bin_center, m)?)?;
    m.add_function(wrap_pyfunction!(window_gen, m)?)?;
    m.add_function(wrap_pyfunction!(run, m)?)?;

    Ok(())
}
