//! AMC calculator interfaces.
//!
//! A trade exposes exactly one of two capabilities:
//!
//! - [`PathCalculator`]: evaluated once per sample on that sample's path,
//!   returning one value per path time point (index 0 is time zero).
//! - [`BatchCalculator`]: evaluated once per trade on the cached states of
//!   every sample, returning one row per relevant time plus a leading
//!   time-zero row, each row holding one value per sample.
//!
//! Values are deflated by the numeraire of the calculator's NPV currency.

use amc_core::types::Currency;
use amc_models::{Path, PathCache};
use thiserror::Error;

/// Calculator retrieval and evaluation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalculatorError {
    /// The instrument has no AMC calculator.
    #[error("No AMC calculator available: {0}")]
    NotAvailable(String),

    /// Evaluation failed inside the calculator.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// Result shape differs from what the engine asked for.
    #[error("Unexpected result shape: expected {expected}, got {got}")]
    Shape {
        /// Expected shape
        expected: String,
        /// Returned shape
        got: String,
    },
}

/// Path-evaluated calculator.
pub trait PathCalculator: Send + Sync {
    /// Currency in which the calculator's values are expressed.
    fn npv_currency(&self) -> Currency;

    /// Values on every time point of `path`.
    ///
    /// `reuse_last_events` is set for the close-out evaluation in sticky-date
    /// mode: exercise and other path events decided on the preceding
    /// valuation call are kept.
    fn simulate_path(
        &mut self,
        path: &Path,
        reuse_last_events: bool,
    ) -> Result<Vec<f64>, CalculatorError>;
}

/// Batch-evaluated calculator.
pub trait BatchCalculator: Send + Sync {
    /// Currency in which the calculator's values are expressed.
    fn npv_currency(&self) -> Currency;

    /// Values for every relevant time across all samples.
    ///
    /// # Arguments
    ///
    /// * `times` - Simulation times excluding time zero
    /// * `cache` - States of every sample at every entry of `times`
    /// * `relevant` - Which entries of `times` to value
    /// * `move_state_back` - Value relevant times using the state of the
    ///   preceding simulation time
    ///
    /// # Returns
    ///
    /// `count(relevant) + 1` rows of `cache.samples()` values; row 0 is time
    /// zero.
    fn simulate_paths(
        &self,
        times: &[f64],
        cache: &PathCache,
        relevant: &[bool],
        move_state_back: bool,
    ) -> Result<Vec<Vec<f64>>, CalculatorError>;
}

/// A calculator tagged with its capability.
pub enum AmcCalculator {
    /// Evaluated per sample inside the path loop.
    PathEvaluated(Box<dyn PathCalculator>),
    /// Evaluated once over the full path cache.
    BatchEvaluated(Box<dyn BatchCalculator>),
}

impl AmcCalculator {
    /// NPV currency of the wrapped calculator.
    pub fn npv_currency(&self) -> Currency {
        match self {
            AmcCalculator::PathEvaluated(c) => c.npv_currency(),
            AmcCalculator::BatchEvaluated(c) => c.npv_currency(),
        }
    }

    /// Short name of the capability, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AmcCalculator::PathEvaluated(_) => "path",
            AmcCalculator::BatchEvaluated(_) => "batch",
        }
    }

    /// True for the path-evaluated capability.
    #[inline]
    pub fn is_path_evaluated(&self) -> bool {
        matches!(self, AmcCalculator::PathEvaluated(_))
    }
}

impl std::fmt::Debug for AmcCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmcCalculator")
            .field("kind", &self.kind())
            .field("npv_currency", &self.npv_currency())
            .finish()
    }
}

/// Runs a path calculator and checks the result length.
pub(crate) fn evaluate_path(
    calculator: &mut dyn PathCalculator,
    path: &Path,
    reuse_last_events: bool,
) -> Result<Vec<f64>, CalculatorError> {
    let values = calculator.simulate_path(path, reuse_last_events)?;
    if values.len() != path.len() {
        return Err(CalculatorError::Shape {
            expected: path.len().to_string(),
            got: values.len().to_string(),
        });
    }
    Ok(values)
}

/// Runs a batch calculator and checks the result shape.
pub(crate) fn evaluate_batch(
    calculator: &dyn BatchCalculator,
    times: &[f64],
    cache: &PathCache,
    relevant: &[bool],
    move_state_back: bool,
) -> Result<Vec<Vec<f64>>, CalculatorError> {
    let rows = relevant.iter().filter(|&&r| r).count() + 1;
    let samples = cache.samples();
    let result = calculator.simulate_paths(times, cache, relevant, move_state_back)?;
    let bad_row = result.iter().find(|row| row.len() != samples);
    if result.len() != rows || bad_row.is_some() {
        return Err(CalculatorError::Shape {
            expected: format!("{}x{}", rows, samples),
            got: format!(
                "{}x{}",
                result.len(),
                bad_row.or(result.first()).map_or(0, |r| r.len())
            ),
        });
    }
    Ok(result)
}
