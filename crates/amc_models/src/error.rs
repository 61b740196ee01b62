//! Error types for models, curves and path generation.

use amc_core::types::{CurrencyError, DateError};
use thiserror::Error;

/// Model-layer errors.
///
/// # Examples
/// ```
/// use amc_models::ModelError;
///
/// let err = ModelError::InvalidMaturity { t: -1.0 };
/// assert_eq!(format!("{}", err), "Invalid maturity: t = -1");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Negative or otherwise unusable time.
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// Offending time in years
        t: f64,
    },

    /// Parameter outside its admissible range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Correlation matrix failed validation or factorisation.
    #[error("Correlation error: {0}")]
    Correlation(String),

    /// Slice length does not match the expected dimension.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// Time grid is empty, does not start at zero or is not increasing.
    #[error("Invalid time grid: {0}")]
    InvalidTimeGrid(String),

    /// Index name unknown to the market.
    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    /// An injected path source ran out of paths.
    #[error("Path source exhausted after {0} paths")]
    PathsExhausted(usize),

    /// Currency lookup failed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Date arithmetic failed.
    #[error(transparent)]
    Date(#[from] DateError),
}
