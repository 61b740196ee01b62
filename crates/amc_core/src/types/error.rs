//! Error types for the core value types.
//!
//! This module provides:
//! - `DateError`: Errors from date construction and parsing
//! - `CurrencyError`: Errors from currency parsing and model lookup

use thiserror::Error;

/// Date-related errors.
///
/// # Examples
/// ```
/// use amc_core::types::DateError;
///
/// let err = DateError::InvalidDate { year: 2024, month: 2, day: 30 };
/// assert_eq!(format!("{}", err), "Invalid date: 2024-2-30");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Invalid date components (e.g., February 30th).
    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component (1-12)
        month: u32,
        /// Day component (1-31)
        day: u32,
    },

    /// Failed to parse date string.
    #[error("Date parse error: {0}")]
    ParseError(String),

    /// Date arithmetic left the representable range.
    #[error("Date out of range: {0}")]
    OutOfRange(String),
}

/// Currency-related errors.
///
/// # Examples
/// ```
/// use amc_core::types::CurrencyError;
///
/// let err = CurrencyError::UnknownCurrency("XYZ".to_string());
/// assert_eq!(format!("{}", err), "Unknown currency: XYZ");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Unknown currency code.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Currency is not part of the model's currency list.
    #[error("Currency {0} is not covered by the model")]
    NotInModel(String),
}
