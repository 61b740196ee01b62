//! ISO 4217 currencies covered by the cross-asset model.
//!
//! # Examples
//!
//! ```
//! use amc_core::types::Currency;
//!
//! let eur: Currency = "eur".parse().unwrap();
//! assert_eq!(eur, Currency::EUR);
//! assert_eq!(eur.code(), "EUR");
//! ```

use std::fmt;
use std::str::FromStr;

use super::error::CurrencyError;

/// ISO 4217 currency codes.
///
/// The model's currency list is an ordered `Vec<Currency>` whose first entry
/// is the base (domestic) currency; the enum itself carries no ordering.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Currency {
    /// United States Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound Sterling
    GBP,
    /// Japanese Yen
    JPY,
    /// Swiss Franc
    CHF,
}

impl Currency {
    /// All supported currencies.
    pub const ALL: [Currency; 5] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::CHF,
    ];

    /// Returns the ISO 4217 three-letter currency code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
        }
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    /// Parses an ISO 4217 code (case-insensitive).
    fn from_str(s: &str) -> Result<Self, CurrencyError> {
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CurrencyError::UnknownCurrency(s.to_string()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
