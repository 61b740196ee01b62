//! Dates and day count conventions for the simulation grid.
//!
//! # Examples
//!
//! ```
//! use amc_core::types::{Date, DayCountConvention};
//!
//! let start = Date::from_ymd(2024, 1, 1).unwrap();
//! let end = Date::from_ymd(2024, 7, 1).unwrap();
//!
//! let yf = DayCountConvention::ActualActual365.year_fraction(start, end);
//! assert!((yf - 0.4986).abs() < 0.001);
//! ```

use chrono::{Datelike, Duration, Months, NaiveDate};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use super::error::DateError;

/// Type-safe date wrapper around `chrono::NaiveDate`.
///
/// Serialises as an ISO 8601 string (`YYYY-MM-DD`).
///
/// ```
/// use amc_core::types::Date;
///
/// let date = Date::from_ymd(2024, 6, 15).unwrap();
/// let parsed: Date = "2024-06-15".parse().unwrap();
/// assert_eq!(date, parsed);
/// assert_eq!(date.add_days(10).unwrap() - date, 10);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a Date from year, month, and day components.
    ///
    /// # Errors
    /// `DateError::InvalidDate` for impossible dates such as February 30th.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or(DateError::InvalidDate { year, month, day })
    }

    /// Parses a date from ISO 8601 format (`YYYY-MM-DD`).
    pub fn parse(s: &str) -> Result<Self, DateError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Date)
            .map_err(|e| DateError::ParseError(format!("'{}': {}", s, e)))
    }

    /// Returns the date shifted by `days` calendar days.
    pub fn add_days(self, days: i64) -> Result<Self, DateError> {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Date)
            .ok_or_else(|| DateError::OutOfRange(format!("{} + {} days", self, days)))
    }

    /// Returns the date shifted by `months` calendar months, clamping to the
    /// end of the month (31 January + 1 month = 29 February in a leap year).
    pub fn add_months(self, months: u32) -> Result<Self, DateError> {
        self.0
            .checked_add_months(Months::new(months))
            .map(Date)
            .ok_or_else(|| DateError::OutOfRange(format!("{} + {} months", self, months)))
    }

    /// Returns the underlying `NaiveDate`.
    pub fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// Returns the year component.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day component (1-31).
    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl Sub for Date {
    type Output = i64;

    /// Number of calendar days from `other` to `self`.
    fn sub(self, other: Self) -> i64 {
        (self.0 - other.0).num_days()
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        Date::parse(s)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Day count convention used to map grid dates onto model time.
///
/// The grid and the model must agree on the convention; the engine rejects
/// a run where they differ.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DayCountConvention {
    /// Actual/365 Fixed: actual_days / 365.0
    #[default]
    ActualActual365,

    /// Actual/360: actual_days / 360.0
    ActualActual360,

    /// 30/360 US Bond Basis
    Thirty360,
}

impl DayCountConvention {
    /// Returns the standard convention name.
    ///
    /// ```
    /// use amc_core::types::DayCountConvention;
    ///
    /// assert_eq!(DayCountConvention::ActualActual365.name(), "ACT/365");
    /// assert_eq!(DayCountConvention::Thirty360.name(), "30/360");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            DayCountConvention::ActualActual365 => "ACT/365",
            DayCountConvention::ActualActual360 => "ACT/360",
            DayCountConvention::Thirty360 => "30/360",
        }
    }

    /// Year fraction between two dates; negative when `start > end`.
    pub fn year_fraction(&self, start: Date, end: Date) -> f64 {
        match self {
            DayCountConvention::ActualActual365 => (end - start) as f64 / 365.0,
            DayCountConvention::ActualActual360 => (end - start) as f64 / 360.0,
            DayCountConvention::Thirty360 => {
                let (a, b, sign) = if start <= end {
                    (start, end, 1.0)
                } else {
                    (end, start, -1.0)
                };

                let d1 = if a.day() == 31 { 30 } else { a.day() };
                let d2 = if b.day() == 31 && d1 == 30 { 30 } else { b.day() };

                let days = 360 * (b.year() - a.year())
                    + 30 * (b.month() as i32 - a.month() as i32)
                    + (d2 as i32 - d1 as i32);
                sign * days as f64 / 360.0
            }
        }
    }
}

impl FromStr for DayCountConvention {
    type Err = String;

    /// Parses a day count convention (case-insensitive, common aliases).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(['/', ' '], "").as_str() {
            "ACT365" | "ACTUAL365" | "A365" | "ACT365FIXED" => {
                Ok(DayCountConvention::ActualActual365)
            }
            "ACT360" | "ACTUAL360" | "A360" => Ok(DayCountConvention::ActualActual360),
            "30360" | "THIRTY360" => Ok(DayCountConvention::Thirty360),
            _ => Err(format!("Unknown day count convention: {}", s)),
        }
    }
}

impl fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::DayCountConvention;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    impl Serialize for DayCountConvention {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(self.name())
        }
    }

    impl<'de> Deserialize<'de> for DayCountConvention {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            DayCountConvention::from_str(&s).map_err(de::Error::custom)
        }
    }
}
