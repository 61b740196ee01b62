//! Simulation date grid.
//!
//! A [`SimulationGrid`] is the ordered union of valuation dates and (when a
//! margin period of risk is modelled) close-out dates. Each position carries
//! two flags: whether it is a valuation date and whether it is a close-out
//! date. A position may carry both.
//!
//! The time grid has one more entry than the date list: index 0 is time zero
//! (the reference date) and index `k + 1` is the year fraction of date `k`.
//!
//! # Memory Layout
//!
//! ```text
//! times:        [0.0, t(d0), t(d1), ..., t(dn)]
//! dates:             [d0,    d1,    ..., dn]
//! is_valuation:      [true,  false, ..., true]
//! is_close_out:      [false, true,  ..., true]
//! ```

use thiserror::Error;

use crate::types::{Date, DateError, DayCountConvention};

/// Margin-period-of-risk convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MporMode {
    /// No close-out dates; depth 1 of the cube is unused.
    #[default]
    NoLag,
    /// Valuation and close-out sub-schedules are evaluated independently,
    /// each on a grid filtered to its own dates.
    StickyDate,
    /// A single evaluation over the full grid.
    ActualDate,
}

/// Grid construction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// No valuation dates were supplied.
    #[error("Simulation grid has no valuation dates")]
    NoValuationDates,

    /// Dates are not strictly increasing.
    #[error("Grid dates must be strictly increasing: {previous} followed by {next}")]
    NotIncreasing {
        /// Earlier date
        previous: Date,
        /// Date that does not come after it
        next: Date,
    },

    /// A grid date is on or before the reference date.
    #[error("Grid date {date} is not after the reference date {reference}")]
    NotAfterReference {
        /// Offending date
        date: Date,
        /// Reference date
        reference: Date,
    },

    /// The lag and the MPOR mode disagree.
    #[error("Close-out lag of {lag} days is inconsistent with MPOR mode {mode:?}")]
    LagModeMismatch {
        /// Lag in calendar days
        lag: i64,
        /// Requested mode
        mode: MporMode,
    },

    /// A close-out date falls after the next valuation date.
    #[error("Close-out date {close_out} of valuation date {valuation} is after the next valuation date {next}")]
    OverlappingCloseOut {
        /// Valuation date
        valuation: Date,
        /// Its close-out date
        close_out: Date,
        /// Next valuation date
        next: Date,
    },

    /// Flag vectors do not match the date count.
    #[error("Flag length mismatch: {dates} dates, {valuation} valuation flags, {close_out} close-out flags")]
    FlagLengthMismatch {
        /// Number of dates
        dates: usize,
        /// Number of valuation flags
        valuation: usize,
        /// Number of close-out flags
        close_out: usize,
    },

    /// A position is neither a valuation nor a close-out date.
    #[error("Grid position {0} is neither a valuation date nor a close-out date")]
    UnflaggedPosition(usize),

    /// Close-out flags were given but the mode has no lag.
    #[error("Close-out date at position {0} but MPOR mode is NoLag")]
    CloseOutWithoutLag(usize),

    /// Date arithmetic failed.
    #[error(transparent)]
    Date(#[from] DateError),
}

/// Immutable simulation grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationGrid {
    reference_date: Date,
    day_count: DayCountConvention,
    dates: Vec<Date>,
    times: Vec<f64>,
    is_valuation: Vec<bool>,
    is_close_out: Vec<bool>,
    mpor_mode: MporMode,
}

impl SimulationGrid {
    /// Starts a builder for a grid anchored at `reference_date`.
    pub fn builder(reference_date: Date, day_count: DayCountConvention) -> SimulationGridBuilder {
        SimulationGridBuilder::new(reference_date, day_count)
    }

    /// Builds a grid from explicit per-position flags.
    ///
    /// Dates must be strictly increasing and after the reference date, and
    /// every position must carry at least one flag. A close-out flag that is
    /// not preceded by a valuation flag is accepted here; the engine rejects
    /// such a grid at setup (see [`first_close_out_before_valuation`]).
    ///
    /// [`first_close_out_before_valuation`]: SimulationGrid::first_close_out_before_valuation
    pub fn from_flags(
        reference_date: Date,
        day_count: DayCountConvention,
        dates: Vec<Date>,
        is_valuation: Vec<bool>,
        is_close_out: Vec<bool>,
        mpor_mode: MporMode,
    ) -> Result<Self, GridError> {
        if dates.len() != is_valuation.len() || dates.len() != is_close_out.len() {
            return Err(GridError::FlagLengthMismatch {
                dates: dates.len(),
                valuation: is_valuation.len(),
                close_out: is_close_out.len(),
            });
        }
        if !is_valuation.iter().any(|&v| v) {
            return Err(GridError::NoValuationDates);
        }
        validate_dates(reference_date, &dates)?;

        for (i, (&v, &c)) in is_valuation.iter().zip(&is_close_out).enumerate() {
            if !v && !c {
                return Err(GridError::UnflaggedPosition(i));
            }
            if c && mpor_mode == MporMode::NoLag {
                return Err(GridError::CloseOutWithoutLag(i));
            }
        }

        let times = std::iter::once(0.0)
            .chain(
                dates
                    .iter()
                    .map(|&d| day_count.year_fraction(reference_date, d)),
            )
            .collect();

        Ok(Self {
            reference_date,
            day_count,
            dates,
            times,
            is_valuation,
            is_close_out,
            mpor_mode,
        })
    }

    /// Returns the reference (as-of) date.
    #[inline]
    pub fn reference_date(&self) -> Date {
        self.reference_date
    }

    /// Returns the day count convention.
    #[inline]
    pub fn day_count(&self) -> DayCountConvention {
        self.day_count
    }

    /// Returns all grid dates (valuation and close-out).
    #[inline]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Number of grid dates, excluding time zero.
    #[inline]
    pub fn size(&self) -> usize {
        self.dates.len()
    }

    /// Returns the time grid; `time_grid()[0] == 0.0` and has `size() + 1`
    /// entries.
    #[inline]
    pub fn time_grid(&self) -> &[f64] {
        &self.times
    }

    /// Whether grid position `k` (0-based over dates) is a valuation date.
    #[inline]
    pub fn is_valuation_date(&self, k: usize) -> bool {
        self.is_valuation[k]
    }

    /// Whether grid position `k` (0-based over dates) is a close-out date.
    #[inline]
    pub fn is_close_out_date(&self, k: usize) -> bool {
        self.is_close_out[k]
    }

    /// Valuation flags for every position.
    #[inline]
    pub fn valuation_flags(&self) -> &[bool] {
        &self.is_valuation
    }

    /// Close-out flags for every position.
    #[inline]
    pub fn close_out_flags(&self) -> &[bool] {
        &self.is_close_out
    }

    /// Valuation dates in order.
    pub fn valuation_dates(&self) -> Vec<Date> {
        self.dates
            .iter()
            .zip(&self.is_valuation)
            .filter_map(|(&d, &v)| v.then_some(d))
            .collect()
    }

    /// Number of valuation dates; equals the cube's date dimension.
    pub fn valuation_count(&self) -> usize {
        self.is_valuation.iter().filter(|&&v| v).count()
    }

    /// Positions (0-based over dates) flagged as valuation dates.
    pub fn valuation_positions(&self) -> Vec<usize> {
        positions(&self.is_valuation)
    }

    /// Positions (0-based over dates) flagged as close-out dates.
    pub fn close_out_positions(&self) -> Vec<usize> {
        positions(&self.is_close_out)
    }

    /// Returns the MPOR mode.
    #[inline]
    pub fn mpor_mode(&self) -> MporMode {
        self.mpor_mode
    }

    /// True when close-out values are produced (sticky or actual mode).
    #[inline]
    pub fn with_close_out_lag(&self) -> bool {
        self.mpor_mode != MporMode::NoLag
    }

    /// True for the sticky-date convention.
    #[inline]
    pub fn with_mpor_sticky_date(&self) -> bool {
        self.mpor_mode == MporMode::StickyDate
    }

    /// Year fraction from the reference date to `date` under the grid's
    /// day count.
    pub fn time_from_reference(&self, date: Date) -> f64 {
        self.day_count.year_fraction(self.reference_date, date)
    }

    /// First position flagged as close-out with no valuation date strictly
    /// before it, if any. A position that is both valuation and close-out
    /// counts as its own predecessor only for later positions.
    pub fn first_close_out_before_valuation(&self) -> Option<usize> {
        let mut seen_valuation = false;
        for k in 0..self.size() {
            if self.is_close_out[k] && !seen_valuation {
                return Some(k);
            }
            seen_valuation |= self.is_valuation[k];
        }
        None
    }
}

fn positions(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(k, &f)| f.then_some(k))
        .collect()
}

fn validate_dates(reference: Date, dates: &[Date]) -> Result<(), GridError> {
    if let Some(&first) = dates.first() {
        if first <= reference {
            return Err(GridError::NotAfterReference {
                date: first,
                reference,
            });
        }
    }
    for w in dates.windows(2) {
        if w[1] <= w[0] {
            return Err(GridError::NotIncreasing {
                previous: w[0],
                next: w[1],
            });
        }
    }
    Ok(())
}

/// Builder for [`SimulationGrid`] from valuation dates and a close-out lag.
///
/// With a lag of `d > 0` days each valuation date `v` gets a close-out date
/// `v + d`; the grid is the sorted union of both sets. A close-out date that
/// coincides with the next valuation date shares its position.
#[derive(Debug, Clone)]
pub struct SimulationGridBuilder {
    reference_date: Date,
    day_count: DayCountConvention,
    valuation_dates: Vec<Date>,
    close_out_lag: i64,
    mpor_mode: MporMode,
}

impl SimulationGridBuilder {
    /// Creates a builder with no dates and no lag.
    pub fn new(reference_date: Date, day_count: DayCountConvention) -> Self {
        Self {
            reference_date,
            day_count,
            valuation_dates: Vec::new(),
            close_out_lag: 0,
            mpor_mode: MporMode::NoLag,
        }
    }

    /// Sets the valuation dates.
    pub fn valuation_dates(mut self, dates: Vec<Date>) -> Self {
        self.valuation_dates = dates;
        self
    }

    /// Sets the close-out lag in calendar days and the MPOR mode.
    pub fn close_out_lag(mut self, days: i64, mode: MporMode) -> Self {
        self.close_out_lag = days;
        self.mpor_mode = mode;
        self
    }

    /// Builds the grid.
    ///
    /// # Errors
    ///
    /// - `NoValuationDates` if no dates were given
    /// - `NotIncreasing` / `NotAfterReference` for badly ordered dates
    /// - `LagModeMismatch` if a positive lag is paired with `NoLag` or a
    ///   non-positive lag with a lagged mode
    /// - `OverlappingCloseOut` if a close-out date passes the next valuation
    pub fn build(self) -> Result<SimulationGrid, GridError> {
        let vals = self.valuation_dates;
        if vals.is_empty() {
            return Err(GridError::NoValuationDates);
        }
        validate_dates(self.reference_date, &vals)?;

        let lagged = self.close_out_lag > 0;
        if lagged != (self.mpor_mode != MporMode::NoLag) {
            return Err(GridError::LagModeMismatch {
                lag: self.close_out_lag,
                mode: self.mpor_mode,
            });
        }

        if !lagged {
            let n = vals.len();
            return SimulationGrid::from_flags(
                self.reference_date,
                self.day_count,
                vals,
                vec![true; n],
                vec![false; n],
                MporMode::NoLag,
            );
        }

        let close_outs = vals
            .iter()
            .map(|v| v.add_days(self.close_out_lag))
            .collect::<Result<Vec<_>, _>>()?;

        for i in 0..vals.len().saturating_sub(1) {
            if close_outs[i] > vals[i + 1] {
                return Err(GridError::OverlappingCloseOut {
                    valuation: vals[i],
                    close_out: close_outs[i],
                    next: vals[i + 1],
                });
            }
        }

        let mut dates: Vec<Date> = vals.iter().chain(&close_outs).copied().collect();
        dates.sort();
        dates.dedup();

        let is_valuation = dates.iter().map(|d| vals.binary_search(d).is_ok()).collect();
        let is_close_out = dates
            .iter()
            .map(|d| close_outs.binary_search(d).is_ok())
            .collect();

        SimulationGrid::from_flags(
            self.reference_date,
            self.day_count,
            dates,
            is_valuation,
            is_close_out,
            self.mpor_mode,
        )
    }
}
