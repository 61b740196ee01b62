//! Engine error types.
//!
//! Only setup problems and infrastructure failures are errors. Trade-level
//! problems are recovered and reported through [`RunReport`](crate::RunReport).

use amc_core::types::{CurrencyError, DayCountConvention};
use amc_core::{CubeError, GridError};
use amc_models::ModelError;
use thiserror::Error;

/// Fatal errors aborting a cube build.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The portfolio contains no trades.
    #[error("Portfolio is empty")]
    EmptyPortfolio,

    /// Cube row count differs from the portfolio size.
    #[error("Cube has {cube} ids but the portfolio has {portfolio} trades")]
    CubeIdMismatch {
        /// Cube row count
        cube: usize,
        /// Portfolio size
        portfolio: usize,
    },

    /// Cube date count differs from the number of valuation dates.
    #[error("Cube has {cube} dates but the grid has {grid} valuation dates")]
    CubeDateMismatch {
        /// Cube date count
        cube: usize,
        /// Grid valuation-date count
        grid: usize,
    },

    /// Close-out values need a second depth layer.
    #[error("Cube depth {0} is too small for a grid with close-out lag (need at least 2)")]
    CubeDepthTooSmall(usize),

    /// Grid and model use different day counts.
    #[error("Grid day count {grid} does not match model day count {model}")]
    DayCountMismatch {
        /// Grid day count
        grid: DayCountConvention,
        /// Model day count
        model: DayCountConvention,
    },

    /// Seed 0 is reserved.
    #[error("Seed must not be zero")]
    ZeroSeed,

    /// A close-out date precedes every valuation date.
    #[error("Grid position {0} is a close-out date with no preceding valuation date")]
    CloseOutBeforeValuation(usize),

    /// Sticky-date grid whose close-out rows cannot be paired with
    /// valuation dates.
    #[error("Invalid sticky-date grid: {0}")]
    InvalidStickyGrid(String),

    /// Scenario currencies or indices requested without a market.
    #[error("Scenario data requested but no market data provider is set")]
    MissingMarket,

    /// A path does not match the grid or the model.
    #[error("Path for sample {sample} has shape {got_times}x{got_states}, expected {expected_times}x{expected_states}")]
    PathShape {
        /// Sample index
        sample: usize,
        /// Expected time points
        expected_times: usize,
        /// Actual time points
        got_times: usize,
        /// Expected state variables
        expected_states: usize,
        /// Actual state variables
        got_states: usize,
    },

    /// The run was cancelled.
    #[error("Cube build cancelled")]
    Cancelled,

    /// Model, curve or path source failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Cube write failure.
    #[error(transparent)]
    Cube(#[from] CubeError),

    /// Currency lookup failure.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Grid construction failure.
    #[error(transparent)]
    Grid(#[from] GridError),
}
