//! # AMC Core (L1: Foundation)
//!
//! Foundation types shared by the AMC exposure engine:
//!
//! - [`types`]: currencies, dates, day count conventions and error types
//! - [`grid`]: the simulation date grid with valuation / close-out flags
//!   and the margin-period-of-risk (MPOR) mode
//! - [`cube`]: the four-dimensional NPV cube (trade × date × sample × depth)
//! - [`scenario`]: aggregation scenario data written alongside the cube
//! - [`progress`]: best-effort progress observers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             amc_engine (L4)             │
//! │  registry, buffers, two-pass engine     │
//! └─────────────────────────────────────────┘
//!          ↓                     ↓
//! ┌──────────────────┐  ┌──────────────────┐
//! │  amc_models (L2) │→ │  amc_core (L1)   │
//! │  model, paths    │  │  grid, cube      │
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use amc_core::grid::{MporMode, SimulationGrid};
//! use amc_core::types::{Date, DayCountConvention};
//!
//! let asof = Date::from_ymd(2024, 1, 2).unwrap();
//! let dates = vec![
//!     Date::from_ymd(2024, 4, 2).unwrap(),
//!     Date::from_ymd(2024, 7, 2).unwrap(),
//! ];
//!
//! let grid = SimulationGrid::builder(asof, DayCountConvention::ActualActual365)
//!     .valuation_dates(dates)
//!     .close_out_lag(14, MporMode::ActualDate)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(grid.size(), 4);
//! assert_eq!(grid.valuation_count(), 2);
//! assert!(grid.with_close_out_lag());
//! ```

#![warn(missing_docs)]

pub mod cube;
pub mod grid;
pub mod progress;
pub mod scenario;
pub mod types;

pub use cube::{CubeError, InMemoryCube, NpvCube};
pub use grid::{GridError, MporMode, SimulationGrid, SimulationGridBuilder};
pub use progress::{NoProgress, ProgressObserver};
pub use scenario::{InMemoryScenarioData, ScenarioDataSink, ScenarioDataType};
pub use types::{Currency, CurrencyError, Date, DateError, DayCountConvention};
