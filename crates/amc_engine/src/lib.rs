//! # AMC Engine (L4: Exposure Cube)
//!
//! Builds a Monte Carlo NPV cube for a portfolio of trades priced with
//! American Monte Carlo calculators:
//!
//! - [`calculator`]: path-evaluated and batch-evaluated calculator traits
//! - [`portfolio`]: trades, fees and option positions
//! - [`registry`]: calculator extraction and per-trade records
//! - [`buffers`]: per-sample FX and IR state buffers
//! - [`fees`]: fee contributions
//! - [`engine`]: the two-pass [`AmcValuationEngine`]
//! - [`config`]: TOML run configuration
//! - [`parallel`]: Rayon settings
//! - [`report`]: run report and timings
//!
//! Depth 0 of the cube holds valuation-date values deflated in the base
//! currency; depth 1 (grids with a close-out lag) holds close-out values
//! in base currency units.

#![warn(missing_docs)]

mod bucketing;
mod scenario_writer;

pub mod buffers;
pub mod calculator;
pub mod config;
pub mod engine;
pub mod error;
pub mod fees;
pub mod parallel;
pub mod portfolio;
pub mod registry;
pub mod report;

pub use buffers::ConversionBuffers;
pub use calculator::{AmcCalculator, BatchCalculator, CalculatorError, PathCalculator};
pub use config::{
    ConfigError, CorrelationConfig, EngineConfig, ForeignConfig, GridConfig, IndexConfig,
    LgmConfig, MarketConfig, ModelConfig, RunConfig,
};
pub use engine::AmcValuationEngine;
pub use error::EngineError;
pub use fees::FeeRecord;
pub use parallel::ParallelConfig;
pub use portfolio::{AmcInstrument, FeePayment, OptionPosition, Portfolio, Trade};
pub use registry::{CalculatorRecord, CalculatorRegistry, ExtractionError};
pub use report::{EngineTimings, FailureStage, RunReport, TradeFailure};
