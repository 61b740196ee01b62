//! Calculator extraction.
//!
//! Turns a portfolio into one [`CalculatorRecord`] per trade whose calculator
//! and currencies can be resolved. Trades that fail are logged, reported and
//! left out; the run carries on without them.

use amc_core::types::CurrencyError;
use amc_core::{NpvCube, ProgressObserver, SimulationGrid};
use amc_models::CrossAssetModel;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculator::{AmcCalculator, CalculatorError};
use crate::fees::FeeRecord;
use crate::portfolio::{Portfolio, Trade};
use crate::report::{FailureStage, TradeFailure};

/// Why a trade could not be registered.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Calculator retrieval failed.
    #[error(transparent)]
    Calculator(#[from] CalculatorError),

    /// NPV or fee currency not in the model.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Trade id not present in the cube.
    #[error("Trade id {0} not found in cube")]
    MissingCubeRow(String),
}

/// Everything the engine needs about one trade.
#[derive(Debug)]
pub struct CalculatorRecord {
    /// AMC calculator
    pub calculator: AmcCalculator,
    /// Row in the cube
    pub cube_row: usize,
    /// Label for log messages (the trade id)
    pub label: String,
    /// Trade type label
    pub trade_type: String,
    /// Multiplier including option sign
    pub multiplier: f64,
    /// Model currency index of the NPV currency
    pub ccy_index: usize,
    /// Fees resolved against the model
    pub fees: Vec<FeeRecord>,
}

impl CalculatorRecord {
    pub(crate) fn failure(
        &self,
        sample: Option<usize>,
        stage: FailureStage,
        message: String,
    ) -> TradeFailure {
        TradeFailure {
            trade_id: self.label.clone(),
            trade_type: self.trade_type.clone(),
            sample,
            stage,
            message,
        }
    }
}

/// Extracted calculators plus the trades that were skipped.
#[derive(Debug, Default)]
pub struct CalculatorRegistry {
    records: Vec<CalculatorRecord>,
    skipped: Vec<TradeFailure>,
}

impl CalculatorRegistry {
    /// Extracts a record for every trade in `portfolio`.
    ///
    /// Progress is reported as `(0, n + 1)` up front and `(i + 1, n + 1)`
    /// after trade `i`. The last step belongs to the valuation passes.
    pub fn build(
        portfolio: &Portfolio,
        model: &dyn CrossAssetModel,
        grid: &SimulationGrid,
        cube: &dyn NpvCube,
        progress: &dyn ProgressObserver,
    ) -> Self {
        let total = portfolio.len() + 1;
        progress.update_progress(0, total);

        let mut registry = Self::default();
        for (i, trade) in portfolio.iter().enumerate() {
            match extract(trade, model, grid, cube) {
                Ok(record) => {
                    debug!(
                        trade = %record.label,
                        trade_type = %record.trade_type,
                        kind = record.calculator.kind(),
                        ccy = %model.currencies()[record.ccy_index],
                        multiplier = record.multiplier,
                        fees = record.fees.len(),
                        "AMC calculator extracted"
                    );
                    registry.records.push(record);
                }
                Err(e) => {
                    warn!(
                        trade = trade.id(),
                        trade_type = trade.trade_type(),
                        "could not extract AMC calculator, trade is skipped: {}",
                        e
                    );
                    registry.skipped.push(TradeFailure {
                        trade_id: trade.id().to_string(),
                        trade_type: trade.trade_type().to_string(),
                        sample: None,
                        stage: FailureStage::Extraction,
                        message: e.to_string(),
                    });
                }
            }
            progress.update_progress(i + 1, total);
        }
        registry
    }

    /// Extracted records in portfolio order.
    #[inline]
    pub fn records(&self) -> &[CalculatorRecord] {
        &self.records
    }

    /// Mutable records, for path-evaluated calculators.
    #[inline]
    pub fn records_mut(&mut self) -> &mut [CalculatorRecord] {
        &mut self.records
    }

    /// Trades left out.
    #[inline]
    pub fn skipped(&self) -> &[TradeFailure] {
        &self.skipped
    }

    /// Number of extracted records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no trade could be extracted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of path-evaluated records.
    pub fn path_evaluated(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.calculator.is_path_evaluated())
            .count()
    }

    pub(crate) fn into_skipped(self) -> Vec<TradeFailure> {
        self.skipped
    }
}

fn extract(
    trade: &Trade,
    model: &dyn CrossAssetModel,
    grid: &SimulationGrid,
    cube: &dyn NpvCube,
) -> Result<CalculatorRecord, ExtractionError> {
    let calculator = trade.instrument().amc_calculator()?;
    let ccy_index = model.ccy_index(calculator.npv_currency())?;
    let cube_row = cube
        .index_of(trade.id())
        .ok_or_else(|| ExtractionError::MissingCubeRow(trade.id().to_string()))?;
    let fees = trade
        .fees()
        .iter()
        .map(|fee| {
            Ok(FeeRecord {
                ccy_index: model.ccy_index(fee.currency)?,
                amount: fee.amount,
                pay_date: fee.pay_date,
                pay_time: grid.time_from_reference(fee.pay_date),
            })
        })
        .collect::<Result<Vec<_>, ExtractionError>>()?;

    Ok(CalculatorRecord {
        calculator,
        cube_row,
        label: trade.id().to_string(),
        trade_type: trade.trade_type().to_string(),
        multiplier: trade.effective_multiplier(),
        ccy_index,
        fees,
    })
}
