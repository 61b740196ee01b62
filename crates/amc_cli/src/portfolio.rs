//! Demo portfolio of closed-form AMC trades.
//!
//! - `ZeroBond`: unit zero-coupon bond per model currency, path evaluated
//! - `FxForward`: forward on each foreign currency against the base
//!   currency, batch evaluated on the path cache
//!
//! Both calculators return values deflated by the numeraire of their NPV
//! currency, as the engine expects.

use amc_core::types::{Currency, Date};
use amc_core::SimulationGrid;
use amc_engine::{
    AmcCalculator, AmcInstrument, BatchCalculator, CalculatorError, PathCalculator, Portfolio,
    Trade,
};
use amc_models::{
    CrossAssetModel, GaussianCrossAssetModel, LgmComponent, ModelError, Path, PathCache,
    YieldCurve,
};

fn evaluation_error(e: ModelError) -> CalculatorError {
    CalculatorError::Evaluation(e.to_string())
}

/// Zero bond paying `notional` at `maturity` (model time).
#[derive(Debug, Clone)]
pub struct ZeroBond {
    currency: Currency,
    lgm: LgmComponent,
    ir_state: usize,
    notional: f64,
    maturity: f64,
}

impl PathCalculator for ZeroBond {
    fn npv_currency(&self) -> Currency {
        self.currency
    }

    fn simulate_path(&mut self, path: &Path, _reuse: bool) -> Result<Vec<f64>, CalculatorError> {
        (0..path.len())
            .map(|t| {
                let time = path.time(t);
                if time >= self.maturity {
                    return Ok(0.0);
                }
                let x = path.value(self.ir_state, t);
                let bond = self.lgm.discount_bond(time, self.maturity, x)?;
                Ok(self.notional * bond / self.lgm.numeraire(time, x)?)
            })
            .collect::<Result<Vec<_>, ModelError>>()
            .map_err(evaluation_error)
    }
}

impl AmcInstrument for ZeroBond {
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        Ok(AmcCalculator::PathEvaluated(Box::new(self.clone())))
    }
}

/// Receives `notional` foreign currency against `notional · strike` base
/// currency at `maturity`; NPV in the base currency.
#[derive(Debug, Clone)]
pub struct FxForward {
    base: LgmComponent,
    foreign: LgmComponent,
    base_state: usize,
    foreign_state: usize,
    fx_state: usize,
    spot: f64,
    notional: f64,
    strike: f64,
    maturity: f64,
}

impl FxForward {
    fn deflated(&self, t: f64, x_base: f64, x_foreign: f64, fx: f64) -> Result<f64, ModelError> {
        if t >= self.maturity {
            return Ok(0.0);
        }
        let receive = fx * self.foreign.discount_bond(t, self.maturity, x_foreign)?;
        let pay = self.strike * self.base.discount_bond(t, self.maturity, x_base)?;
        Ok(self.notional * (receive - pay) / self.base.numeraire(t, x_base)?)
    }
}

impl BatchCalculator for FxForward {
    fn npv_currency(&self) -> Currency {
        self.base.currency()
    }

    fn simulate_paths(
        &self,
        times: &[f64],
        cache: &PathCache,
        relevant: &[bool],
        _move_state_back: bool,
    ) -> Result<Vec<Vec<f64>>, CalculatorError> {
        let samples = cache.samples();
        let t0 = self.deflated(0.0, 0.0, 0.0, self.spot).map_err(evaluation_error)?;
        let mut rows = vec![vec![t0; samples]];
        for (t, &time) in times.iter().enumerate() {
            if !relevant[t] {
                continue;
            }
            let row = (0..samples)
                .map(|s| {
                    self.deflated(
                        time,
                        cache.value(t, self.base_state, s),
                        cache.value(t, self.foreign_state, s),
                        cache.value(t, self.fx_state, s).exp(),
                    )
                })
                .collect::<Result<Vec<_>, ModelError>>()
                .map_err(evaluation_error)?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl AmcInstrument for FxForward {
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        Ok(AmcCalculator::BatchEvaluated(Box::new(self.clone())))
    }
}

/// Builds the demo portfolio: a zero bond per currency maturing after the
/// last valuation date, and an at-the-money FX forward per foreign currency
/// maturing mid-grid.
pub fn demo_portfolio(
    model: &GaussianCrossAssetModel,
    grid: &SimulationGrid,
) -> Result<Portfolio, ModelError> {
    let dates = grid.dates();
    let last = dates.last().copied().unwrap_or(grid.reference_date());
    let bond_maturity = grid.time_from_reference(last.add_months(12)?);
    let forward_maturity = grid.time_from_reference(mid_date(grid));

    let mut portfolio = Portfolio::new();
    for (c, &currency) in model.currencies().iter().enumerate() {
        portfolio.push(Trade::new(
            format!("ZB_{}", currency),
            "ZeroBond",
            Box::new(ZeroBond {
                currency,
                lgm: model.lgm(c).clone(),
                ir_state: model.ir_state_index(c),
                notional: 1_000_000.0,
                maturity: bond_maturity,
            }),
        ));
    }

    let base = model.lgm(0);
    for (c, &currency) in model.currencies().iter().enumerate().skip(1) {
        let foreign = model.lgm(c);
        let spot = model.fx(c).spot();
        // forward rate from the initial curves
        let strike = spot * foreign.curve().discount_factor(forward_maturity)?
            / base.curve().discount_factor(forward_maturity)?;
        portfolio.push(Trade::new(
            format!("FXF_{}{}", currency, base.currency()),
            "FxForward",
            Box::new(FxForward {
                base: base.clone(),
                foreign: foreign.clone(),
                base_state: model.ir_state_index(0),
                foreign_state: model.ir_state_index(c),
                fx_state: model.fx_state_index(c),
                spot,
                notional: 1_000_000.0,
                strike,
                maturity: forward_maturity,
            }),
        ));
    }
    Ok(portfolio)
}

fn mid_date(grid: &SimulationGrid) -> Date {
    let dates = grid.dates();
    dates
        .get(dates.len() / 2)
        .copied()
        .unwrap_or(grid.reference_date())
}
