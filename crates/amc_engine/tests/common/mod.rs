//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use amc_core::types::{Currency, Date, DayCountConvention};
use amc_core::{InMemoryCube, MporMode, NpvCube, SimulationGrid};
use amc_engine::{
    AmcCalculator, AmcInstrument, BatchCalculator, CalculatorError, OptionPosition,
    PathCalculator, Trade,
};
use amc_models::{CrossAssetModel, ModelError, Path, PathCache, StateProcess};

pub const FX_SPOT: f64 = 1.1;

/// Numeraire behaviour of [`StubModel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StubNumeraire {
    /// Always 1.0
    One,
    /// exp(x), independent of time
    StateExp,
}

/// USD/EUR model with state layout [x_usd, x_eur, ln fx_eur].
#[derive(Debug, Clone)]
pub struct StubModel {
    pub numeraire: StubNumeraire,
    pub volatility: f64,
    pub fx_volatility: f64,
    pub day_count: DayCountConvention,
    currencies: Vec<Currency>,
}

impl StubModel {
    pub fn new(numeraire: StubNumeraire) -> Self {
        Self {
            numeraire,
            volatility: 0.01,
            fx_volatility: 0.0,
            day_count: DayCountConvention::ActualActual365,
            currencies: vec![Currency::USD, Currency::EUR],
        }
    }

    pub fn with_fx_volatility(mut self, vol: f64) -> Self {
        self.fx_volatility = vol;
        self
    }
}

impl StateProcess for StubModel {
    fn size(&self) -> usize {
        3
    }

    fn factors(&self) -> usize {
        3
    }

    fn initial_values(&self) -> Vec<f64> {
        vec![0.0, 0.0, FX_SPOT.ln()]
    }

    fn evolve(
        &self,
        _t0: f64,
        x0: &[f64],
        dt: f64,
        z: &[f64],
        out: &mut [f64],
    ) -> Result<(), ModelError> {
        let sdt = dt.sqrt();
        out[0] = x0[0] + self.volatility * sdt * z[0];
        out[1] = x0[1] + self.volatility * sdt * z[1];
        out[2] = x0[2] + self.fx_volatility * sdt * z[2];
        Ok(())
    }
}

impl CrossAssetModel for StubModel {
    fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    fn ir_state_index(&self, ccy_index: usize) -> usize {
        ccy_index
    }

    fn fx_state_index(&self, ccy_index: usize) -> usize {
        ccy_index + 1
    }

    fn numeraire(&self, _ccy_index: usize, _t: f64, x: f64) -> Result<f64, ModelError> {
        Ok(match self.numeraire {
            StubNumeraire::One => 1.0,
            StubNumeraire::StateExp => x.exp(),
        })
    }

    fn discount_bond(
        &self,
        _ccy_index: usize,
        t: f64,
        maturity: f64,
        _x: f64,
    ) -> Result<f64, ModelError> {
        if maturity < t {
            return Err(ModelError::InvalidMaturity { t: maturity - t });
        }
        Ok(1.0)
    }

    fn day_count(&self) -> DayCountConvention {
        self.day_count
    }
}

pub fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd(y, m, day).unwrap()
}

pub fn asof() -> Date {
    d(2024, 1, 2)
}

/// Three semi-annual valuation dates, no lag.
pub fn no_lag_grid() -> SimulationGrid {
    SimulationGrid::builder(asof(), DayCountConvention::ActualActual365)
        .valuation_dates(vec![d(2024, 7, 2), d(2025, 1, 2), d(2025, 7, 2)])
        .build()
        .unwrap()
}

/// Two semi-annual valuation dates with a 14-day close-out lag.
pub fn lagged_grid(mode: MporMode) -> SimulationGrid {
    SimulationGrid::builder(asof(), DayCountConvention::ActualActual365)
        .valuation_dates(vec![d(2024, 7, 2), d(2025, 1, 2)])
        .close_out_lag(14, mode)
        .build()
        .unwrap()
}

/// Valuation dates every 14 days whose close-out dates fall on the next
/// valuation date.
pub fn chained_grid(mode: MporMode) -> SimulationGrid {
    let dates = (1..=4).map(|i| asof().add_days(14 * i).unwrap()).collect();
    SimulationGrid::builder(asof(), DayCountConvention::ActualActual365)
        .valuation_dates(dates)
        .close_out_lag(14, mode)
        .build()
        .unwrap()
}

/// Path-evaluated calculator returning a fixed array.
pub struct FixedPayoff {
    pub currency: Currency,
    pub values: Vec<f64>,
}

impl PathCalculator for FixedPayoff {
    fn npv_currency(&self) -> Currency {
        self.currency
    }

    fn simulate_path(&mut self, path: &Path, _reuse: bool) -> Result<Vec<f64>, CalculatorError> {
        Ok(self.values.iter().copied().take(path.len()).collect())
    }
}

/// Path-evaluated calculator returning `scale · (1 + x)` of one state.
pub struct StatePayoff {
    pub currency: Currency,
    pub state: usize,
    pub scale: f64,
}

impl PathCalculator for StatePayoff {
    fn npv_currency(&self) -> Currency {
        self.currency
    }

    fn simulate_path(&mut self, path: &Path, _reuse: bool) -> Result<Vec<f64>, CalculatorError> {
        Ok(path
            .state_path(self.state)
            .iter()
            .map(|x| self.scale * (1.0 + x))
            .collect())
    }
}

/// Batch counterpart of [`StatePayoff`].
pub struct BatchStatePayoff {
    pub currency: Currency,
    pub state: usize,
    pub scale: f64,
    pub initial: f64,
}

impl BatchCalculator for BatchStatePayoff {
    fn npv_currency(&self) -> Currency {
        self.currency
    }

    fn simulate_paths(
        &self,
        _times: &[f64],
        cache: &PathCache,
        relevant: &[bool],
        _move_state_back: bool,
    ) -> Result<Vec<Vec<f64>>, CalculatorError> {
        let mut rows = vec![vec![self.scale * (1.0 + self.initial); cache.samples()]];
        for (t, _) in relevant.iter().enumerate().filter(|(_, r)| **r) {
            rows.push(
                cache
                    .values(t, self.state)
                    .iter()
                    .map(|x| self.scale * (1.0 + x))
                    .collect(),
            );
        }
        Ok(rows)
    }
}

/// Fails on one call (the `fail_on`-th, counting from 0), otherwise
/// delegates.
pub struct FailOnCall<C> {
    pub inner: C,
    pub fail_on: usize,
    pub calls: usize,
}

impl<C: PathCalculator> PathCalculator for FailOnCall<C> {
    fn npv_currency(&self) -> Currency {
        self.inner.npv_currency()
    }

    fn simulate_path(&mut self, path: &Path, reuse: bool) -> Result<Vec<f64>, CalculatorError> {
        let call = self.calls;
        self.calls += 1;
        if call == self.fail_on {
            return Err(CalculatorError::Evaluation(format!("failure on call {}", call)));
        }
        self.inner.simulate_path(path, reuse)
    }
}

/// Records the arguments of every call.
pub struct RecordingPayoff {
    pub calls: Arc<Mutex<Vec<(Vec<f64>, bool)>>>,
}

impl PathCalculator for RecordingPayoff {
    fn npv_currency(&self) -> Currency {
        Currency::USD
    }

    fn simulate_path(&mut self, path: &Path, reuse: bool) -> Result<Vec<f64>, CalculatorError> {
        self.calls
            .lock()
            .unwrap()
            .push((path.times().to_vec(), reuse));
        Ok(vec![0.0; path.len()])
    }
}

/// Records the masks of every batch call.
pub struct RecordingBatch {
    pub calls: Arc<Mutex<Vec<(usize, Vec<bool>, bool)>>>,
}

impl BatchCalculator for RecordingBatch {
    fn npv_currency(&self) -> Currency {
        Currency::USD
    }

    fn simulate_paths(
        &self,
        times: &[f64],
        cache: &PathCache,
        relevant: &[bool],
        move_state_back: bool,
    ) -> Result<Vec<Vec<f64>>, CalculatorError> {
        self.calls
            .lock()
            .unwrap()
            .push((times.len(), relevant.to_vec(), move_state_back));
        let rows = relevant.iter().filter(|&&r| r).count() + 1;
        Ok(vec![vec![0.0; cache.samples()]; rows])
    }
}

type Factory = Box<dyn Fn() -> Result<AmcCalculator, CalculatorError> + Send + Sync>;

/// Instrument handing out calculators from a factory.
pub struct TestInstrument {
    factory: Factory,
    position: Option<OptionPosition>,
    pub retrievals: AtomicUsize,
}

impl TestInstrument {
    pub fn new(factory: impl Fn() -> Result<AmcCalculator, CalculatorError> + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            position: None,
            retrievals: AtomicUsize::new(0),
        }
    }

    pub fn with_position(mut self, position: OptionPosition) -> Self {
        self.position = Some(position);
        self
    }
}

impl AmcInstrument for TestInstrument {
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        self.retrievals.fetch_add(1, Ordering::Relaxed);
        (self.factory)()
    }

    fn option_position(&self) -> Option<OptionPosition> {
        self.position
    }
}

pub fn path_trade(
    id: &str,
    make: impl Fn() -> Box<dyn PathCalculator> + Send + Sync + 'static,
) -> Trade {
    Trade::new(
        id,
        "Swap",
        Box::new(TestInstrument::new(move || {
            Ok(AmcCalculator::PathEvaluated(make()))
        })),
    )
}

pub fn batch_trade(
    id: &str,
    make: impl Fn() -> Box<dyn BatchCalculator> + Send + Sync + 'static,
) -> Trade {
    Trade::new(
        id,
        "Swap",
        Box::new(TestInstrument::new(move || {
            Ok(AmcCalculator::BatchEvaluated(make()))
        })),
    )
}

pub fn fixed_trade(id: &str, currency: Currency, values: Vec<f64>) -> Trade {
    path_trade(id, move || {
        Box::new(FixedPayoff {
            currency,
            values: values.clone(),
        })
    })
}

pub fn state_trade(id: &str, currency: Currency, state: usize, scale: f64) -> Trade {
    path_trade(id, move || {
        Box::new(StatePayoff {
            currency,
            state,
            scale,
        })
    })
}

pub fn batch_state_trade(id: &str, currency: Currency, state: usize, scale: f64, initial: f64) -> Trade {
    batch_trade(id, move || {
        Box::new(BatchStatePayoff {
            currency,
            state,
            scale,
            initial,
        })
    })
}

/// Every cube entry, time-zero slice included, in a fixed order.
pub fn snapshot(cube: &InMemoryCube) -> Vec<f64> {
    let mut out = Vec::new();
    for id in 0..cube.num_ids() {
        for depth in 0..cube.depth() {
            out.push(cube.get_t0(id, depth).unwrap());
            for date in 0..cube.num_dates() {
                out.extend_from_slice(cube.sample_values(id, date, depth).unwrap());
            }
        }
    }
    out
}
