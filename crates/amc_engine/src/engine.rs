//! Two-pass AMC valuation engine.
//!
//! # Pass 1 (per sample)
//!
//! 1. Draw the sample's path.
//! 2. Store its FX and IR states in the conversion buffers (and in the
//!    path cache when batch-evaluated trades exist).
//! 3. Emit scenario data for the valuation dates.
//! 4. Evaluate every path-evaluated trade on the path and write its cube
//!    entries.
//!
//! # Pass 2 (after all samples)
//!
//! Evaluate every batch-evaluated trade once on the full path cache and
//! write its entries for all samples.
//!
//! Trade evaluations run on the Rayon pool; cube writes happen on the
//! calling thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use amc_core::{NoProgress, NpvCube, ProgressObserver, ScenarioDataSink, SimulationGrid};
use amc_models::{
    CrossAssetModel, MarketDataProvider, MultiPathGenerator, Path, PathCache, PathSource,
};
use tracing::{error, info};

use crate::bucketing::{CubeWriter, SampleValues};
use crate::buffers::ConversionBuffers;
use crate::calculator::{evaluate_batch, evaluate_path, AmcCalculator};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::portfolio::Portfolio;
use crate::registry::{CalculatorRecord, CalculatorRegistry};
use crate::report::{EngineTimings, FailureStage, RunReport, TradeFailure};
use crate::scenario_writer::ScenarioWriter;

/// Values of one trade, owned.
enum Outcome {
    Full(Vec<f64>),
    Sticky {
        valuation: Vec<f64>,
        close_out: Vec<f64>,
    },
}

impl Outcome {
    fn view(&self) -> SampleValues<'_> {
        match self {
            Outcome::Full(v) => SampleValues::Full(v),
            Outcome::Sticky {
                valuation,
                close_out,
            } => SampleValues::Sticky {
                valuation,
                close_out,
            },
        }
    }
}

/// Batch results of one trade, row-major (`rows[time][sample]`).
enum BatchOutcome {
    Full(Vec<Vec<f64>>),
    Sticky {
        valuation: Vec<Vec<f64>>,
        close_out: Vec<Vec<f64>>,
    },
}

impl BatchOutcome {
    fn column(&self, s: usize) -> Outcome {
        let gather = |rows: &Vec<Vec<f64>>| -> Vec<f64> { rows.iter().map(|r| r[s]).collect() };
        match self {
            BatchOutcome::Full(rows) => Outcome::Full(gather(rows)),
            BatchOutcome::Sticky {
                valuation,
                close_out,
            } => Outcome::Sticky {
                valuation: gather(valuation),
                close_out: gather(close_out),
            },
        }
    }
}

/// Evaluation result of one record plus the recovered failures.
struct Evaluated<T> {
    record: usize,
    values: T,
    failures: Vec<TradeFailure>,
}

/// Sub-path masks for sticky-date evaluation: time zero plus valuation
/// positions, and time zero plus close-out positions.
struct StickyMasks {
    valuation: Vec<bool>,
    close_out: Vec<bool>,
}

impl StickyMasks {
    fn new(grid: &SimulationGrid) -> Self {
        let with_t0 =
            |flags: &[bool]| -> Vec<bool> { std::iter::once(true).chain(flags.iter().copied()).collect() };
        Self {
            valuation: with_t0(grid.valuation_flags()),
            close_out: with_t0(grid.close_out_flags()),
        }
    }
}

/// AMC exposure cube builder.
///
/// # Examples
///
/// ```
/// use amc_core::types::{Currency, Date, DayCountConvention};
/// use amc_core::{InMemoryCube, NpvCube, SimulationGrid};
/// use amc_engine::{
///     AmcCalculator, AmcInstrument, AmcValuationEngine, CalculatorError, EngineConfig,
///     PathCalculator, Portfolio, Trade,
/// };
/// use amc_models::{FlatCurve, GaussianCrossAssetModel, LgmComponent, Path};
///
/// struct Fixed;
///
/// impl PathCalculator for Fixed {
///     fn npv_currency(&self) -> Currency {
///         Currency::USD
///     }
///     fn simulate_path(&mut self, path: &Path, _: bool) -> Result<Vec<f64>, CalculatorError> {
///         Ok(vec![100.0; path.len()])
///     }
/// }
///
/// struct Deposit;
///
/// impl AmcInstrument for Deposit {
///     fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
///         Ok(AmcCalculator::PathEvaluated(Box::new(Fixed)))
///     }
/// }
///
/// let model = GaussianCrossAssetModel::builder(
///     LgmComponent::new(Currency::USD, 0.0, 0.0, FlatCurve::new(0.0)).unwrap(),
/// )
/// .build()
/// .unwrap();
/// let asof = Date::from_ymd(2024, 1, 2).unwrap();
/// let grid = SimulationGrid::builder(asof, DayCountConvention::ActualActual365)
///     .valuation_dates(vec![Date::from_ymd(2024, 7, 2).unwrap()])
///     .build()
///     .unwrap();
///
/// let portfolio = Portfolio::new().with_trade(Trade::new("D1", "Deposit", Box::new(Deposit)));
/// let mut cube = InMemoryCube::new(portfolio.ids(), 1, 10, 1).unwrap();
///
/// let engine = AmcValuationEngine::new(&model, &grid, EngineConfig::default()).unwrap();
/// let report = engine.build_cube(&portfolio, &mut cube, None).unwrap();
///
/// assert!(report.is_clean());
/// assert!((cube.get(0, 0, 9, 0).unwrap() - 100.0).abs() < 1e-12);
/// ```
pub struct AmcValuationEngine<'a> {
    model: &'a dyn CrossAssetModel,
    grid: &'a SimulationGrid,
    config: EngineConfig,
    market: Option<&'a dyn MarketDataProvider>,
    progress: &'a dyn ProgressObserver,
    cancelled: Arc<AtomicBool>,
}

impl<'a> AmcValuationEngine<'a> {
    /// Creates an engine after checking the model, grid and seed.
    ///
    /// # Errors
    ///
    /// - `ZeroSeed`
    /// - `DayCountMismatch` if grid and model convert dates differently
    /// - `CloseOutBeforeValuation` if a close-out date has no preceding
    ///   valuation date
    /// - `InvalidStickyGrid` if sticky-date close-outs cannot be paired with
    ///   valuation dates
    pub fn new(
        model: &'a dyn CrossAssetModel,
        grid: &'a SimulationGrid,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        if config.seed == 0 {
            return Err(EngineError::ZeroSeed);
        }
        if grid.day_count() != model.day_count() {
            return Err(EngineError::DayCountMismatch {
                grid: grid.day_count(),
                model: model.day_count(),
            });
        }
        if let Some(k) = grid.first_close_out_before_valuation() {
            return Err(EngineError::CloseOutBeforeValuation(k));
        }
        if grid.with_mpor_sticky_date() {
            check_sticky_pairing(grid)?;
        }
        Ok(Self {
            model,
            grid,
            config,
            market: None,
            progress: &NoProgress,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Sets the market used for scenario index fixings.
    pub fn with_market(mut self, market: &'a dyn MarketDataProvider) -> Self {
        self.market = Some(market);
        self
    }

    /// Sets the progress observer.
    pub fn with_progress(mut self, progress: &'a dyn ProgressObserver) -> Self {
        self.progress = progress;
        self
    }

    /// Shares an external cancellation flag.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Flag that cancels a running build when set.
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Engine settings.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn check_cancelled(&self) -> Result<(), EngineError> {
        if self.cancelled.load(Ordering::Relaxed) {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Builds the cube from paths generated by the model.
    pub fn build_cube(
        &self,
        portfolio: &Portfolio,
        cube: &mut dyn NpvCube,
        sink: Option<&mut dyn ScenarioDataSink>,
    ) -> Result<RunReport, EngineError> {
        let mut generator = MultiPathGenerator::new(
            self.model,
            self.grid.time_grid(),
            self.config.seed,
            self.config.sequence_type,
        )?;
        self.build_cube_with_paths(portfolio, cube, sink, &mut generator)
    }

    /// Builds the cube from paths drawn from `paths`, one per cube sample.
    ///
    /// # Errors
    ///
    /// Setup errors (see [`EngineError`]), path source failures, paths of
    /// the wrong shape, cube write errors and cancellation. Trade-level
    /// failures are recovered and listed in the returned report.
    pub fn build_cube_with_paths(
        &self,
        portfolio: &Portfolio,
        cube: &mut dyn NpvCube,
        mut sink: Option<&mut dyn ScenarioDataSink>,
        paths: &mut dyn PathSource,
    ) -> Result<RunReport, EngineError> {
        let total_timer = Instant::now();
        let mut timings = EngineTimings::default();
        self.check_cube(portfolio, cube)?;

        let samples = cube.samples();
        let mut scenario_writer = match sink {
            Some(_) => Some(ScenarioWriter::new(
                self.model,
                self.grid,
                &self.config.scenario_currencies,
                &self.config.scenario_indices,
                self.market,
            )?),
            None => None,
        };

        info!(
            trades = portfolio.len(),
            samples,
            dates = self.grid.size(),
            mpor_mode = ?self.grid.mpor_mode(),
            "AMC valuation engine started"
        );

        let timer = Instant::now();
        let mut registry =
            CalculatorRegistry::build(portfolio, self.model, self.grid, &*cube, self.progress);
        timings.registry = timer.elapsed();
        let path_evaluated = registry.path_evaluated();
        let batch_evaluated = registry.len() - path_evaluated;
        info!(
            extracted = registry.len(),
            skipped = registry.skipped().len(),
            path_evaluated,
            batch_evaluated,
            "AMC calculators extracted"
        );

        let n_times = self.grid.size() + 1;
        let n_states = self.model.size();
        let mut buffers = ConversionBuffers::new(self.model, n_times, samples);
        let mut cache =
            (batch_evaluated > 0).then(|| PathCache::new(self.grid.size(), n_states, samples));
        let masks = StickyMasks::new(self.grid);
        let mut failures = Vec::new();

        for s in 0..samples {
            self.check_cancelled()?;

            let timer = Instant::now();
            let path = paths.next_path()?;
            timings.path_generation += timer.elapsed();
            if path.len() != n_times || path.n_states() != n_states {
                return Err(EngineError::PathShape {
                    sample: s,
                    expected_times: n_times,
                    got_times: path.len(),
                    expected_states: n_states,
                    got_states: path.n_states(),
                });
            }

            let timer = Instant::now();
            buffers.fill(s, &path)?;
            if let Some(cache) = cache.as_mut() {
                cache.store(s, &path)?;
            }
            timings.buffers += timer.elapsed();

            if let (Some(writer), Some(sink)) = (scenario_writer.as_mut(), sink.as_deref_mut()) {
                let timer = Instant::now();
                writer.write_sample(sink, &buffers, s)?;
                timings.scenario_data += timer.elapsed();
            }

            if path_evaluated > 0 {
                let timer = Instant::now();
                let evaluated = self.evaluate_paths(registry.records_mut(), &path, &masks, s)?;
                let writer = CubeWriter::new(self.grid, &buffers);
                for result in evaluated {
                    self.check_cancelled()?;
                    let record = &registry.records()[result.record];
                    writer.write_sample(cube, record, result.values.view(), s, s == 0)?;
                    failures.extend(result.failures);
                }
                timings.valuation += timer.elapsed();
            }
        }

        if let Some(cache) = cache.as_ref() {
            let timer = Instant::now();
            let evaluated = self.evaluate_batches(registry.records(), cache);
            let writer = CubeWriter::new(self.grid, &buffers);
            for result in evaluated {
                self.check_cancelled()?;
                let record = &registry.records()[result.record];
                for s in 0..samples {
                    let column = result.values.column(s);
                    writer.write_sample(cube, record, column.view(), s, s == 0)?;
                }
                failures.extend(result.failures);
            }
            timings.valuation += timer.elapsed();
        }

        let steps = portfolio.len() + 1;
        self.progress.update_progress(steps, steps);

        timings.close(total_timer.elapsed());
        timings.log();

        let extracted = registry.len();
        let mut all_failures = registry.into_skipped();
        let skipped = all_failures.len();
        all_failures.extend(failures);
        info!(
            extracted,
            skipped,
            failures = all_failures.len() - skipped,
            "AMC valuation engine finished"
        );

        Ok(RunReport {
            extracted,
            skipped,
            samples,
            failures: all_failures,
            timings,
        })
    }

    fn check_cube(
        &self,
        portfolio: &Portfolio,
        cube: &dyn NpvCube,
    ) -> Result<(), EngineError> {
        if portfolio.is_empty() {
            return Err(EngineError::EmptyPortfolio);
        }
        if cube.num_ids() != portfolio.len() {
            return Err(EngineError::CubeIdMismatch {
                cube: cube.num_ids(),
                portfolio: portfolio.len(),
            });
        }
        if cube.num_dates() != self.grid.valuation_count() {
            return Err(EngineError::CubeDateMismatch {
                cube: cube.num_dates(),
                grid: self.grid.valuation_count(),
            });
        }
        if self.grid.with_close_out_lag() && cube.depth() < 2 {
            return Err(EngineError::CubeDepthTooSmall(cube.depth()));
        }
        Ok(())
    }

    /// Evaluates every path-evaluated record on one sample's path.
    fn evaluate_paths(
        &self,
        records: &mut [CalculatorRecord],
        path: &Path,
        masks: &StickyMasks,
        s: usize,
    ) -> Result<Vec<Evaluated<Outcome>>, EngineError> {
        let sticky = if self.grid.with_mpor_sticky_date() {
            Some((path.select(&masks.valuation)?, path.select(&masks.close_out)?))
        } else {
            None
        };

        let eval = |i: usize, record: &mut CalculatorRecord| {
            let AmcCalculator::PathEvaluated(calculator) = &mut record.calculator else {
                return None;
            };
            let mut messages = Vec::new();
            let mut run = |p: &Path, reuse: bool| match evaluate_path(&mut **calculator, p, reuse) {
                Ok(values) => values,
                Err(e) => {
                    messages.push(e.to_string());
                    vec![0.0; p.len()]
                }
            };
            let values = match &sticky {
                Some((valuation, close_out)) => Outcome::Sticky {
                    valuation: run(valuation, false),
                    close_out: run(close_out, true),
                },
                None => Outcome::Full(run(path, false)),
            };

            let failures = messages
                .into_iter()
                .map(|message| {
                    error!(
                        trade = %record.label,
                        trade_type = %record.trade_type,
                        sample = s,
                        "AMC path evaluation failed, using zero values: {}",
                        message
                    );
                    record.failure(Some(s), FailureStage::PathEvaluation, message)
                })
                .collect();
            Some(Evaluated {
                record: i,
                values,
                failures,
            })
        };

        Ok(self.config.parallel.filter_map_mut(records, eval))
    }

    /// Evaluates every batch-evaluated record on the path cache.
    fn evaluate_batches(
        &self,
        records: &[CalculatorRecord],
        cache: &PathCache,
    ) -> Vec<Evaluated<BatchOutcome>> {
        let times = &self.grid.time_grid()[1..];
        let samples = cache.samples();
        let sticky = self.grid.with_mpor_sticky_date();
        let all = vec![true; self.grid.size()];

        let eval = |i: usize, record: &CalculatorRecord| {
            let AmcCalculator::BatchEvaluated(calculator) = &record.calculator else {
                return None;
            };
            let mut messages = Vec::new();
            let mut run = |relevant: &[bool], move_back: bool| {
                match evaluate_batch(&**calculator, times, cache, relevant, move_back) {
                    Ok(rows) => rows,
                    Err(e) => {
                        messages.push(e.to_string());
                        let rows = relevant.iter().filter(|&&r| r).count() + 1;
                        vec![vec![0.0; samples]; rows]
                    }
                }
            };
            let values = if sticky {
                BatchOutcome::Sticky {
                    valuation: run(self.grid.valuation_flags(), false),
                    close_out: run(self.grid.close_out_flags(), true),
                }
            } else {
                BatchOutcome::Full(run(all.as_slice(), false))
            };

            let failures = messages
                .into_iter()
                .map(|message| {
                    error!(
                        trade = %record.label,
                        trade_type = %record.trade_type,
                        "AMC batch evaluation failed, using zero values: {}",
                        message
                    );
                    record.failure(None, FailureStage::BatchEvaluation, message)
                })
                .collect();
            Some(Evaluated {
                record: i,
                values,
                failures,
            })
        };

        self.config
            .parallel
            .map(records, eval)
            .into_iter()
            .flatten()
            .collect()
    }
}

/// In sticky-date mode the `d`-th close-out value belongs to the `d`-th
/// valuation date, so no close-out may follow more valuation dates than
/// there are close-out dates.
fn check_sticky_pairing(grid: &SimulationGrid) -> Result<(), EngineError> {
    let close_outs = grid.close_out_positions().len();
    let mut valuations = 0;
    for k in 0..grid.size() {
        if grid.is_close_out_date(k) && valuations > close_outs {
            return Err(EngineError::InvalidStickyGrid(format!(
                "close-out date at position {} follows {} valuation dates but the grid has {} close-out dates",
                k, valuations, close_outs
            )));
        }
        if grid.is_valuation_date(k) {
            valuations += 1;
        }
    }
    Ok(())
}
