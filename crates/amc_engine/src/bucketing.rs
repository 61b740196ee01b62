//! Conversion of calculator values into cube entries.
//!
//! Calculator values are deflated by the numeraire of the trade currency.
//! Valuation-date entries (depth 0) are converted with the numeraire ratio
//! `N_ccy / N_base`, leaving them deflated in the base currency. Close-out
//! entries (depth 1) are converted with the plain numeraire `N_ccy`:
//!
//! ```text
//! depth 0: v · fx · N_ccy / N_base · m + fee
//! depth 1: v · fx · N_ccy          · m + fee
//! ```
//!
//! Grid positions map to cube dates as follows:
//!
//! - no lag: position `k` is cube date `k`
//! - actual date: one value per position; a close-out position writes depth
//!   1 of the current valuation date, a valuation position advances the
//!   date and writes depth 0 (close-out first when a position is both)
//! - sticky date: valuation and close-out schedules are valued separately;
//!   the `d`-th close-out value is written to date `d` and converted at the
//!   preceding grid time

use amc_core::{NpvCube, SimulationGrid};

use crate::buffers::ConversionBuffers;
use crate::error::EngineError;
use crate::fees::fee_contribution;
use crate::registry::CalculatorRecord;

/// Values of one trade on one sample.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SampleValues<'v> {
    /// One value per time point (time zero included).
    Full(&'v [f64]),
    /// Time zero plus valuation positions, and time zero plus close-out
    /// positions.
    Sticky {
        valuation: &'v [f64],
        close_out: &'v [f64],
    },
}

impl<'v> SampleValues<'v> {
    fn time_zero(&self) -> f64 {
        match self {
            SampleValues::Full(v) => v[0],
            SampleValues::Sticky { valuation, .. } => valuation[0],
        }
    }
}

/// Cube layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Depth {
    Valuation,
    CloseOut,
}

impl Depth {
    fn index(self) -> usize {
        match self {
            Depth::Valuation => 0,
            Depth::CloseOut => 1,
        }
    }
}

/// Writes one trade's sample values into the cube.
pub(crate) struct CubeWriter<'r> {
    grid: &'r SimulationGrid,
    buffers: &'r ConversionBuffers<'r>,
}

impl<'r> CubeWriter<'r> {
    pub(crate) fn new(grid: &'r SimulationGrid, buffers: &'r ConversionBuffers<'r>) -> Self {
        Self { grid, buffers }
    }

    /// Converts a deflated value at time point `k` using the numeraire at
    /// physical time `time`.
    fn convert(
        &self,
        record: &CalculatorRecord,
        value: f64,
        k: usize,
        time: f64,
        s: usize,
        depth: Depth,
    ) -> Result<f64, EngineError> {
        let c = record.ccy_index;
        let numeraire = match depth {
            Depth::Valuation => self.buffers.numeraire_ratio(c, k, time, s)?,
            Depth::CloseOut => self.buffers.numeraire(c, k, time, s)?,
        };
        Ok(value * self.buffers.fx(c, k, s) * numeraire * record.multiplier)
    }

    fn fee(&self, record: &CalculatorRecord, k: usize, s: usize) -> Result<f64, EngineError> {
        Ok(fee_contribution(&record.fees, self.grid, self.buffers, k, s)?)
    }

    /// Writes every entry of sample `s`; the time-zero slice as well when
    /// `write_t0` is set. Time-zero conversion always uses sample 0.
    pub(crate) fn write_sample(
        &self,
        cube: &mut dyn NpvCube,
        record: &CalculatorRecord,
        values: SampleValues<'_>,
        s: usize,
        write_t0: bool,
    ) -> Result<(), EngineError> {
        if write_t0 {
            let t0 = self.convert(record, values.time_zero(), 0, 0.0, 0, Depth::Valuation)?
                + self.fee(record, 0, 0)?;
            cube.set_t0(t0, record.cube_row, 0)?;
        }
        match values {
            SampleValues::Full(v) if self.grid.with_close_out_lag() => {
                self.write_actual_date(cube, record, v, s)
            }
            SampleValues::Full(v) => self.write_no_lag(cube, record, v, s),
            SampleValues::Sticky {
                valuation,
                close_out,
            } => self.write_sticky_date(cube, record, valuation, close_out, s),
        }
    }

    fn write_no_lag(
        &self,
        cube: &mut dyn NpvCube,
        record: &CalculatorRecord,
        values: &[f64],
        s: usize,
    ) -> Result<(), EngineError> {
        let times = self.grid.time_grid();
        for k in 1..=self.grid.size() {
            let value = self.convert(record, values[k], k, times[k], s, Depth::Valuation)?
                + self.fee(record, k, s)?;
            cube.set(value, record.cube_row, k - 1, s, 0)?;
        }
        Ok(())
    }

    fn write_actual_date(
        &self,
        cube: &mut dyn NpvCube,
        record: &CalculatorRecord,
        values: &[f64],
        s: usize,
    ) -> Result<(), EngineError> {
        let times = self.grid.time_grid();
        let mut date_index: Option<usize> = None;
        for k in 1..=self.grid.size() {
            let t = times[k];
            if self.grid.is_close_out_date(k - 1) {
                let d = date_index.ok_or(EngineError::CloseOutBeforeValuation(k - 1))?;
                let value = self.convert(record, values[k], k, t, s, Depth::CloseOut)?
                    + self.fee(record, k, s)?;
                cube.set(value, record.cube_row, d, s, Depth::CloseOut.index())?;
            }
            if self.grid.is_valuation_date(k - 1) {
                let d = date_index.map_or(0, |d| d + 1);
                date_index = Some(d);
                let value = self.convert(record, values[k], k, t, s, Depth::Valuation)?
                    + self.fee(record, k, s)?;
                cube.set(value, record.cube_row, d, s, Depth::Valuation.index())?;
            }
        }
        Ok(())
    }

    fn write_sticky_date(
        &self,
        cube: &mut dyn NpvCube,
        record: &CalculatorRecord,
        valuation: &[f64],
        close_out: &[f64],
        s: usize,
    ) -> Result<(), EngineError> {
        let times = self.grid.time_grid();
        let mut date_index: Option<usize> = None;
        // close-out entries carry the fee of their valuation date
        let mut fee_k = 0;
        for k in 0..self.grid.size() {
            if self.grid.is_close_out_date(k) {
                let d = date_index.ok_or(EngineError::CloseOutBeforeValuation(k))?;
                let v = *close_out.get(d + 1).ok_or_else(|| {
                    EngineError::InvalidStickyGrid(format!(
                        "no close-out value for valuation date {}",
                        d
                    ))
                })?;
                let value = self.convert(record, v, k + 1, times[k], s, Depth::CloseOut)?
                    + self.fee(record, fee_k, s)?;
                cube.set(value, record.cube_row, d, s, Depth::CloseOut.index())?;
            }
            if self.grid.is_valuation_date(k) {
                let d = date_index.map_or(0, |d| d + 1);
                date_index = Some(d);
                fee_k = k + 1;
                let value =
                    self.convert(record, valuation[d + 1], k + 1, times[k + 1], s, Depth::Valuation)?
                        + self.fee(record, k + 1, s)?;
                cube.set(value, record.cube_row, d, s, Depth::Valuation.index())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{AmcCalculator, CalculatorError, PathCalculator};
    use crate::fees::FeeRecord;
    use amc_core::types::{Currency, Date, DayCountConvention};
    use amc_core::{InMemoryCube, MporMode};
    use amc_models::{
        CrossAssetModel, FlatCurve, FxComponent, GaussianCrossAssetModel, LgmComponent, Path,
        StateProcess,
    };
    use approx::assert_relative_eq;

    struct Unused;

    impl PathCalculator for Unused {
        fn npv_currency(&self) -> Currency {
            Currency::EUR
        }
        fn simulate_path(&mut self, _: &Path, _: bool) -> Result<Vec<f64>, CalculatorError> {
            Err(CalculatorError::Evaluation("unused".to_string()))
        }
    }

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    fn model(usd: f64, eur: f64) -> GaussianCrossAssetModel {
        GaussianCrossAssetModel::builder(
            LgmComponent::new(Currency::USD, 0.0, 0.0, FlatCurve::new(usd)).unwrap(),
        )
        .foreign(
            LgmComponent::new(Currency::EUR, 0.0, 0.0, FlatCurve::new(eur)).unwrap(),
            FxComponent::new(1.1, 0.0).unwrap(),
        )
        .build()
        .unwrap()
    }

    fn record(ccy_index: usize, multiplier: f64) -> CalculatorRecord {
        CalculatorRecord {
            calculator: AmcCalculator::PathEvaluated(Box::new(Unused)),
            cube_row: 0,
            label: "T".to_string(),
            trade_type: "Swap".to_string(),
            multiplier,
            ccy_index,
            fees: Vec::new(),
        }
    }

    fn flat_path(model: &GaussianCrossAssetModel, grid: &SimulationGrid) -> Path {
        let mut path = Path::new(grid.time_grid().to_vec(), model.size());
        for t in 0..path.len() {
            path.set(model.fx_state_index(1), t, 1.1_f64.ln());
        }
        path
    }

    #[test]
    fn test_no_lag_uses_ratio_and_multiplier() {
        let model = model(0.0, 0.0);
        let grid = SimulationGrid::builder(d(2024, 1, 1), DayCountConvention::ActualActual365)
            .valuation_dates(vec![d(2024, 7, 1), d(2025, 1, 1), d(2025, 7, 1)])
            .build()
            .unwrap();
        let mut buffers = ConversionBuffers::new(&model, grid.size() + 1, 1);
        buffers.fill(0, &flat_path(&model, &grid)).unwrap();
        let mut cube = InMemoryCube::new(vec!["T".into()], 3, 1, 1).unwrap();

        let writer = CubeWriter::new(&grid, &buffers);
        writer
            .write_sample(
                &mut cube,
                &record(1, 2.0),
                SampleValues::Full(&[0.0, 100.0, 200.0, 300.0]),
                0,
                true,
            )
            .unwrap();

        assert_relative_eq!(cube.get_t0(0, 0).unwrap(), 0.0);
        assert_relative_eq!(cube.get(0, 0, 0, 0).unwrap(), 220.0, epsilon = 1e-9);
        assert_relative_eq!(cube.get(0, 1, 0, 0).unwrap(), 440.0, epsilon = 1e-9);
        assert_relative_eq!(cube.get(0, 2, 0, 0).unwrap(), 660.0, epsilon = 1e-9);
    }

    #[test]
    fn test_actual_date_depth_asymmetry() {
        let (r_usd, r_eur) = (0.03, 0.01);
        let model = model(r_usd, r_eur);
        let grid = SimulationGrid::builder(d(2024, 1, 1), DayCountConvention::ActualActual365)
            .valuation_dates(vec![d(2024, 7, 1), d(2025, 1, 1)])
            .close_out_lag(14, MporMode::ActualDate)
            .build()
            .unwrap();
        assert_eq!(grid.size(), 4);

        let mut buffers = ConversionBuffers::new(&model, grid.size() + 1, 1);
        buffers.fill(0, &flat_path(&model, &grid)).unwrap();
        let mut cube = InMemoryCube::new(vec!["T".into()], 2, 1, 2).unwrap();
        let writer = CubeWriter::new(&grid, &buffers);
        writer
            .write_sample(
                &mut cube,
                &record(1, 1.0),
                SampleValues::Full(&[0.0, 10.0, 11.0, 20.0, 21.0]),
                0,
                false,
            )
            .unwrap();

        let times = grid.time_grid();
        // zero-volatility LGM: N(t, 0) = exp(r t)
        let ratio = |t: f64| (r_eur * t).exp() / (r_usd * t).exp();
        let plain = |t: f64| (r_eur * t).exp();
        assert_relative_eq!(cube.get(0, 0, 0, 0).unwrap(), 10.0 * 1.1 * ratio(times[1]), epsilon = 1e-9);
        assert_relative_eq!(cube.get(0, 0, 0, 1).unwrap(), 11.0 * 1.1 * plain(times[2]), epsilon = 1e-9);
        assert_relative_eq!(cube.get(0, 1, 0, 0).unwrap(), 20.0 * 1.1 * ratio(times[3]), epsilon = 1e-9);
        assert_relative_eq!(cube.get(0, 1, 0, 1).unwrap(), 21.0 * 1.1 * plain(times[4]), epsilon = 1e-9);
    }

    #[test]
    fn test_sticky_close_out_converted_at_preceding_time() {
        let r = 0.02;
        let model = model(r, 0.0);
        let grid = SimulationGrid::builder(d(2024, 1, 1), DayCountConvention::ActualActual365)
            .valuation_dates(vec![d(2024, 7, 1), d(2025, 1, 1)])
            .close_out_lag(14, MporMode::StickyDate)
            .build()
            .unwrap();
        let mut buffers = ConversionBuffers::new(&model, grid.size() + 1, 1);
        buffers.fill(0, &flat_path(&model, &grid)).unwrap();
        let mut cube = InMemoryCube::new(vec!["T".into()], 2, 1, 2).unwrap();

        let writer = CubeWriter::new(&grid, &buffers);
        writer
            .write_sample(
                &mut cube,
                &record(0, 1.0),
                SampleValues::Sticky {
                    valuation: &[5.0, 10.0, 20.0],
                    close_out: &[5.0, 11.0, 21.0],
                },
                0,
                true,
            )
            .unwrap();

        let times = grid.time_grid();
        assert_eq!(cube.get_t0(0, 0).unwrap(), 5.0);
        assert_eq!(cube.get(0, 0, 0, 0).unwrap(), 10.0);
        assert_eq!(cube.get(0, 1, 0, 0).unwrap(), 20.0);
        assert_relative_eq!(cube.get(0, 0, 0, 1).unwrap(), 11.0 * (r * times[1]).exp(), epsilon = 1e-9);
        assert_relative_eq!(cube.get(0, 1, 0, 1).unwrap(), 21.0 * (r * times[3]).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_sticky_close_out_fee_taken_from_valuation_date() {
        let model = model(0.0, 0.0);
        let grid = SimulationGrid::builder(d(2024, 1, 1), DayCountConvention::ActualActual365)
            .valuation_dates(vec![d(2024, 7, 1), d(2025, 1, 1)])
            .close_out_lag(14, MporMode::StickyDate)
            .build()
            .unwrap();
        let mut buffers = ConversionBuffers::new(&model, grid.size() + 1, 1);
        buffers.fill(0, &flat_path(&model, &grid)).unwrap();
        let mut cube = InMemoryCube::new(vec!["T".into()], 2, 1, 2).unwrap();

        // paid between the first valuation date and its close-out date
        let pay_date = d(2024, 7, 5);
        let mut rec = record(0, 1.0);
        rec.fees.push(FeeRecord {
            ccy_index: 0,
            amount: 7.0,
            pay_date,
            pay_time: grid.time_from_reference(pay_date),
        });

        CubeWriter::new(&grid, &buffers)
            .write_sample(
                &mut cube,
                &rec,
                SampleValues::Sticky {
                    valuation: &[0.0; 3],
                    close_out: &[0.0; 3],
                },
                0,
                true,
            )
            .unwrap();

        assert_relative_eq!(cube.get_t0(0, 0).unwrap(), 7.0, epsilon = 1e-12);
        assert_relative_eq!(cube.get(0, 0, 0, 0).unwrap(), 7.0, epsilon = 1e-12);
        assert_relative_eq!(cube.get(0, 0, 0, 1).unwrap(), 7.0, epsilon = 1e-12);
        assert_eq!(cube.get(0, 1, 0, 0).unwrap(), 0.0);
        assert_eq!(cube.get(0, 1, 0, 1).unwrap(), 0.0);
    }
}
