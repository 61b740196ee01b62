//! Fee contributions added on top of calculator values.
//!
//! A fee paid on `pay_date` contributes to every grid position strictly
//! before it:
//!
//! ```text
//! amount · fx(ccy, k) · P_ccy(t_k, T_pay) · N_base(t_k)
//! ```

use amc_core::types::Date;
use amc_core::SimulationGrid;
use amc_models::ModelError;

use crate::buffers::ConversionBuffers;

/// Fee resolved against the model and grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRecord {
    /// Model currency index of the payment currency
    pub ccy_index: usize,
    /// Signed amount in payment currency
    pub amount: f64,
    /// Payment date
    pub pay_date: Date,
    /// Payment time from the reference date
    pub pay_time: f64,
}

/// Sum of fee contributions at time point `k` (0 is time zero) for sample
/// `s`.
pub fn fee_contribution(
    fees: &[FeeRecord],
    grid: &SimulationGrid,
    buffers: &ConversionBuffers<'_>,
    k: usize,
    s: usize,
) -> Result<f64, ModelError> {
    if fees.is_empty() {
        return Ok(0.0);
    }
    let sim_date = if k == 0 {
        grid.reference_date()
    } else {
        grid.dates()[k - 1]
    };
    let t = grid.time_grid()[k];

    let mut total = 0.0;
    for fee in fees.iter().filter(|f| f.pay_date > sim_date) {
        total += fee.amount
            * buffers.fx(fee.ccy_index, k, s)
            * buffers.discount_bond(fee.ccy_index, k, t, fee.pay_time, s)?
            * buffers.numeraire(0, k, t, s)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_core::types::{Currency, DayCountConvention};
    use amc_models::{FlatCurve, GaussianCrossAssetModel, LgmComponent, Path, StateProcess};
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    #[test]
    fn test_fee_paid_only_before_pay_date() {
        let model = GaussianCrossAssetModel::builder(
            LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.02)).unwrap(),
        )
        .build()
        .unwrap();
        let asof = d(2024, 1, 1);
        let grid = SimulationGrid::builder(asof, DayCountConvention::ActualActual365)
            .valuation_dates(vec![d(2024, 7, 1), d(2025, 1, 1), d(2025, 7, 1)])
            .build()
            .unwrap();

        let mut buffers = ConversionBuffers::new(&model, grid.size() + 1, 1);
        buffers
            .fill(0, &Path::new(grid.time_grid().to_vec(), model.size()))
            .unwrap();

        let pay_date = d(2025, 1, 1);
        let fees = [FeeRecord {
            ccy_index: 0,
            amount: 1000.0,
            pay_date,
            pay_time: grid.time_from_reference(pay_date),
        }];

        // zero state: P(0,T) * N(0) = exp(-rT)
        let expected = 1000.0 * (-0.02 * fees[0].pay_time).exp();
        assert_relative_eq!(
            fee_contribution(&fees, &grid, &buffers, 0, 0).unwrap(),
            expected,
            epsilon = 1e-9
        );
        assert!(fee_contribution(&fees, &grid, &buffers, 1, 0).unwrap() > 0.0);
        assert_eq!(fee_contribution(&fees, &grid, &buffers, 2, 0).unwrap(), 0.0);
        assert_eq!(fee_contribution(&fees, &grid, &buffers, 3, 0).unwrap(), 0.0);
        assert_eq!(fee_contribution(&[], &grid, &buffers, 0, 0).unwrap(), 0.0);
    }
}
