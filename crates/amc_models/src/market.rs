//! Index conventions and model-implied index replication.
//!
//! Scenario index fixings are computed off a curve implied by the model
//! state: the LGM zero bond of the index currency, corrected by the ratio
//! of the market forwarding curve to the model's initial curve so that the
//! curve reproduces today's forwarding term structure at `x = 0`:
//!
//! ```text
//! P_fwd(t, T | x) = P_model(t, T, x) · [F(T) / F(t)] / [P0(T) / P0(t)]
//! ```

use std::collections::HashMap;

use amc_core::types::{Currency, Date, DayCountConvention};

use crate::curves::{FlatCurve, YieldCurve};
use crate::error::ModelError;
use crate::model::CrossAssetModel;
use tracing::debug;

/// Conventions and forwarding curve of an Ibor index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IborIndexSpec {
    /// Index name, e.g. `EUR-EURIBOR-6M`
    pub name: String,
    /// Index currency
    pub currency: Currency,
    /// Tenor in months
    pub tenor_months: u32,
    /// Accrual day count
    pub day_count: DayCountConvention,
    /// Market forwarding curve
    pub forwarding_curve: FlatCurve,
}

/// Source of index conventions and forwarding curves.
pub trait MarketDataProvider: Send + Sync {
    /// Looks up an Ibor index by name.
    ///
    /// # Errors
    ///
    /// `ModelError::UnknownIndex` if the market has no such index.
    fn ibor_index(&self, name: &str) -> Result<IborIndexSpec, ModelError>;
}

/// Map-backed market.
#[derive(Debug, Clone, Default)]
pub struct SimpleMarket {
    indices: HashMap<String, IborIndexSpec>,
}

impl SimpleMarket {
    /// Empty market.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an index.
    pub fn with_index(mut self, spec: IborIndexSpec) -> Self {
        self.indices.insert(spec.name.clone(), spec);
        self
    }
}

impl MarketDataProvider for SimpleMarket {
    fn ibor_index(&self, name: &str) -> Result<IborIndexSpec, ModelError> {
        self.indices
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::UnknownIndex(name.to_string()))
    }
}

/// Model-implied forwarding curve for one index, movable along a path.
pub struct IndexReplicationCurve<'a> {
    model: &'a dyn CrossAssetModel,
    ccy_index: usize,
    spec: IborIndexSpec,
    reference_date: Date,
    t: f64,
    x: f64,
}

impl<'a> IndexReplicationCurve<'a> {
    /// Creates the curve positioned at time zero with state 0.
    ///
    /// # Errors
    ///
    /// `ModelError::Currency` if the index currency is not in the model.
    pub fn new(
        model: &'a dyn CrossAssetModel,
        spec: IborIndexSpec,
        reference_date: Date,
    ) -> Result<Self, ModelError> {
        let ccy_index = model.ccy_index(spec.currency)?;
        debug!(index = %spec.name, currency = %spec.currency, "index replication curve");
        Ok(Self {
            model,
            ccy_index,
            spec,
            reference_date,
            t: 0.0,
            x: 0.0,
        })
    }

    /// Model currency index of the index currency.
    #[inline]
    pub fn ccy_index(&self) -> usize {
        self.ccy_index
    }

    /// Index conventions.
    #[inline]
    pub fn spec(&self) -> &IborIndexSpec {
        &self.spec
    }

    /// Moves the curve to `date` with IR state `x`.
    pub fn move_to(&mut self, date: Date, x: f64) {
        self.t = self.time(date);
        self.x = x;
    }

    fn time(&self, date: Date) -> f64 {
        self.model
            .day_count()
            .year_fraction(self.reference_date, date)
    }

    /// Discount factor from the curve's current date to `date`.
    pub fn discount(&self, date: Date) -> Result<f64, ModelError> {
        let maturity = self.time(date);
        let c = self.ccy_index;
        let model_bond = self.model.discount_bond(c, self.t, maturity, self.x)?;
        let p0_ratio = self.model.discount_bond(c, 0.0, maturity, 0.0)?
            / self.model.discount_bond(c, 0.0, self.t, 0.0)?;
        let curve = &self.spec.forwarding_curve;
        let fwd_ratio = curve.discount_factor(maturity)? / curve.discount_factor(self.t)?;
        Ok(model_bond * fwd_ratio / p0_ratio)
    }

    /// Simple forward fixing for `fixing_date` over the index tenor.
    pub fn fixing(&self, fixing_date: Date) -> Result<f64, ModelError> {
        let end = fixing_date.add_months(self.spec.tenor_months)?;
        let tau = self.spec.day_count.year_fraction(fixing_date, end);
        if tau <= 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "index {} has non-positive accrual",
                self.spec.name
            )));
        }
        Ok((self.discount(fixing_date)? / self.discount(end)? - 1.0) / tau)
    }
}
