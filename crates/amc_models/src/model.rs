//! State processes and the cross-asset model.
//!
//! ## State layout
//!
//! For `n` currencies (base first) the [`GaussianCrossAssetModel`] state is
//!
//! ```text
//! [x_0, x_1, ..., x_{n-1}, ln X_1, ..., ln X_{n-1}]
//! ```
//!
//! where `x_i` is the LGM state of currency `i` and `X_j` the FX rate of
//! currency `j` in units of base per unit of foreign. Brownian factors use
//! the same ordering.
//!
//! ## Dynamics (Euler step in the base LGM measure)
//!
//! ```text
//! dx_0    = α_0 dW_0
//! dx_j    = -ρ(x_j, X_j) σ_j α_j dt + α_j dW_j
//! d ln X_j = (r_0 - r_j - ½ σ_j²) dt + σ_j dW_{X_j}
//! ```

use amc_core::types::{Currency, CurrencyError, DayCountConvention};

use crate::correlation::{CholeskyFactor, CorrelationMatrix};
use crate::error::ModelError;
use crate::lgm::LgmComponent;

/// Multi-dimensional state process driven by independent normals.
pub trait StateProcess: Send + Sync {
    /// Number of state variables.
    fn size(&self) -> usize;

    /// Number of Brownian factors.
    fn factors(&self) -> usize;

    /// State at time zero.
    fn initial_values(&self) -> Vec<f64>;

    /// Evolves `x0` at `t0` over `dt` using independent standard normals `z`
    /// (length [`factors`](StateProcess::factors)) and writes the result to
    /// `out`.
    fn evolve(
        &self,
        t0: f64,
        x0: &[f64],
        dt: f64,
        z: &[f64],
        out: &mut [f64],
    ) -> Result<(), ModelError>;
}

/// Multi-currency model used by the exposure engine.
///
/// Currency index 0 is the base currency.
pub trait CrossAssetModel: StateProcess {
    /// Model currencies, base first. Never empty.
    fn currencies(&self) -> &[Currency];

    /// Base currency.
    fn base_currency(&self) -> Currency {
        self.currencies()[0]
    }

    /// Index of `ccy` in the model currency list.
    fn ccy_index(&self, ccy: Currency) -> Result<usize, CurrencyError> {
        self.currencies()
            .iter()
            .position(|&c| c == ccy)
            .ok_or_else(|| CurrencyError::NotInModel(ccy.code().to_string()))
    }

    /// State index of the IR state of currency `ccy_index`.
    fn ir_state_index(&self, ccy_index: usize) -> usize;

    /// State index of the log FX state of currency `ccy_index` (>= 1).
    fn fx_state_index(&self, ccy_index: usize) -> usize;

    /// Numeraire of currency `ccy_index` at time `t` given its IR state `x`.
    fn numeraire(&self, ccy_index: usize, t: f64, x: f64) -> Result<f64, ModelError>;

    /// Zero bond P(t, maturity) of currency `ccy_index` given its IR state.
    fn discount_bond(
        &self,
        ccy_index: usize,
        t: f64,
        maturity: f64,
        x: f64,
    ) -> Result<f64, ModelError>;

    /// Day count the model uses to convert dates to times.
    fn day_count(&self) -> DayCountConvention;
}

/// FX component of a foreign currency.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FxComponent {
    spot: f64,
    volatility: f64,
}

impl FxComponent {
    /// Creates an FX component with positive spot (base per foreign) and
    /// non-negative lognormal volatility.
    pub fn new(spot: f64, volatility: f64) -> Result<Self, ModelError> {
        if !(spot > 0.0 && spot.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "FX spot must be positive, got {}",
                spot
            )));
        }
        if !(volatility >= 0.0 && volatility.is_finite()) {
            return Err(ModelError::InvalidParameter(format!(
                "FX volatility must be non-negative, got {}",
                volatility
            )));
        }
        Ok(Self { spot, volatility })
    }

    /// Spot FX rate.
    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Lognormal volatility σ.
    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }
}

/// Gaussian cross-asset model: LGM rates per currency plus lognormal FX.
#[derive(Debug, Clone)]
pub struct GaussianCrossAssetModel {
    currencies: Vec<Currency>,
    lgm: Vec<LgmComponent>,
    fx: Vec<FxComponent>,
    correlation: CorrelationMatrix,
    cholesky: CholeskyFactor,
    day_count: DayCountConvention,
}

impl GaussianCrossAssetModel {
    /// Starts a builder with the base currency component.
    pub fn builder(base: LgmComponent) -> GaussianCrossAssetModelBuilder {
        GaussianCrossAssetModelBuilder {
            lgm: vec![base],
            fx: Vec::new(),
            correlation: None,
            day_count: DayCountConvention::default(),
        }
    }

    /// LGM component of currency `ccy_index`.
    #[inline]
    pub fn lgm(&self, ccy_index: usize) -> &LgmComponent {
        &self.lgm[ccy_index]
    }

    /// FX component of foreign currency `ccy_index` (>= 1).
    #[inline]
    pub fn fx(&self, ccy_index: usize) -> &FxComponent {
        &self.fx[ccy_index - 1]
    }

    /// Factor correlation matrix.
    #[inline]
    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    fn n(&self) -> usize {
        self.currencies.len()
    }
}

impl StateProcess for GaussianCrossAssetModel {
    fn size(&self) -> usize {
        2 * self.n() - 1
    }

    fn factors(&self) -> usize {
        self.size()
    }

    fn initial_values(&self) -> Vec<f64> {
        let mut x = vec![0.0; self.size()];
        for j in 1..self.n() {
            x[self.fx_state_index(j)] = self.fx[j - 1].spot.ln();
        }
        x
    }

    fn evolve(
        &self,
        t0: f64,
        x0: &[f64],
        dt: f64,
        z: &[f64],
        out: &mut [f64],
    ) -> Result<(), ModelError> {
        let size = self.size();
        for len in [x0.len(), z.len(), out.len()] {
            if len != size {
                return Err(ModelError::DimensionMismatch {
                    expected: size,
                    got: len,
                });
            }
        }

        let mut w = vec![0.0; size];
        self.cholesky.transform(z, &mut w);
        let sdt = dt.sqrt();
        let n = self.n();

        for i in 0..n {
            let alpha = self.lgm[i].volatility();
            let drift = if i == 0 {
                0.0
            } else {
                let fx_idx = self.fx_state_index(i);
                -self.correlation.get(i, fx_idx) * self.fx[i - 1].volatility * alpha
            };
            out[i] = x0[i] + drift * dt + alpha * sdt * w[i];
        }

        let r_base = self.lgm[0].short_rate(t0, x0[0])?;
        for j in 1..n {
            let idx = self.fx_state_index(j);
            let sigma = self.fx[j - 1].volatility;
            let r_j = self.lgm[j].short_rate(t0, x0[j])?;
            out[idx] = x0[idx] + (r_base - r_j - 0.5 * sigma * sigma) * dt + sigma * sdt * w[idx];
        }
        Ok(())
    }
}

impl CrossAssetModel for GaussianCrossAssetModel {
    fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    #[inline]
    fn ir_state_index(&self, ccy_index: usize) -> usize {
        ccy_index
    }

    #[inline]
    fn fx_state_index(&self, ccy_index: usize) -> usize {
        self.n() + ccy_index - 1
    }

    fn numeraire(&self, ccy_index: usize, t: f64, x: f64) -> Result<f64, ModelError> {
        self.lgm[ccy_index].numeraire(t, x)
    }

    fn discount_bond(
        &self,
        ccy_index: usize,
        t: f64,
        maturity: f64,
        x: f64,
    ) -> Result<f64, ModelError> {
        self.lgm[ccy_index].discount_bond(t, maturity, x)
    }

    fn day_count(&self) -> DayCountConvention {
        self.day_count
    }
}

/// Builder for [`GaussianCrossAssetModel`].
#[derive(Debug, Clone)]
pub struct GaussianCrossAssetModelBuilder {
    lgm: Vec<LgmComponent>,
    fx: Vec<FxComponent>,
    correlation: Option<CorrelationMatrix>,
    day_count: DayCountConvention,
}

impl GaussianCrossAssetModelBuilder {
    /// Adds a foreign currency with its rates and FX components.
    pub fn foreign(mut self, lgm: LgmComponent, fx: FxComponent) -> Self {
        self.lgm.push(lgm);
        self.fx.push(fx);
        self
    }

    /// Sets the factor correlation matrix (state ordering). Defaults to
    /// identity.
    pub fn correlation(mut self, correlation: CorrelationMatrix) -> Self {
        self.correlation = Some(correlation);
        self
    }

    /// Sets the day count convention.
    pub fn day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for duplicate currencies
    /// - `DimensionMismatch` for a correlation matrix of the wrong size
    /// - `Correlation` if the matrix is not positive definite
    pub fn build(self) -> Result<GaussianCrossAssetModel, ModelError> {
        let currencies: Vec<Currency> = self.lgm.iter().map(|c| c.currency()).collect();
        for (i, c) in currencies.iter().enumerate() {
            if currencies[..i].contains(c) {
                return Err(ModelError::InvalidParameter(format!(
                    "duplicate currency {}",
                    c
                )));
            }
        }

        let size = 2 * currencies.len() - 1;
        let correlation = self
            .correlation
            .unwrap_or_else(|| CorrelationMatrix::identity(size));
        if correlation.dim() != size {
            return Err(ModelError::DimensionMismatch {
                expected: size,
                got: correlation.dim(),
            });
        }
        let cholesky = correlation.cholesky()?;

        Ok(GaussianCrossAssetModel {
            currencies,
            lgm: self.lgm,
            fx: self.fx,
            correlation,
            cholesky,
            day_count: self.day_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::FlatCurve;
    use approx::assert_relative_eq;

    fn two_ccy(fx_vol: f64) -> GaussianCrossAssetModel {
        GaussianCrossAssetModel::builder(
            LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.04)).unwrap(),
        )
        .foreign(
            LgmComponent::new(Currency::EUR, 0.02, 0.008, FlatCurve::new(0.02)).unwrap(),
            FxComponent::new(1.1, fx_vol).unwrap(),
        )
        .build()
        .unwrap()
    }

    #[test]
    fn test_state_layout() {
        let model = two_ccy(0.1);
        assert_eq!(model.size(), 3);
        assert_eq!(model.ir_state_index(1), 1);
        assert_eq!(model.fx_state_index(1), 2);
        assert_eq!(model.base_currency(), Currency::USD);
        assert_eq!(model.ccy_index(Currency::EUR).unwrap(), 1);
        assert!(model.ccy_index(Currency::JPY).is_err());

        let x0 = model.initial_values();
        assert_eq!(x0[0], 0.0);
        assert_relative_eq!(x0[2].exp(), 1.1, epsilon = 1e-14);
    }

    #[test]
    fn test_zero_shock_fx_drift_is_rate_differential() {
        let model = two_ccy(0.0);
        let x0 = model.initial_values();
        let mut out = vec![0.0; 3];
        model.evolve(0.0, &x0, 0.5, &[0.0; 3], &mut out).unwrap();
        assert_relative_eq!(out[2] - x0[2], (0.04 - 0.02) * 0.5, epsilon = 1e-8);
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_evolve_rejects_wrong_dimensions() {
        let model = two_ccy(0.1);
        let mut out = vec![0.0; 3];
        assert!(matches!(
            model.evolve(0.0, &[0.0; 2], 0.1, &[0.0; 3], &mut out),
            Err(ModelError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_duplicate_currency_rejected() {
        let usd = LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.04)).unwrap();
        let err = GaussianCrossAssetModel::builder(usd.clone())
            .foreign(usd, FxComponent::new(1.0, 0.1).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter(_)));
    }

    #[test]
    fn test_wrong_correlation_size_rejected() {
        let err = GaussianCrossAssetModel::builder(
            LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.04)).unwrap(),
        )
        .correlation(CorrelationMatrix::identity(2))
        .build()
        .unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
    }
}
