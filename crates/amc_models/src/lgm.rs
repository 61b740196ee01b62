//! Linear Gauss-Markov (LGM) one-factor rates component.
//!
//! The LGM model in its Hull-White parametrisation with constant mean
//! reversion `κ` and constant volatility `α`:
//!
//! ```text
//! H(t)  = (1 - exp(-κ t)) / κ          (H(t) = t for κ = 0)
//! ζ(t)  = α² t
//! N(t, x)    = exp(H(t) x + ½ H(t)² ζ(t)) / P0(t)
//! P(t, T, x) = P0(T) / P0(t) · exp(-(H(T) - H(t)) x - ½ (H(T)² - H(t)²) ζ(t))
//! r(t, x)    = f0(t) + ζ(t) H'(t) H(t) + H'(t) x
//! ```
//!
//! The state `x` starts at zero and has dynamics `dx = α dW` in the
//! component's own LGM measure.

use amc_core::types::Currency;

use crate::curves::{FlatCurve, YieldCurve};
use crate::error::ModelError;

const KAPPA_CUTOFF: f64 = 1e-10;

/// One currency's LGM component.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LgmComponent {
    currency: Currency,
    mean_reversion: f64,
    volatility: f64,
    curve: FlatCurve,
}

impl LgmComponent {
    /// Creates a component.
    ///
    /// # Arguments
    ///
    /// * `currency` - Currency the component models
    /// * `mean_reversion` - κ, finite
    /// * `volatility` - α, finite and non-negative
    /// * `curve` - Initial discount curve P0
    pub fn new(
        currency: Currency,
        mean_reversion: f64,
        volatility: f64,
        curve: FlatCurve,
    ) -> Result<Self, ModelError> {
        if !mean_reversion.is_finite() {
            return Err(ModelError::InvalidParameter(format!(
                "{} mean reversion must be finite, got {}",
                currency, mean_reversion
            )));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(ModelError::InvalidParameter(format!(
                "{} LGM volatility must be non-negative, got {}",
                currency, volatility
            )));
        }
        Ok(Self {
            currency,
            mean_reversion,
            volatility,
            curve,
        })
    }

    /// Modelled currency.
    #[inline]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Mean reversion κ.
    #[inline]
    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    /// Volatility α.
    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Initial discount curve.
    #[inline]
    pub fn curve(&self) -> &FlatCurve {
        &self.curve
    }

    /// H(t).
    pub fn h(&self, t: f64) -> f64 {
        let k = self.mean_reversion;
        if k.abs() < KAPPA_CUTOFF {
            t
        } else {
            (1.0 - (-k * t).exp()) / k
        }
    }

    /// H'(t) = exp(-κ t).
    pub fn h_prime(&self, t: f64) -> f64 {
        (-self.mean_reversion * t).exp()
    }

    /// ζ(t) = α² t.
    pub fn zeta(&self, t: f64) -> f64 {
        self.volatility * self.volatility * t
    }

    /// Numeraire N(t, x).
    pub fn numeraire(&self, t: f64, x: f64) -> Result<f64, ModelError> {
        let p0 = self.curve.discount_factor(t)?;
        let h = self.h(t);
        Ok((h * x + 0.5 * h * h * self.zeta(t)).exp() / p0)
    }

    /// Zero bond P(t, T, x).
    pub fn discount_bond(&self, t: f64, maturity: f64, x: f64) -> Result<f64, ModelError> {
        if maturity < t {
            return Err(ModelError::InvalidMaturity { t: maturity - t });
        }
        let p0_t = self.curve.discount_factor(t)?;
        let p0_mat = self.curve.discount_factor(maturity)?;
        let h_t = self.h(t);
        let h_mat = self.h(maturity);
        Ok(p0_mat / p0_t * (-(h_mat - h_t) * x - 0.5 * (h_mat * h_mat - h_t * h_t) * self.zeta(t)).exp())
    }

    /// Short rate r(t, x).
    pub fn short_rate(&self, t: f64, x: f64) -> Result<f64, ModelError> {
        let f0 = self.curve.instantaneous_forward(t)?;
        let hp = self.h_prime(t);
        Ok(f0 + self.zeta(t) * hp * self.h(t) + hp * x)
    }
}
