//! Initial yield curves.
//!
//! The LGM components are fitted to an initial discount curve and the
//! market supplies forwarding curves for Ibor indices. Both are expressed
//! through [`YieldCurve`].

use crate::error::ModelError;

/// Yield curve giving discount factors for model times.
///
/// # Invariants
///
/// - D(0) = 1
/// - D(t) > 0 for all t >= 0
///
/// # Example
///
/// ```
/// use amc_models::curves::{FlatCurve, YieldCurve};
///
/// let curve = FlatCurve::new(0.05);
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - 0.951229).abs() < 1e-5);
/// assert!((curve.forward_rate(1.0, 2.0).unwrap() - 0.05).abs() < 1e-12);
/// ```
pub trait YieldCurve: Send + Sync {
    /// Discount factor for maturity `t` (years).
    ///
    /// # Errors
    ///
    /// `ModelError::InvalidMaturity` if `t < 0`.
    fn discount_factor(&self, t: f64) -> Result<f64, ModelError>;

    /// Continuously compounded zero rate for maturity `t`.
    fn zero_rate(&self, t: f64) -> Result<f64, ModelError> {
        if t <= 0.0 {
            return Err(ModelError::InvalidMaturity { t });
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Continuously compounded forward rate between `t1` and `t2`.
    fn forward_rate(&self, t1: f64, t2: f64) -> Result<f64, ModelError> {
        let dt = t2 - t1;
        if dt <= 0.0 {
            return Err(ModelError::InvalidMaturity { t: dt });
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok(-(df2 / df1).ln() / dt)
    }

    /// Instantaneous forward rate f(0, t), used for the model short rate.
    fn instantaneous_forward(&self, t: f64) -> Result<f64, ModelError> {
        const BUMP: f64 = 1e-4;
        self.forward_rate(t, t + BUMP)
    }
}

/// Flat continuously compounded curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatCurve {
    rate: f64,
}

impl FlatCurve {
    /// Creates a flat curve with the given rate.
    #[inline]
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Returns the constant rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl YieldCurve for FlatCurve {
    fn discount_factor(&self, t: f64) -> Result<f64, ModelError> {
        if t < 0.0 {
            return Err(ModelError::InvalidMaturity { t });
        }
        Ok((-self.rate * t).exp())
    }

    fn zero_rate(&self, t: f64) -> Result<f64, ModelError> {
        if t <= 0.0 {
            return Err(ModelError::InvalidMaturity { t });
        }
        Ok(self.rate)
    }

    fn forward_rate(&self, t1: f64, t2: f64) -> Result<f64, ModelError> {
        if t2 <= t1 {
            return Err(ModelError::InvalidMaturity { t: t2 - t1 });
        }
        Ok(self.rate)
    }

    fn instantaneous_forward(&self, t: f64) -> Result<f64, ModelError> {
        if t < 0.0 {
            return Err(ModelError::InvalidMaturity { t });
        }
        Ok(self.rate)
    }
}
