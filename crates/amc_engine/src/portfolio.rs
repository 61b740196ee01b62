//! Trades and portfolios as seen by the exposure engine.

use amc_core::types::{Currency, Date};

use crate::calculator::{AmcCalculator, CalculatorError};

/// Long or short side of an option wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionPosition {
    /// Bought option
    Long,
    /// Sold option
    Short,
}

impl OptionPosition {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            OptionPosition::Long => 1.0,
            OptionPosition::Short => -1.0,
        }
    }
}

/// Additional payment attached to a trade (premium, upfront fee).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeePayment {
    /// Payment currency
    pub currency: Currency,
    /// Signed amount in payment currency
    pub amount: f64,
    /// Payment date
    pub pay_date: Date,
}

impl FeePayment {
    /// Creates a fee payment.
    pub fn new(currency: Currency, amount: f64, pay_date: Date) -> Self {
        Self {
            currency,
            amount,
            pay_date,
        }
    }
}

/// Priced instrument that can hand out an AMC calculator.
pub trait AmcInstrument: Send + Sync {
    /// Retrieves the instrument's AMC calculator.
    ///
    /// # Errors
    ///
    /// `CalculatorError::NotAvailable` if the instrument was not set up for
    /// AMC pricing.
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError>;

    /// Side of the option wrapper, if the instrument is one.
    fn option_position(&self) -> Option<OptionPosition> {
        None
    }
}

/// A trade: identity, instrument and scaling.
pub struct Trade {
    id: String,
    trade_type: String,
    instrument: Box<dyn AmcInstrument>,
    multiplier: f64,
    fees: Vec<FeePayment>,
}

impl Trade {
    /// Creates a trade with multiplier 1 and no fees.
    pub fn new(
        id: impl Into<String>,
        trade_type: impl Into<String>,
        instrument: Box<dyn AmcInstrument>,
    ) -> Self {
        Self {
            id: id.into(),
            trade_type: trade_type.into(),
            instrument,
            multiplier: 1.0,
            fees: Vec::new(),
        }
    }

    /// Sets the instrument multiplier (notional scaling).
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Attaches an additional payment.
    pub fn with_fee(mut self, fee: FeePayment) -> Self {
        self.fees.push(fee);
        self
    }

    /// Trade id, also the cube row key.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Trade type label.
    #[inline]
    pub fn trade_type(&self) -> &str {
        &self.trade_type
    }

    /// Priced instrument.
    #[inline]
    pub fn instrument(&self) -> &dyn AmcInstrument {
        self.instrument.as_ref()
    }

    /// Instrument multiplier before option sign.
    #[inline]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Multiplier including the option sign.
    pub fn effective_multiplier(&self) -> f64 {
        self.multiplier
            * self
                .instrument
                .option_position()
                .map_or(1.0, |p| p.sign())
    }

    /// Additional payments.
    #[inline]
    pub fn fees(&self) -> &[FeePayment] {
        &self.fees
    }
}

impl std::fmt::Debug for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trade")
            .field("id", &self.id)
            .field("trade_type", &self.trade_type)
            .field("multiplier", &self.multiplier)
            .field("fees", &self.fees)
            .finish()
    }
}

/// Ordered collection of trades.
#[derive(Debug, Default)]
pub struct Portfolio {
    trades: Vec<Trade>,
}

impl Portfolio {
    /// Empty portfolio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a trade.
    pub fn push(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Builder-style append.
    pub fn with_trade(mut self, trade: Trade) -> Self {
        self.push(trade);
        self
    }

    /// Number of trades.
    #[inline]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// True if the portfolio holds no trades.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Iterates trades in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Trade> {
        self.trades.iter()
    }

    /// Trade ids in insertion order, e.g. for sizing a cube.
    pub fn ids(&self) -> Vec<String> {
        self.trades.iter().map(|t| t.id.clone()).collect()
    }
}

impl<'a> IntoIterator for &'a Portfolio {
    type Item = &'a Trade;
    type IntoIter = std::slice::Iter<'a, Trade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

impl FromIterator<Trade> for Portfolio {
    fn from_iter<I: IntoIterator<Item = Trade>>(iter: I) -> Self {
        Self {
            trades: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ShortOption;

    impl AmcInstrument for ShortOption {
        fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
            Err(CalculatorError::NotAvailable("test".to_string()))
        }
        fn option_position(&self) -> Option<OptionPosition> {
            Some(OptionPosition::Short)
        }
    }

    struct Plain;

    impl AmcInstrument for Plain {
        fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
            Err(CalculatorError::NotAvailable("test".to_string()))
        }
    }

    #[test]
    fn test_effective_multiplier_applies_option_sign() {
        let short = Trade::new("T1", "FxOption", Box::new(ShortOption)).with_multiplier(2.5);
        assert_eq!(short.effective_multiplier(), -2.5);

        let plain = Trade::new("T2", "Swap", Box::new(Plain)).with_multiplier(3.0);
        assert_eq!(plain.effective_multiplier(), 3.0);
    }

    #[test]
    fn test_portfolio_ids_in_order() {
        let portfolio: Portfolio = ["A", "B", "C"]
            .iter()
            .map(|id| Trade::new(*id, "Swap", Box::new(Plain)))
            .collect();
        assert_eq!(portfolio.len(), 3);
        assert_eq!(portfolio.ids(), vec!["A", "B", "C"]);
        assert_eq!((&portfolio).into_iter().count(), 3);
    }
}
