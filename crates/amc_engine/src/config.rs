//! Run configuration.
//!
//! Loads engine, grid, model and market settings from a TOML file with
//! environment variable overrides:
//!
//! ```toml
//! [engine]
//! samples = 1000
//! seed = 42
//! sequence_type = "PseudoRandomAntithetic"
//! scenario_currencies = ["EUR"]
//! scenario_indices = ["EUR-EURIBOR-6M"]
//!
//! [grid]
//! reference_date = "2024-01-02"
//! frequency_months = 3
//! periods = 20
//! close_out_lag_days = 14
//! mpor_mode = "StickyDate"
//!
//! [model.base]
//! currency = "USD"
//! rate = 0.04
//! mean_reversion = 0.03
//! volatility = 0.01
//!
//! [[model.foreign]]
//! currency = "EUR"
//! rate = 0.025
//! mean_reversion = 0.02
//! volatility = 0.008
//! fx_spot = 1.08
//! fx_volatility = 0.09
//!
//! [[model.correlations]]
//! first = "IR:EUR"
//! second = "FX:EUR"
//! value = -0.2
//! ```

use std::path::Path;

use amc_core::types::{Currency, Date, DayCountConvention};
use amc_core::{MporMode, SimulationGrid};
use amc_models::{
    CorrelationMatrix, FlatCurve, FxComponent, GaussianCrossAssetModel, IborIndexSpec,
    LgmComponent, ModelError, SequenceType, SimpleMarket,
};
use serde::Deserialize;
use thiserror::Error;

use crate::error::EngineError;
use crate::parallel::ParallelConfig;

/// Configuration error type
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Engine settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of Monte Carlo samples
    pub samples: usize,
    /// Path generator seed (non-zero)
    pub seed: u64,
    /// Random sequence scheme
    pub sequence_type: SequenceType,
    /// Currencies whose FX rates go to the scenario data
    pub scenario_currencies: Vec<Currency>,
    /// Indices whose fixings go to the scenario data
    pub scenario_indices: Vec<String>,
    /// Parallel evaluation settings
    pub parallel: ParallelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            samples: 1000,
            seed: 42,
            sequence_type: SequenceType::default(),
            scenario_currencies: Vec::new(),
            scenario_indices: Vec::new(),
            parallel: ParallelConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Sets the sample count.
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the sequence type.
    pub fn with_sequence_type(mut self, sequence_type: SequenceType) -> Self {
        self.sequence_type = sequence_type;
        self
    }

    /// Requests scenario data for currencies and indices.
    pub fn with_scenario_data(mut self, currencies: Vec<Currency>, indices: Vec<String>) -> Self {
        self.scenario_currencies = currencies;
        self.scenario_indices = indices;
        self
    }

    /// Sets the parallel settings.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Simulation grid settings.
///
/// Valuation dates are either listed explicitly or generated every
/// `frequency_months` for `periods` periods after the reference date.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GridConfig {
    /// As-of date
    pub reference_date: Date,
    /// Day count for date-to-time conversion
    #[serde(default)]
    pub day_count: DayCountConvention,
    /// Explicit valuation dates
    #[serde(default)]
    pub valuation_dates: Vec<Date>,
    /// Generated schedule frequency
    pub frequency_months: Option<u32>,
    /// Generated schedule length
    pub periods: Option<usize>,
    /// Margin period of risk in calendar days
    pub close_out_lag_days: Option<i64>,
    /// Close-out convention
    #[serde(default)]
    pub mpor_mode: MporMode,
}

impl GridConfig {
    /// Valuation dates, explicit or generated.
    pub fn schedule(&self) -> Result<Vec<Date>, EngineError> {
        if !self.valuation_dates.is_empty() {
            return Ok(self.valuation_dates.clone());
        }
        match (self.frequency_months, self.periods) {
            (Some(months), Some(periods)) => (1..=periods as u32)
                .map(|i| {
                    self.reference_date
                        .add_months(i * months)
                        .map_err(|e| EngineError::Model(e.into()))
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Builds the grid.
    pub fn build(&self) -> Result<SimulationGrid, EngineError> {
        let mut builder = SimulationGrid::builder(self.reference_date, self.day_count)
            .valuation_dates(self.schedule()?);
        if let Some(lag) = self.close_out_lag_days {
            builder = builder.close_out_lag(lag, self.mpor_mode);
        }
        Ok(builder.build()?)
    }
}

/// One LGM rates component.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LgmConfig {
    /// Currency
    pub currency: Currency,
    /// Flat initial zero rate
    pub rate: f64,
    /// Mean reversion κ
    pub mean_reversion: f64,
    /// Volatility α
    pub volatility: f64,
}

impl LgmConfig {
    fn build(&self) -> Result<LgmComponent, ModelError> {
        LgmComponent::new(
            self.currency,
            self.mean_reversion,
            self.volatility,
            FlatCurve::new(self.rate),
        )
    }
}

/// A foreign currency: rates plus FX.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ForeignConfig {
    /// Rates component
    #[serde(flatten)]
    pub lgm: LgmConfig,
    /// FX spot, base per foreign
    pub fx_spot: f64,
    /// Lognormal FX volatility
    pub fx_volatility: f64,
}

/// Correlation between two factors named `IR:<ccy>` or `FX:<ccy>`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CorrelationConfig {
    /// First factor
    pub first: String,
    /// Second factor
    pub second: String,
    /// Correlation
    pub value: f64,
}

/// Cross-asset model settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// Base currency rates
    pub base: LgmConfig,
    /// Foreign currencies
    #[serde(default)]
    pub foreign: Vec<ForeignConfig>,
    /// Non-zero factor correlations
    #[serde(default)]
    pub correlations: Vec<CorrelationConfig>,
    /// Model day count
    #[serde(default)]
    pub day_count: DayCountConvention,
}

impl ModelConfig {
    /// Model currencies, base first.
    pub fn currencies(&self) -> Vec<Currency> {
        std::iter::once(self.base.currency)
            .chain(self.foreign.iter().map(|f| f.lgm.currency))
            .collect()
    }

    fn factor_index(&self, name: &str) -> Result<usize, ModelError> {
        let currencies = self.currencies();
        let (kind, code) = name
            .split_once(':')
            .ok_or_else(|| ModelError::Correlation(format!("bad factor name {}", name)))?;
        let ccy: Currency = code
            .parse()
            .map_err(|_| ModelError::Correlation(format!("bad factor currency in {}", name)))?;
        let c = currencies
            .iter()
            .position(|&x| x == ccy)
            .ok_or_else(|| ModelError::Correlation(format!("{} is not a model currency", ccy)))?;
        match kind {
            "IR" => Ok(c),
            "FX" if c > 0 => Ok(currencies.len() + c - 1),
            _ => Err(ModelError::Correlation(format!("unknown factor {}", name))),
        }
    }

    /// Builds the model.
    pub fn build(&self) -> Result<GaussianCrossAssetModel, ModelError> {
        let size = 2 * (self.foreign.len() + 1) - 1;
        let mut correlation = CorrelationMatrix::identity(size);
        for entry in &self.correlations {
            correlation.set(
                self.factor_index(&entry.first)?,
                self.factor_index(&entry.second)?,
                entry.value,
            )?;
        }

        let mut builder = GaussianCrossAssetModel::builder(self.base.build()?)
            .correlation(correlation)
            .day_count(self.day_count);
        for foreign in &self.foreign {
            builder = builder.foreign(
                foreign.lgm.build()?,
                FxComponent::new(foreign.fx_spot, foreign.fx_volatility)?,
            );
        }
        builder.build()
    }
}

/// Ibor index with a flat forwarding curve.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Index name
    pub name: String,
    /// Index currency
    pub currency: Currency,
    /// Tenor in months
    pub tenor_months: u32,
    /// Accrual day count
    #[serde(default)]
    pub day_count: DayCountConvention,
    /// Flat forwarding rate
    pub rate: f64,
}

/// Market data for scenario index fixings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MarketConfig {
    /// Ibor indices
    #[serde(default)]
    pub indices: Vec<IndexConfig>,
}

impl MarketConfig {
    /// Builds the market.
    pub fn build(&self) -> SimpleMarket {
        self.indices.iter().fold(SimpleMarket::new(), |market, index| {
            market.with_index(IborIndexSpec {
                name: index.name.clone(),
                currency: index.currency,
                tenor_months: index.tenor_months,
                day_count: index.day_count,
                forwarding_curve: FlatCurve::new(index.rate),
            })
        })
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Engine settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Grid settings
    pub grid: GridConfig,
    /// Model settings
    pub model: ModelConfig,
    /// Market settings
    #[serde(default)]
    pub market: MarketConfig,
}

impl RunConfig {
    /// Parses a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Apply environment variable overrides (`AMC_SAMPLES`, `AMC_SEED`)
    pub fn with_env_override(mut self) -> Self {
        if let Some(samples) = std::env::var("AMC_SAMPLES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.engine.samples = samples;
        }
        if let Some(seed) = std::env::var("AMC_SEED").ok().and_then(|v| v.parse().ok()) {
            self.engine.seed = seed;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.engine.samples == 0 {
            errors.push("samples must be greater than 0".to_string());
        }
        if self.engine.seed == 0 {
            errors.push("seed must not be 0".to_string());
        }

        let has_schedule = self.grid.frequency_months.is_some() && self.grid.periods.is_some();
        if self.grid.valuation_dates.is_empty() && !has_schedule {
            errors.push(
                "grid needs valuation_dates or both frequency_months and periods".to_string(),
            );
        }
        let lagged = self.grid.close_out_lag_days.unwrap_or(0) > 0;
        if lagged != (self.grid.mpor_mode != MporMode::NoLag) {
            errors.push(format!(
                "close_out_lag_days {:?} is inconsistent with mpor_mode {:?}",
                self.grid.close_out_lag_days, self.grid.mpor_mode
            ));
        }
        if self.grid.day_count != self.model.day_count {
            errors.push(format!(
                "grid day count {} differs from model day count {}",
                self.grid.day_count, self.model.day_count
            ));
        }

        let currencies = self.model.currencies();
        for (i, c) in currencies.iter().enumerate() {
            if currencies[..i].contains(c) {
                errors.push(format!("duplicate model currency {}", c));
            }
        }
        for c in &self.engine.scenario_currencies {
            if !currencies.contains(c) {
                errors.push(format!("scenario currency {} is not a model currency", c));
            }
        }
        for name in &self.engine.scenario_indices {
            if !self.market.indices.iter().any(|i| &i.name == name) {
                errors.push(format!("scenario index {} is not configured in [market]", name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from file with environment overrides and validate
    pub fn load_with_env_and_validate(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?.with_env_override();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amc_models::CrossAssetModel;

    const MINIMAL: &str = r#"
        [grid]
        reference_date = "2024-01-02"
        frequency_months = 6
        periods = 4

        [model.base]
        currency = "USD"
        rate = 0.04
        mean_reversion = 0.03
        volatility = 0.01
    "#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = RunConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.validate().is_ok());

        let grid = config.grid.build().unwrap();
        assert_eq!(grid.size(), 4);
        assert_eq!(grid.dates()[0], Date::from_ymd(2024, 7, 2).unwrap());
        assert_eq!(grid.mpor_mode(), MporMode::NoLag);
    }

    #[test]
    fn test_model_with_correlation() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
            [[model.foreign]]
            currency = "EUR"
            rate = 0.02
            mean_reversion = 0.02
            volatility = 0.008
            fx_spot = 1.08
            fx_volatility = 0.09

            [[model.correlations]]
            first = "IR:EUR"
            second = "FX:EUR"
            value = -0.25
            "#
        );
        let config = RunConfig::from_toml_str(&toml).unwrap();
        let model = config.model.build().unwrap();
        assert_eq!(model.currencies(), &[Currency::USD, Currency::EUR]);
        assert_eq!(model.correlation().get(1, 2), -0.25);
    }

    #[test]
    fn test_bad_factor_name() {
        let mut config = RunConfig::from_toml_str(MINIMAL).unwrap();
        config.model.correlations.push(CorrelationConfig {
            first: "FX:USD".to_string(),
            second: "IR:USD".to_string(),
            value: 0.1,
        });
        assert!(matches!(
            config.model.build(),
            Err(ModelError::Correlation(_))
        ));
    }

    #[test]
    fn test_validate_collects_errors() {
        let mut config = RunConfig::from_toml_str(MINIMAL).unwrap();
        config.engine.samples = 0;
        config.engine.seed = 0;
        config.grid.close_out_lag_days = Some(14);
        config.engine.scenario_indices = vec!["EUR-EURIBOR-6M".to_string()];

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.iter().any(|e| e.contains("samples")));
                assert!(errors.iter().any(|e| e.contains("mpor_mode")));
                assert!(errors.iter().any(|e| e.contains("EUR-EURIBOR-6M")));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            RunConfig::from_toml_str("[grid]\nreference_date = 5"),
            Err(ConfigError::Parse(_))
        ));
    }
}
