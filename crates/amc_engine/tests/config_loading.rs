//! Loading a run configuration from disk and running it.

use std::io::Write;
use std::path::Path;

use amc_core::{InMemoryCube, InMemoryScenarioData, MporMode, NpvCube, ScenarioDataType};
use amc_engine::{
    AmcCalculator, AmcInstrument, AmcValuationEngine, CalculatorError, ConfigError,
    PathCalculator, Portfolio, RunConfig, Trade,
};
use amc_models::{CrossAssetModel, Path as SimPath};
use tempfile::NamedTempFile;

const RUN: &str = r#"
[engine]
samples = 64
seed = 42
sequence_type = "PseudoRandomAntithetic"
scenario_currencies = ["EUR"]
scenario_indices = ["EUR-EURIBOR-6M"]

[engine.parallel]
enabled = true
parallel_threshold = 2

[grid]
reference_date = "2024-01-02"
frequency_months = 3
periods = 4
close_out_lag_days = 14
mpor_mode = "StickyDate"

[model.base]
currency = "USD"
rate = 0.04
mean_reversion = 0.03
volatility = 0.01

[[model.foreign]]
currency = "EUR"
rate = 0.025
mean_reversion = 0.02
volatility = 0.008
fx_spot = 1.08
fx_volatility = 0.09

[[model.correlations]]
first = "IR:EUR"
second = "FX:EUR"
value = -0.2

[[market.indices]]
name = "EUR-EURIBOR-6M"
currency = "EUR"
tenor_months = 6
day_count = "ACT/360"
rate = 0.03
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Unit notional in EUR, undiscounted.
struct UnitCash;

impl PathCalculator for UnitCash {
    fn npv_currency(&self) -> amc_core::Currency {
        amc_core::Currency::EUR
    }

    fn simulate_path(&mut self, path: &SimPath, _reuse: bool) -> Result<Vec<f64>, CalculatorError> {
        Ok(vec![1.0; path.len()])
    }
}

struct Cash;

impl AmcInstrument for Cash {
    fn amc_calculator(&self) -> Result<AmcCalculator, CalculatorError> {
        Ok(AmcCalculator::PathEvaluated(Box::new(UnitCash)))
    }
}

#[test]
fn test_load_build_and_run() {
    let file = write_config(RUN);
    let config = RunConfig::load(file.path()).unwrap();
    config.validate().unwrap();

    let grid = config.grid.build().unwrap();
    assert_eq!(grid.mpor_mode(), MporMode::StickyDate);
    assert_eq!(grid.valuation_count(), 4);
    assert_eq!(grid.close_out_positions().len(), 4);

    let model = config.model.build().unwrap();
    assert_eq!(model.currencies().len(), 2);
    let market = config.market.build();

    let portfolio = Portfolio::new().with_trade(Trade::new("CASH", "Cash", Box::new(Cash)));
    let mut cube = InMemoryCube::new(
        portfolio.ids(),
        grid.valuation_count(),
        config.engine.samples,
        2,
    )
    .unwrap();
    let mut sink = InMemoryScenarioData::new();

    let report = AmcValuationEngine::new(&model, &grid, config.engine.clone())
        .unwrap()
        .with_market(&market)
        .build_cube(&portfolio, &mut cube, Some(&mut sink))
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.samples, 64);
    assert!((cube.get_t0(0, 0).unwrap() - 1.08).abs() < 1e-12);
    assert_eq!(sink.len(), 4 * 64 * 3);
    assert!(sink
        .get(3, 63, ScenarioDataType::IndexFixing, Some("EUR-EURIBOR-6M"))
        .is_some());
}

#[test]
fn test_missing_file_is_io_error() {
    let result = RunConfig::load(Path::new("/nonexistent/amc/run.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_env_override_then_validate() {
    let file = write_config(RUN);

    std::env::set_var("AMC_SAMPLES", "128");
    std::env::set_var("AMC_SEED", "7");
    let config = RunConfig::load_with_env_and_validate(file.path());
    std::env::set_var("AMC_SEED", "0");
    let rejected = RunConfig::load_with_env_and_validate(file.path());
    std::env::remove_var("AMC_SAMPLES");
    std::env::remove_var("AMC_SEED");

    let config = config.unwrap();
    assert_eq!(config.engine.samples, 128);
    assert_eq!(config.engine.seed, 7);
    assert!(matches!(rejected, Err(ConfigError::Validation(_))));
}

#[test]
fn test_invalid_file_reports_every_problem() {
    let content = RUN
        .replace("seed = 42", "seed = 0")
        .replace("scenario_currencies = [\"EUR\"]", "scenario_currencies = [\"GBP\"]");
    let file = write_config(&content);

    match RunConfig::load(file.path()).unwrap().validate() {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().any(|e| e.contains("GBP")));
        }
        other => panic!("Expected validation error, got {:?}", other),
    }
}
