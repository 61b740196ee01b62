//! Scenario data written alongside the cube.

mod common;

use amc_core::types::DayCountConvention;
use amc_core::{Currency, InMemoryCube, InMemoryScenarioData, MporMode, ScenarioDataType};
use amc_engine::{AmcValuationEngine, EngineConfig, Portfolio};
use amc_models::{
    CrossAssetModel, FlatCurve, FxComponent, GaussianCrossAssetModel, IborIndexSpec,
    IndexReplicationCurve, LgmComponent, Path, PrecomputedPaths, SimpleMarket,
};
use approx::assert_relative_eq;
use common::{asof, fixed_trade, lagged_grid};

const X_USD: f64 = 0.01;
const X_EUR: f64 = 0.02;
const FX: f64 = 1.2;

fn model() -> GaussianCrossAssetModel {
    GaussianCrossAssetModel::builder(
        LgmComponent::new(Currency::USD, 0.03, 0.01, FlatCurve::new(0.04)).unwrap(),
    )
    .foreign(
        LgmComponent::new(Currency::EUR, 0.02, 0.008, FlatCurve::new(0.02)).unwrap(),
        FxComponent::new(1.1, 0.1).unwrap(),
    )
    .build()
    .unwrap()
}

fn euribor() -> IborIndexSpec {
    IborIndexSpec {
        name: "EUR-EURIBOR-6M".to_string(),
        currency: Currency::EUR,
        tenor_months: 6,
        day_count: DayCountConvention::ActualActual360,
        forwarding_curve: FlatCurve::new(0.025),
    }
}

#[test]
fn test_scenario_data_on_valuation_dates() {
    let model = model();
    let grid = lagged_grid(MporMode::ActualDate);
    let market = SimpleMarket::new().with_index(euribor());
    let config = EngineConfig::default().with_scenario_data(
        vec![Currency::USD, Currency::EUR],
        vec!["EUR-EURIBOR-6M".to_string(), "GBP-LIBOR-3M".to_string()],
    );

    let times = grid.time_grid().to_vec();
    let n = times.len();
    let mut states = vec![X_USD; n];
    states.extend(vec![X_EUR; n]);
    states.extend(vec![FX.ln(); n]);
    let path = Path::from_values(times.clone(), 3, states).unwrap();
    let mut paths = PrecomputedPaths::new(vec![path.clone(), path]);

    let portfolio =
        Portfolio::new().with_trade(fixed_trade("A", Currency::USD, vec![0.0; n]));
    let mut cube = InMemoryCube::new(portfolio.ids(), 2, 2, 2).unwrap();
    let mut sink = InMemoryScenarioData::new();

    let report = AmcValuationEngine::new(&model, &grid, config)
        .unwrap()
        .with_market(&market)
        .build_cube_with_paths(&portfolio, &mut cube, Some(&mut sink), &mut paths)
        .unwrap();
    assert!(report.is_clean());

    // numeraire, EUR spot and one index per date and sample; USD and the
    // unknown index are skipped
    assert_eq!(sink.len(), 2 * 2 * 3);

    let valuation_positions = [1, 3];
    for (date, &k) in valuation_positions.iter().enumerate() {
        let valuation_date = grid.dates()[k - 1];
        let mut curve = IndexReplicationCurve::new(&model, euribor(), asof()).unwrap();
        curve.move_to(valuation_date, X_EUR);
        let fixing = curve.fixing(valuation_date).unwrap();
        let numeraire = model.numeraire(0, times[k], X_USD).unwrap();

        for s in 0..2 {
            assert_relative_eq!(
                sink.get(date, s, ScenarioDataType::Numeraire, None).unwrap(),
                numeraire,
                max_relative = 1e-12
            );
            assert_relative_eq!(
                sink.get(date, s, ScenarioDataType::FxSpot, Some("EUR")).unwrap(),
                FX,
                max_relative = 1e-12
            );
            assert_relative_eq!(
                sink.get(date, s, ScenarioDataType::IndexFixing, Some("EUR-EURIBOR-6M"))
                    .unwrap(),
                fixing,
                max_relative = 1e-12
            );
            assert!(sink.get(date, s, ScenarioDataType::FxSpot, Some("USD")).is_none());
            assert!(sink
                .get(date, s, ScenarioDataType::IndexFixing, Some("GBP-LIBOR-3M"))
                .is_none());
        }
    }
    assert!(sink.get(2, 0, ScenarioDataType::Numeraire, None).is_none());
}

#[test]
fn test_generated_numeraire_is_positive() {
    let model = model();
    let grid = lagged_grid(MporMode::StickyDate);
    let market = SimpleMarket::new();
    let config = EngineConfig::default().with_scenario_data(vec![Currency::EUR], vec![]);
    let portfolio = Portfolio::new().with_trade(fixed_trade("A", Currency::USD, vec![0.0; 5]));
    let mut cube = InMemoryCube::new(portfolio.ids(), 2, 50, 2).unwrap();
    let mut sink = InMemoryScenarioData::new();

    AmcValuationEngine::new(&model, &grid, config)
        .unwrap()
        .with_market(&market)
        .build_cube(&portfolio, &mut cube, Some(&mut sink))
        .unwrap();

    assert_eq!(sink.len(), 2 * 50 * 2);
    for date in 0..2 {
        for s in 0..50 {
            assert!(sink.get(date, s, ScenarioDataType::Numeraire, None).unwrap() > 0.0);
            assert!(sink.get(date, s, ScenarioDataType::FxSpot, Some("EUR")).unwrap() > 0.0);
        }
    }
}
