//! Run command implementation
//!
//! Builds the exposure cube for the demo portfolio and prints the expected
//! exposure profile of each trade.

use std::path::Path;

use amc_core::{InMemoryCube, InMemoryScenarioData, NpvCube, ScenarioDataSink};
use amc_engine::{AmcValuationEngine, RunConfig, RunReport};
use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use crate::portfolio::demo_portfolio;

/// Run the run command
pub fn run(config_path: &Path, samples: Option<usize>, seed: Option<u64>, format: &str) -> Result<()> {
    if !matches!(format, "table" | "csv") {
        bail!("Unknown format: {}. Supported: table, csv", format);
    }

    let mut config = RunConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?
        .with_env_override();
    if let Some(samples) = samples {
        config.engine.samples = samples;
    }
    if let Some(seed) = seed {
        config.engine.seed = seed;
    }
    config.validate().context("invalid configuration")?;

    info!("Starting AMC run...");
    info!("  Config: {}", config_path.display());
    info!("  Samples: {}", config.engine.samples);
    info!("  Seed: {}", config.engine.seed);
    info!("  Sequence: {}", config.engine.sequence_type);

    let grid = config.grid.build().context("failed to build simulation grid")?;
    let model = config.model.build().context("failed to build model")?;
    let market = config.market.build();
    let portfolio = demo_portfolio(&model, &grid).context("failed to build demo portfolio")?;

    let depth = if grid.with_close_out_lag() { 2 } else { 1 };
    let mut cube = InMemoryCube::new(
        portfolio.ids(),
        grid.valuation_count(),
        config.engine.samples,
        depth,
    )?;
    let with_scenario_data =
        !config.engine.scenario_currencies.is_empty() || !config.engine.scenario_indices.is_empty();
    let mut scenario_data = InMemoryScenarioData::new();

    let progress = |done: usize, total: usize| debug!(done, total, "calculator extraction");
    let engine = AmcValuationEngine::new(&model, &grid, config.engine.clone())?
        .with_market(&market)
        .with_progress(&progress);
    let sink: Option<&mut dyn ScenarioDataSink> = if with_scenario_data {
        Some(&mut scenario_data)
    } else {
        None
    };
    let report = engine.build_cube(&portfolio, &mut cube, sink)?;

    log_failures(&report);
    if with_scenario_data {
        info!(values = scenario_data.len(), "scenario data recorded");
    }

    let dates = grid.valuation_dates();
    match format {
        "csv" => {
            println!("trade,date,epe,ene");
            for (id, trade) in cube.ids().iter().enumerate() {
                for (d, date) in dates.iter().enumerate() {
                    let (epe, ene) = exposures(&cube, id, d)?;
                    println!("{},{},{:.4},{:.4}", trade, date, epe, ene);
                }
            }
        }
        _ => {
            println!();
            println!("{:<14} {:>16} {:>16} {:>12}", "Trade ID", "T0 NPV", "Peak EPE", "Peak date");
            println!("{}", "-".repeat(61));
            for (id, trade) in cube.ids().iter().enumerate() {
                let mut peak = (0.0, None);
                for (d, date) in dates.iter().enumerate() {
                    let (epe, _) = exposures(&cube, id, d)?;
                    if peak.1.is_none() || epe > peak.0 {
                        peak = (epe, Some(*date));
                    }
                }
                println!(
                    "{:<14} {:>16.2} {:>16.2} {:>12}",
                    trade,
                    cube.get_t0(id, 0)?,
                    peak.0,
                    peak.1.map(|d| d.to_string()).unwrap_or_default()
                );
            }
            println!();
        }
    }

    info!(
        extracted = report.extracted,
        skipped = report.skipped,
        failures = report.failures.len(),
        "AMC run complete"
    );
    Ok(())
}

/// Positive and negative expected exposure of one cube cell, deflated.
fn exposures(cube: &InMemoryCube, id: usize, date: usize) -> Result<(f64, f64)> {
    let values = cube.sample_values(id, date, 0)?;
    let n = values.len() as f64;
    let epe = values.iter().map(|v| v.max(0.0)).sum::<f64>() / n;
    let ene = values.iter().map(|v| v.min(0.0)).sum::<f64>() / n;
    Ok((epe, ene))
}

fn log_failures(report: &RunReport) {
    for failure in &report.failures {
        warn!(
            trade = %failure.trade_id,
            stage = %failure.stage,
            sample = ?failure.sample,
            "{}",
            failure.message
        );
    }
}
