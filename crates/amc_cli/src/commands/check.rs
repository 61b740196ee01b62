//! Check command implementation
//!
//! Validates the run configuration and prints the simulation grid.

use std::path::Path;

use amc_engine::RunConfig;
use amc_models::CrossAssetModel;
use anyhow::{Context, Result};
use tracing::info;

/// Run the check command
pub fn run(config_path: &Path) -> Result<()> {
    info!("Checking configuration {}", config_path.display());

    let config = RunConfig::load_with_env_and_validate(config_path)
        .with_context(|| format!("invalid configuration {}", config_path.display()))?;
    let grid = config.grid.build().context("failed to build simulation grid")?;
    let model = config.model.build().context("failed to build model")?;

    println!("Reference date : {}", grid.reference_date());
    println!("Day count      : {}", grid.day_count());
    println!("MPOR mode      : {:?}", grid.mpor_mode());
    println!(
        "Currencies     : {}",
        model
            .currencies()
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Samples        : {}", config.engine.samples);
    println!();
    println!("{:<5} {:<12} {:>10} {:>10} {:>10}", "Pos", "Date", "Time", "Valuation", "Close-out");
    for (k, date) in grid.dates().iter().enumerate() {
        println!(
            "{:<5} {:<12} {:>10.6} {:>10} {:>10}",
            k,
            date.to_string(),
            grid.time_grid()[k + 1],
            if grid.is_valuation_date(k) { "x" } else { "" },
            if grid.is_close_out_date(k) { "x" } else { "" },
        );
    }

    info!("Configuration OK");
    Ok(())
}
