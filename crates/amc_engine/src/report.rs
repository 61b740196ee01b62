//! Run summary: extraction counts, recovered failures and timings.

use std::fmt;
use std::time::Duration;

use tracing::info;

/// Stage at which a trade-level failure was recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// Calculator retrieval or registry resolution; the trade was skipped.
    Extraction,
    /// Path-evaluated calculator on one sample; zeros were written.
    PathEvaluation,
    /// Batch-evaluated calculator; zeros were written for every sample.
    BatchEvaluation,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Extraction => write!(f, "extraction"),
            FailureStage::PathEvaluation => write!(f, "path evaluation"),
            FailureStage::BatchEvaluation => write!(f, "batch evaluation"),
        }
    }
}

/// A recovered trade-level failure.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeFailure {
    /// Trade id
    pub trade_id: String,
    /// Trade type label
    pub trade_type: String,
    /// Sample index for per-sample failures
    pub sample: Option<usize>,
    /// Stage of the failure
    pub stage: FailureStage,
    /// Error message
    pub message: String,
}

/// Wall-clock time spent per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineTimings {
    /// Calculator extraction
    pub registry: Duration,
    /// Path generation
    pub path_generation: Duration,
    /// FX and IR buffer filling
    pub buffers: Duration,
    /// Scenario data emission
    pub scenario_data: Duration,
    /// Calculator evaluation and cube writes (both passes)
    pub valuation: Duration,
    /// Everything else
    pub residual: Duration,
    /// Whole run
    pub total: Duration,
}

impl EngineTimings {
    /// Sets `residual` from `total` and the other stages.
    pub fn close(&mut self, total: Duration) {
        self.total = total;
        let accounted = self.registry
            + self.path_generation
            + self.buffers
            + self.scenario_data
            + self.valuation;
        self.residual = total.saturating_sub(accounted);
    }

    /// Logs the breakdown at info level.
    pub fn log(&self) {
        info!("AMC valuation engine timings (seconds):");
        info!("  registry:        {:.3}", self.registry.as_secs_f64());
        info!("  path generation: {:.3}", self.path_generation.as_secs_f64());
        info!("  buffers:         {:.3}", self.buffers.as_secs_f64());
        info!("  scenario data:   {:.3}", self.scenario_data.as_secs_f64());
        info!("  valuation:       {:.3}", self.valuation.as_secs_f64());
        info!("  residual:        {:.3}", self.residual.as_secs_f64());
        info!("  total:           {:.3}", self.total.as_secs_f64());
    }
}

/// Outcome of a completed cube build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Trades with an extracted calculator
    pub extracted: usize,
    /// Trades skipped at extraction
    pub skipped: usize,
    /// Samples simulated
    pub samples: usize,
    /// Recovered failures in the order they occurred
    pub failures: Vec<TradeFailure>,
    /// Stage timings
    pub timings: EngineTimings,
}

impl RunReport {
    /// True if nothing was skipped or zeroed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures recovered at `stage`.
    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &TradeFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}
