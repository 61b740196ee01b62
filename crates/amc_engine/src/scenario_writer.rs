//! Scenario data emission on valuation dates.

use amc_core::types::Currency;
use amc_core::{ScenarioDataSink, ScenarioDataType, SimulationGrid};
use amc_models::{CrossAssetModel, IndexReplicationCurve, MarketDataProvider};
use tracing::{debug, warn};

use crate::buffers::ConversionBuffers;
use crate::error::EngineError;

/// Writes numeraire, FX and index values of each sample to a sink.
pub(crate) struct ScenarioWriter<'a> {
    grid: &'a SimulationGrid,
    currencies: Vec<(usize, &'static str)>,
    curves: Vec<IndexReplicationCurve<'a>>,
}

impl<'a> ScenarioWriter<'a> {
    /// Resolves the requested currencies and indices.
    ///
    /// The base currency is skipped. Indices the market does not know are
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// - `MissingMarket` if currencies or indices are requested without a
    ///   market
    /// - `Currency` if a requested currency is not in the model
    pub(crate) fn new(
        model: &'a dyn CrossAssetModel,
        grid: &'a SimulationGrid,
        currencies: &[Currency],
        indices: &[String],
        market: Option<&dyn MarketDataProvider>,
    ) -> Result<Self, EngineError> {
        if (!currencies.is_empty() || !indices.is_empty()) && market.is_none() {
            return Err(EngineError::MissingMarket);
        }
        let base = model.base_currency();
        let currencies = currencies
            .iter()
            .filter(|&&c| c != base)
            .map(|&c| Ok((model.ccy_index(c)?, c.code())))
            .collect::<Result<Vec<_>, EngineError>>()?;

        let mut curves = Vec::with_capacity(indices.len());
        if let Some(market) = market {
            for name in indices {
                let curve = market.ibor_index(name).and_then(|spec| {
                    IndexReplicationCurve::new(model, spec, grid.reference_date())
                });
                match curve {
                    Ok(curve) => curves.push(curve),
                    Err(e) => warn!(index = %name, "scenario index skipped: {}", e),
                }
            }
        }

        debug!(
            currencies = currencies.len(),
            indices = curves.len(),
            "scenario data writer ready"
        );
        Ok(Self {
            grid,
            currencies,
            curves,
        })
    }

    /// Writes every valuation date of sample `s`.
    pub(crate) fn write_sample(
        &mut self,
        sink: &mut dyn ScenarioDataSink,
        buffers: &ConversionBuffers<'_>,
        s: usize,
    ) -> Result<(), EngineError> {
        let times = self.grid.time_grid();
        let mut date_index = 0;
        for k in 1..=self.grid.size() {
            if !self.grid.is_valuation_date(k - 1) {
                continue;
            }
            sink.set(
                date_index,
                s,
                buffers.numeraire(0, k, times[k], s)?,
                ScenarioDataType::Numeraire,
                None,
            );
            for &(c, code) in &self.currencies {
                sink.set(
                    date_index,
                    s,
                    buffers.fx(c, k, s),
                    ScenarioDataType::FxSpot,
                    Some(code),
                );
            }
            let date = self.grid.dates()[k - 1];
            for curve in &mut self.curves {
                curve.move_to(date, buffers.ir_state(curve.ccy_index(), k, s));
                sink.set(
                    date_index,
                    s,
                    curve.fixing(date)?,
                    ScenarioDataType::IndexFixing,
                    Some(curve.spec().name.as_str()),
                );
            }
            date_index += 1;
        }
        Ok(())
    }
}
