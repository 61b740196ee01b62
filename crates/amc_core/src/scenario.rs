//! Aggregation scenario data.
//!
//! Alongside the cube the engine can record, for every valuation date and
//! sample, the base numeraire, FX spots and index fixings implied by the
//! simulated state. Downstream aggregation uses them to discount and
//! convert netting-set exposures.

use std::collections::HashMap;
use std::fmt;

/// Kind of scenario value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScenarioDataType {
    /// Base-currency numeraire.
    Numeraire,
    /// FX spot to base; qualifier is the currency code.
    FxSpot,
    /// Index fixing; qualifier is the index name.
    IndexFixing,
}

impl fmt::Display for ScenarioDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioDataType::Numeraire => "Numeraire",
            ScenarioDataType::FxSpot => "FxSpot",
            ScenarioDataType::IndexFixing => "IndexFixing",
        };
        f.write_str(name)
    }
}

/// Sink for scenario values keyed by (date index, sample, type, qualifier).
pub trait ScenarioDataSink: Send {
    /// Records one value.
    fn set(
        &mut self,
        date: usize,
        sample: usize,
        value: f64,
        data_type: ScenarioDataType,
        qualifier: Option<&str>,
    );
}

type ScenarioKey = (usize, usize, ScenarioDataType, Option<String>);

/// Hash-map backed scenario store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryScenarioData {
    values: HashMap<ScenarioKey, f64>,
}

impl InMemoryScenarioData {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a recorded value.
    pub fn get(
        &self,
        date: usize,
        sample: usize,
        data_type: ScenarioDataType,
        qualifier: Option<&str>,
    ) -> Option<f64> {
        self.values
            .get(&(date, sample, data_type, qualifier.map(str::to_string)))
            .copied()
    }

    /// Number of recorded values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ScenarioDataSink for InMemoryScenarioData {
    fn set(
        &mut self,
        date: usize,
        sample: usize,
        value: f64,
        data_type: ScenarioDataType,
        qualifier: Option<&str>,
    ) {
        self.values.insert(
            (date, sample, data_type, qualifier.map(str::to_string)),
            value,
        );
    }
}
