//! Bar records: a bar plus whatever numeric columns the source file carried.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names that map onto [`Bar`] fields.
pub const BAR_COLUMNS: [&str; 4] = ["open", "high", "low", "last"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub bar: Bar,
    /// Extra numeric columns keyed by normalized column name.
    #[serde(default)]
    pub extra: BTreeMap<String, f64>,
}

impl BarRecord {
    pub fn new(bar: Bar) -> Self {
        Self {
            bar,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, column: impl Into<String>, value: f64) -> Self {
        self.extra.insert(column.into(), value);
        self
    }

    /// Look up a column by name: bar fields first, then extras.
    pub fn get(&self, column: &str) -> Option<f64> {
        match column {
            "open" => Some(self.bar.open),
            "high" => Some(self.bar.high),
            "low" => Some(self.bar.low),
            "last" => Some(self.bar.last),
            other => self.extra.get(other).copied(),
        }
    }
}

/// Strip records down to the bar stream orders consume.
pub fn bars_of(records: &[BarRecord]) -> Vec<Bar> {
    records.iter().map(|r| r.bar).collect()
}
