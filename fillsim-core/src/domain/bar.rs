//! Bar: one price interval fed to orders.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Open/high/low/last snapshot of a single interval.
///
/// Orders only ever read bars. The OHLC relationship
/// (`low <= open, last <= high`) is expected but not enforced here;
/// see [`Bar::is_sane`] for the ingestion-side check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub last: f64,
    pub timestamp: NaiveDateTime,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, last: f64, timestamp: NaiveDateTime) -> Self {
        Self {
            open,
            high,
            low,
            last,
            timestamp,
        }
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.last.is_nan()
    }

    /// Basic OHLC sanity check: low <= open/last <= high.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.low <= self.high
            && self.low <= self.open
            && self.open <= self.high
            && self.low <= self.last
            && self.last <= self.high
    }
}
