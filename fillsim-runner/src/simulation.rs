//! Simulation runner: wires config, bar data, order placement and reporting.
//!
//! Two execution paths produce the same result:
//! - parallel: every placement is advanced independently over its bar slice
//!   on the rayon pool
//! - sequential: placements are replayed through [`StrategyRunner`]

use chrono::NaiveDateTime;
use fillsim_core::data::{bars_of, load_records, DataError, IngestOptions};
use fillsim_core::domain::Bar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::config::{ConfigError, DataConfig, RunId, SimulationConfig};
use crate::report::{TradeRecord, TradeSummary};
use crate::strategy::{Placement, ScheduledOrders, StrategyRunner, TrackedOrder};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("no bars to simulate")]
    NoBars,
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub bar_count: usize,
    pub first_bar: NaiveDateTime,
    pub last_bar: NaiveDateTime,
    pub parallel: bool,
    pub trades: Vec<TradeRecord>,
    pub summary: TradeSummary,
}

/// Load the configured bar file.
pub fn load_bars(data: &DataConfig) -> Result<Vec<Bar>, RunError> {
    let opts = IngestOptions {
        reject_insane: data.reject_insane,
        ..Default::default()
    };
    let report = load_records(&data.path, &opts)?;
    if report.insane_rows > 0 {
        warn!(
            path = %data.path.display(),
            rows = report.insane_rows,
            "bars with out-of-range open/last kept"
        );
    }
    info!(path = %data.path.display(), bars = report.records.len(), "bars loaded");
    Ok(bars_of(&report.records))
}

/// Load the configured data, then simulate.
pub fn run_from_config(config: &SimulationConfig) -> Result<SimulationResult, RunError> {
    let bars = load_bars(&config.data)?;
    run_simulation(config, &bars)
}

/// Simulate every configured order over pre-loaded bars.
pub fn run_simulation(
    config: &SimulationConfig,
    bars: &[Bar],
) -> Result<SimulationResult, RunError> {
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Err(RunError::NoBars);
    };
    let run_id = config.run_id(bars)?;
    let span = info_span!("simulation", run_id = %&run_id[..12]);
    let _guard = span.enter();

    let placements = config.placements(bars)?;
    info!(
        orders = placements.len(),
        bars = bars.len(),
        parallel = config.run.parallel,
        "simulation started"
    );

    let orders = if config.run.parallel {
        simulate_orders(bars, &placements, true)
    } else {
        StrategyRunner::new(ScheduledOrders::new(&placements))
            .run(bars)
            .into_orders()
    };

    let trades: Vec<TradeRecord> = orders.iter().map(TradeRecord::from).collect();
    let summary = TradeSummary::from_trades(&trades);
    info!(
        closed = summary.closed,
        open = summary.open,
        unfilled = summary.unfilled,
        total_exit_pl = summary.total_exit_pl,
        "simulation finished"
    );

    Ok(SimulationResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        bar_count: bars.len(),
        first_bar: first.timestamp,
        last_bar: last.timestamp,
        parallel: config.run.parallel,
        trades,
        summary,
    })
}

/// Advance each placement independently, on the rayon pool when `parallel`.
///
/// Placements are ordered by entry bar (stable, so ties keep their input
/// order) and numbered the way [`StrategyRunner`] numbers them. Placements
/// past the end of `bars` are skipped.
pub fn simulate_orders(
    bars: &[Bar],
    placements: &[Placement],
    parallel: bool,
) -> Vec<TrackedOrder> {
    let mut ordered: Vec<&Placement> = placements.iter().collect();
    ordered.sort_by_key(|p| p.entry_bar);

    if parallel {
        ordered
            .par_iter()
            .enumerate()
            .filter_map(|(id, p)| simulate_one(bars, id, p))
            .collect()
    } else {
        ordered
            .iter()
            .enumerate()
            .filter_map(|(id, p)| simulate_one(bars, id, p))
            .collect()
    }
}

fn simulate_one(bars: &[Bar], id: usize, placement: &Placement) -> Option<TrackedOrder> {
    let Some(window) = bars.get(placement.entry_bar..).filter(|w| !w.is_empty()) else {
        debug!(
            label = %placement.request.label,
            entry_bar = placement.entry_bar,
            "placement past the last bar"
        );
        return None;
    };

    let mut order = placement.request.place(&window[0]);
    let mut closed_bar = None;
    for (offset, bar) in window.iter().enumerate() {
        order.advance(bar);
        if order.is_closed {
            closed_bar = Some(placement.entry_bar + offset);
            break;
        }
    }

    debug!(
        label = %placement.request.label,
        state = ?order.state(),
        level_hit = %order.level_hit,
        exit_pl = ?order.exit_pl,
        "order simulated"
    );
    Some(TrackedOrder {
        id,
        label: placement.request.label.clone(),
        placed_bar: placement.entry_bar,
        closed_bar,
        order,
    })
}
