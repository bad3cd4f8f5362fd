//! Trade records, run summary and their CSV/JSON exports.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use fillsim_core::domain::{LevelHit, OrderSide};
use fillsim_core::orders::OrderState;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::strategy::TrackedOrder;

/// Where an order ended up when the run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Closed,
    Open,
    Unfilled,
}

impl From<OrderState> for TradeStatus {
    fn from(state: OrderState) -> Self {
        match state {
            OrderState::Closed => TradeStatus::Closed,
            OrderState::Live => TradeStatus::Open,
            OrderState::Pending => TradeStatus::Unfilled,
        }
    }
}

/// One flat row per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub label: String,
    pub side: OrderSide,
    pub kind: String,
    pub status: TradeStatus,
    pub placed_bar: usize,
    #[serde(default)]
    pub closed_bar: Option<usize>,
    #[serde(default)]
    pub entry_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub exit_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub level_hit: LevelHit,
    #[serde(default)]
    pub exit_pl: Option<f64>,
    #[serde(default)]
    pub max_open_pl: Option<f64>,
    #[serde(default)]
    pub min_open_pl: Option<f64>,
    #[serde(default)]
    pub last_bar_pl: Option<f64>,
    pub bars_live: usize,
}

impl From<&TrackedOrder> for TradeRecord {
    fn from(t: &TrackedOrder) -> Self {
        let o = &t.order;
        Self {
            label: t.label.clone(),
            side: o.side,
            kind: o.kind.name().to_string(),
            status: o.state().into(),
            placed_bar: t.placed_bar,
            closed_bar: t.closed_bar,
            entry_time: o.entry_time,
            exit_time: o.exit_time,
            entry_price: o.entry_price,
            exit_price: o.exit_price,
            quantity: o.quantity,
            level_hit: o.level_hit,
            exit_pl: o.exit_pl,
            max_open_pl: o.max_open_pl,
            min_open_pl: o.min_open_pl,
            last_bar_pl: o.bar_close_pl,
            bars_live: o.bars_live,
        }
    }
}

/// Aggregate view over a run's trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub total: usize,
    pub closed: usize,
    pub open: usize,
    pub unfilled: usize,
    pub targets: usize,
    pub stops: usize,
    pub total_exit_pl: f64,
    /// Targets over closed trades; 0 when nothing closed.
    pub win_rate: f64,
    pub avg_exit_pl: f64,
    #[serde(default)]
    pub worst_open_pl: Option<f64>,
    #[serde(default)]
    pub best_open_pl: Option<f64>,
}

impl TradeSummary {
    pub fn from_trades(trades: &[TradeRecord]) -> Self {
        let mut s = TradeSummary {
            total: trades.len(),
            ..Default::default()
        };

        for t in trades {
            match t.status {
                TradeStatus::Closed => s.closed += 1,
                TradeStatus::Open => s.open += 1,
                TradeStatus::Unfilled => s.unfilled += 1,
            }
            match t.level_hit {
                LevelHit::Target => s.targets += 1,
                LevelHit::Stop => s.stops += 1,
                LevelHit::NoHit => {}
            }
            s.total_exit_pl += t.exit_pl.unwrap_or(0.0);
            if let Some(min) = t.min_open_pl {
                s.worst_open_pl = Some(s.worst_open_pl.map_or(min, |w| w.min(min)));
            }
            if let Some(max) = t.max_open_pl {
                s.best_open_pl = Some(s.best_open_pl.map_or(max, |b| b.max(max)));
            }
        }

        if s.closed > 0 {
            s.win_rate = s.targets as f64 / s.closed as f64;
            s.avg_exit_pl = s.total_exit_pl / s.closed as f64;
        }
        s
    }
}

pub fn write_trades_csv(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trades CSV {}", path.display()))?;
    for trade in trades {
        writer
            .serialize(trade)
            .with_context(|| format!("Failed to write trade '{}'", trade.label))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush trades CSV {}", path.display()))?;
    Ok(())
}

pub fn write_trades_json(path: &Path, trades: &[TradeRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(trades).context("Failed to serialize trades")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write trades JSON {}", path.display()))?;
    Ok(())
}

pub fn write_summary_json<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write summary {}", path.display()))?;
    Ok(())
}
