use crate::domain::{Bar, LevelHit, OrderSide};
use crate::orders::kind::{market_fill_price, OrderKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Order lifecycle state, derived from the `is_live`/`is_closed` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Waiting for the activation test to pass.
    Pending,
    /// Filled; PL is tracked and stop/target are checked every bar.
    Live,
    /// Stop or target hit. Terminal.
    Closed,
}

/// Open PL of one bar, relative to the entry price and scaled by quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPl {
    /// PL at the bar's best price for the order's side.
    pub favorable: f64,
    /// PL at the bar's worst price for the order's side.
    pub adverse: f64,
    /// PL at the bar's last price.
    pub close: f64,
}

/// A bracketed order simulated bar by bar.
///
/// All fields are public so callers can poll them after each
/// [`Order::advance`]. Only `advance` mutates an order; once `is_closed`
/// is set nothing changes again.
///
/// Intrabar paths are unknown, so open PL is bounded by the order's own
/// levels: an order is never credited with more upside than its target or
/// more downside than its stop, since crossing either would have closed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub kind: OrderKind,
    pub side: OrderSide,
    pub stop_price: f64,
    pub target_price: f64,
    pub entry_price: Option<f64>,
    pub quantity: f64,

    pub is_live: bool,
    pub is_closed: bool,
    pub exit_price: Option<f64>,
    pub level_hit: LevelHit,

    pub bar_close_pl: Option<f64>,
    pub max_open_pl: Option<f64>,
    pub min_open_pl: Option<f64>,
    pub exit_pl: Option<f64>,

    /// Timestamp of the bar the order went live on.
    pub entry_time: Option<NaiveDateTime>,
    /// Timestamp of the bar that closed the order.
    pub exit_time: Option<NaiveDateTime>,
    /// Bars evaluated while live, the exit bar included.
    pub bars_live: usize,
}

impl Order {
    /// Create a pending order.
    pub fn new(
        kind: OrderKind,
        side: OrderSide,
        stop_price: f64,
        target_price: f64,
        entry_price: Option<f64>,
        quantity: f64,
    ) -> Self {
        Self {
            kind,
            side,
            stop_price,
            target_price,
            entry_price,
            quantity,
            is_live: false,
            is_closed: false,
            exit_price: None,
            level_hit: LevelHit::NoHit,
            bar_close_pl: None,
            max_open_pl: None,
            min_open_pl: None,
            exit_pl: None,
            entry_time: None,
            exit_time: None,
            bars_live: 0,
        }
    }

    /// Pending limit order resting at `limit_price`.
    pub fn limit(
        side: OrderSide,
        stop_price: f64,
        target_price: f64,
        limit_price: f64,
        quantity: f64,
    ) -> Self {
        Self::new(
            OrderKind::Limit,
            side,
            stop_price,
            target_price,
            Some(limit_price),
            quantity,
        )
    }

    /// Market order filled at `bar.open` plus slippage against the trader.
    ///
    /// The order is live on return; the first `advance` it receives
    /// (normally with this same bar) tracks PL and checks the exits.
    pub fn market_at_bar(
        side: OrderSide,
        stop_price: f64,
        target_price: f64,
        bar: &Bar,
        slippage: f64,
        quantity: f64,
    ) -> Self {
        let mut order = Self::new(
            OrderKind::Market { slippage },
            side,
            stop_price,
            target_price,
            Some(market_fill_price(side, bar.open, slippage)),
            quantity,
        );
        order.is_live = true;
        order.entry_time = Some(bar.timestamp);
        order
    }

    pub fn state(&self) -> OrderState {
        if self.is_closed {
            OrderState::Closed
        } else if self.is_live {
            OrderState::Live
        } else {
            OrderState::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state() == OrderState::Pending
    }

    pub fn sign(&self) -> f64 {
        self.side.sign()
    }

    /// `(worst, best)` per-unit PL the levels allow, once the entry price is
    /// known. Not scaled by quantity.
    pub fn open_pl_bounds(&self) -> Option<(f64, f64)> {
        self.entry_price.map(|entry| self.level_bounds(entry))
    }

    /// Favorable/adverse/close PL of `bar` against the entry price.
    pub fn pl_at_bar(&self, bar: &Bar) -> Option<BarPl> {
        self.entry_price.map(|entry| self.bar_pl(entry, bar))
    }

    /// Which level `bar` would hit, and at what price. Does not mutate.
    ///
    /// The tie-break differs by side: a long checks its stop first, a short
    /// checks its target first.
    pub fn exit_status_at_bar(&self, bar: &Bar) -> (LevelHit, Option<f64>) {
        match self.side {
            OrderSide::Long => {
                if bar.low <= self.stop_price {
                    return (LevelHit::Stop, Some(self.stop_price));
                }
                if bar.high > self.target_price {
                    return (LevelHit::Target, Some(self.target_price));
                }
            }
            OrderSide::Short => {
                if bar.low < self.target_price {
                    return (LevelHit::Target, Some(self.target_price));
                }
                if bar.high >= self.stop_price {
                    return (LevelHit::Stop, Some(self.stop_price));
                }
            }
        }
        (LevelHit::NoHit, None)
    }

    /// Advance the order by one bar.
    ///
    /// Bars must arrive once each, in chronological order. A pending order
    /// that activates on this bar is evaluated on the same bar, so it can
    /// fill and exit together.
    ///
    /// # Panics
    ///
    /// Panics if the order is live without an entry price.
    pub fn advance(&mut self, bar: &Bar) {
        if self.is_closed {
            return;
        }

        if !self.is_live {
            self.try_activate(bar);
        }

        if self.is_live {
            let Some(entry) = self.entry_price else {
                panic!("order is live without an entry price");
            };
            self.bars_live += 1;
            self.update_pl_stats(entry, bar);
            self.resolve_exit(entry, bar);
        }
    }

    fn try_activate(&mut self, bar: &Bar) {
        if !self.kind.activates(self.side, self.entry_price, bar) {
            return;
        }
        if self.entry_price.is_none() {
            self.entry_price = self.kind.fill_price(self.side, bar);
        }
        self.is_live = true;
        self.entry_time.get_or_insert(bar.timestamp);
        trace!(
            kind = self.kind.name(),
            side = %self.side,
            entry = ?self.entry_price,
            at = %bar.timestamp,
            "order live"
        );
    }

    fn bar_pl(&self, entry: f64, bar: &Bar) -> BarPl {
        let qty = self.quantity;
        match self.side {
            OrderSide::Long => BarPl {
                favorable: (bar.high - entry) * qty,
                adverse: (bar.low - entry) * qty,
                close: (bar.last - entry) * qty,
            },
            OrderSide::Short => BarPl {
                favorable: (entry - bar.low) * qty,
                adverse: (entry - bar.high) * qty,
                close: (entry - bar.last) * qty,
            },
        }
    }

    fn level_bounds(&self, entry: f64) -> (f64, f64) {
        let worst = self.sign() * (self.stop_price - entry);
        let best = self.sign() * (self.target_price - entry);
        (worst, best)
    }

    fn update_pl_stats(&mut self, entry: f64, bar: &Bar) {
        let pl = self.bar_pl(entry, bar);
        let (real_worse, real_best) = self.level_bounds(entry);

        let best = pl.favorable.min(real_best);
        let worse = pl.adverse.max(real_worse);

        self.bar_close_pl = Some(pl.close);
        self.max_open_pl = Some(match self.max_open_pl {
            Some(current) => current.max(best),
            None => best,
        });
        self.min_open_pl = Some(match self.min_open_pl {
            Some(current) => current.min(worse),
            None => worse,
        });
    }

    fn resolve_exit(&mut self, entry: f64, bar: &Bar) {
        let (level_hit, exit_price) = self.exit_status_at_bar(bar);
        self.level_hit = level_hit;
        self.exit_price = exit_price;

        if let Some(exit) = exit_price {
            self.is_closed = true;
            self.is_live = false;
            self.exit_pl = Some(self.sign() * (exit - entry));
            self.exit_time = Some(bar.timestamp);
            trace!(
                kind = self.kind.name(),
                side = %self.side,
                level = %level_hit,
                exit,
                exit_pl = ?self.exit_pl,
                "order closed"
            );
        }
    }
}
