//! Strategy loop: turn per-bar decisions into orders and manage them.
//!
//! A strategy sees bar `i` only after it has closed, so any order it asks
//! for takes effect from bar `i + 1`: market orders fill at that bar's open,
//! limit orders start resting on it.

use fillsim_core::domain::{Bar, OrderSide};
use fillsim_core::orders::{Order, OrderKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Everything needed to build an order once its placement bar is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub label: String,
    pub kind: OrderKind,
    pub side: OrderSide,
    pub stop_price: f64,
    pub target_price: f64,
    /// Required for limit orders; ignored for market orders.
    pub limit_price: Option<f64>,
    pub quantity: f64,
}

impl OrderRequest {
    /// Build the order as placed on `bar`.
    pub fn place(&self, bar: &Bar) -> Order {
        match self.kind {
            OrderKind::Market { slippage } => Order::market_at_bar(
                self.side,
                self.stop_price,
                self.target_price,
                bar,
                slippage,
                self.quantity,
            ),
            OrderKind::Limit => Order::new(
                OrderKind::Limit,
                self.side,
                self.stop_price,
                self.target_price,
                self.limit_price,
                self.quantity,
            ),
        }
    }
}

/// An order request pinned to the bar it is placed on.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub entry_bar: usize,
    pub request: OrderRequest,
}

/// An order with its run bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedOrder {
    /// Placement sequence within the run: by bar, then by request order.
    pub id: usize,
    pub label: String,
    pub placed_bar: usize,
    pub closed_bar: Option<usize>,
    pub order: Order,
}

pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Requests placed on the first bar, before any bar has been seen.
    fn on_start(&mut self) -> Vec<OrderRequest> {
        Vec::new()
    }

    /// Called after bar `index` closes. `history` holds bars `0..=index`.
    fn on_bar(&mut self, index: usize, history: &[Bar]) -> Vec<OrderRequest>;
}

/// Replays a fixed list of placements: an order scheduled for bar `i` is
/// requested when bar `i - 1` closes.
#[derive(Debug, Clone, Default)]
pub struct ScheduledOrders {
    by_bar: BTreeMap<usize, Vec<OrderRequest>>,
}

impl ScheduledOrders {
    pub fn new(placements: &[Placement]) -> Self {
        let mut by_bar: BTreeMap<usize, Vec<OrderRequest>> = BTreeMap::new();
        for p in placements {
            by_bar.entry(p.entry_bar).or_default().push(p.request.clone());
        }
        Self { by_bar }
    }

    pub fn len(&self) -> usize {
        self.by_bar.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_bar.is_empty()
    }
}

impl Strategy for ScheduledOrders {
    fn name(&self) -> &str {
        "scheduled"
    }

    fn on_start(&mut self) -> Vec<OrderRequest> {
        self.by_bar.remove(&0).unwrap_or_default()
    }

    fn on_bar(&mut self, index: usize, _history: &[Bar]) -> Vec<OrderRequest> {
        self.by_bar.remove(&(index + 1)).unwrap_or_default()
    }
}

/// Everything a strategy run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunOutcome {
    pub strategy: String,
    pub closed: Vec<TrackedOrder>,
    pub open: Vec<TrackedOrder>,
    /// Requests made after the final bar; they never had a bar to be placed on.
    pub unplaced: usize,
}

impl RunOutcome {
    /// Closed and open orders together, ordered by placement.
    pub fn into_orders(self) -> Vec<TrackedOrder> {
        let mut all = self.closed;
        all.extend(self.open);
        all.sort_by_key(|t| t.id);
        all
    }
}

/// Sequential event loop driving one strategy over a bar stream.
pub struct StrategyRunner<S: Strategy> {
    strategy: S,
    open: Vec<TrackedOrder>,
    closed: Vec<TrackedOrder>,
    next_id: usize,
}

impl<S: Strategy> StrategyRunner<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            open: Vec::new(),
            closed: Vec::new(),
            next_id: 0,
        }
    }

    pub fn open_orders(&self) -> &[TrackedOrder] {
        &self.open
    }

    pub fn closed_orders(&self) -> &[TrackedOrder] {
        &self.closed
    }

    pub fn run(mut self, bars: &[Bar]) -> RunOutcome {
        let mut requests = self.strategy.on_start();
        for (index, bar) in bars.iter().enumerate() {
            for request in requests.drain(..) {
                self.place(index, bar, request);
            }
            self.manage_open_orders(index, bar);
            requests = self.strategy.on_bar(index, &bars[..=index]);
        }
        if !requests.is_empty() {
            debug!(count = requests.len(), "requests after the final bar were not placed");
        }

        RunOutcome {
            strategy: self.strategy.name().to_string(),
            closed: self.closed,
            open: self.open,
            unplaced: requests.len(),
        }
    }

    fn place(&mut self, index: usize, bar: &Bar, request: OrderRequest) {
        trace!(label = %request.label, bar = index, kind = request.kind.name(), "order placed");
        let order = request.place(bar);
        self.open.push(TrackedOrder {
            id: self.next_id,
            label: request.label,
            placed_bar: index,
            closed_bar: None,
            order,
        });
        self.next_id += 1;
    }

    fn manage_open_orders(&mut self, index: usize, bar: &Bar) {
        for tracked in &mut self.open {
            tracked.order.advance(bar);
        }
        let (done, still_open): (Vec<_>, Vec<_>) = std::mem::take(&mut self.open)
            .into_iter()
            .partition(|t| t.order.is_closed);
        self.open = still_open;
        self.closed.extend(done.into_iter().map(|mut t| {
            t.closed_bar = Some(index);
            t
        }));
    }
}
