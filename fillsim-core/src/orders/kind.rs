use crate::domain::{Bar, OrderSide};
use serde::{Deserialize, Serialize};

/// Order kinds. They differ only in how a pending order goes live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OrderKind {
    /// Fills at the open, with slippage charged against the trader.
    Market { slippage: f64 },

    /// Rests at its entry price until the bar trades through it.
    Limit,
}

impl OrderKind {
    /// Activation test for a pending order on this bar.
    ///
    /// Limit orders trigger breakout-style: a long goes live once the high
    /// trades above the entry level, a short once the low trades below it.
    /// A limit with no entry level never activates.
    pub fn activates(&self, side: OrderSide, entry_price: Option<f64>, bar: &Bar) -> bool {
        match self {
            OrderKind::Market { .. } => true,
            OrderKind::Limit => match (side, entry_price) {
                (OrderSide::Long, Some(level)) => bar.high > level,
                (OrderSide::Short, Some(level)) => bar.low < level,
                (_, None) => false,
            },
        }
    }

    /// Entry price to use on activation when none was fixed up front.
    pub fn fill_price(&self, side: OrderSide, bar: &Bar) -> Option<f64> {
        match self {
            OrderKind::Market { slippage } => Some(market_fill_price(side, bar.open, *slippage)),
            OrderKind::Limit => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OrderKind::Market { .. } => "market",
            OrderKind::Limit => "limit",
        }
    }
}

/// Open price adjusted by slippage: paid up for longs, given away for shorts.
pub fn market_fill_price(side: OrderSide, open: f64, slippage: f64) -> f64 {
    match side {
        OrderSide::Long => open + slippage,
        OrderSide::Short => open - slippage,
    }
}
