//! Order lifecycle simulation
//!
//! Provides the order state machine, the market/limit activation variants,
//! and opt-in parameter validation.

pub mod kind;
pub mod levels;
pub mod order;

pub use kind::{market_fill_price, OrderKind};
pub use levels::{validate_levels, validate_quantity, OrderError};
pub use order::{BarPl, Order, OrderState};
