//! Opt-in validation of order parameters.
//!
//! Order constructors accept any stop/target placement. Callers that want
//! wrong-side levels rejected run these checks before building the order.

use crate::domain::OrderSide;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(f64),

    #[error("{field} must be a finite price, got {value}")]
    NonFinitePrice { field: &'static str, value: f64 },

    #[error("{side} stop {stop} is not on the losing side of entry {entry}")]
    StopOnWrongSide {
        side: OrderSide,
        stop: f64,
        entry: f64,
    },

    #[error("{side} target {target} is not on the winning side of entry {entry}")]
    TargetOnWrongSide {
        side: OrderSide,
        target: f64,
        entry: f64,
    },
}

/// Reject non-positive or non-finite quantities.
pub fn validate_quantity(quantity: f64) -> Result<(), OrderError> {
    if quantity.is_finite() && quantity > 0.0 {
        Ok(())
    } else {
        Err(OrderError::NonPositiveQuantity(quantity))
    }
}

/// Long: `stop < entry < target`. Short: `target < entry < stop`.
pub fn validate_levels(
    side: OrderSide,
    entry: f64,
    stop: f64,
    target: f64,
) -> Result<(), OrderError> {
    for (field, value) in [("entry", entry), ("stop", stop), ("target", target)] {
        if !value.is_finite() {
            return Err(OrderError::NonFinitePrice { field, value });
        }
    }

    let sign = side.sign();
    if sign * (stop - entry) >= 0.0 {
        return Err(OrderError::StopOnWrongSide { side, stop, entry });
    }
    if sign * (target - entry) <= 0.0 {
        return Err(OrderError::TargetOnWrongSide {
            side,
            target,
            entry,
        });
    }
    Ok(())
}
