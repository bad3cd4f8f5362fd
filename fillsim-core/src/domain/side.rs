//! Order direction and exit outcome enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of an order. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Long,
    Short,
}

impl OrderSide {
    /// +1 for long, -1 for short. Multiplies every price difference.
    pub fn sign(&self) -> f64 {
        match self {
            OrderSide::Long => 1.0,
            OrderSide::Short => -1.0,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Long => write!(f, "long"),
            OrderSide::Short => write!(f, "short"),
        }
    }
}

/// Which protective level closed the order on a bar, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelHit {
    Target,
    Stop,
    #[default]
    NoHit,
}

impl LevelHit {
    pub fn is_hit(&self) -> bool {
        !matches!(self, LevelHit::NoHit)
    }
}

impl fmt::Display for LevelHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelHit::Target => write!(f, "target"),
            LevelHit::Stop => write!(f, "stop"),
            LevelHit::NoHit => write!(f, "nohit"),
        }
    }
}
