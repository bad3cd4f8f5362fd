//! fillsim core: bar-by-bar order lifecycle and fill simulation.
//!
//! This crate contains:
//! - Domain types (bars, order side, level hit)
//! - The order state machine (pending → live → closed) with conservative,
//!   stop/target-bounded open PL accounting
//! - Market and limit activation variants
//! - Bar data ingestion, Parquet persistence and nested-record shaping

pub mod data;
pub mod domain;
pub mod orders;

pub use domain::{Bar, LevelHit, OrderSide};
pub use orders::{Order, OrderKind, OrderState};
