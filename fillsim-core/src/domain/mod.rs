//! Domain value types for fillsim

pub mod bar;
pub mod side;

pub use bar::Bar;
pub use side::{LevelHit, OrderSide};
