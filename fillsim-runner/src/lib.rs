//! Fillsim Runner: simulation orchestration on top of `fillsim-core`.
//!
//! This crate provides:
//! - TOML run configs with semantic validation and content-addressed run ids
//! - A strategy loop that places orders on the bar after each decision
//! - Independent per-order simulation on the rayon pool
//! - Trade records, run summaries and CSV/JSON export

pub mod config;
pub mod report;
pub mod simulation;
pub mod strategy;

pub use config::{
    ConfigError, DataConfig, OrderKindConfig, OrderSpec, RunId, RunSettings, SimulationConfig,
};
pub use report::{
    write_summary_json, write_trades_csv, write_trades_json, TradeRecord, TradeStatus,
    TradeSummary,
};
pub use simulation::{
    load_bars, run_from_config, run_simulation, simulate_orders, RunError, SimulationResult,
    SCHEMA_VERSION,
};
pub use strategy::{
    OrderRequest, Placement, RunOutcome, ScheduledOrders, Strategy, StrategyRunner, TrackedOrder,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SimulationConfig>();
        assert_sync::<SimulationConfig>();
        assert_send::<OrderSpec>();
        assert_sync::<OrderSpec>();
    }

    #[test]
    fn placements_cross_threads() {
        assert_send::<Placement>();
        assert_sync::<Placement>();
        assert_send::<TrackedOrder>();
        assert_sync::<TrackedOrder>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<SimulationResult>();
        assert_sync::<SimulationResult>();
        assert_send::<TradeSummary>();
        assert_sync::<TradeSummary>();
    }

    #[test]
    fn scheduled_strategy_is_send() {
        assert_send::<StrategyRunner<ScheduledOrders>>();
    }
}
