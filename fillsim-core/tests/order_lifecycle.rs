//! Integration tests for the order lifecycle.
//!
//! These exercise the public surface only: construction through the
//! limit/market constructors, repeated `advance` calls, and polling the
//! public fields afterwards.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fillsim_core::domain::{Bar, LevelHit, OrderSide};
use fillsim_core::orders::{Order, OrderKind, OrderState};

// ─── Helpers ──────────────────────────────────────────────────────────

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn bar_at(minute: i64, open: f64, high: f64, low: f64, last: f64) -> Bar {
    Bar::new(open, high, low, last, t0() + Duration::minutes(minute))
}

fn hl(high: f64, low: f64, last: f64) -> Bar {
    bar_at(0, last, high, low, last)
}

// ─── End-to-end scenario ──────────────────────────────────────────────

#[test]
fn long_order_three_bar_scenario() {
    let mut order = Order::new(
        OrderKind::Market { slippage: 0.0 },
        OrderSide::Long,
        80.0,
        120.0,
        Some(100.0),
        1.0,
    );
    assert!(!order.is_live);

    order.advance(&bar_at(0, 100.0, 105.0, 90.0, 95.0));
    assert!(order.is_live);
    assert!(!order.is_closed);
    assert_eq!(order.max_open_pl, Some(5.0));
    assert_eq!(order.min_open_pl, Some(-10.0));
    assert_eq!(order.bar_close_pl, Some(-5.0));
    assert_eq!(order.level_hit, LevelHit::NoHit);
    assert_eq!(order.exit_pl, None);

    order.advance(&bar_at(1, 95.0, 104.0, 89.0, 95.0));
    assert!(order.is_live);
    assert!(!order.is_closed);
    assert_eq!(order.max_open_pl, Some(5.0));
    assert_eq!(order.min_open_pl, Some(-11.0));
    assert_eq!(order.level_hit, LevelHit::NoHit);
    assert_eq!(order.exit_pl, None);

    let bar_c = bar_at(2, 95.0, 140.0, 70.0, 100.0);
    order.advance(&bar_c);
    assert!(!order.is_live);
    assert!(order.is_closed);
    assert_eq!(order.max_open_pl, Some(20.0));
    assert_eq!(order.min_open_pl, Some(-20.0));
    assert_eq!(order.level_hit, LevelHit::Stop);
    assert_eq!(order.exit_pl, Some(-20.0));
    assert_eq!(order.exit_time, Some(bar_c.timestamp));
    assert_eq!(order.entry_time, Some(t0()));
}

// ─── Tie-breaks ───────────────────────────────────────────────────────

#[test]
fn long_prefers_stop_when_both_levels_cross() {
    let mut order = Order::limit(OrderSide::Long, 95.0, 110.0, 100.0, 1.0);
    order.is_live = true;
    order.advance(&hl(111.0, 95.0, 100.0));
    assert_eq!(order.level_hit, LevelHit::Stop);
    assert_eq!(order.exit_price, Some(95.0));
}

#[test]
fn short_prefers_target_when_both_levels_cross() {
    let mut order = Order::limit(OrderSide::Short, 110.0, 90.0, 100.0, 1.0);
    order.is_live = true;
    order.advance(&hl(110.0, 89.0, 100.0));
    assert_eq!(order.level_hit, LevelHit::Target);
    assert_eq!(order.exit_price, Some(90.0));
    assert_eq!(order.exit_pl, Some(10.0));
}

#[test]
fn long_target_requires_strict_cross() {
    let mut order = Order::limit(OrderSide::Long, 95.0, 110.0, 100.0, 1.0);
    order.is_live = true;
    order.advance(&hl(110.0, 96.0, 105.0));
    assert_eq!(order.level_hit, LevelHit::NoHit);
    assert_eq!(order.state(), OrderState::Live);
}

// ─── Market factory ───────────────────────────────────────────────────

#[test]
fn market_long_pays_slippage_and_is_live_immediately() {
    let fill_bar = bar_at(0, 100.0, 101.0, 99.5, 100.5);
    let order = Order::market_at_bar(OrderSide::Long, 95.0, 110.0, &fill_bar, 0.25, 1.0);
    assert_eq!(order.entry_price, Some(100.25));
    assert!(order.is_live);
    assert!(!order.is_closed);
    assert_eq!(order.state(), OrderState::Live);
    assert_eq!(order.entry_time, Some(fill_bar.timestamp));
    assert_eq!(order.max_open_pl, None);
}

#[test]
fn market_short_gives_up_slippage() {
    let fill_bar = bar_at(0, 100.0, 101.0, 99.5, 100.5);
    let order = Order::market_at_bar(OrderSide::Short, 105.0, 90.0, &fill_bar, 0.25, 1.0);
    assert_eq!(order.entry_price, Some(99.75));
    assert!(order.is_live);
}

#[test]
fn market_first_advance_tracks_pl_and_can_exit() {
    let fill_bar = bar_at(0, 100.0, 106.0, 99.0, 104.0);
    let mut order = Order::market_at_bar(OrderSide::Long, 95.0, 105.0, &fill_bar, 0.0, 2.0);
    order.advance(&fill_bar);
    assert!(order.is_closed);
    assert_eq!(order.level_hit, LevelHit::Target);
    // Open PL scales with quantity; the level bounds and exit PL do not.
    assert_eq!(order.bar_close_pl, Some(8.0));
    assert_eq!(order.exit_pl, Some(5.0));
    assert_eq!(order.max_open_pl, Some(5.0));
    assert_eq!(order.min_open_pl, Some(-2.0));
    assert_eq!(order.bars_live, 1);
}

// ─── Limit activation ─────────────────────────────────────────────────

#[test]
fn long_limit_stays_pending_until_high_exceeds_level() {
    let mut order = Order::limit(OrderSide::Long, 95.0, 110.0, 101.0, 1.0);

    order.advance(&bar_at(0, 100.0, 101.0, 99.0, 100.0));
    assert!(order.is_pending());
    assert_eq!(order.bar_close_pl, None);
    assert_eq!(order.max_open_pl, None);
    assert_eq!(order.bars_live, 0);

    let fill = bar_at(1, 100.0, 102.0, 99.0, 101.5);
    order.advance(&fill);
    assert_eq!(order.state(), OrderState::Live);
    assert_eq!(order.entry_price, Some(101.0));
    assert_eq!(order.entry_time, Some(fill.timestamp));
    assert_eq!(order.bar_close_pl, Some(0.5));
    assert_eq!(order.max_open_pl, Some(1.0));
    assert_eq!(order.min_open_pl, Some(-2.0));
}

#[test]
fn short_limit_activates_below_level() {
    let mut order = Order::limit(OrderSide::Short, 105.0, 90.0, 99.0, 1.0);
    order.advance(&bar_at(0, 100.0, 101.0, 99.0, 100.0));
    assert!(order.is_pending());
    order.advance(&bar_at(1, 100.0, 101.0, 98.0, 98.5));
    assert!(order.is_live);
    assert_eq!(order.bar_close_pl, Some(0.5));
}

#[test]
fn limit_can_fill_and_exit_on_the_same_bar() {
    let mut order = Order::limit(OrderSide::Long, 95.0, 110.0, 101.0, 1.0);
    let wide = bar_at(0, 100.0, 112.0, 99.0, 111.0);
    order.advance(&wide);
    assert!(order.is_closed);
    assert!(!order.is_live);
    assert_eq!(order.level_hit, LevelHit::Target);
    assert_eq!(order.exit_pl, Some(9.0));
    assert_eq!(order.entry_time, Some(wide.timestamp));
    assert_eq!(order.exit_time, Some(wide.timestamp));
}

// ─── Terminal state ───────────────────────────────────────────────────

#[test]
fn closed_order_ignores_further_bars() {
    let mut order = Order::limit(OrderSide::Short, 110.0, 90.0, 100.0, 1.0);
    order.is_live = true;
    order.advance(&hl(111.0, 95.0, 108.0));
    assert_eq!(order.level_hit, LevelHit::Stop);

    let snapshot = order.clone();
    order.advance(&hl(200.0, 1.0, 50.0));
    order.advance(&hl(100.5, 99.5, 100.0));
    assert_eq!(order, snapshot);
}

#[test]
fn orders_serialize_for_reporting() {
    let mut order = Order::limit(OrderSide::Long, 95.0, 110.0, 100.0, 1.0);
    order.advance(&hl(111.0, 96.0, 105.0));
    let json = serde_json::to_string(&order).unwrap();
    let back: Order = serde_json::from_str(&json).unwrap();
    assert_eq!(back, order);
}
