//! Property tests for order invariants.
//!
//! Uses proptest to verify:
//! 1. Favorable PL never falls below adverse PL on a well-formed bar
//! 2. Running open-PL extrema are monotone while live
//! 3. Open PL stays inside the stop/target bounds
//! 4. Closed orders are inert
//! 5. Live and closed are never set together; a hit implies closed

use chrono::{Duration, NaiveDate, NaiveDateTime};
use fillsim_core::domain::{Bar, LevelHit, OrderSide};
use fillsim_core::orders::{Order, OrderKind};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// A well-formed bar: low <= open, last <= high.
fn arb_bar() -> impl Strategy<Value = Bar> {
    (50.0..150.0_f64, 0.0..20.0_f64, 0.0..=1.0_f64, 0.0..=1.0_f64).prop_map(
        |(low, span, open_frac, last_frac)| {
            let high = low + span;
            Bar::new(low + span * open_frac, high, low, low + span * last_frac, t0())
        },
    )
}

fn arb_bars(max: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec(arb_bar(), 1..max).prop_map(|bars| {
        bars.into_iter()
            .enumerate()
            .map(|(i, mut bar)| {
                bar.timestamp = t0() + Duration::minutes(i as i64);
                bar
            })
            .collect()
    })
}

fn arb_side() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Long), Just(OrderSide::Short)]
}

fn arb_quantity() -> impl Strategy<Value = f64> {
    (1u32..10).prop_map(f64::from)
}

/// Live order at `entry` with stop/target on the proper sides.
fn arb_live_order() -> impl Strategy<Value = Order> {
    (arb_side(), 80.0..120.0_f64, 0.5..30.0_f64, 0.5..30.0_f64, arb_quantity()).prop_map(
        |(side, entry, stop_dist, target_dist, qty)| {
            let sign = side.sign();
            let mut order = Order::new(
                OrderKind::Market { slippage: 0.0 },
                side,
                entry - sign * stop_dist,
                entry + sign * target_dist,
                Some(entry),
                qty,
            );
            order.is_live = true;
            order
        },
    )
}

const EPS: f64 = 1e-9;

proptest! {
    #[test]
    fn favorable_never_below_adverse(order in arb_live_order(), bar in arb_bar()) {
        let pl = order.pl_at_bar(&bar).unwrap();
        prop_assert!(pl.favorable >= pl.adverse);
        prop_assert!(pl.close <= pl.favorable + EPS);
        prop_assert!(pl.close >= pl.adverse - EPS);
    }

    #[test]
    fn open_pl_extrema_are_monotone(mut order in arb_live_order(), bars in arb_bars(40)) {
        let mut prev: Option<(f64, f64)> = None;
        for bar in &bars {
            order.advance(bar);
            let (max, min) = (order.max_open_pl.unwrap(), order.min_open_pl.unwrap());
            if let Some((prev_max, prev_min)) = prev {
                prop_assert!(max >= prev_max);
                prop_assert!(min <= prev_min);
            }
            prev = Some((max, min));
            if order.is_closed {
                break;
            }
        }
    }

    #[test]
    fn open_pl_stays_within_levels(mut order in arb_live_order(), bars in arb_bars(40)) {
        let (worst, best) = order.open_pl_bounds().unwrap();
        for bar in &bars {
            order.advance(bar);
            prop_assert!(order.max_open_pl.unwrap() <= best + EPS);
            prop_assert!(order.min_open_pl.unwrap() >= worst - EPS);
        }
    }

    #[test]
    fn closed_orders_are_inert(mut order in arb_live_order(), bars in arb_bars(60), extra in arb_bars(5)) {
        for bar in &bars {
            order.advance(bar);
            if order.is_closed {
                break;
            }
        }
        prop_assume!(order.is_closed);

        let snapshot = order.clone();
        for bar in &extra {
            order.advance(bar);
        }
        prop_assert_eq!(order, snapshot);
    }

    #[test]
    fn flags_stay_consistent(mut order in arb_live_order(), bars in arb_bars(40)) {
        for bar in &bars {
            order.advance(bar);
            prop_assert!(!(order.is_live && order.is_closed));
            if order.level_hit != LevelHit::NoHit {
                prop_assert!(order.is_closed);
                prop_assert!(order.exit_price.is_some());
                prop_assert!(order.exit_pl.is_some());
            }
        }
    }

    #[test]
    fn exit_pl_matches_hit_level(mut order in arb_live_order(), bars in arb_bars(40)) {
        let (worst, best) = order.open_pl_bounds().unwrap();
        for bar in &bars {
            order.advance(bar);
        }
        match order.level_hit {
            LevelHit::Stop => prop_assert!((order.exit_pl.unwrap() - worst).abs() < EPS),
            LevelHit::Target => prop_assert!((order.exit_pl.unwrap() - best).abs() < EPS),
            LevelHit::NoHit => prop_assert!(order.exit_pl.is_none()),
        }
    }

    #[test]
    fn market_factory_applies_slippage(side in arb_side(), bar in arb_bar(), slippage in 0.0..2.0_f64) {
        let order = Order::market_at_bar(side, 0.0, 1000.0, &bar, slippage, 1.0);
        let expected = match side {
            OrderSide::Long => bar.open + slippage,
            OrderSide::Short => bar.open - slippage,
        };
        prop_assert_eq!(order.entry_price, Some(expected));
        prop_assert!(order.is_live);
        prop_assert!(!order.is_closed);
    }
}
