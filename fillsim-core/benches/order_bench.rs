//! Criterion benchmarks for the order hot path.
//!
//! Benchmarks:
//! 1. A single live order advanced over a long bar stream
//! 2. A batch of limit orders fed the same stream (the runner's inner loop)
//! 3. Ingestion of a Sierra-style text export

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fillsim_core::data::{ingest_reader, IngestOptions, SyntheticBars};
use fillsim_core::domain::{Bar, OrderSide};
use fillsim_core::orders::Order;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    SyntheticBars::new(11, start).generate(n)
}

fn make_text_export(bars: &[Bar]) -> String {
    let mut out = String::from("Date, Time, Open, High, Low, Last, Volume\n");
    for bar in bars {
        out.push_str(&format!(
            "{}, {}, {:.2}, {:.2}, {:.2}, {:.2}, 100\n",
            bar.timestamp.format("%Y/%m/%d"),
            bar.timestamp.format("%H:%M:%S%.3f"),
            bar.open,
            bar.high,
            bar.low,
            bar.last
        ));
    }
    out
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_single_order(c: &mut Criterion) {
    let bars = make_bars(10_000);
    c.bench_function("advance_live_order_10k_bars", |b| {
        b.iter(|| {
            // Levels far away so the order stays live for the whole stream.
            let mut order =
                Order::market_at_bar(OrderSide::Long, 1e-6, 1e12, &bars[0], 0.0, 1.0);
            for bar in &bars {
                order.advance(black_box(bar));
            }
            black_box(order.max_open_pl)
        })
    });
}

fn bench_order_batch(c: &mut Criterion) {
    let bars = make_bars(2_000);
    let mut group = c.benchmark_group("limit_order_batch");
    for n_orders in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n_orders), &n_orders, |b, &n| {
            b.iter(|| {
                let mut orders: Vec<Order> = (0..n)
                    .map(|i| {
                        let level = 100.0 + (i % 20) as f64 * 0.25;
                        Order::limit(OrderSide::Long, level - 2.0, level + 3.0, level, 1.0)
                    })
                    .collect();
                for bar in &bars {
                    for order in orders.iter_mut().filter(|o| !o.is_closed) {
                        order.advance(bar);
                    }
                }
                black_box(orders.iter().filter(|o| o.is_closed).count())
            })
        });
    }
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let text = make_text_export(&make_bars(5_000));
    c.bench_function("ingest_text_export_5k_rows", |b| {
        b.iter(|| {
            let report = ingest_reader(black_box(text.as_bytes()), &IngestOptions::default())
                .expect("ingest");
            black_box(report.records.len())
        })
    });
}

criterion_group!(benches, bench_single_order, bench_order_batch, bench_ingest);
criterion_main!(benches);
