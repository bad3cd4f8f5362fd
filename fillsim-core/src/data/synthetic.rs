//! Seeded random-walk bars for tests, benchmarks and offline demos.

use crate::domain::Bar;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct SyntheticBars {
    pub seed: u64,
    pub start: NaiveDateTime,
    pub interval: Duration,
    pub start_price: f64,
    /// Maximum relative move per bar (e.g. 0.01 = 1%).
    pub volatility: f64,
}

impl SyntheticBars {
    pub fn new(seed: u64, start: NaiveDateTime) -> Self {
        Self {
            seed,
            start,
            interval: Duration::minutes(5),
            start_price: 100.0,
            volatility: 0.01,
        }
    }

    /// Generate `n` sane bars. Each bar opens at the previous bar's last.
    pub fn generate(&self, n: usize) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut price = self.start_price;
        let mut timestamp = self.start;
        let mut bars = Vec::with_capacity(n);

        for _ in 0..n {
            let open = price;
            let drift: f64 = rng.gen::<f64>() * 2.0 - 1.0;
            let last = (open * (1.0 + drift * self.volatility)).max(0.01);
            let wick_up = rng.gen::<f64>() * self.volatility * open;
            let wick_down = rng.gen::<f64>() * self.volatility * open;
            let high = open.max(last) + wick_up;
            let low = (open.min(last) - wick_down).max(0.0);

            bars.push(Bar::new(open, high, low, last, timestamp));
            price = last;
            timestamp += self.interval;
        }

        bars
    }
}
