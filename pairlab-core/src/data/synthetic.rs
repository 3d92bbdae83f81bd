//! Seeded synthetic bar generators for tests, benches, and demos.
//!
//! Generated series are business-day stamped (weekends skipped) at 21:00 UTC.

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::domain::Bar;
use crate::rng::SeedTree;

/// `n` consecutive business days starting at (or after) `start`.
pub fn business_days(start: DateTime<Utc>, n: usize) -> Vec<DateTime<Utc>> {
    let mut out = Vec::with_capacity(n);
    let mut ts = start;
    while out.len() < n {
        if !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(ts);
        }
        ts += Duration::days(1);
    }
    out
}

/// Default calendar origin: 2020-01-02 21:00 UTC.
pub fn default_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 2, 21, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn close_bar(symbol: &str, timestamp: DateTime<Utc>, close: f64) -> Bar {
    Bar {
        symbol: symbol.to_string(),
        timestamp,
        open: close,
        high: close * 1.005,
        low: close * 0.995,
        close,
        volume: 1_000_000.0,
    }
}

/// Gaussian random walk with a price floor.
pub fn random_walk(
    symbol: &str,
    start_price: f64,
    step_sigma: f64,
    timestamps: &[DateTime<Utc>],
    seeds: SeedTree,
) -> Vec<Bar> {
    let mut rng = seeds.rng_for(symbol, "walk");
    let mut price = start_price;
    timestamps
        .iter()
        .map(|ts| {
            let step: f64 = rng.sample(StandardNormal);
            price = (price + step * step_sigma).max(1.0);
            close_bar(symbol, *ts, price)
        })
        .collect()
}

/// Add `delta` to every close from index `from` on, rebuilding the bars.
/// Used to inject a persistent break into an otherwise stationary spread.
pub fn level_shift(bars: &mut [Bar], from: usize, delta: f64) {
    for bar in bars.iter_mut().skip(from) {
        *bar = close_bar(&bar.symbol, bar.timestamp, (bar.close + delta).max(1.0));
    }
}

/// Parameters of a synthetic cointegrated pair:
/// `A_t = intercept + hedge_ratio · B_t + e_t`, with `B` a random walk and
/// `e_t = spread_ar · e_{t-1} + N(0, spread_sigma²)`.
#[derive(Debug, Clone)]
pub struct CointegratedPair {
    pub symbol_a: String,
    pub symbol_b: String,
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub start_price_b: f64,
    pub drift_sigma: f64,
    pub spread_ar: f64,
    pub spread_sigma: f64,
    pub ticks: usize,
    pub start: DateTime<Utc>,
    pub seed: u64,
}

impl Default for CointegratedPair {
    fn default() -> Self {
        Self {
            symbol_a: "AAA".into(),
            symbol_b: "BBB".into(),
            hedge_ratio: 2.0,
            intercept: 0.0,
            start_price_b: 100.0,
            drift_sigma: 0.8,
            spread_ar: 0.0,
            spread_sigma: 0.5,
            ticks: 250,
            start: default_start(),
            seed: 42,
        }
    }
}

impl CointegratedPair {
    /// Generate `(bars_a, bars_b)` on a shared business-day calendar.
    pub fn generate(&self) -> (Vec<Bar>, Vec<Bar>) {
        let seeds = SeedTree::new(self.seed);
        let timestamps = business_days(self.start, self.ticks);
        let bars_b = random_walk(
            &self.symbol_b,
            self.start_price_b,
            self.drift_sigma,
            &timestamps,
            seeds,
        );

        let mut rng = seeds.rng_for(&self.symbol_a, "spread");
        let mut residual = 0.0;
        let bars_a = bars_b
            .iter()
            .map(|b| {
                let shock: f64 = rng.sample(StandardNormal);
                residual = self.spread_ar * residual + shock * self.spread_sigma;
                let close = (self.intercept + self.hedge_ratio * b.close + residual).max(1.0);
                close_bar(&self.symbol_a, b.timestamp, close)
            })
            .collect();
        (bars_a, bars_b)
    }
}
