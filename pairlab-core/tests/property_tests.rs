//! Property tests for engine invariants.
//!
//! Uses proptest to verify, over random feeds and random intent scripts:
//! 1. Accounting identity: cash + Σ market value == equity on every snapshot
//! 2. Cash floor: with no leverage allowance, cash never goes negative
//! 3. Fill price: close × (1 ± slippage), adverse to the side
//! 4. Determinism: the same inputs give the same digest

use proptest::prelude::*;
use std::collections::BTreeMap;

use pairlab_core::data::synthetic::{business_days, default_start, random_walk};
use pairlab_core::data::MarketDataFeed;
use pairlab_core::domain::{IntentReason, OrderIntent, Side};
use pairlab_core::engine::{run, EngineConfig, EventLog, EventRecord};
use pairlab_core::rng::SeedTree;
use pairlab_core::strategy::{Decision, Strategy as TradingStrategy, StrategyError, TickContext};

const SYMBOLS: [&str; 2] = ["AAA", "BBB"];
const TICKS: usize = 40;

// ── Strategies (proptest) ────────────────────────────────────────────

/// (tick, symbol index, signed target quantity)
fn arb_script() -> impl Strategy<Value = Vec<(usize, usize, f64)>> {
    prop::collection::vec((0..TICKS, 0..SYMBOLS.len(), -400.0..400.0_f64), 0..30)
}

fn arb_costs() -> impl Strategy<Value = (f64, f64)> {
    (0.0..0.01_f64, 0.0..0.01_f64)
}

// ── Helpers ──────────────────────────────────────────────────────────

struct Replay {
    script: BTreeMap<usize, Vec<OrderIntent>>,
}

impl Replay {
    fn new(script: &[(usize, usize, f64)]) -> Self {
        let mut by_tick: BTreeMap<usize, Vec<OrderIntent>> = BTreeMap::new();
        for &(tick, symbol, qty) in script {
            by_tick.entry(tick).or_default().push(OrderIntent::target_quantity(
                SYMBOLS[symbol],
                qty,
                IntentReason::Rebalance,
            ));
        }
        Self { script: by_tick }
    }
}

impl TradingStrategy for Replay {
    fn name(&self) -> &str {
        "replay"
    }

    fn decide(&mut self, ctx: &TickContext<'_>) -> Result<Decision, StrategyError> {
        Ok(Decision::with_intents(
            self.script.get(&ctx.tick).cloned().unwrap_or_default(),
        ))
    }
}

fn feed(seed: u64) -> MarketDataFeed {
    let timestamps = business_days(default_start(), TICKS);
    let seeds = SeedTree::new(seed);
    let series = SYMBOLS
        .iter()
        .map(|s| (s.to_string(), random_walk(s, 50.0, 1.0, &timestamps, seeds)))
        .collect();
    MarketDataFeed::new(series).unwrap()
}

fn replay(seed: u64, script: &[(usize, usize, f64)], config: &EngineConfig) -> EventLog {
    let feed = feed(seed);
    let mut strategy = Replay::new(script);
    run(&feed, &mut strategy, config).unwrap()
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn equity_identity_holds_every_tick(
        seed in 0..1_000u64,
        script in arb_script(),
        (commission, slippage) in arb_costs(),
    ) {
        let config = EngineConfig::new(20_000.0).with_costs(commission, slippage);
        let log = replay(seed, &script, &config);
        prop_assert!(log.is_complete());
        prop_assert_eq!(log.snapshots().count(), TICKS);
        for snap in log.snapshots() {
            let value: f64 = snap.market_values.values().sum();
            let tolerance = 1e-9 * snap.equity.abs().max(1.0);
            prop_assert!(
                (snap.cash + value - snap.equity).abs() < tolerance,
                "tick {}: cash {} + value {} != equity {}",
                snap.tick, snap.cash, value, snap.equity
            );
        }
    }

    #[test]
    fn cash_never_negative_without_leverage(
        seed in 0..1_000u64,
        script in arb_script(),
    ) {
        let config = EngineConfig::new(5_000.0).with_costs(0.001, 0.001);
        let log = replay(seed, &script, &config);
        for snap in log.snapshots() {
            prop_assert!(snap.cash >= -1e-9, "tick {}: cash {}", snap.tick, snap.cash);
        }
    }

    #[test]
    fn fill_price_is_adverse_close(
        seed in 0..1_000u64,
        script in arb_script(),
        slippage in 0.0..0.02_f64,
    ) {
        let config = EngineConfig::new(50_000.0).with_costs(0.0, slippage);
        let log = replay(seed, &script, &config);

        let mut closes: BTreeMap<(usize, String), f64> = BTreeMap::new();
        for record in log.records() {
            if let EventRecord::Next { tick, bars, .. } = record {
                for bar in bars {
                    closes.insert((*tick, bar.symbol.clone()), bar.close);
                }
            }
        }
        for fill in log.fills() {
            let close = closes[&(fill.tick, fill.symbol.clone())];
            let expected = match fill.side() {
                Side::Buy => close * (1.0 + slippage),
                Side::Sell => close * (1.0 - slippage),
            };
            prop_assert!((fill.price - expected).abs() < 1e-9 * close);
            prop_assert!(fill.slippage >= 0.0);
        }
    }

    #[test]
    fn same_inputs_same_digest(seed in 0..1_000u64, script in arb_script()) {
        let config = EngineConfig::default();
        let first = replay(seed, &script, &config);
        let second = replay(seed, &script, &config);
        prop_assert_eq!(first.digest().unwrap(), second.digest().unwrap());
    }
}
