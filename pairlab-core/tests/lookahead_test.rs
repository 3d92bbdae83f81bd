//! Look-ahead contamination tests.
//!
//! Invariant: nothing recorded at tick t may depend on bars after t.
//!
//! Method: run on a truncated feed (ticks 0..n) and on the full feed, then
//! assert the truncated log is an exact prefix of the full one. Any
//! difference means a strategy or the engine read future data.

use std::collections::BTreeMap;

use pairlab_core::data::synthetic::CointegratedPair;
use pairlab_core::data::MarketDataFeed;
use pairlab_core::domain::{Bar, PairId};
use pairlab_core::engine::{run, EventLog};
use pairlab_core::pairs::{PairsConfig, PairsStrategy, Universe};
use pairlab_core::strategy::Schedule;

fn pair_bars(ticks: usize) -> (Vec<Bar>, Vec<Bar>) {
    CointegratedPair {
        spread_ar: 0.5,
        spread_sigma: 1.0,
        ticks,
        seed: 7,
        ..Default::default()
    }
    .generate()
}

fn feed(a: &[Bar], b: &[Bar], n: usize) -> MarketDataFeed {
    let mut series = BTreeMap::new();
    series.insert("AAA".to_string(), a[..n].to_vec());
    series.insert("BBB".to_string(), b[..n].to_vec());
    MarketDataFeed::new(series).unwrap()
}

fn run_on(feed: &MarketDataFeed, config: &PairsConfig) -> EventLog {
    let mut strategy = PairsStrategy::new(
        config.clone(),
        Universe::Explicit(vec![PairId::new("AAA", "BBB")]),
    )
    .unwrap();
    run(feed, &mut strategy, &config.engine_config(100_000.0)).unwrap()
}

fn assert_prefix(config: PairsConfig, full_len: usize, truncated_len: usize) {
    let (a, b) = pair_bars(full_len);
    let full = run_on(&feed(&a, &b, full_len), &config);
    let truncated = run_on(&feed(&a, &b, truncated_len), &config);

    assert!(truncated.len() <= full.len());
    for (i, (t, f)) in truncated.records().iter().zip(full.records()).enumerate() {
        assert_eq!(t, f, "record {i} (tick {}) differs", t.tick());
    }
    assert_eq!(
        truncated.snapshots().count(),
        truncated_len,
        "one snapshot per tick"
    );
}

#[test]
fn pairs_log_has_no_lookahead() {
    let config = PairsConfig {
        use_half_life: false,
        ..PairsConfig::default()
    };
    assert_prefix(config, 400, 250);
}

#[test]
fn rescreen_ticks_have_no_lookahead() {
    // re-screen often so truncation lands right after several REBALANCEs
    let config = PairsConfig {
        use_half_life: false,
        rescreen: Schedule::EveryNTicks(7),
        ..PairsConfig::default()
    };
    for cut in [61, 100, 177] {
        assert_prefix(config.clone(), 300, cut);
    }
}
