//! Run artifacts round-trip through disk.

use pairlab_core::data::synthetic::CointegratedPair;
use pairlab_core::data::MarketDataFeed;
use pairlab_core::domain::PairId;
use pairlab_core::pairs::{PairsConfig, Universe};
use pairlab_runner::{
    load_event_log, load_summary, run_pairs, ArtifactWriter, RunError, RunSpec, RunSummary,
    DAILY_PERIODS,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn feed() -> MarketDataFeed {
    let (a, b) = CointegratedPair {
        spread_ar: 0.5,
        spread_sigma: 1.0,
        ticks: 300,
        ..Default::default()
    }
    .generate();
    MarketDataFeed::from_bars(a.into_iter().chain(b)).unwrap()
}

fn spec(universe: Universe) -> RunSpec {
    RunSpec::new(
        universe,
        PairsConfig {
            use_half_life: false,
            ..PairsConfig::default()
        },
    )
}

fn one_pair() -> Universe {
    Universe::Explicit(vec![PairId::new("AAA", "BBB")])
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn saved_run_reloads_identically() {
    let output = run_pairs(&spec(one_pair()), &feed()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(dir.path()).unwrap();
    let paths = writer.save_run(&output).unwrap();

    assert!(paths.run_dir.ends_with(&output.run_id));
    for path in [
        &paths.events,
        &paths.equity_csv,
        &paths.trades_csv,
        &paths.transitions_json,
        &paths.summary_json,
    ] {
        assert!(path.exists(), "{} missing", path.display());
    }

    let log = load_event_log(&paths.events).unwrap();
    assert_eq!(log, output.log);
    assert!(log.is_complete());
    assert_eq!(log.digest().unwrap(), output.log.digest().unwrap());

    // the summary is a pure function of the log
    let rebuilt = RunSummary::from_event_log(&log, DAILY_PERIODS);
    assert_eq!(rebuilt, output.summary);
    assert_eq!(load_summary(&paths.summary_json).unwrap(), output.summary);
}

#[test]
fn equity_csv_has_one_row_per_tick() {
    let output = run_pairs(&spec(one_pair()), &feed()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactWriter::new(dir.path())
        .unwrap()
        .save_run(&output)
        .unwrap();

    let mut rdr = csv::Reader::from_path(&paths.equity_csv).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["tick", "timestamp", "cash", "position_value", "gross_exposure", "equity"]
    );
    assert_eq!(rdr.records().count(), output.summary.ticks);
}

#[test]
fn aborted_run_keeps_partial_log() {
    // CCC is not in the feed: the strategy aborts on its first tick
    let universe = Universe::AllCombinations(vec!["AAA".into(), "BBB".into(), "CCC".into()]);
    let err = run_pairs(&spec(universe.clone()), &feed()).unwrap_err();
    let RunError::Aborted { run_id, aborted } = err else {
        panic!("expected an aborted run");
    };
    assert!(!aborted.failure.partial_log.is_complete());
    assert!(!aborted.summary.complete);

    let dir = tempfile::tempdir().unwrap();
    let paths = ArtifactWriter::new(dir.path())
        .unwrap()
        .save(
            &run_id,
            &aborted.failure.partial_log,
            &aborted.summary,
            &aborted.transitions,
        )
        .unwrap();
    let reloaded = load_event_log(&paths.events).unwrap();
    assert!(!reloaded.is_complete());
    assert_eq!(reloaded.len(), aborted.failure.partial_log.len());
}

#[test]
fn missing_event_log_reports_path() {
    let err = load_event_log("/nonexistent/events.jsonl").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/events.jsonl"));
}
