//! PairLab Runner — pairs run orchestration, performance summary, artifacts.
//!
//! This crate builds on `pairlab-core` to provide:
//! - `RunSpec` (TOML-loadable) and `run_pairs()` over a validated feed
//! - Round-trip trade extraction from TRADE events, grouped per pair entry
//! - Performance metrics and `RunSummary` built from an EventLog alone
//! - Artifact persistence (events.jsonl, equity.csv, trades.csv, summary.json)
//! - `init_tracing()` for embedders

pub mod export;
pub mod logging;
pub mod metrics;
pub mod runner;
pub mod summary;
pub mod trades;

pub use export::{load_event_log, load_summary, ArtifactPaths, ArtifactWriter};
pub use logging::init_tracing;
pub use metrics::{PerformanceMetrics, DAILY_PERIODS};
pub use runner::{load_feed, run_pairs, AbortedRun, RunError, RunOutput, RunSpec};
pub use summary::{EquityPoint, OrderCounts, RunSummary};
pub use trades::{extract_round_trips, group_pair_trades, PairTrade, RoundTrip, TradeDirection};
