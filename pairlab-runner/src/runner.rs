//! Pairs run orchestration — wires together config, feed, engine, and summary.
//!
//! Two entry points:
//! - `run_pairs()`: runs a validated `RunSpec` over a pre-built feed.
//! - `load_feed()`: reads one CSV file per symbol into a validated feed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use pairlab_core::data::{read_bars_file, DataError, MarketDataFeed};
use pairlab_core::engine::{self, ConfigError, EngineConfig, EventLog, RunFailure};
use pairlab_core::pairs::{PairTransition, PairsConfig, PairsStrategy, Universe};

use crate::metrics::DAILY_PERIODS;
use crate::summary::RunSummary;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// The engine aborted. The partial log and its summary are kept for
    /// post-mortem inspection.
    #[error("run {run_id} aborted: {}", .aborted.failure)]
    Aborted {
        run_id: String,
        aborted: Box<AbortedRun>,
    },
}

#[derive(Debug)]
pub struct AbortedRun {
    pub failure: RunFailure,
    pub summary: RunSummary,
    pub transitions: Vec<PairTransition>,
}

fn default_initial_cash() -> f64 {
    100_000.0
}

fn default_periods_per_year() -> f64 {
    DAILY_PERIODS
}

/// Everything needed to reproduce one pairs run, given the same feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    pub universe: Universe,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    #[serde(default)]
    pub pairs: PairsConfig,
}

impl RunSpec {
    pub fn new(universe: Universe, pairs: PairsConfig) -> Self {
        Self {
            universe,
            initial_cash: default_initial_cash(),
            periods_per_year: default_periods_per_year(),
            pairs,
        }
    }

    /// Parse from TOML: top-level run keys plus a `[pairs]` table.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let spec: Self = toml::from_str(s)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(ConfigError::Invalid {
                key: "periods_per_year",
                reason: format!("must be positive, got {}", self.periods_per_year),
            });
        }
        self.pairs.validate()?;
        self.engine_config().validate()
    }

    pub fn engine_config(&self) -> EngineConfig {
        self.pairs.engine_config(self.initial_cash)
    }

    /// Deterministic hash ID over the spec and every bar of the feed.
    ///
    /// Two runs with the same id produce the same event log.
    pub fn run_id(&self, feed: &MarketDataFeed) -> Result<String, ConfigError> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(self)?);
        for symbol in feed.symbols() {
            hasher.update(symbol.as_bytes());
            if let Some(bars) = feed.series(symbol) {
                hasher.update(&serde_json::to_vec(bars)?);
            }
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Complete result of a pairs run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: String,
    pub spec: RunSpec,
    pub log: EventLog,
    pub summary: RunSummary,
    pub transitions: Vec<PairTransition>,
}

/// Run `spec` over `feed`. Configuration errors fail before any tick.
pub fn run_pairs(spec: &RunSpec, feed: &MarketDataFeed) -> Result<RunOutput, RunError> {
    spec.validate()?;
    let run_id = spec.run_id(feed)?;
    let mut strategy = PairsStrategy::new(spec.pairs.clone(), spec.universe.clone())?;

    info!(run_id = %run_id, ticks = feed.len(), "starting pairs run");
    match engine::run(feed, &mut strategy, &spec.engine_config()) {
        Ok(log) => {
            let summary = RunSummary::from_event_log(&log, spec.periods_per_year);
            info!(
                run_id = %run_id,
                final_equity = summary.final_equity,
                trades = summary.metrics.trade_count,
                sharpe = summary.metrics.sharpe,
                "pairs run finished"
            );
            Ok(RunOutput {
                run_id,
                spec: spec.clone(),
                log,
                summary,
                transitions: strategy.transitions().to_vec(),
            })
        }
        Err(failure) => {
            warn!(run_id = %run_id, error = %failure.error, "pairs run aborted");
            let summary = RunSummary::from_event_log(&failure.partial_log, spec.periods_per_year);
            Err(RunError::Aborted {
                run_id,
                aborted: Box::new(AbortedRun {
                    failure,
                    summary,
                    transitions: strategy.transitions().to_vec(),
                }),
            })
        }
    }
}

/// Read `symbol -> csv path` into a validated feed.
pub fn load_feed(paths: &BTreeMap<String, PathBuf>) -> Result<MarketDataFeed, DataError> {
    let mut series = BTreeMap::new();
    for (symbol, path) in paths {
        series.insert(symbol.clone(), read_bars_file(symbol, path)?);
    }
    MarketDataFeed::new(series)
}
