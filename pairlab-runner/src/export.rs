//! Run artifacts — event log, equity curve, round trips and summary on disk.
//!
//! Layout under `<root>/<run_id>/`:
//! - `events.jsonl`: the canonical event log (replayable with [`load_event_log`])
//! - `equity.csv`: one row per end-of-tick snapshot
//! - `trades.csv`: round trips
//! - `transitions.json`: pair state transitions
//! - `summary.json`: [`RunSummary`] with metrics

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pairlab_core::engine::EventLog;
use pairlab_core::pairs::PairTransition;

use crate::runner::RunOutput;
use crate::summary::{EquityPoint, RunSummary};
use crate::trades::RoundTrip;

/// Artifact paths returned after export.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub events: PathBuf,
    pub equity_csv: PathBuf,
    pub trades_csv: PathBuf,
    pub transitions_json: PathBuf,
    pub summary_json: PathBuf,
}

/// Writes run artifacts under one output root.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create artifact root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn save_run(&self, output: &RunOutput) -> Result<ArtifactPaths> {
        self.save(&output.run_id, &output.log, &output.summary, &output.transitions)
    }

    /// Save any log, complete or partial, with its summary.
    pub fn save(
        &self,
        run_id: &str,
        log: &EventLog,
        summary: &RunSummary,
        transitions: &[PairTransition],
    ) -> Result<ArtifactPaths> {
        let run_dir = self.root.join(run_id);
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed to create run directory {}", run_dir.display()))?;

        let paths = ArtifactPaths {
            events: run_dir.join("events.jsonl"),
            equity_csv: run_dir.join("equity.csv"),
            trades_csv: run_dir.join("trades.csv"),
            transitions_json: run_dir.join("transitions.json"),
            summary_json: run_dir.join("summary.json"),
            run_dir,
        };

        write_event_log(&paths.events, log)?;
        write_equity_csv(&paths.equity_csv, &summary.equity_curve)?;
        write_trades_csv(&paths.trades_csv, &summary.trades)?;
        write_json(&paths.transitions_json, &transitions)?;
        write_json(&paths.summary_json, summary)?;
        Ok(paths)
    }
}

// ─── Writers ────────────────────────────────────────────────────────

pub fn write_event_log(path: &Path, log: &EventLog) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create event log {}", path.display()))?;
    log.write_jsonl(BufWriter::new(file))
        .with_context(|| format!("failed to write event log {}", path.display()))
}

pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create equity CSV {}", path.display()))?;
    for point in equity {
        wtr.serialize(point)?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush equity CSV {}", path.display()))
}

/// Columns: symbol, direction, entry_tick, entry_timestamp, exit_tick,
/// exit_timestamp, max_quantity, gross_pnl, commission, net_pnl, source.
/// Open trips leave the exit columns empty.
pub fn write_trades_csv(path: &Path, trades: &[RoundTrip]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create trades CSV {}", path.display()))?;
    for trade in trades {
        wtr.serialize(trade)?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush trades CSV {}", path.display()))
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {}", path.display()))
}

// ─── Readers ────────────────────────────────────────────────────────

/// Reload a persisted event log for replay or re-summarizing.
pub fn load_event_log(path: impl AsRef<Path>) -> Result<EventLog> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open event log {}", path.display()))?;
    EventLog::read_jsonl(BufReader::new(file))
        .with_context(|| format!("failed to parse event log {}", path.display()))
}

pub fn load_summary(path: impl AsRef<Path>) -> Result<RunSummary> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open summary {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse summary {}", path.display()))
}
