//! Event log — the append-only record of a run.
//!
//! Emission order is the total order: per tick `NEXT`, then an optional
//! `REBALANCE`, then `ORDER` (each followed by its `TRADE` if filled), then
//! `PORTFOLIO`. Every map inside a record is a `BTreeMap`, so two runs on the
//! same inputs serialize to identical bytes.
//!
//! Persisted form is JSON Lines: one record per line, then a trailer line
//! `{"complete":bool,"records":N}`. A log whose trailer is missing is read
//! back as incomplete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use thiserror::Error;

use crate::domain::{
    Bar, Fill, IntentReason, OrderId, OrderStatus, OrderTarget, PortfolioSnapshot,
};

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode event record: {0}")]
    Encode(serde_json::Error),

    #[error("failed to decode line {line}: {source}")]
    Decode {
        line: usize,
        source: serde_json::Error,
    },

    #[error("trailer announces {expected} records, found {found}")]
    CountMismatch { expected: usize, found: usize },
}

/// Outcome of one order intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub target: OrderTarget,
    pub reason: IntentReason,
    pub source: Option<String>,
    /// Resolved signed delta; absent when it could not be resolved.
    pub delta: Option<f64>,
    pub status: OrderStatus,
    pub reject_reason: Option<String>,
}

/// What a strategy re-screened on a REBALANCE tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RebalanceDetail {
    pub screened: usize,
    pub active: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventRecord {
    Next {
        tick: usize,
        timestamp: DateTime<Utc>,
        /// Bars that updated on this tick, in symbol order.
        bars: Vec<Bar>,
    },
    Portfolio(PortfolioSnapshot),
    Order(OrderRecord),
    Trade(Fill),
    Rebalance {
        tick: usize,
        timestamp: DateTime<Utc>,
        strategy: String,
        detail: RebalanceDetail,
    },
}

impl EventRecord {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Next { .. } => "NEXT",
            Self::Portfolio(_) => "PORTFOLIO",
            Self::Order(_) => "ORDER",
            Self::Trade(_) => "TRADE",
            Self::Rebalance { .. } => "REBALANCE",
        }
    }

    pub fn tick(&self) -> usize {
        match self {
            Self::Next { tick, .. } | Self::Rebalance { tick, .. } => *tick,
            Self::Portfolio(s) => s.tick,
            Self::Order(o) => o.tick,
            Self::Trade(f) => f.tick,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Next { timestamp, .. } | Self::Rebalance { timestamp, .. } => *timestamp,
            Self::Portfolio(s) => s.timestamp,
            Self::Order(o) => o.timestamp,
            Self::Trade(f) => f.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogTrailer {
    complete: bool,
    records: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    records: Vec<EventRecord>,
    complete: bool,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EventRecord>, complete: bool) -> Self {
        Self { records, complete }
    }

    pub(crate) fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// True only for a run that processed every tick.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &PortfolioSnapshot> {
        self.records.iter().filter_map(|r| match r {
            EventRecord::Portfolio(s) => Some(s),
            _ => None,
        })
    }

    pub fn fills(&self) -> impl Iterator<Item = &Fill> {
        self.records.iter().filter_map(|r| match r {
            EventRecord::Trade(f) => Some(f),
            _ => None,
        })
    }

    pub fn orders(&self) -> impl Iterator<Item = &OrderRecord> {
        self.records.iter().filter_map(|r| match r {
            EventRecord::Order(o) => Some(o),
            _ => None,
        })
    }

    pub fn rebalances(&self) -> impl Iterator<Item = (usize, &RebalanceDetail)> {
        self.records.iter().filter_map(|r| match r {
            EventRecord::Rebalance { tick, detail, .. } => Some((*tick, detail)),
            _ => None,
        })
    }

    // ─── Persistence ─────────────────────────────────────────────────

    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<(), EventLogError> {
        for record in &self.records {
            serde_json::to_writer(&mut writer, record).map_err(EventLogError::Encode)?;
            writer.write_all(b"\n")?;
        }
        let trailer = LogTrailer {
            complete: self.complete,
            records: self.records.len(),
        };
        serde_json::to_writer(&mut writer, &trailer).map_err(EventLogError::Encode)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_jsonl(&self) -> Result<Vec<u8>, EventLogError> {
        let mut buf = Vec::new();
        self.write_jsonl(&mut buf)?;
        Ok(buf)
    }

    pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Self, EventLogError> {
        let mut lines: Vec<(usize, String)> = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push((i + 1, line));
            }
        }

        let trailer = lines
            .last()
            .and_then(|(_, last)| serde_json::from_str::<LogTrailer>(last).ok());
        if trailer.is_some() {
            lines.pop();
        }

        let records = lines
            .iter()
            .map(|(line, text)| {
                serde_json::from_str::<EventRecord>(text)
                    .map_err(|source| EventLogError::Decode { line: *line, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match trailer {
            Some(t) if t.records != records.len() => Err(EventLogError::CountMismatch {
                expected: t.records,
                found: records.len(),
            }),
            Some(t) => Ok(Self::from_records(records, t.complete)),
            None => Ok(Self::from_records(records, false)),
        }
    }

    /// BLAKE3 hex digest of the canonical JSONL form.
    pub fn digest(&self) -> Result<String, EventLogError> {
        let bytes = self.to_jsonl()?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}
