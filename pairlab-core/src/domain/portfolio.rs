//! Portfolio snapshot — the per-tick, read-only view of the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::position::Position;

/// Portfolio state at the end of marking (before fills) or the end of a tick.
///
/// `equity == cash + Σ market_values` holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub positions: BTreeMap<String, Position>,
    /// Signed quantity × latest close per open position.
    pub market_values: BTreeMap<String, f64>,
    pub equity: f64,
}

impl PortfolioSnapshot {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    /// Signed quantity held, zero if flat.
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position_value(&self) -> f64 {
        self.market_values.values().sum()
    }

    /// Gross exposure: Σ |market value|.
    pub fn gross_exposure(&self) -> f64 {
        self.market_values.values().map(|v| v.abs()).sum()
    }
}
