//! Order intents — what a strategy asks for within one tick.
//!
//! An intent is ephemeral: it is produced by `Strategy::decide`, resolved by
//! the fill engine against the current bar, and never carried to the next tick.
//! Only its ORDER record survives, in the event log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Desired end state of the position in one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OrderTarget {
    /// Signed target quantity. `Quantity(0.0)` closes the position.
    Quantity(f64),
    /// Signed fraction of current total equity.
    PercentOfEquity(f64),
}

/// Why an intent was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentReason {
    EntryLongSpread,
    EntryShortSpread,
    ExitMeanReversion,
    ExitMaxHold,
    ExitDrawdown,
    ExitNumericInstability,
    ExitEntryIncomplete,
    /// Generic rebalance toward a target, used by non-pairs strategies.
    Rebalance,
}

impl IntentReason {
    pub fn is_exit(self) -> bool {
        matches!(
            self,
            Self::ExitMeanReversion
                | Self::ExitMaxHold
                | Self::ExitDrawdown
                | Self::ExitNumericInstability
                | Self::ExitEntryIncomplete
        )
    }
}

impl fmt::Display for IntentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EntryLongSpread => "entry_long_spread",
            Self::EntryShortSpread => "entry_short_spread",
            Self::ExitMeanReversion => "exit_mean_reversion",
            Self::ExitMaxHold => "exit_max_hold",
            Self::ExitDrawdown => "exit_drawdown",
            Self::ExitNumericInstability => "exit_numeric_instability",
            Self::ExitEntryIncomplete => "exit_entry_incomplete",
            Self::Rebalance => "rebalance",
        };
        f.write_str(s)
    }
}

/// A request to move one instrument's position to a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub symbol: String,
    pub target: OrderTarget,
    pub reason: IntentReason,
    /// Emitting unit inside the strategy, e.g. a pair id.
    pub source: Option<String>,
}

impl OrderIntent {
    pub fn target_quantity(symbol: impl Into<String>, quantity: f64, reason: IntentReason) -> Self {
        Self {
            symbol: symbol.into(),
            target: OrderTarget::Quantity(quantity),
            reason,
            source: None,
        }
    }

    pub fn target_percent(symbol: impl Into<String>, fraction: f64, reason: IntentReason) -> Self {
        Self {
            symbol: symbol.into(),
            target: OrderTarget::PercentOfEquity(fraction),
            reason,
            source: None,
        }
    }

    pub fn close(symbol: impl Into<String>, reason: IntentReason) -> Self {
        Self::target_quantity(symbol, 0.0, reason)
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Outcome of one intent, as recorded in its ORDER event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Filled,
    /// Resolved to a zero delta; no trade.
    NoOp,
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_targets_zero() {
        let intent = OrderIntent::close("KO", IntentReason::ExitMaxHold).with_source("KO/PEP");
        assert_eq!(intent.target, OrderTarget::Quantity(0.0));
        assert_eq!(intent.source.as_deref(), Some("KO/PEP"));
        assert!(intent.reason.is_exit());
    }

    #[test]
    fn target_serializes_with_kind_tag() {
        let json = serde_json::to_string(&OrderTarget::PercentOfEquity(0.15)).unwrap();
        assert_eq!(json, r#"{"kind":"percent_of_equity","value":0.15}"#);
    }
}
