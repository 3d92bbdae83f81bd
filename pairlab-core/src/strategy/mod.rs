//! Strategy interface — one capability: bars + portfolio in, intents out.
//!
//! # Architecture invariants
//! - A strategy never mutates the ledger. It sees an immutable [`MarketView`]
//!   (nothing after the current tick) and the marked [`PortfolioSnapshot`].
//! - All per-run state lives inside the strategy value; there is no ambient
//!   state, so independent runs can share a process.
//! - Periodic work is driven by [`Schedule`] predicates on the tick timestamp.

pub mod schedule;

pub use schedule::Schedule;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::data::MarketView;
use crate::domain::{OrderIntent, PortfolioSnapshot};
use crate::engine::event_log::RebalanceDetail;

/// Everything a strategy may observe on one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub market: MarketView<'a>,
    /// Ledger state after marking to this tick's closes, before any fill.
    pub portfolio: &'a PortfolioSnapshot,
}

/// A strategy's answer for one tick.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    /// Applied in order by the fill engine.
    pub intents: Vec<OrderIntent>,
    /// Set when the strategy re-screened or rebalanced on this tick.
    pub rebalance: Option<RebalanceDetail>,
}

impl Decision {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_intents(intents: Vec<OrderIntent>) -> Self {
        Self {
            intents,
            rebalance: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StrategyError {
    /// Unrecoverable; aborts the run.
    #[error("fatal strategy error: {0}")]
    Fatal(String),

    /// Scoped to one instrument or pair; logged, and the whole tick's
    /// decision is dropped. A strategy that can still act on its other
    /// instruments should skip the failed one inside `decide` instead.
    #[error("{scope}: {reason}")]
    Domain { scope: String, reason: String },
}

/// Trait for strategies driven by the simulation loop.
pub trait Strategy {
    /// Human-readable name (e.g., "pairs").
    fn name(&self) -> &str;

    /// Decide this tick's order intents.
    ///
    /// Failures confined to one instrument belong inside the returned
    /// decision: omit that instrument's intents and keep the rest.
    /// Returning [`StrategyError::Domain`] discards every intent of the tick.
    fn decide(&mut self, ctx: &TickContext<'_>) -> Result<Decision, StrategyError>;
}
