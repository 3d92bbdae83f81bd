//! Per-pair owned state: hedge estimator, spread window, lifecycle phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::config::PairsConfig;
use super::screening::ScreenResult;
use crate::domain::{IntentReason, PairId};
use crate::stats::{simple_ols, KalmanHedge, RollingWindow, StatsError};

// ─── Lifecycle ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairPhase {
    Flat,
    /// Long A, short B.
    EnteredLongSpread,
    /// Short A, long B.
    EnteredShortSpread,
}

impl PairPhase {
    pub fn is_entered(self) -> bool {
        !matches!(self, Self::Flat)
    }
}

impl fmt::Display for PairPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flat => "FLAT",
            Self::EnteredLongSpread => "ENTERED_LONG_SPREAD",
            Self::EnteredShortSpread => "ENTERED_SHORT_SPREAD",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    Entry,
    MeanReversion,
    MaxHold,
    Drawdown,
    NumericInstability,
    /// Both entry legs were rejected by the fill engine.
    EntryRejected,
    /// Only one entry leg filled; it was closed.
    EntryIncomplete,
}

impl TransitionReason {
    /// Reason tag for the close intents an exit emits.
    pub fn exit_intent(self) -> Option<IntentReason> {
        match self {
            Self::MeanReversion => Some(IntentReason::ExitMeanReversion),
            Self::MaxHold => Some(IntentReason::ExitMaxHold),
            Self::Drawdown => Some(IntentReason::ExitDrawdown),
            Self::NumericInstability => Some(IntentReason::ExitNumericInstability),
            Self::EntryIncomplete => Some(IntentReason::ExitEntryIncomplete),
            Self::Entry | Self::EntryRejected => None,
        }
    }
}

/// One lifecycle change, as observed by the strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTransition {
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub pair: PairId,
    pub from: PairPhase,
    pub to: PairPhase,
    pub reason: TransitionReason,
    pub zscore: Option<f64>,
    pub hedge_ratio: Option<f64>,
}

/// An open entry. Exists exactly while the phase is `Entered*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub zscore: f64,
    pub hedge_ratio: f64,
    /// Requested signed leg quantities.
    pub quantity_a: f64,
    pub quantity_b: f64,
    /// Highest marked equity since entry; drives the drawdown stop.
    pub peak_equity: f64,
    /// Set once the fills have been checked against the portfolio.
    pub reconciled: bool,
}

impl Entry {
    pub fn drawdown(&self, equity: f64) -> f64 {
        if self.peak_equity > 0.0 {
            1.0 - equity / self.peak_equity
        } else {
            0.0
        }
    }
}

// ─── Hedge estimation ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum HedgeEstimator {
    Kalman(KalmanHedge),
    /// Slope of A on B over a rolling window.
    RollingOls {
        a: RollingWindow,
        b: RollingWindow,
        beta: Option<f64>,
    },
}

impl HedgeEstimator {
    pub fn from_config(config: &PairsConfig) -> Self {
        if config.use_kalman {
            Self::Kalman(KalmanHedge::new(config.kalman_q, config.kalman_r))
        } else {
            Self::RollingOls {
                a: RollingWindow::new(config.lookback),
                b: RollingWindow::new(config.lookback),
                beta: None,
            }
        }
    }

    /// Fold one observation; `None` until the estimator has enough data.
    pub fn update(&mut self, price_a: f64, price_b: f64) -> Result<Option<f64>, StatsError> {
        match self {
            Self::Kalman(kf) => kf.update(price_a, price_b).map(Some),
            Self::RollingOls { a, b, beta } => {
                if !price_a.is_finite() || !price_b.is_finite() {
                    return Err(StatsError::NonFinite {
                        what: "rolling OLS observation",
                    });
                }
                a.push(price_a);
                b.push(price_b);
                if a.len() < 3 {
                    return Ok(None);
                }
                let fit = simple_ols(&a.values(), &b.values())?;
                if !fit.slope.is_finite() {
                    return Err(StatsError::NonFinite { what: "hedge ratio" });
                }
                *beta = Some(fit.slope);
                Ok(*beta)
            }
        }
    }

    pub fn hedge_ratio(&self) -> Option<f64> {
        match self {
            Self::Kalman(kf) if kf.updates() > 0 => Some(kf.beta()),
            Self::Kalman(_) => None,
            Self::RollingOls { beta, .. } => *beta,
        }
    }
}

// ─── Pair state ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PairState {
    pub id: PairId,
    phase: PairPhase,
    estimator: HedgeEstimator,
    spread: RollingWindow,
    entry: Option<Entry>,
    /// Last screening result that admitted or retained the pair.
    pub screen: ScreenResult,
    pub created_tick: usize,
    last_zscore: Option<f64>,
    /// Excluded from updates and entries until rebuilt by a re-screen.
    quarantined: bool,
    /// Exit whose close intents still need to be confirmed.
    pending_exit: Option<TransitionReason>,
}

impl PairState {
    pub fn new(screen: ScreenResult, config: &PairsConfig, tick: usize) -> Self {
        Self {
            id: screen.pair.clone(),
            phase: PairPhase::Flat,
            estimator: HedgeEstimator::from_config(config),
            spread: RollingWindow::new(config.lookback),
            entry: None,
            screen,
            created_tick: tick,
            last_zscore: None,
            quarantined: false,
            pending_exit: None,
        }
    }

    pub fn phase(&self) -> PairPhase {
        self.phase
    }

    pub fn is_entered(&self) -> bool {
        self.phase.is_entered()
    }

    pub fn entry(&self) -> Option<&Entry> {
        self.entry.as_ref()
    }

    pub(crate) fn entry_mut(&mut self) -> Option<&mut Entry> {
        self.entry.as_mut()
    }

    pub fn hedge_ratio(&self) -> Option<f64> {
        self.estimator.hedge_ratio()
    }

    pub fn estimator(&self) -> &HedgeEstimator {
        &self.estimator
    }

    pub fn spread(&self) -> &RollingWindow {
        &self.spread
    }

    pub fn last_zscore(&self) -> Option<f64> {
        self.last_zscore
    }

    pub fn is_quarantined(&self) -> bool {
        self.quarantined
    }

    pub fn pending_exit(&self) -> Option<TransitionReason> {
        self.pending_exit
    }

    /// Update the hedge ratio, push the spread, and return its z-score.
    ///
    /// On error the spread window is left untouched.
    pub fn observe(
        &mut self,
        price_a: f64,
        price_b: f64,
        min_periods: usize,
    ) -> Result<Option<f64>, StatsError> {
        let Some(beta) = self.estimator.update(price_a, price_b)? else {
            self.last_zscore = None;
            return Ok(None);
        };
        let spread = price_a - beta * price_b;
        if !spread.is_finite() {
            return Err(StatsError::NonFinite { what: "spread" });
        }
        self.spread.push(spread);
        self.last_zscore = self.spread.zscore(min_periods);
        Ok(self.last_zscore)
    }

    pub(crate) fn enter(&mut self, phase: PairPhase, entry: Entry) {
        debug_assert!(phase.is_entered() && self.entry.is_none());
        self.phase = phase;
        self.entry = Some(entry);
        self.pending_exit = None;
    }

    /// Return to FLAT, remembering the exit if close intents were emitted.
    pub(crate) fn exit(&mut self, reason: Option<TransitionReason>) -> Option<Entry> {
        self.phase = PairPhase::Flat;
        self.pending_exit = reason;
        self.entry.take()
    }

    pub(crate) fn clear_pending_exit(&mut self) {
        self.pending_exit = None;
    }

    pub(crate) fn quarantine(&mut self) {
        self.quarantined = true;
        self.last_zscore = None;
    }
}
