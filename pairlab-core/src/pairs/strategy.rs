//! The pairs-trading strategy.
//!
//! Per tick:
//! 1. Track portfolio drawdown (entry lock) and per-entry equity peaks
//! 2. Screen the universe on the first tick with enough aligned history,
//!    then whenever the `rescreen` schedule is due
//! 3. For every tracked pair whose legs both updated, in rank order:
//!    reconcile a fresh entry, update hedge ratio and z-score, evaluate
//!    exits, then entries
//! 4. Emit intents: exits first, then short legs, then long legs
//!
//! Pair-scoped failures ([`PairsError`]) are logged and never abort the run.
//! A universe symbol without market data is fatal.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use super::config::PairsConfig;
use super::error::PairsError;
use super::screening::{rank, screen_pair, ScreenResult, Universe};
use super::state::{Entry, PairPhase, PairState, PairTransition, TransitionReason};
use crate::data::MarketView;
use crate::domain::{IntentReason, OrderIntent, OrderTarget, PairId, PortfolioSnapshot};
use crate::engine::config::ConfigError;
use crate::engine::event_log::RebalanceDetail;
use crate::stats::StatsError;
use crate::strategy::{Decision, Strategy, StrategyError, TickContext};

/// Direction implied by a z-score; entry thresholds are strict.
pub fn entry_direction(zscore: f64, entry_z: f64) -> Option<PairPhase> {
    if zscore < -entry_z {
        Some(PairPhase::EnteredLongSpread)
    } else if zscore > entry_z {
        Some(PairPhase::EnteredShortSpread)
    } else {
        None
    }
}

/// A flat pair whose z-score crossed the entry threshold this tick.
#[derive(Debug, Clone, Copy)]
struct EntrySignal {
    phase: PairPhase,
    zscore: f64,
    hedge_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct PairsStrategy {
    config: PairsConfig,
    universe: Universe,
    candidates: Vec<PairId>,
    pairs: BTreeMap<PairId, PairState>,
    /// Tracked pairs in rank order.
    order: Vec<PairId>,
    transitions: Vec<PairTransition>,
    screened: bool,
    symbols_checked: bool,
    equity_peak: f64,
    entry_lock: bool,
}

impl PairsStrategy {
    pub fn new(config: PairsConfig, universe: Universe) -> Result<Self, ConfigError> {
        config.validate()?;
        let candidates = universe.pairs();
        if candidates.is_empty() {
            return Err(ConfigError::invalid("universe", "no candidate pairs"));
        }
        Ok(Self {
            config,
            universe,
            candidates,
            pairs: BTreeMap::new(),
            order: Vec::new(),
            transitions: Vec::new(),
            screened: false,
            symbols_checked: false,
            equity_peak: 0.0,
            entry_lock: false,
        })
    }

    pub fn config(&self) -> &PairsConfig {
        &self.config
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Every lifecycle change so far, in emission order.
    pub fn transitions(&self) -> &[PairTransition] {
        &self.transitions
    }

    pub fn pair_state(&self, id: &PairId) -> Option<&PairState> {
        self.pairs.get(id)
    }

    /// Tracked pairs in rank order.
    pub fn active_pairs(&self) -> impl Iterator<Item = &PairId> {
        self.order.iter()
    }

    pub fn entered_count(&self) -> usize {
        self.pairs.values().filter(|s| s.is_entered()).count()
    }

    pub fn is_entry_locked(&self) -> bool {
        self.entry_lock
    }

    // ─── Portfolio-level risk ────────────────────────────────────────

    fn track_drawdown(&mut self, equity: f64) {
        if equity.is_finite() {
            self.equity_peak = self.equity_peak.max(equity);
        }
        let drawdown = if self.equity_peak > 0.0 {
            1.0 - equity / self.equity_peak
        } else {
            0.0
        };
        if !self.entry_lock && drawdown > self.config.max_drawdown {
            self.entry_lock = true;
            warn!(drawdown, peak = self.equity_peak, "drawdown lock engaged, entries suspended");
        } else if self.entry_lock
            && drawdown < self.config.drawdown_lock_release * self.config.max_drawdown
        {
            self.entry_lock = false;
            info!(drawdown, "drawdown lock released");
        }

        for state in self.pairs.values_mut() {
            if let Some(entry) = state.entry_mut() {
                entry.peak_equity = entry.peak_equity.max(equity);
            }
        }
    }

    // ─── Screening ───────────────────────────────────────────────────

    fn check_symbols(&self, market: &MarketView<'_>) -> Result<(), StrategyError> {
        let available: BTreeSet<&str> = market.symbols().collect();
        match self
            .universe
            .symbols()
            .into_iter()
            .find(|s| !available.contains(s.as_str()))
        {
            Some(missing) => Err(StrategyError::Fatal(format!(
                "universe symbol {missing} has no market data"
            ))),
            None => Ok(()),
        }
    }

    fn should_screen(&self, ctx: &TickContext<'_>) -> bool {
        if self.screened {
            return self.config.rescreen.is_due(ctx.timestamp, ctx.tick);
        }
        self.candidates
            .iter()
            .any(|p| ctx.market.aligned_len(&p.a, &p.b) >= self.config.lookback)
    }

    fn screen(&mut self, ctx: &TickContext<'_>) -> RebalanceDetail {
        let mut passed: Vec<ScreenResult> = Vec::new();
        for pair in &self.candidates {
            let (a, b) = ctx.market.aligned_closes(&pair.a, &pair.b, self.config.lookback);
            match screen_pair(pair, &a, &b, &self.config) {
                Ok(result) => passed.push(result),
                Err(reason) => debug!(tick = ctx.tick, pair = %pair, %reason, "pair failed screen"),
            }
        }
        rank(&mut passed);
        let passing: BTreeSet<PairId> = passed.iter().map(|r| r.pair.clone()).collect();

        // Entered pairs and pairs with unconfirmed exits stay regardless.
        let stale: Vec<PairId> = self
            .pairs
            .iter()
            .filter(|(id, s)| {
                !s.is_entered()
                    && s.pending_exit().is_none()
                    && (!passing.contains(*id) || s.is_quarantined())
            })
            .map(|(id, _)| id.clone())
            .collect();
        let mut removed = Vec::with_capacity(stale.len());
        for id in stale {
            self.pairs.remove(&id);
            removed.push(id.to_string());
        }

        let mut added = Vec::new();
        for result in &passed {
            if let Some(state) = self.pairs.get_mut(&result.pair) {
                state.screen = result.clone();
                continue;
            }
            match self.warm_start(result.clone(), &ctx.market, ctx.tick) {
                Ok(state) => {
                    added.push(result.pair.to_string());
                    self.pairs.insert(result.pair.clone(), state);
                }
                Err(err) => {
                    warn!(tick = ctx.tick, pair = %result.pair, error = %err, "warm start failed, pair not tracked");
                }
            }
        }

        self.order = passed
            .iter()
            .map(|r| r.pair.clone())
            .filter(|id| self.pairs.contains_key(id))
            .collect();
        self.order.extend(
            self.pairs
                .keys()
                .filter(|id| !passing.contains(*id))
                .cloned(),
        );
        self.screened = true;

        info!(
            tick = ctx.tick,
            screened = self.candidates.len(),
            passed = passed.len(),
            tracked = self.order.len(),
            added = added.len(),
            removed = removed.len(),
            "universe screened"
        );
        RebalanceDetail {
            screened: self.candidates.len(),
            active: self.order.iter().map(|id| id.to_string()).collect(),
            added,
            removed,
        }
    }

    /// Fresh state replaying the aligned history before this tick.
    fn warm_start(
        &self,
        screen: ScreenResult,
        market: &MarketView<'_>,
        tick: usize,
    ) -> Result<PairState, StatsError> {
        let lookback = self.config.lookback;
        let (a, b) = (screen.pair.a.clone(), screen.pair.b.clone());
        let (mut xs, mut ys) = market.aligned_closes(&a, &b, lookback + 1);
        if market.current(&a).is_some() && market.current(&b).is_some() {
            xs.pop();
            ys.pop();
        }
        let skip = xs.len().saturating_sub(lookback);
        let mut state = PairState::new(screen, &self.config, tick);
        for (pa, pb) in xs[skip..].iter().zip(&ys[skip..]) {
            state.observe(*pa, *pb, self.config.min_zscore_periods)?;
        }
        Ok(state)
    }

    // ─── Per-pair step ───────────────────────────────────────────────

    /// Advance one pair; pushes exit intents and returns an entry signal
    /// for a flat pair that may enter.
    fn step_pair(
        &mut self,
        id: &PairId,
        price_a: f64,
        price_b: f64,
        ctx: &TickContext<'_>,
        exits: &mut Vec<OrderIntent>,
    ) -> Option<EntrySignal> {
        let config = &self.config;
        let state = self.pairs.get_mut(id)?;
        let mut settled = false;

        // Entry reconciliation against the fills of the previous entry tick.
        if state.entry().is_some_and(|e| !e.reconciled) {
            let held_a = ctx.portfolio.has_position(&id.a);
            let held_b = ctx.portfolio.has_position(&id.b);
            let (from, z, beta) = (state.phase(), state.last_zscore(), state.hedge_ratio());
            match (held_a, held_b) {
                (true, true) => {
                    if let Some(entry) = state.entry_mut() {
                        entry.reconciled = true;
                    }
                }
                (false, false) => {
                    state.exit(None);
                    settled = true;
                    self.transitions.push(transition(
                        ctx,
                        id,
                        (from, PairPhase::Flat),
                        TransitionReason::EntryRejected,
                        z,
                        beta,
                    ));
                }
                _ => {
                    let open = if held_a { &id.a } else { &id.b };
                    exits.push(
                        OrderIntent::close(open.as_str(), IntentReason::ExitEntryIncomplete)
                            .with_source(id.to_string()),
                    );
                    state.exit(Some(TransitionReason::EntryIncomplete));
                    settled = true;
                    self.transitions.push(transition(
                        ctx,
                        id,
                        (from, PairPhase::Flat),
                        TransitionReason::EntryIncomplete,
                        z,
                        beta,
                    ));
                }
            }
        }

        // Exit legs that are still open after their close intents.
        if !settled {
            if let Some(reason) = state.pending_exit() {
                let open: Vec<&String> = [&id.a, &id.b]
                    .into_iter()
                    .filter(|s| ctx.portfolio.has_position(s))
                    .collect();
                if open.is_empty() {
                    state.clear_pending_exit();
                } else {
                    warn!(tick = ctx.tick, pair = %id, ?reason, "exit legs still open, closing again");
                    let intent_reason = reason
                        .exit_intent()
                        .unwrap_or(IntentReason::ExitEntryIncomplete);
                    for symbol in open {
                        exits.push(
                            OrderIntent::close(symbol.as_str(), intent_reason)
                                .with_source(id.to_string()),
                        );
                    }
                }
            }
        }

        if state.is_quarantined() {
            return None;
        }

        let zscore = match state.observe(price_a, price_b, config.min_zscore_periods) {
            Ok(z) => z,
            Err(err) => {
                let error = PairsError::NumericInstability {
                    pair: id.clone(),
                    reason: err.to_string(),
                };
                warn!(tick = ctx.tick, error = %error, "pair forced flat and quarantined");
                if state.is_entered() {
                    let from = state.phase();
                    push_closes(exits, id, IntentReason::ExitNumericInstability, ctx.portfolio);
                    state.exit(Some(TransitionReason::NumericInstability));
                    self.transitions.push(transition(
                        ctx,
                        id,
                        (from, PairPhase::Flat),
                        TransitionReason::NumericInstability,
                        None,
                        None,
                    ));
                }
                state.quarantine();
                return None;
            }
        };
        let hedge_ratio = state.hedge_ratio();
        debug!(tick = ctx.tick, pair = %id, z = ?zscore, beta = ?hedge_ratio, "pair updated");

        if let Some(entry) = state.entry() {
            let reason = if zscore.is_some_and(|z| z.abs() <= config.exit_z) {
                Some(TransitionReason::MeanReversion)
            } else if ctx.tick.saturating_sub(entry.tick) >= config.max_hold_days {
                Some(TransitionReason::MaxHold)
            } else if entry.drawdown(ctx.portfolio.equity) > config.max_drawdown {
                Some(TransitionReason::Drawdown)
            } else {
                None
            };
            if let Some(reason) = reason {
                let from = state.phase();
                let intent_reason = reason
                    .exit_intent()
                    .unwrap_or(IntentReason::ExitMeanReversion);
                push_closes(exits, id, intent_reason, ctx.portfolio);
                state.exit(Some(reason));
                self.transitions.push(transition(
                    ctx,
                    id,
                    (from, PairPhase::Flat),
                    reason,
                    zscore,
                    hedge_ratio,
                ));
            }
            return None;
        }

        if settled || state.pending_exit().is_some() {
            return None;
        }
        let (zscore, hedge_ratio) = (zscore?, hedge_ratio?);
        entry_direction(zscore, config.entry_z).map(|phase| EntrySignal {
            phase,
            zscore,
            hedge_ratio,
        })
    }

    /// Apply entry guards and sizing; `Ok(None)` while entries are locked.
    fn try_enter(
        &mut self,
        id: &PairId,
        signal: EntrySignal,
        price_a: f64,
        ctx: &TickContext<'_>,
    ) -> Result<Option<Vec<OrderIntent>>, PairsError> {
        if self.entry_lock {
            debug!(tick = ctx.tick, pair = %id, "entry suppressed by drawdown lock");
            return Ok(None);
        }

        let open = self.entered_count();
        if open >= self.config.max_positions {
            return Err(PairsError::PositionCapExceeded {
                pair: id.clone(),
                open,
                max: self.config.max_positions,
            });
        }

        for symbol in [&id.a, &id.b] {
            let claimed = self.pairs.iter().any(|(other, s)| {
                other != id && other.contains(symbol) && (s.is_entered() || s.pending_exit().is_some())
            });
            if claimed || ctx.portfolio.has_position(symbol) {
                return Err(PairsError::LegInUse {
                    pair: id.clone(),
                    symbol: symbol.clone(),
                });
            }
        }

        let equity = ctx.portfolio.equity;
        let cap = self.config.hedge_ratio_cap;
        let units_a = self.config.position_size * equity / price_a;
        let units_b = signal.hedge_ratio.clamp(-cap, cap) * units_a;
        if !(units_a.is_finite() && units_a > 0.0 && units_b.is_finite()) {
            return Err(PairsError::NonFiniteSize { pair: id.clone() });
        }
        let (quantity_a, quantity_b, reason) = match signal.phase {
            PairPhase::EnteredLongSpread => (units_a, -units_b, IntentReason::EntryLongSpread),
            _ => (-units_a, units_b, IntentReason::EntryShortSpread),
        };

        let Some(state) = self.pairs.get_mut(id) else {
            return Ok(None);
        };
        state.enter(
            signal.phase,
            Entry {
                tick: ctx.tick,
                timestamp: ctx.timestamp,
                zscore: signal.zscore,
                hedge_ratio: signal.hedge_ratio,
                quantity_a,
                quantity_b,
                peak_equity: equity,
                reconciled: false,
            },
        );
        self.transitions.push(transition(
            ctx,
            id,
            (PairPhase::Flat, signal.phase),
            TransitionReason::Entry,
            Some(signal.zscore),
            Some(signal.hedge_ratio),
        ));

        let source = id.to_string();
        Ok(Some(vec![
            OrderIntent::target_quantity(id.a.as_str(), quantity_a, reason).with_source(source.as_str()),
            OrderIntent::target_quantity(id.b.as_str(), quantity_b, reason).with_source(source),
        ]))
    }
}

/// Close both legs, selling the long leg first so its proceeds cover the
/// buy-to-cover of the short leg.
fn push_closes(
    exits: &mut Vec<OrderIntent>,
    id: &PairId,
    reason: IntentReason,
    portfolio: &PortfolioSnapshot,
) {
    let source = id.to_string();
    let (first, second) = if portfolio.quantity(&id.b) > portfolio.quantity(&id.a) {
        (&id.b, &id.a)
    } else {
        (&id.a, &id.b)
    };
    exits.push(OrderIntent::close(first.as_str(), reason).with_source(source.as_str()));
    exits.push(OrderIntent::close(second.as_str(), reason).with_source(source));
}

/// Build a transition record and log it.
fn transition(
    ctx: &TickContext<'_>,
    pair: &PairId,
    (from, to): (PairPhase, PairPhase),
    reason: TransitionReason,
    zscore: Option<f64>,
    hedge_ratio: Option<f64>,
) -> PairTransition {
    info!(tick = ctx.tick, pair = %pair, %from, %to, ?reason, z = ?zscore, "pair transition");
    PairTransition {
        tick: ctx.tick,
        timestamp: ctx.timestamp,
        pair: pair.clone(),
        from,
        to,
        reason,
        zscore,
        hedge_ratio,
    }
}

impl Strategy for PairsStrategy {
    fn name(&self) -> &str {
        "pairs"
    }

    fn decide(&mut self, ctx: &TickContext<'_>) -> Result<Decision, StrategyError> {
        if !self.symbols_checked {
            self.check_symbols(&ctx.market)?;
            self.symbols_checked = true;
        }

        self.track_drawdown(ctx.portfolio.equity);
        let rebalance = if self.should_screen(ctx) {
            Some(self.screen(ctx))
        } else {
            None
        };

        let mut exits = Vec::new();
        let mut entries = Vec::new();
        for id in self.order.clone() {
            let (Some(bar_a), Some(bar_b)) = (ctx.market.current(&id.a), ctx.market.current(&id.b))
            else {
                continue;
            };
            let Some(signal) = self.step_pair(&id, bar_a.close, bar_b.close, ctx, &mut exits) else {
                continue;
            };
            match self.try_enter(&id, signal, bar_a.close, ctx) {
                Ok(Some(legs)) => entries.extend(legs),
                Ok(None) => {}
                Err(err) => warn!(tick = ctx.tick, error = %err, "entry skipped"),
            }
        }

        // Short legs first so their proceeds fund the long legs.
        let (shorts, longs): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|intent| matches!(intent.target, OrderTarget::Quantity(q) if q < 0.0));
        let intents = exits.into_iter().chain(shorts).chain(longs).collect();
        Ok(Decision { intents, rebalance })
    }
}
