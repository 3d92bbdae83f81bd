//! Tick-by-tick simulation loop — the heart of the engine.
//!
//! Per tick, strictly in this order:
//! 1. Mark: record the closes of every instrument that updated
//! 2. NEXT: log the tick and its bars
//! 3. Decide: the strategy sees the market view and the marked snapshot
//! 4. Fill: each intent is resolved against its bar and logged as ORDER (+ TRADE)
//! 5. PORTFOLIO: log the end-of-tick snapshot
//!
//! Ticks never overlap and the strategy never sees past the current tick.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::config::{ConfigError, EngineConfig};
use super::event_log::{EventLog, EventRecord, OrderRecord};
use super::fill_engine::{FillEngine, FillError};
use super::ledger::PortfolioLedger;
use crate::data::{DataError, MarketDataFeed};
use crate::domain::{Bar, IdGen, OrderIntent, OrderStatus};
use crate::strategy::{Strategy, StrategyError, TickContext};

/// Run-aborting errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("strategy '{strategy}' failed at tick {tick} ({timestamp}): {reason}")]
    Strategy {
        strategy: String,
        tick: usize,
        timestamp: DateTime<Utc>,
        reason: String,
    },
}

/// An aborted run: the error plus whatever was logged before it, marked incomplete.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: EngineError,
    pub partial_log: EventLog,
}

impl RunFailure {
    fn before_start(error: impl Into<EngineError>) -> Self {
        Self {
            error: error.into(),
            partial_log: EventLog::new(),
        }
    }
}

/// Validate raw series, then run. Data errors abort before any tick.
pub fn run_series(
    series: BTreeMap<String, Vec<Bar>>,
    strategy: &mut dyn Strategy,
    config: &EngineConfig,
) -> Result<EventLog, RunFailure> {
    let feed = MarketDataFeed::new(series).map_err(RunFailure::before_start)?;
    run(&feed, strategy, config)
}

/// Replay `feed` through `strategy` and return the complete event log.
pub fn run(
    feed: &MarketDataFeed,
    strategy: &mut dyn Strategy,
    config: &EngineConfig,
) -> Result<EventLog, RunFailure> {
    config.validate().map_err(RunFailure::before_start)?;

    let fill_engine = FillEngine::new(config);
    let mut ledger = PortfolioLedger::new(config.initial_cash);
    let mut ids = IdGen::default();
    let mut log = EventLog::new();

    info!(
        strategy = strategy.name(),
        ticks = feed.len(),
        initial_cash = config.initial_cash,
        "run started"
    );

    for tick in 0..feed.len() {
        let Some(market) = feed.view(tick) else {
            break;
        };
        let timestamp = market.timestamp();

        // ─── Mark ────────────────────────────────────────────────────
        let bars: Vec<Bar> = market.updated().cloned().collect();
        ledger.mark_to_market(bars.iter());
        log.push(EventRecord::Next {
            tick,
            timestamp,
            bars,
        });

        // ─── Decide ──────────────────────────────────────────────────
        let marked = ledger.snapshot(tick, timestamp);
        let ctx = TickContext {
            tick,
            timestamp,
            market,
            portfolio: &marked,
        };
        let decision = match strategy.decide(&ctx) {
            Ok(decision) => decision,
            Err(StrategyError::Fatal(reason)) => {
                warn!(tick, %timestamp, reason = reason.as_str(), "strategy aborted the run");
                return Err(RunFailure {
                    error: EngineError::Strategy {
                        strategy: strategy.name().to_string(),
                        tick,
                        timestamp,
                        reason,
                    },
                    partial_log: log,
                });
            }
            // per-instrument failures are the strategy's to absorb
            Err(err @ StrategyError::Domain { .. }) => {
                warn!(tick, error = %err, "strategy domain error, no action this tick");
                Default::default()
            }
        };

        if let Some(detail) = decision.rebalance {
            log.push(EventRecord::Rebalance {
                tick,
                timestamp,
                strategy: strategy.name().to_string(),
                detail,
            });
        }

        // ─── Fill ────────────────────────────────────────────────────
        for intent in &decision.intents {
            let order_id = ids.next_order_id();
            let outcome = match market.current(&intent.symbol) {
                Some(bar) => fill_engine
                    .resolve_delta(intent, bar, &ledger)
                    .and_then(|delta| {
                        fill_engine
                            .execute(order_id, delta, bar, tick, &mut ledger)
                            .map(|fill| (delta, fill))
                    }),
                None => Err(FillError::MarketClosed {
                    symbol: intent.symbol.clone(),
                }),
            };

            let base = |delta, status, reject_reason| OrderRecord {
                order_id,
                tick,
                timestamp,
                symbol: intent.symbol.clone(),
                target: intent.target,
                reason: intent.reason,
                source: intent.source.clone(),
                delta,
                status,
                reject_reason,
            };
            match outcome {
                Ok((delta, Some(fill))) => {
                    debug!(tick, %order_id, symbol = %fill.symbol, qty = fill.quantity, price = fill.price, "filled");
                    log.push(EventRecord::Order(base(Some(delta), OrderStatus::Filled, None)));
                    log.push(EventRecord::Trade(fill));
                }
                Ok((_, None)) => {
                    log.push(EventRecord::Order(base(Some(0.0), OrderStatus::NoOp, None)));
                }
                Err(err) => {
                    warn!(tick, %order_id, symbol = %intent.symbol, error = %err, "order rejected");
                    let delta = rejected_delta(&fill_engine, intent, &market, &ledger);
                    log.push(EventRecord::Order(base(
                        delta,
                        OrderStatus::Rejected,
                        Some(err.to_string()),
                    )));
                }
            }
        }

        // ─── Snapshot ────────────────────────────────────────────────
        log.push(EventRecord::Portfolio(ledger.snapshot(tick, timestamp)));
    }

    log.mark_complete();
    info!(
        strategy = strategy.name(),
        records = log.len(),
        final_equity = ledger.equity(),
        "run complete"
    );
    Ok(log)
}

/// Delta an intent would have had, for the ORDER record of a rejection.
/// The ledger is unchanged by a rejected fill, so this is well defined.
fn rejected_delta(
    fill_engine: &FillEngine,
    intent: &OrderIntent,
    market: &crate::data::MarketView<'_>,
    ledger: &PortfolioLedger,
) -> Option<f64> {
    market
        .current(&intent.symbol)
        .and_then(|bar| fill_engine.resolve_delta(intent, bar, ledger).ok())
        .filter(|d| d.is_finite())
}
