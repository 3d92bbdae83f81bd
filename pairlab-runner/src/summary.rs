//! Run summary — reduces an EventLog to an equity curve, round trips and metrics.
//!
//! Everything here is derived from the log alone, so a summary can be
//! rebuilt from a persisted `events.jsonl` without re-running the engine.
//!
//! Fills land at the close of their tick, so the only gap between the
//! starting capital and the first snapshot is the commission and slippage
//! paid on that tick. [`RunSummary::initial_equity`] adds them back, and
//! returns are measured from there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pairlab_core::domain::{Fill, OrderId, OrderStatus, PortfolioSnapshot};
use pairlab_core::engine::{EventLog, EventRecord};

use crate::metrics::PerformanceMetrics;
use crate::trades::{extract_round_trips, group_pair_trades, PairTrade, RoundTrip};

/// One point of the end-of-tick snapshot history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub position_value: f64,
    pub gross_exposure: f64,
    pub equity: f64,
}

impl From<&PortfolioSnapshot> for EquityPoint {
    fn from(snap: &PortfolioSnapshot) -> Self {
        Self {
            tick: snap.tick,
            timestamp: snap.timestamp,
            cash: snap.cash,
            position_value: snap.position_value(),
            gross_exposure: snap.gross_exposure(),
            equity: snap.equity,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCounts {
    pub filled: usize,
    pub no_op: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// False for the partial log of an aborted run.
    pub complete: bool,
    pub ticks: usize,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Equity before the first fill.
    pub initial_equity: f64,
    pub final_equity: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub final_snapshot: Option<PortfolioSnapshot>,
    /// Per-instrument round trips.
    pub trades: Vec<RoundTrip>,
    /// Round trips grouped by entry; the unit of the trade statistics.
    pub pair_trades: Vec<PairTrade>,
    pub orders: OrderCounts,
    pub rebalances: usize,
    pub metrics: PerformanceMetrics,
}

impl RunSummary {
    pub fn from_event_log(log: &EventLog, periods_per_year: f64) -> Self {
        let equity_curve: Vec<EquityPoint> = log.snapshots().map(EquityPoint::from).collect();
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();

        let mut orders = OrderCounts::default();
        let mut sources: BTreeMap<OrderId, String> = BTreeMap::new();
        for order in log.orders() {
            match order.status {
                OrderStatus::Filled => orders.filled += 1,
                OrderStatus::NoOp => orders.no_op += 1,
                OrderStatus::Rejected => orders.rejected += 1,
            }
            if let Some(source) = &order.source {
                sources.insert(order.order_id, source.clone());
            }
        }

        let mut marks: BTreeMap<String, f64> = BTreeMap::new();
        for record in log.records() {
            if let EventRecord::Next { bars, .. } = record {
                for bar in bars {
                    marks.insert(bar.symbol.clone(), bar.close);
                }
            }
        }

        let fills: Vec<&Fill> = log.fills().collect();
        let total_commission = fills.iter().map(|f| f.commission).sum();
        let trades = extract_round_trips(&fills, &sources, &marks);
        let pair_trades = group_pair_trades(&trades);

        let initial_equity = match equity_curve.first() {
            Some(first) => {
                first.equity
                    + fills
                        .iter()
                        .filter(|f| f.tick == first.tick)
                        .map(|f| f.commission + f.slippage)
                        .sum::<f64>()
            }
            None => 0.0,
        };
        let mut curve = Vec::with_capacity(equity.len() + 1);
        if !equity.is_empty() {
            curve.push(initial_equity);
        }
        curve.extend_from_slice(&equity);
        let metrics =
            PerformanceMetrics::compute(&curve, &pair_trades, periods_per_year, total_commission);

        Self {
            complete: log.is_complete(),
            ticks: equity_curve.len(),
            start: equity_curve.first().map(|p| p.timestamp),
            end: equity_curve.last().map(|p| p.timestamp),
            initial_equity,
            final_equity: equity.last().copied().unwrap_or(0.0),
            final_snapshot: log.snapshots().last().cloned(),
            equity_curve,
            trades,
            pair_trades,
            orders,
            rebalances: log.rebalances().count(),
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DAILY_PERIODS;
    use pairlab_core::data::{CointegratedPair, MarketDataFeed};
    use pairlab_core::domain::{IntentReason, OrderIntent};
    use pairlab_core::engine::{run, EngineConfig};
    use pairlab_core::strategy::{Decision, Strategy, StrategyError, TickContext};

    #[test]
    fn empty_log_summarizes_to_zeroes() {
        let summary = RunSummary::from_event_log(&EventLog::new(), DAILY_PERIODS);
        assert!(!summary.complete);
        assert_eq!(summary.ticks, 0);
        assert!(summary.trades.is_empty());
        assert_eq!(summary.final_equity, 0.0);
        assert_eq!(summary.metrics.trade_count, 0);
    }

    // ── Starting capital ──

    /// Buys once on the first tick and holds.
    struct BuyFirstTick;

    impl Strategy for BuyFirstTick {
        fn name(&self) -> &str {
            "buy-first-tick"
        }

        fn decide(&mut self, ctx: &TickContext<'_>) -> Result<Decision, StrategyError> {
            if ctx.tick > 0 {
                return Ok(Decision::none());
            }
            Ok(Decision::with_intents(vec![OrderIntent::target_quantity(
                "AAA",
                100.0,
                IntentReason::Rebalance,
            )]))
        }
    }

    #[test]
    fn first_tick_costs_count_against_returns() {
        let (a, b) = CointegratedPair {
            ticks: 20,
            ..Default::default()
        }
        .generate();
        let feed = MarketDataFeed::from_bars(a.into_iter().chain(b)).unwrap();
        let config = EngineConfig::new(100_000.0).with_costs(0.001, 0.001);
        let log = run(&feed, &mut BuyFirstTick, &config).unwrap();
        let summary = RunSummary::from_event_log(&log, DAILY_PERIODS);

        let first = &summary.equity_curve[0];
        assert!(first.equity < 100_000.0);
        assert!((summary.initial_equity - 100_000.0).abs() < 1e-6);
        let expected = (summary.final_equity - 100_000.0) / 100_000.0;
        assert!((summary.metrics.total_return - expected).abs() < 1e-12);
    }
}
