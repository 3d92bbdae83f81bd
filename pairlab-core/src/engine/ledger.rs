//! Portfolio ledger — cash, signed positions, realized P&L.
//!
//! The ledger is owned by the engine. Fills are applied only through
//! [`FillEngine`](super::FillEngine); strategies see [`PortfolioSnapshot`]s.
//!
//! Fill application:
//! - same-sign fill: average into the position
//! - opposite-sign fill: realize P&L on the closed part; the remainder (if the
//!   fill crosses zero) opens a fresh position at the fill price
//! - a position that reaches zero is removed

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::{Bar, Fill, PortfolioSnapshot, Position, QTY_EPSILON};

#[derive(Debug, Clone)]
pub struct PortfolioLedger {
    initial_cash: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    /// Latest close per instrument seen by the engine.
    marks: BTreeMap<String, f64>,
    realized_pnl: f64,
    total_commission: f64,
    total_slippage: f64,
}

impl PortfolioLedger {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            positions: BTreeMap::new(),
            marks: BTreeMap::new(),
            realized_pnl: 0.0,
            total_commission: 0.0,
            total_slippage: 0.0,
        }
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Signed quantity held, zero if flat.
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.positions.get(symbol).map_or(0.0, |p| p.quantity)
    }

    pub fn mark(&self, symbol: &str) -> Option<f64> {
        self.marks.get(symbol).copied()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn total_commission(&self) -> f64 {
        self.total_commission
    }

    pub fn total_slippage(&self) -> f64 {
        self.total_slippage
    }

    /// Mark price for an open position, falling back to its entry price.
    fn mark_or_entry(&self, pos: &Position) -> f64 {
        self.marks
            .get(&pos.symbol)
            .copied()
            .unwrap_or(pos.avg_entry_price)
    }

    pub fn position_value(&self) -> f64 {
        self.positions
            .values()
            .map(|p| p.market_value(self.mark_or_entry(p)))
            .sum()
    }

    /// Total equity: cash + Σ(quantity × latest close).
    pub fn equity(&self) -> f64 {
        self.cash + self.position_value()
    }

    /// Record this tick's closes as marks.
    pub(crate) fn mark_to_market<'a>(&mut self, bars: impl IntoIterator<Item = &'a Bar>) {
        for bar in bars {
            self.marks.insert(bar.symbol.clone(), bar.close);
        }
    }

    /// Fold a fill into cash and position. Callers have already checked cash.
    pub(crate) fn apply_fill(&mut self, fill: &Fill) {
        self.cash += fill.cash_delta();
        self.total_commission += fill.commission;
        self.total_slippage += fill.slippage;

        let Some(pos) = self.positions.get_mut(&fill.symbol) else {
            self.positions.insert(
                fill.symbol.clone(),
                Position::open(
                    fill.symbol.clone(),
                    fill.quantity,
                    fill.price,
                    fill.timestamp,
                    fill.tick,
                ),
            );
            return;
        };

        if pos.quantity.signum() == fill.quantity.signum() {
            let held = pos.quantity.abs();
            let added = fill.quantity.abs();
            pos.avg_entry_price = (pos.avg_entry_price * held + fill.price * added) / (held + added);
            pos.quantity += fill.quantity;
            return;
        }

        let closed = fill.quantity.abs().min(pos.quantity.abs());
        let realized = (fill.price - pos.avg_entry_price) * closed * pos.quantity.signum();
        pos.realized_pnl += realized;
        self.realized_pnl += realized;

        let remaining = pos.quantity + fill.quantity;
        if remaining.abs() < QTY_EPSILON {
            self.positions.remove(&fill.symbol);
        } else if remaining.signum() == pos.quantity.signum() {
            pos.quantity = remaining;
        } else {
            // crossed zero: the remainder is a new position
            *pos = Position::open(
                fill.symbol.clone(),
                remaining,
                fill.price,
                fill.timestamp,
                fill.tick,
            );
        }
    }

    pub fn snapshot(&self, tick: usize, timestamp: DateTime<Utc>) -> PortfolioSnapshot {
        let market_values: BTreeMap<String, f64> = self
            .positions
            .values()
            .map(|p| (p.symbol.clone(), p.market_value(self.mark_or_entry(p))))
            .collect();
        let equity = self.cash + market_values.values().sum::<f64>();
        debug_assert!(
            (equity - self.equity()).abs() <= 1e-6 * equity.abs().max(1.0),
            "equity identity violated"
        );
        PortfolioSnapshot {
            tick,
            timestamp,
            cash: self.cash,
            positions: self.positions.clone(),
            market_values,
            equity,
        }
    }
}
