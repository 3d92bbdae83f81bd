//! Fill engine — resolves order intents into fills against the current bar.
//!
//! Each intent becomes at most one fill for its full delta at the bar close
//! (slippage applied adversely). There are no partial fills. A fill either
//! applies completely to the ledger or is rejected with the ledger untouched.

use thiserror::Error;

use super::config::EngineConfig;
use super::cost_model::CostModel;
use super::ledger::PortfolioLedger;
use crate::domain::{Bar, Fill, OrderId, OrderIntent, OrderTarget, Side, QTY_EPSILON};

/// Recoverable, intent-scoped fill failures. The run continues.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FillError {
    #[error("insufficient cash for {symbol}: requires {required:.2}, available {available:.2}")]
    InsufficientCash {
        symbol: String,
        required: f64,
        available: f64,
    },

    #[error("non-finite order quantity for {symbol}")]
    NonFiniteQuantity { symbol: String },

    #[error("no bar for {symbol} on this tick")]
    MarketClosed { symbol: String },

    #[error("invalid fill price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },
}

#[derive(Debug, Clone)]
pub struct FillEngine {
    costs: CostModel,
    leverage_allowance: f64,
}

impl FillEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            costs: CostModel::new(config.commission_rate, config.slippage_rate),
            leverage_allowance: config.leverage_allowance,
        }
    }

    /// Signed quantity needed to move the current position to the intent's target.
    ///
    /// Percent targets are sized on current equity at the bar close.
    /// Deltas smaller than [`QTY_EPSILON`] resolve to exactly zero.
    pub fn resolve_delta(
        &self,
        intent: &OrderIntent,
        bar: &Bar,
        ledger: &PortfolioLedger,
    ) -> Result<f64, FillError> {
        if !(bar.close.is_finite() && bar.close > 0.0) {
            return Err(FillError::InvalidPrice {
                symbol: intent.symbol.clone(),
                price: bar.close,
            });
        }
        let target = match intent.target {
            OrderTarget::Quantity(q) => q,
            OrderTarget::PercentOfEquity(fraction) => fraction * ledger.equity() / bar.close,
        };
        if !target.is_finite() {
            return Err(FillError::NonFiniteQuantity {
                symbol: intent.symbol.clone(),
            });
        }
        let delta = target - ledger.quantity(&intent.symbol);
        Ok(if delta.abs() < QTY_EPSILON { 0.0 } else { delta })
    }

    /// Resolve and execute one intent. `Ok(None)` means a zero delta (no trade).
    pub fn apply(
        &self,
        order_id: OrderId,
        intent: &OrderIntent,
        bar: &Bar,
        tick: usize,
        ledger: &mut PortfolioLedger,
    ) -> Result<Option<Fill>, FillError> {
        if bar.symbol != intent.symbol {
            return Err(FillError::MarketClosed {
                symbol: intent.symbol.clone(),
            });
        }
        let delta = self.resolve_delta(intent, bar, ledger)?;
        self.execute(order_id, delta, bar, tick, ledger)
    }

    /// Execute a pre-resolved delta at the bar close.
    pub fn execute(
        &self,
        order_id: OrderId,
        delta: f64,
        bar: &Bar,
        tick: usize,
        ledger: &mut PortfolioLedger,
    ) -> Result<Option<Fill>, FillError> {
        if delta == 0.0 {
            return Ok(None);
        }
        if !delta.is_finite() {
            return Err(FillError::NonFiniteQuantity {
                symbol: bar.symbol.clone(),
            });
        }

        let side = if delta > 0.0 { Side::Buy } else { Side::Sell };
        let (price, slippage) = self.costs.apply_slippage(bar.close, side, delta);
        let commission = self.costs.commission(price, delta);
        let fill = Fill {
            order_id,
            tick,
            timestamp: bar.timestamp,
            symbol: bar.symbol.clone(),
            quantity: delta,
            price,
            commission,
            slippage,
        };

        let cash_delta = fill.cash_delta();
        if cash_delta < 0.0 {
            let equity_after = ledger.equity() - commission - slippage;
            let floor = -self.leverage_allowance * equity_after.max(0.0);
            let available = ledger.cash() - floor;
            if -cash_delta > available + 1e-9 {
                return Err(FillError::InsufficientCash {
                    symbol: fill.symbol,
                    required: -cash_delta,
                    available,
                });
            }
        }

        ledger.apply_fill(&fill);
        Ok(Some(fill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IntentReason;
    use chrono::{TimeZone, Utc};

    fn bar(symbol: &str, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    fn marked_ledger(cash: f64, bars: &[Bar]) -> PortfolioLedger {
        let mut ledger = PortfolioLedger::new(cash);
        ledger.mark_to_market(bars.iter());
        ledger
    }

    #[test]
    fn target_quantity_fills_at_close_with_commission() {
        let engine = FillEngine::new(&EngineConfig::new(10_000.0).with_costs(0.001, 0.0));
        let b = bar("KO", 50.0);
        let mut ledger = marked_ledger(10_000.0, &[b.clone()]);
        let intent = OrderIntent::target_quantity("KO", 100.0, IntentReason::Rebalance);
        let fill = engine
            .apply(OrderId(1), &intent, &b, 0, &mut ledger)
            .unwrap()
            .unwrap();
        assert_eq!(fill.price, 50.0);
        assert!((fill.commission - 5.0).abs() < 1e-12);
        assert!((ledger.cash() - (10_000.0 - 5_000.0 - 5.0)).abs() < 1e-9);
    }

    #[test]
    fn percent_target_sizes_on_equity() {
        let engine = FillEngine::new(&EngineConfig::frictionless(10_000.0));
        let b = bar("KO", 50.0);
        let mut ledger = marked_ledger(10_000.0, &[b.clone()]);
        let intent = OrderIntent::target_percent("KO", 0.25, IntentReason::Rebalance);
        let fill = engine
            .apply(OrderId(1), &intent, &b, 0, &mut ledger)
            .unwrap()
            .unwrap();
        assert!((fill.quantity - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_delta_produces_no_fill() {
        let engine = FillEngine::new(&EngineConfig::frictionless(10_000.0));
        let b = bar("KO", 50.0);
        let mut ledger = marked_ledger(10_000.0, &[b.clone()]);
        let intent = OrderIntent::close("KO", IntentReason::ExitMaxHold);
        assert_eq!(engine.apply(OrderId(1), &intent, &b, 0, &mut ledger), Ok(None));
        assert_eq!(ledger.cash(), 10_000.0);
    }

    #[test]
    fn insufficient_cash_leaves_ledger_unchanged() {
        let engine = FillEngine::new(&EngineConfig::new(1_000.0));
        let b = bar("KO", 50.0);
        let mut ledger = marked_ledger(1_000.0, &[b.clone()]);
        let intent = OrderIntent::target_quantity("KO", 100.0, IntentReason::Rebalance);
        let err = engine
            .apply(OrderId(1), &intent, &b, 0, &mut ledger)
            .unwrap_err();
        assert!(matches!(err, FillError::InsufficientCash { ref symbol, .. } if symbol == "KO"));
        assert_eq!(ledger.cash(), 1_000.0);
        assert!(ledger.position("KO").is_none());
    }

    #[test]
    fn leverage_allowance_permits_borrowing() {
        let cfg = EngineConfig::frictionless(1_000.0).with_leverage_allowance(1.0);
        let engine = FillEngine::new(&cfg);
        let b = bar("KO", 10.0);
        let mut ledger = marked_ledger(1_000.0, &[b.clone()]);
        let intent = OrderIntent::target_quantity("KO", 190.0, IntentReason::Rebalance);
        assert!(engine.apply(OrderId(1), &intent, &b, 0, &mut ledger).is_ok());
        assert!((ledger.cash() + 900.0).abs() < 1e-9);
    }

    #[test]
    fn short_sale_needs_no_cash() {
        let engine = FillEngine::new(&EngineConfig::frictionless(100.0));
        let b = bar("PEP", 50.0);
        let mut ledger = marked_ledger(100.0, &[b.clone()]);
        let intent = OrderIntent::target_quantity("PEP", -40.0, IntentReason::EntryLongSpread);
        let fill = engine
            .apply(OrderId(1), &intent, &b, 0, &mut ledger)
            .unwrap()
            .unwrap();
        assert_eq!(fill.side(), Side::Sell);
        assert_eq!(ledger.cash(), 2_100.0);
    }

    #[test]
    fn non_finite_target_rejected() {
        let engine = FillEngine::new(&EngineConfig::frictionless(100.0));
        let b = bar("KO", 50.0);
        let mut ledger = marked_ledger(100.0, &[b.clone()]);
        let intent = OrderIntent::target_quantity("KO", f64::INFINITY, IntentReason::Rebalance);
        assert!(matches!(
            engine.apply(OrderId(1), &intent, &b, 0, &mut ledger),
            Err(FillError::NonFiniteQuantity { .. })
        ));
    }

    #[test]
    fn slippage_is_charged_against_buyer() {
        let engine = FillEngine::new(&EngineConfig::frictionless(10_000.0).with_costs(0.0, 0.01));
        let b = bar("KO", 100.0);
        let mut ledger = marked_ledger(10_000.0, &[b.clone()]);
        let intent = OrderIntent::target_quantity("KO", 10.0, IntentReason::Rebalance);
        let fill = engine
            .apply(OrderId(1), &intent, &b, 0, &mut ledger)
            .unwrap()
            .unwrap();
        assert!((fill.price - 101.0).abs() < 1e-9);
        assert!((fill.slippage - 10.0).abs() < 1e-9);
        // equity loses exactly the slippage cost
        assert!((ledger.equity() - 9_990.0).abs() < 1e-9);
    }
}
