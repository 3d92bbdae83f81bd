//! Cost model — slippage and commission calculation.
//!
//! Slippage is directional: buyers pay more, sellers receive less.
//! Commission is `|quantity| × fill price × commission_rate`.

use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Fractional adverse price move per fill.
    pub slippage_rate: f64,
    /// Fraction of traded notional charged per fill.
    pub commission_rate: f64,
}

impl CostModel {
    pub fn new(commission_rate: f64, slippage_rate: f64) -> Self {
        Self {
            slippage_rate,
            commission_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Apply slippage to a raw close.
    ///
    /// Returns `(slipped_price, slippage_cost)` where the cost is always >= 0.
    pub fn apply_slippage(&self, close: f64, side: Side, quantity: f64) -> (f64, f64) {
        if self.slippage_rate == 0.0 {
            return (close, 0.0);
        }
        let qty = quantity.abs();
        match side {
            Side::Buy => {
                let slipped = close * (1.0 + self.slippage_rate);
                (slipped, (slipped - close) * qty)
            }
            Side::Sell => {
                let slipped = close * (1.0 - self.slippage_rate);
                (slipped, (close - slipped) * qty)
            }
        }
    }

    pub fn commission(&self, fill_price: f64, quantity: f64) -> f64 {
        quantity.abs() * fill_price * self.commission_rate
    }
}
