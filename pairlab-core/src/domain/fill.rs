//! Fill — an executed trade. Immutable once created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::OrderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub tick: usize,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: f64,
    /// Execution price, slippage included.
    pub price: f64,
    pub commission: f64,
    /// Cost of slippage versus the bar close, always >= 0.
    pub slippage: f64,
}

impl Fill {
    pub fn side(&self) -> Side {
        if self.quantity >= 0.0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// Unsigned traded value at the execution price.
    pub fn notional(&self) -> f64 {
        self.quantity.abs() * self.price
    }

    /// Change to cash caused by this fill.
    pub fn cash_delta(&self) -> f64 {
        -self.quantity * self.price - self.commission
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fill(quantity: f64) -> Fill {
        Fill {
            order_id: OrderId(1),
            tick: 3,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 5, 21, 0, 0).unwrap(),
            symbol: "KO".into(),
            quantity,
            price: 50.0,
            commission: 1.25,
            slippage: 0.0,
        }
    }

    #[test]
    fn buy_consumes_cash() {
        let f = fill(10.0);
        assert_eq!(f.side(), Side::Buy);
        assert_eq!(f.cash_delta(), -501.25);
    }

    #[test]
    fn sell_credits_cash_net_of_commission() {
        let f = fill(-10.0);
        assert_eq!(f.side(), Side::Sell);
        assert_eq!(f.notional(), 500.0);
        assert_eq!(f.cash_delta(), 498.75);
    }
}
