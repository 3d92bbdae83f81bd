//! Position — a signed holding in one instrument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quantities with magnitude below this are treated as flat.
pub const QTY_EPSILON: f64 = 1e-9;

/// Open position. Negative quantity is a short.
///
/// A flat position is never stored: the ledger removes it on close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub entry_tick: usize,
    /// P&L realized by partial closes since this position was opened.
    pub realized_pnl: f64,
}

impl Position {
    pub fn open(
        symbol: impl Into<String>,
        quantity: f64,
        price: f64,
        timestamp: DateTime<Utc>,
        tick: usize,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            avg_entry_price: price,
            entry_timestamp: timestamp,
            entry_tick: tick,
            realized_pnl: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.quantity > QTY_EPSILON
    }

    pub fn is_short(&self) -> bool {
        self.quantity < -QTY_EPSILON
    }

    /// Signed market value at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.avg_entry_price) * self.quantity
    }
}
