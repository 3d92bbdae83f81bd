use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential order ID, unique within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Monotonic order ID generator owned by the engine.
#[derive(Debug, Default)]
pub struct IdGen {
    next_order: u64,
}

impl IdGen {
    pub fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(self.next_order)
    }
}

/// Identity of a tracked pair: instrument A is regressed on instrument B.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairId {
    pub a: String,
    pub b: String,
}

impl PairId {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// True if `symbol` is either leg of the pair.
    pub fn contains(&self, symbol: &str) -> bool {
        self.a == symbol || self.b == symbol
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.a, self.b)
    }
}
