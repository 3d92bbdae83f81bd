use thiserror::Error;

use crate::domain::PairId;

/// Pair-scoped failures. None of these abort a run: each is logged and the
/// affected pair takes no action (or is forced flat) on that tick.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PairsError {
    #[error("numeric instability in {pair}: {reason}")]
    NumericInstability { pair: PairId, reason: String },

    #[error("entry for {pair} rejected: {open} of {max} positions already open")]
    PositionCapExceeded { pair: PairId, open: usize, max: usize },

    #[error("entry for {pair} rejected: leg {symbol} is held by another pair")]
    LegInUse { pair: PairId, symbol: String },

    #[error("entry for {pair} rejected: non-finite or non-positive position size")]
    NonFiniteSize { pair: PairId },
}
