//! Round-trip trade extraction from TRADE events.
//!
//! Net position is tracked per instrument. A round trip opens when the
//! position leaves zero and closes when it returns to zero. A fill that
//! flips the sign closes the current trip and opens the next one with the
//! remainder; its commission is split pro rata.
//!
//! Per-instrument trips are then grouped into [`PairTrade`]s: every leg
//! opened by the same source on the same tick is one trade, so a pairs
//! entry counts once and wins or loses on its combined P&L.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use pairlab_core::domain::{Fill, OrderId, QTY_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Long,
    Short,
}

/// One closed (or still open at end of run) round trip on a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_tick: usize,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_tick: Option<usize>,
    pub exit_timestamp: Option<DateTime<Utc>>,
    /// Largest absolute size held during the trip.
    pub max_quantity: f64,
    /// Sum of cash flows from fills, before commission.
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
    /// Source tag (pair id) of the opening order, when known.
    pub source: Option<String>,
}

impl RoundTrip {
    pub fn is_closed(&self) -> bool {
        self.exit_tick.is_some()
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }

    pub fn ticks_held(&self) -> Option<usize> {
        self.exit_tick.map(|exit| exit - self.entry_tick)
    }
}

#[derive(Debug)]
struct OpenTrip {
    trip: RoundTrip,
    quantity: f64,
    last_price: f64,
}

impl OpenTrip {
    fn open(fill: &Fill, quantity: f64, commission: f64, source: Option<String>) -> Self {
        let direction = if quantity > 0.0 {
            TradeDirection::Long
        } else {
            TradeDirection::Short
        };
        Self {
            trip: RoundTrip {
                symbol: fill.symbol.clone(),
                direction,
                entry_tick: fill.tick,
                entry_timestamp: fill.timestamp,
                exit_tick: None,
                exit_timestamp: None,
                max_quantity: quantity.abs(),
                gross_pnl: -quantity * fill.price,
                commission,
                net_pnl: 0.0,
                source,
            },
            quantity,
            last_price: fill.price,
        }
    }

    fn add(&mut self, fill: &Fill, quantity: f64, commission: f64) {
        self.quantity += quantity;
        self.trip.gross_pnl -= quantity * fill.price;
        self.trip.commission += commission;
        self.last_price = fill.price;
        self.trip.max_quantity = self.trip.max_quantity.max(self.quantity.abs());
    }

    fn finish(mut self, exit: Option<&Fill>, mark: Option<f64>) -> RoundTrip {
        if let Some(fill) = exit {
            self.trip.exit_tick = Some(fill.tick);
            self.trip.exit_timestamp = Some(fill.timestamp);
        } else {
            // still open: value the remainder at the last mark
            self.trip.gross_pnl += self.quantity * mark.unwrap_or(self.last_price);
        }
        self.trip.net_pnl = self.trip.gross_pnl - self.trip.commission;
        self.trip
    }
}

/// Extract round trips from fills in log order.
///
/// `sources` maps order ids to the ORDER source tag; `marks` gives the last
/// close per symbol for valuing trips still open at the end.
pub fn extract_round_trips(
    fills: &[&Fill],
    sources: &BTreeMap<OrderId, String>,
    marks: &BTreeMap<String, f64>,
) -> Vec<RoundTrip> {
    let mut open: BTreeMap<String, OpenTrip> = BTreeMap::new();
    let mut closed = Vec::new();

    for fill in fills {
        let source = sources.get(&fill.order_id).cloned();
        let qty = fill.quantity;
        let Some(mut current) = open.remove(&fill.symbol) else {
            open.insert(
                fill.symbol.clone(),
                OpenTrip::open(fill, qty, fill.commission, source),
            );
            continue;
        };

        let after = current.quantity + qty;
        let scale_in = current.quantity.signum() == qty.signum();
        let partial_close =
            after.abs() >= QTY_EPSILON && after.signum() == current.quantity.signum();
        if scale_in || partial_close {
            current.add(fill, qty, fill.commission);
            open.insert(fill.symbol.clone(), current);
            continue;
        }

        // closes the trip, possibly flipping through zero
        let closing = -current.quantity;
        let share = (closing / qty).abs().min(1.0);
        current.add(fill, closing, fill.commission * share);
        closed.push(current.finish(Some(fill), None));

        let remainder = qty - closing;
        if remainder.abs() >= QTY_EPSILON {
            open.insert(
                fill.symbol.clone(),
                OpenTrip::open(fill, remainder, fill.commission * (1.0 - share), source),
            );
        }
    }

    closed.extend(
        open.into_values()
            .map(|trip| {
                let mark = marks.get(&trip.trip.symbol).copied();
                trip.finish(None, mark)
            }),
    );
    closed.sort_by_key(|t| (t.entry_tick, t.symbol.clone()));
    closed
}

/// Legs opened together by one source on one tick, such as the two legs
/// of a pair entry. A trip without a source is a single-leg trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    /// Pair id, or the symbol for a trip without a source.
    pub source: String,
    pub entry_tick: usize,
    pub entry_timestamp: DateTime<Utc>,
    /// Last leg's exit; `None` while any leg is open.
    pub exit_tick: Option<usize>,
    pub exit_timestamp: Option<DateTime<Utc>>,
    /// Symbols of the legs, in symbol order.
    pub legs: Vec<String>,
    pub gross_pnl: f64,
    pub commission: f64,
    pub net_pnl: f64,
}

impl PairTrade {
    pub fn is_closed(&self) -> bool {
        self.exit_tick.is_some()
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}

/// Group round trips by `(source, entry tick)`, ordered by entry tick.
pub fn group_pair_trades(trips: &[RoundTrip]) -> Vec<PairTrade> {
    let mut groups: BTreeMap<(usize, String), Vec<&RoundTrip>> = BTreeMap::new();
    for trip in trips {
        let source = trip.source.clone().unwrap_or_else(|| trip.symbol.clone());
        groups.entry((trip.entry_tick, source)).or_default().push(trip);
    }

    groups
        .into_iter()
        .map(|((entry_tick, source), mut legs)| {
            legs.sort_by(|x, y| x.symbol.cmp(&y.symbol));
            let all_closed = legs.iter().all(|t| t.is_closed());
            let last_exit = legs
                .iter()
                .filter_map(|t| t.exit_tick.zip(t.exit_timestamp))
                .max_by_key(|(tick, _)| *tick);
            let (exit_tick, exit_timestamp) = match last_exit {
                Some((tick, ts)) if all_closed => (Some(tick), Some(ts)),
                _ => (None, None),
            };
            PairTrade {
                source,
                entry_tick,
                entry_timestamp: legs[0].entry_timestamp,
                exit_tick,
                exit_timestamp,
                legs: legs.iter().map(|t| t.symbol.clone()).collect(),
                gross_pnl: legs.iter().map(|t| t.gross_pnl).sum(),
                commission: legs.iter().map(|t| t.commission).sum(),
                net_pnl: legs.iter().map(|t| t.net_pnl).sum(),
            }
        })
        .collect()
}
