//! Market data feed — validated, read-only bar series on a shared calendar.
//!
//! The calendar is the sorted union of every instrument's timestamps. Tick `t`
//! is one calendar entry; an instrument with no bar at that timestamp simply
//! has no update on that tick (no forward-filled bar is fabricated).
//!
//! Visibility is precomputed once: `visible[symbol][t]` is the number of bars
//! of `symbol` with timestamp <= `calendar[t]`. A [`MarketView`] for tick `t`
//! only ever slices that prefix, so strategies cannot observe future bars.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::domain::Bar;

/// Fatal data errors. Any of these aborts a run before the first tick.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("feed contains no bars")]
    EmptyFeed,

    #[error(
        "non-monotonic timestamp for '{symbol}' at index {index}: {current} does not follow {previous}"
    )]
    NonMonotonicTimestamp {
        symbol: String,
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("malformed bar for '{symbol}' at index {index} ({timestamp}): {reason}")]
    MalformedBar {
        symbol: String,
        index: usize,
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("bar at index {index} of series '{series}' is labelled '{found}'")]
    SymbolMismatch {
        series: String,
        index: usize,
        found: String,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unparseable timestamp '{0}'")]
    Timestamp(String),
}

/// Ordered, time-indexed bars per instrument.
#[derive(Debug, Clone)]
pub struct MarketDataFeed {
    series: BTreeMap<String, Vec<Bar>>,
    calendar: Vec<DateTime<Utc>>,
    visible: BTreeMap<String, Vec<usize>>,
}

impl MarketDataFeed {
    /// Validate and index per-instrument bar series.
    pub fn new(series: BTreeMap<String, Vec<Bar>>) -> Result<Self, DataError> {
        for (symbol, bars) in &series {
            validate_series(symbol, bars)?;
        }

        let calendar: Vec<DateTime<Utc>> = series
            .values()
            .flat_map(|bars| bars.iter().map(|b| b.timestamp))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if calendar.is_empty() {
            return Err(DataError::EmptyFeed);
        }

        let visible = series
            .iter()
            .map(|(symbol, bars)| {
                let mut counts = Vec::with_capacity(calendar.len());
                let mut seen = 0;
                for ts in &calendar {
                    while seen < bars.len() && bars[seen].timestamp <= *ts {
                        seen += 1;
                    }
                    counts.push(seen);
                }
                (symbol.clone(), counts)
            })
            .collect();

        Ok(Self {
            series,
            calendar,
            visible,
        })
    }

    /// Build a feed from a flat list of bars, grouping by symbol in input order.
    pub fn from_bars(bars: impl IntoIterator<Item = Bar>) -> Result<Self, DataError> {
        let mut series: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        for bar in bars {
            series.entry(bar.symbol.clone()).or_default().push(bar);
        }
        Self::new(series)
    }

    pub fn len(&self) -> usize {
        self.calendar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty()
    }

    pub fn calendar(&self) -> &[DateTime<Utc>] {
        &self.calendar
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    /// Full series for one instrument. For post-run analysis only.
    pub fn series(&self, symbol: &str) -> Option<&[Bar]> {
        self.series.get(symbol).map(Vec::as_slice)
    }

    /// Point-in-time view at `tick`. Returns `None` past the end of the calendar.
    pub fn view(&self, tick: usize) -> Option<MarketView<'_>> {
        (tick < self.calendar.len()).then_some(MarketView { feed: self, tick })
    }
}

fn validate_series(symbol: &str, bars: &[Bar]) -> Result<(), DataError> {
    for (index, bar) in bars.iter().enumerate() {
        if bar.symbol != symbol {
            return Err(DataError::SymbolMismatch {
                series: symbol.to_string(),
                index,
                found: bar.symbol.clone(),
            });
        }
        if let Some(reason) = bar.defect() {
            return Err(DataError::MalformedBar {
                symbol: symbol.to_string(),
                index,
                timestamp: bar.timestamp,
                reason: reason.to_string(),
            });
        }
        if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
            return Err(DataError::NonMonotonicTimestamp {
                symbol: symbol.to_string(),
                index,
                previous: bars[index - 1].timestamp,
                current: bar.timestamp,
            });
        }
    }
    Ok(())
}

// ─── Point-in-time view ──────────────────────────────────────────────

/// Immutable market view at one tick. Exposes nothing after `timestamp()`.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    feed: &'a MarketDataFeed,
    tick: usize,
}

impl<'a> MarketView<'a> {
    pub fn tick(&self) -> usize {
        self.tick
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.feed.calendar[self.tick]
    }

    pub fn symbols(&self) -> impl Iterator<Item = &'a str> {
        self.feed.symbols()
    }

    /// All bars visible for `symbol` up to and including this tick.
    pub fn history(&self, symbol: &str) -> &'a [Bar] {
        match (self.feed.series.get(symbol), self.feed.visible.get(symbol)) {
            (Some(bars), Some(counts)) => &bars[..counts[self.tick]],
            _ => &[],
        }
    }

    /// Most recent bar at or before this tick.
    pub fn latest(&self, symbol: &str) -> Option<&'a Bar> {
        self.history(symbol).last()
    }

    /// The bar for `symbol` stamped exactly at this tick, if it updated.
    pub fn current(&self, symbol: &str) -> Option<&'a Bar> {
        self.latest(symbol)
            .filter(|bar| bar.timestamp == self.timestamp())
    }

    /// Bars that updated on this tick, in symbol order.
    pub fn updated(&self) -> impl Iterator<Item = &'a Bar> {
        let view = *self;
        self.feed
            .series
            .keys()
            .filter_map(move |symbol| view.current(symbol))
    }

    /// Up to the last `n` close pairs at timestamps where both instruments
    /// have bars, oldest first.
    pub fn aligned_closes(&self, a: &str, b: &str, n: usize) -> (Vec<f64>, Vec<f64>) {
        let (ha, hb) = (self.history(a), self.history(b));
        let (mut i, mut j) = (ha.len(), hb.len());
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        while i > 0 && j > 0 && xs.len() < n {
            let (ba, bb) = (&ha[i - 1], &hb[j - 1]);
            match ba.timestamp.cmp(&bb.timestamp) {
                std::cmp::Ordering::Equal => {
                    xs.push(ba.close);
                    ys.push(bb.close);
                    i -= 1;
                    j -= 1;
                }
                std::cmp::Ordering::Greater => i -= 1,
                std::cmp::Ordering::Less => j -= 1,
            }
        }
        xs.reverse();
        ys.reverse();
        (xs, ys)
    }

    /// Number of aligned observations available for a pair.
    pub fn aligned_len(&self, a: &str, b: &str) -> usize {
        self.aligned_closes(a, b, usize::MAX).0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 21, 0, 0).unwrap() + Duration::days(i)
    }

    fn bar(symbol: &str, i: i64, close: f64) -> Bar {
        Bar {
            symbol: symbol.into(),
            timestamp: day(i),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    fn feed() -> MarketDataFeed {
        let mut series = BTreeMap::new();
        series.insert(
            "A".to_string(),
            vec![bar("A", 0, 10.0), bar("A", 1, 11.0), bar("A", 3, 13.0)],
        );
        series.insert(
            "B".to_string(),
            vec![bar("B", 1, 20.0), bar("B", 2, 21.0), bar("B", 3, 22.0)],
        );
        MarketDataFeed::new(series).unwrap()
    }

    #[test]
    fn calendar_is_sorted_union() {
        let f = feed();
        assert_eq!(f.calendar(), &[day(0), day(1), day(2), day(3)]);
    }

    #[test]
    fn missing_bar_is_no_update() {
        let f = feed();
        let v = f.view(2).unwrap();
        assert!(v.current("A").is_none());
        assert_eq!(v.latest("A").unwrap().close, 11.0);
        assert_eq!(v.current("B").unwrap().close, 21.0);
        assert_eq!(v.updated().count(), 1);
    }

    #[test]
    fn history_never_extends_past_tick() {
        let f = feed();
        let v = f.view(1).unwrap();
        assert_eq!(v.history("A").len(), 2);
        assert_eq!(v.history("B").len(), 1);
        assert!(v.history("A").iter().all(|b| b.timestamp <= v.timestamp()));
    }

    #[test]
    fn aligned_closes_skip_unshared_timestamps() {
        let f = feed();
        let v = f.view(3).unwrap();
        let (a, b) = v.aligned_closes("A", "B", 10);
        assert_eq!(a, vec![11.0, 13.0]);
        assert_eq!(b, vec![20.0, 22.0]);
        let (a, _) = v.aligned_closes("A", "B", 1);
        assert_eq!(a, vec![13.0]);
    }

    #[test]
    fn rejects_non_monotonic_series() {
        let mut series = BTreeMap::new();
        series.insert("A".to_string(), vec![bar("A", 1, 10.0), bar("A", 1, 11.0)]);
        let err = MarketDataFeed::new(series).unwrap_err();
        match err {
            DataError::NonMonotonicTimestamp { symbol, index, .. } => {
                assert_eq!(symbol, "A");
                assert_eq!(index, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_malformed_bar() {
        let mut bad = bar("A", 0, 10.0);
        bad.high = 5.0;
        let err = MarketDataFeed::from_bars(vec![bad]).unwrap_err();
        assert!(matches!(err, DataError::MalformedBar { index: 0, .. }));
    }

    #[test]
    fn rejects_empty_feed() {
        assert!(matches!(
            MarketDataFeed::new(BTreeMap::new()),
            Err(DataError::EmptyFeed)
        ));
    }

    #[test]
    fn view_out_of_range_is_none() {
        assert!(feed().view(4).is_none());
    }
}
