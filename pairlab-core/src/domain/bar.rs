//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument at a single timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is non-finite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: finite prices, high >= low, positive close.
    pub fn is_sane(&self) -> bool {
        self.defect().is_none()
    }

    /// First sanity rule this bar violates, if any.
    pub fn defect(&self) -> Option<&'static str> {
        if self.is_void() {
            return Some("non-finite OHLCV field");
        }
        if self.high < self.low {
            return Some("high below low");
        }
        if self.close <= 0.0 {
            return Some("non-positive close");
        }
        if self.open <= 0.0 {
            return Some("non-positive open");
        }
        if self.volume < 0.0 {
            return Some("negative volume");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> Bar {
        Bar {
            symbol: "KO".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap(),
            open: 60.0,
            high: 61.5,
            low: 59.5,
            close: 61.0,
            volume: 12_000.0,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn bar_detects_void() {
        let mut bar = sample_bar();
        bar.close = f64::NAN;
        assert!(bar.is_void());
        assert_eq!(bar.defect(), Some("non-finite OHLCV field"));
    }

    #[test]
    fn bar_detects_inverted_range() {
        let mut bar = sample_bar();
        bar.high = 59.0;
        assert_eq!(bar.defect(), Some("high below low"));
    }

    #[test]
    fn bar_rejects_zero_close() {
        let mut bar = sample_bar();
        bar.low = 0.0;
        bar.close = 0.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_serialization_roundtrip() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let deser: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, deser);
    }
}
