//! Bar ingestion from CSV.
//!
//! Expected header: `timestamp,open,high,low,close,volume`. Timestamps are
//! RFC 3339 or plain `YYYY-MM-DD` (interpreted as 00:00 UTC). Rows are kept in
//! file order; ordering is validated later by [`MarketDataFeed::new`].
//!
//! [`MarketDataFeed::new`]: super::MarketDataFeed::new

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use super::DataError;
use crate::domain::Bar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Read one instrument's bars from any reader.
pub fn read_bars<R: Read>(symbol: &str, reader: R) -> Result<Vec<Bar>, DataError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for row in rdr.deserialize() {
        let row: CsvRow = row?;
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp: parse_timestamp(&row.timestamp)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

/// Read one instrument's bars from a file.
pub fn read_bars_file(symbol: &str, path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let file = std::fs::File::open(path)?;
    read_bars(symbol, file)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DataError::Timestamp(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reads_date_and_rfc3339_rows() {
        let data = "timestamp,open,high,low,close,volume\n\
                    2024-01-02,10,11,9,10.5,100\n\
                    2024-01-03T21:00:00Z,10.5,12,10,11.5,200\n";
        let bars = read_bars("KO", data.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert_eq!(bars[1].timestamp, Utc.with_ymd_and_hms(2024, 1, 3, 21, 0, 0).unwrap());
        assert_eq!(bars[1].close, 11.5);
        assert_eq!(bars[1].symbol, "KO");
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let data = "timestamp,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        let err = read_bars("KO", data.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::Timestamp(ref s) if s == "yesterday"));
    }

    #[test]
    fn non_numeric_field_is_csv_error() {
        let data = "timestamp,open,high,low,close,volume\n2024-01-02,x,1,1,1,1\n";
        assert!(matches!(
            read_bars("KO", data.as_bytes()),
            Err(DataError::Csv(_))
        ));
    }
}
