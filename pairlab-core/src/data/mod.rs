//! Market data: validated feed, point-in-time views, CSV ingestion, synthetic series.

pub mod feed;
pub mod ingest;
pub mod synthetic;

pub use feed::{DataError, MarketDataFeed, MarketView};
pub use ingest::{read_bars, read_bars_file};
pub use synthetic::CointegratedPair;
