//! Simulation engine — tick loop and the components it owns.
//!
//! The engine consumes a validated [`MarketDataFeed`](crate::data::MarketDataFeed)
//! and drives one [`Strategy`](crate::strategy::Strategy):
//!
//! 1. Mark the ledger to this tick's closes, emit NEXT
//! 2. Ask the strategy for intents (REBALANCE if it re-screened)
//! 3. Resolve intents through the fill engine, emit ORDER / TRADE
//! 4. Emit the end-of-tick PORTFOLIO snapshot

pub mod config;
pub mod cost_model;
pub mod event_log;
pub mod fill_engine;
pub mod ledger;
pub mod loop_runner;

pub use config::{ConfigError, EngineConfig};
pub use cost_model::CostModel;
pub use event_log::{EventLog, EventLogError, EventRecord, OrderRecord, RebalanceDetail};
pub use fill_engine::{FillEngine, FillError};
pub use ledger::PortfolioLedger;
pub use loop_runner::{run, run_series, EngineError, RunFailure};
