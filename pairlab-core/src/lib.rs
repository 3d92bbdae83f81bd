//! PairLab Core — event-driven backtest engine and the pairs-trading strategy.
//!
//! This crate contains:
//! - Domain types (bars, order intents, fills, positions, snapshots)
//! - A validated multi-instrument market data feed with point-in-time views
//! - Tick-by-tick simulation loop, fill engine and portfolio ledger
//! - Append-only event log with JSONL persistence and digest
//! - Statistics: OLS, ADF / Engle-Granger, half-life, Kalman hedge ratio
//! - The `Strategy` trait, calendar schedules and `PairsStrategy`

pub mod data;
pub mod domain;
pub mod engine;
pub mod pairs;
pub mod rng;
pub mod stats;
pub mod strategy;
