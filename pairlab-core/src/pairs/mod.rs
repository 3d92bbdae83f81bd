//! Pairs trading: cointegration screening, recursive hedge ratio, z-score
//! state machine and portfolio risk rules.
//!
//! # Lifecycle per pair
//! `FLAT → ENTERED_LONG_SPREAD | ENTERED_SHORT_SPREAD → FLAT`
//!
//! - Spread is `A − β·B` with `β` from the Kalman filter (or a rolling OLS
//!   slope), z-scored against a rolling window of `lookback` spreads.
//! - Entries fire on `z < −entry_z` (long spread) or `z > entry_z`.
//! - Exits, in priority order: `|z| ≤ exit_z`, holding period reached,
//!   drawdown since entry above `max_drawdown`.
//! - Numeric trouble forces the pair flat and quarantines it until a
//!   re-screen rebuilds it.

pub mod config;
pub mod error;
pub mod screening;
pub mod state;
pub mod strategy;

pub use config::PairsConfig;
pub use error::PairsError;
pub use screening::{screen_pair, ScreenFailure, ScreenResult, Universe};
pub use state::{Entry, HedgeEstimator, PairPhase, PairState, PairTransition, TransitionReason};
pub use strategy::{entry_direction, PairsStrategy};
