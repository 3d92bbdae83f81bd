//! Pairs strategy parameters.
//!
//! A flat mapping of named parameters with documented defaults. Unknown keys
//! are rejected at construction, and every constructor validates before
//! returning, so an invalid configuration never reaches the first tick.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::config::{ConfigError, EngineConfig};
use crate::strategy::Schedule;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PairsConfig {
    /// Aligned observations used for screening and the spread window.
    pub lookback: usize,
    /// Entry threshold on |z| (strict).
    pub entry_z: f64,
    /// Exit threshold on |z| (inclusive).
    pub exit_z: f64,
    /// Ticks an entry may stay open before a forced close.
    pub max_hold_days: usize,
    /// Maximum simultaneously entered pairs.
    pub max_positions: usize,
    /// Fraction of equity allocated to the A leg of each entry.
    pub position_size: f64,
    /// Drawdown (fraction) that stops out an entry and locks new entries.
    pub max_drawdown: f64,
    /// Recursive Kalman hedge ratio; rolling OLS slope when false.
    pub use_kalman: bool,
    pub use_half_life: bool,
    pub min_half_life: f64,
    pub max_half_life: f64,
    /// Cointegration p-value must be strictly below this.
    pub pvalue_threshold: f64,
    pub kalman_q: f64,
    pub kalman_r: f64,
    pub min_zscore_periods: usize,
    /// |hedge ratio| clamp applied when sizing the B leg.
    pub hedge_ratio_cap: f64,
    pub commission: f64,
    pub slippage: f64,
    pub rescreen: Schedule,
    /// The drawdown lock releases below `drawdown_lock_release * max_drawdown`.
    pub drawdown_lock_release: f64,
    /// ADF lag ceiling; Schwert's rule when unset.
    pub adf_max_lag: Option<usize>,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            entry_z: 2.0,
            exit_z: 0.5,
            max_hold_days: 10,
            max_positions: 3,
            position_size: 0.15,
            max_drawdown: 0.15,
            use_kalman: true,
            use_half_life: true,
            min_half_life: 5.0,
            max_half_life: 30.0,
            pvalue_threshold: 0.05,
            kalman_q: 0.01,
            kalman_r: 0.1,
            min_zscore_periods: 20,
            hedge_ratio_cap: 5.0,
            commission: 0.0005,
            slippage: 0.0002,
            rescreen: Schedule::MonthEnd,
            drawdown_lock_release: 0.7,
            adf_max_lag: None,
        }
    }
}

impl PairsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Build from a flat in-memory mapping, e.g. one point of a parameter grid.
    pub fn from_params(params: BTreeMap<String, serde_json::Value>) -> Result<Self, ConfigError> {
        let value = serde_json::Value::Object(params.into_iter().collect());
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Engine costs taken from this configuration.
    pub fn engine_config(&self, initial_cash: f64) -> EngineConfig {
        EngineConfig::new(initial_cash).with_costs(self.commission, self.slippage)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        use ConfigError as E;

        if self.lookback < 10 {
            return Err(E::invalid("lookback", "must be at least 10"));
        }
        if self.min_zscore_periods < 2 {
            return Err(E::invalid("min_zscore_periods", "must be at least 2"));
        }
        if self.lookback < self.min_zscore_periods {
            return Err(E::invalid(
                "lookback",
                format!(
                    "{} is shorter than min_zscore_periods ({})",
                    self.lookback, self.min_zscore_periods
                ),
            ));
        }
        if !self.exit_z.is_finite() || self.exit_z < 0.0 {
            return Err(E::invalid("exit_z", "must be finite and non-negative"));
        }
        if !self.entry_z.is_finite() || self.entry_z <= self.exit_z {
            return Err(E::invalid(
                "entry_z",
                format!("must be finite and greater than exit_z ({})", self.exit_z),
            ));
        }
        if self.max_hold_days == 0 {
            return Err(E::invalid("max_hold_days", "must be at least 1"));
        }
        if self.max_positions == 0 {
            return Err(E::invalid("max_positions", "must be at least 1"));
        }
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(E::invalid("position_size", "must be in (0, 1]"));
        }
        if !(self.max_drawdown > 0.0 && self.max_drawdown < 1.0) {
            return Err(E::invalid("max_drawdown", "must be in (0, 1)"));
        }
        if !(self.pvalue_threshold > 0.0 && self.pvalue_threshold < 1.0) {
            return Err(E::invalid("pvalue_threshold", "must be in (0, 1)"));
        }
        if self.use_half_life {
            if !(self.min_half_life.is_finite() && self.min_half_life > 0.0) {
                return Err(E::invalid("min_half_life", "must be positive"));
            }
            if !(self.max_half_life >= self.min_half_life) {
                return Err(E::invalid("max_half_life", "must be at least min_half_life"));
            }
        }
        if !(self.kalman_q.is_finite() && self.kalman_q >= 0.0) {
            return Err(E::invalid("kalman_q", "must be finite and non-negative"));
        }
        if !(self.kalman_r.is_finite() && self.kalman_r > 0.0) {
            return Err(E::invalid("kalman_r", "must be finite and positive"));
        }
        if !(self.hedge_ratio_cap.is_finite() && self.hedge_ratio_cap > 0.0) {
            return Err(E::invalid("hedge_ratio_cap", "must be finite and positive"));
        }
        if !(self.commission >= 0.0 && self.commission < 1.0) {
            return Err(E::invalid("commission", "must be in [0, 1)"));
        }
        if !(self.slippage >= 0.0 && self.slippage < 1.0) {
            return Err(E::invalid("slippage", "must be in [0, 1)"));
        }
        if !(self.drawdown_lock_release > 0.0 && self.drawdown_lock_release <= 1.0) {
            return Err(E::invalid("drawdown_lock_release", "must be in (0, 1]"));
        }
        if self.rescreen == Schedule::EveryNTicks(0) {
            return Err(E::invalid("rescreen", "every_n_ticks must be at least 1"));
        }
        Ok(())
    }
}
