//! Engine configuration and the configuration error shared by every layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid or unparseable configuration. Always raised before the first tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("parameter error: {0}")]
    Params(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Configuration for a single simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub initial_cash: f64,
    /// Commission as a fraction of traded notional.
    pub commission_rate: f64,
    /// Adverse price move per fill as a fraction of the close.
    pub slippage_rate: f64,
    /// Cash may fall to `-leverage_allowance × equity`. Zero forbids borrowing.
    pub leverage_allowance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            commission_rate: 0.001,
            slippage_rate: 0.0,
            leverage_allowance: 0.0,
        }
    }
}

impl EngineConfig {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            ..Self::default()
        }
    }

    /// Frictionless config: no commission, no slippage.
    pub fn frictionless(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            commission_rate: 0.0,
            slippage_rate: 0.0,
            leverage_allowance: 0.0,
        }
    }

    pub fn with_costs(mut self, commission_rate: f64, slippage_rate: f64) -> Self {
        self.commission_rate = commission_rate;
        self.slippage_rate = slippage_rate;
        self
    }

    pub fn with_leverage_allowance(mut self, allowance: f64) -> Self {
        self.leverage_allowance = allowance;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(ConfigError::invalid(
                "initial_cash",
                format!("must be positive, got {}", self.initial_cash),
            ));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(ConfigError::invalid(
                "commission_rate",
                format!("must be in [0, 1), got {}", self.commission_rate),
            ));
        }
        if !(0.0..1.0).contains(&self.slippage_rate) {
            return Err(ConfigError::invalid(
                "slippage_rate",
                format!("must be in [0, 1), got {}", self.slippage_rate),
            ));
        }
        if !(self.leverage_allowance.is_finite() && self.leverage_allowance >= 0.0) {
            return Err(ConfigError::invalid(
                "leverage_allowance",
                format!("must be >= 0, got {}", self.leverage_allowance),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_cash() {
        let err = EngineConfig::new(0.0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "initial_cash", .. }));
    }

    #[test]
    fn rejects_nan_commission() {
        let cfg = EngineConfig::new(1_000.0).with_costs(f64::NAN, 0.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        let err = toml::from_str::<EngineConfig>("initial_cash = 5.0\nmargin = 2.0").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
