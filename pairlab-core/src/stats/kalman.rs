//! Scalar Kalman filter for a drifting hedge ratio.
//!
//! State is the ratio `beta` in `A_t = beta_t · B_t + noise`, modelled as a
//! random walk:
//!
//! ```text
//! predict:  P⁻ = P + Q
//! update:   S  = B² · P⁻ + R
//!           K  = P⁻ · B / S
//!           beta += K · (A − beta · B)
//!           P  = (1 − K · B) · P⁻
//! ```
//!
//! The filter never resets itself. Any non-finite input, state or innovation
//! variance is an error and leaves the previous state untouched.

use serde::{Deserialize, Serialize};

use super::StatsError;

/// Smallest innovation variance accepted as a divisor.
const MIN_INNOVATION_VARIANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanHedge {
    /// Process noise Q.
    process_noise: f64,
    /// Observation noise R.
    observation_noise: f64,
    beta: f64,
    variance: f64,
    updates: u64,
}

impl KalmanHedge {
    /// Filter with prior `beta = 0`, `P = 1`.
    pub fn new(process_noise: f64, observation_noise: f64) -> Self {
        Self {
            process_noise,
            observation_noise,
            beta: 0.0,
            variance: 1.0,
            updates: 0,
        }
    }

    pub fn with_prior(mut self, beta: f64, variance: f64) -> Self {
        self.beta = beta;
        self.variance = variance;
        self
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Posterior variance of the ratio.
    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// Fold one observation pair and return the corrected ratio.
    pub fn update(&mut self, price_a: f64, price_b: f64) -> Result<f64, StatsError> {
        if !price_a.is_finite() || !price_b.is_finite() {
            return Err(StatsError::NonFinite {
                what: "kalman observation",
            });
        }

        let p_pred = self.variance + self.process_noise;
        let s = price_b * price_b * p_pred + self.observation_noise;
        if !s.is_finite() || s.abs() < MIN_INNOVATION_VARIANCE {
            return Err(StatsError::Degenerate {
                context: "kalman innovation variance",
                value: s,
            });
        }

        let gain = p_pred * price_b / s;
        let innovation = price_a - self.beta * price_b;
        let beta = self.beta + gain * innovation;
        let variance = (1.0 - gain * price_b) * p_pred;

        if !beta.is_finite() {
            return Err(StatsError::NonFinite { what: "hedge ratio" });
        }
        if !variance.is_finite() || variance < 0.0 {
            return Err(StatsError::Degenerate {
                context: "kalman posterior variance",
                value: variance,
            });
        }

        self.beta = beta;
        self.variance = variance;
        self.updates += 1;
        Ok(beta)
    }
}

impl Default for KalmanHedge {
    fn default() -> Self {
        Self::new(0.01, 0.1)
    }
}
