//! Mean-reversion half-life of a spread.
//!
//! Fits `Δs_t = a + b · s_{t-1}`; half-life is `-ln 2 / b`. A non-negative `b`
//! means no mean reversion and yields `f64::INFINITY`.

use super::ols::simple_ols;
use super::StatsError;

pub fn half_life(spread: &[f64]) -> Result<f64, StatsError> {
    if spread.len() < 4 {
        return Err(StatsError::InsufficientData {
            needed: 4,
            got: spread.len(),
        });
    }
    let lagged = &spread[..spread.len() - 1];
    let delta: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let fit = simple_ols(&delta, lagged)?;
    if fit.slope >= 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(-std::f64::consts::LN_2 / fit.slope)
}
