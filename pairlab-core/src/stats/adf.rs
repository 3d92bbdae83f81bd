//! Augmented Dickey-Fuller regression without deterministic terms.
//!
//! Regresses `Δx_t` on `x_{t-1}` and `L` lagged differences. The lag order
//! is chosen by AIC over `0..=max_lag`, with every candidate fitted on the
//! same sample (the one implied by `max_lag`) so the criteria are comparable.
//! The chosen order is then refit on the longest sample it allows.
//!
//! Default `max_lag` is Schwert's rule `ceil(12 · (n/100)^{1/4})`, capped at
//! `n/2 - 1`.

use super::ols::{least_squares, LinearFit};
use super::StatsError;

#[derive(Debug, Clone, PartialEq)]
pub struct AdfResult {
    /// t-statistic of the `x_{t-1}` coefficient.
    pub statistic: f64,
    pub used_lag: usize,
    pub max_lag: usize,
    pub nobs: usize,
}

pub fn default_max_lag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(1))
}

/// Design rows for `Δx_t` with `lags` lagged differences, over `t` such that
/// `lag_window` previous differences exist.
fn design(x: &[f64], diffs: &[f64], lags: usize, lag_window: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rows = Vec::with_capacity(diffs.len().saturating_sub(lag_window));
    let mut ys = Vec::with_capacity(rows.capacity());
    for t in lag_window..diffs.len() {
        let mut row = Vec::with_capacity(lags + 1);
        row.push(x[t]);
        for l in 1..=lags {
            row.push(diffs[t - l]);
        }
        rows.push(row);
        ys.push(diffs[t]);
    }
    (rows, ys)
}

pub fn adf_no_constant(x: &[f64], max_lag: Option<usize>) -> Result<AdfResult, StatsError> {
    let n = x.len();
    if n < 8 {
        return Err(StatsError::InsufficientData { needed: 8, got: n });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { what: "ADF input" });
    }
    let max_lag = max_lag
        .unwrap_or_else(|| default_max_lag(n))
        .min((n / 2).saturating_sub(1));
    let diffs: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=max_lag {
        let (rows, ys) = design(x, &diffs, lags, max_lag);
        let fit = match least_squares(&rows, &ys) {
            Ok(fit) => fit,
            // a degenerate candidate is skipped, not fatal
            Err(_) => continue,
        };
        let aic = fit.aic();
        if aic.is_finite() && best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lags));
        }
    }
    let (_, used_lag) = best.ok_or(StatsError::Singular)?;

    let (rows, ys) = design(x, &diffs, used_lag, used_lag);
    let fit: LinearFit = least_squares(&rows, &ys)?;
    let statistic = fit.t_value(0);
    if !statistic.is_finite() {
        return Err(StatsError::NonFinite { what: "ADF statistic" });
    }
    Ok(AdfResult {
        statistic,
        used_lag,
        max_lag,
        nobs: fit.nobs,
    })
}
