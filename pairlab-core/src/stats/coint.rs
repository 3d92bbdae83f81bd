//! Engle-Granger two-step cointegration test.
//!
//! 1. Regress A on B with an intercept.
//! 2. ADF (no deterministic terms) on the residuals; p-value from MacKinnon's
//!    surface for a constant and two variables.

use super::adf::adf_no_constant;
use super::mackinnon::coint_pvalue;
use super::ols::simple_ols;
use super::StatsError;

#[derive(Debug, Clone, PartialEq)]
pub struct CointResult {
    pub intercept: f64,
    /// Static OLS hedge ratio of A on B.
    pub hedge_ratio: f64,
    pub statistic: f64,
    pub pvalue: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub residuals: Vec<f64>,
}

pub fn engle_granger(a: &[f64], b: &[f64], max_lag: Option<usize>) -> Result<CointResult, StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::InsufficientData {
            needed: a.len().max(b.len()),
            got: a.len().min(b.len()),
        });
    }
    let fit = simple_ols(a, b)?;
    let adf = adf_no_constant(&fit.residuals, max_lag)?;
    Ok(CointResult {
        intercept: fit.intercept,
        hedge_ratio: fit.slope,
        statistic: adf.statistic,
        pvalue: coint_pvalue(adf.statistic),
        used_lag: adf.used_lag,
        nobs: a.len(),
        residuals: fit.residuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::CointegratedPair;

    fn closes(pair: &CointegratedPair) -> (Vec<f64>, Vec<f64>) {
        let (a, b) = pair.generate();
        (
            a.iter().map(|x| x.close).collect(),
            b.iter().map(|x| x.close).collect(),
        )
    }

    #[test]
    fn cointegrated_pair_passes() {
        let (a, b) = closes(&CointegratedPair {
            spread_ar: 0.5,
            ticks: 120,
            ..Default::default()
        });
        let res = engle_granger(&a, &b, None).unwrap();
        assert!(res.pvalue < 0.01, "p = {}", res.pvalue);
        assert!((res.hedge_ratio - 2.0).abs() < 0.1);
    }

    #[test]
    fn independent_walks_mostly_fail() {
        use crate::data::synthetic::{business_days, default_start, random_walk};
        let ts = business_days(default_start(), 120);
        let mut spurious = 0;
        for seed in 1..=10 {
            let seeds = crate::rng::SeedTree::new(seed);
            let a: Vec<f64> = random_walk("X", 100.0, 1.0, &ts, seeds)
                .iter()
                .map(|b| b.close)
                .collect();
            let b: Vec<f64> = random_walk("Y", 100.0, 1.0, &ts, seeds)
                .iter()
                .map(|b| b.close)
                .collect();
            if engle_granger(&a, &b, None).map_or(false, |r| r.pvalue < 0.05) {
                spurious += 1;
            }
        }
        assert!(spurious <= 3, "{spurious} of 10 independent walks passed");
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(engle_granger(&[1.0; 10], &[1.0; 9], None).is_err());
    }
}
