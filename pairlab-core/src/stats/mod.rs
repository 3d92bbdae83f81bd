//! Statistics routines used by pair screening and signal generation.
//!
//! Every routine is a pure function (or a small owned state object) over
//! `f64` slices. Failures are reported as [`StatsError`]; nothing panics on
//! degenerate input.

pub mod adf;
pub mod coint;
pub mod half_life;
pub mod kalman;
pub mod mackinnon;
pub mod ols;
pub mod rolling;

pub use adf::{adf_no_constant, AdfResult};
pub use coint::{engle_granger, CointResult};
pub use half_life::half_life;
pub use kalman::KalmanHedge;
pub use mackinnon::{coint_pvalue, normal_cdf};
pub use ols::{least_squares, simple_ols, LinearFit, SimpleFit};
pub use rolling::RollingWindow;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StatsError {
    #[error("need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("singular design matrix")]
    Singular,

    #[error("degenerate denominator {value:e} in {context}")]
    Degenerate { context: &'static str, value: f64 },

    #[error("non-finite {what}")]
    NonFinite { what: &'static str },
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (divisor `n`).
pub fn population_std(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_std_uses_n() {
        // values 2,4,4,4,5,5,7,9 have population std exactly 2
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&xs), 5.0);
        assert!((population_std(&xs) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
    }
}
