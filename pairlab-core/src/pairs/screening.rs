//! Candidate universe and cointegration screening.
//!
//! A pair passes when, over its last `lookback` aligned closes, the
//! Engle-Granger p-value is strictly below `pvalue_threshold` and (with
//! `use_half_life`) the residual half-life lies within
//! `[min_half_life, max_half_life]`.
//!
//! Passing pairs are ranked by ascending p-value, then by more aligned
//! observations, then by pair id.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use super::config::PairsConfig;
use crate::domain::PairId;
use crate::stats::{engle_granger, half_life, StatsError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Universe {
    /// Every unordered pair of the symbols; A is the lexically smaller one.
    AllCombinations(Vec<String>),
    Explicit(Vec<PairId>),
}

impl Universe {
    /// Candidate pairs in pair-id order, without duplicates.
    pub fn pairs(&self) -> Vec<PairId> {
        let set: BTreeSet<PairId> = match self {
            Self::AllCombinations(symbols) => {
                let symbols: BTreeSet<&String> = symbols.iter().collect();
                let symbols: Vec<&String> = symbols.into_iter().collect();
                let mut out = BTreeSet::new();
                for (i, a) in symbols.iter().enumerate() {
                    for b in &symbols[i + 1..] {
                        out.insert(PairId::new(a.as_str(), b.as_str()));
                    }
                }
                out
            }
            Self::Explicit(pairs) => pairs.iter().filter(|p| p.a != p.b).cloned().collect(),
        };
        set.into_iter().collect()
    }

    pub fn symbols(&self) -> BTreeSet<String> {
        match self {
            Self::AllCombinations(symbols) => symbols.iter().cloned().collect(),
            Self::Explicit(pairs) => pairs
                .iter()
                .flat_map(|p| [p.a.clone(), p.b.clone()])
                .collect(),
        }
    }
}

/// Statistics of a pair that passed screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenResult {
    pub pair: PairId,
    pub pvalue: f64,
    pub statistic: f64,
    /// Static OLS ratio from the screening regression.
    pub hedge_ratio: f64,
    pub half_life: Option<f64>,
    pub nobs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenFailure {
    InsufficientData { got: usize, needed: usize },
    PValue(f64),
    HalfLife(f64),
    Stats(StatsError),
}

impl fmt::Display for ScreenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData { got, needed } => {
                write!(f, "{got} aligned observations, need {needed}")
            }
            Self::PValue(p) => write!(f, "p-value {p:.4} not below threshold"),
            Self::HalfLife(hl) => write!(f, "half-life {hl:.2} out of bounds"),
            Self::Stats(err) => write!(f, "{err}"),
        }
    }
}

impl From<StatsError> for ScreenFailure {
    fn from(err: StatsError) -> Self {
        Self::Stats(err)
    }
}

/// Screen one pair on aligned closes, oldest first.
pub fn screen_pair(
    pair: &PairId,
    closes_a: &[f64],
    closes_b: &[f64],
    config: &PairsConfig,
) -> Result<ScreenResult, ScreenFailure> {
    let got = closes_a.len().min(closes_b.len());
    if got < config.lookback {
        return Err(ScreenFailure::InsufficientData {
            got,
            needed: config.lookback,
        });
    }
    let a = &closes_a[closes_a.len() - config.lookback..];
    let b = &closes_b[closes_b.len() - config.lookback..];

    let coint = engle_granger(a, b, config.adf_max_lag)?;
    if !(coint.pvalue < config.pvalue_threshold) {
        return Err(ScreenFailure::PValue(coint.pvalue));
    }

    let half_life = if config.use_half_life {
        let hl = half_life(&coint.residuals)?;
        if !(hl >= config.min_half_life && hl <= config.max_half_life) {
            return Err(ScreenFailure::HalfLife(hl));
        }
        Some(hl)
    } else {
        None
    };

    Ok(ScreenResult {
        pair: pair.clone(),
        pvalue: coint.pvalue,
        statistic: coint.statistic,
        hedge_ratio: coint.hedge_ratio,
        half_life,
        nobs: got,
    })
}

/// Ranking order: lower p-value, then more observations, then pair id.
pub fn rank_order(x: &ScreenResult, y: &ScreenResult) -> Ordering {
    x.pvalue
        .total_cmp(&y.pvalue)
        .then_with(|| y.nobs.cmp(&x.nobs))
        .then_with(|| x.pair.cmp(&y.pair))
}

pub fn rank(results: &mut [ScreenResult]) {
    results.sort_by(rank_order);
}
