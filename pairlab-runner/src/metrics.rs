//! Performance metrics — pure functions that compute run statistics.
//!
//! Every metric is a pure function: equity curve and/or trade P&Ls in,
//! scalar out. `periods_per_year` annualizes per-tick returns (252 for
//! daily bars). Trade statistics count [`PairTrade`]s, so both legs of a
//! pair entry make one trade.

use serde::{Deserialize, Serialize};

use crate::trades::PairTrade;

pub const DAILY_PERIODS: f64 = 252.0;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub total_commission: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and grouped trades.
    ///
    /// Only closed trades enter the trade statistics.
    pub fn compute(
        equity_curve: &[f64],
        trades: &[PairTrade],
        periods_per_year: f64,
        total_commission: f64,
    ) -> Self {
        let closed: Vec<f64> = trades
            .iter()
            .filter(|t| t.is_closed())
            .map(|t| t.net_pnl)
            .collect();
        Self {
            total_return: total_return(equity_curve),
            cagr: cagr(equity_curve, periods_per_year),
            volatility: volatility(equity_curve, periods_per_year),
            sharpe: sharpe_ratio(equity_curve, periods_per_year),
            sortino: sortino_ratio(equity_curve, periods_per_year),
            calmar: calmar_ratio(equity_curve, periods_per_year),
            max_drawdown: max_drawdown(equity_curve),
            trade_count: closed.len(),
            win_rate: win_rate(&closed),
            profit_factor: profit_factor(&closed),
            total_commission,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    match (equity_curve.first(), equity_curve.last()) {
        (Some(&initial), Some(&last)) if equity_curve.len() >= 2 && initial > 0.0 => {
            (last - initial) / initial
        }
        _ => 0.0,
    }
}

/// Compound annual growth rate over `len - 1` periods.
///
/// Returns 0.0 for a single point or a non-positive endpoint.
pub fn cagr(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&initial), Some(&last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || initial <= 0.0 || last <= 0.0 || periods_per_year <= 0.0 {
        return 0.0;
    }
    let years = (equity_curve.len() - 1) as f64 / periods_per_year;
    (last / initial).powf(1.0 / years) - 1.0
}

/// Annualized standard deviation of per-period returns (sample).
pub fn volatility(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    std_dev(&returns) * periods_per_year.max(0.0).sqrt()
}

/// Annualized Sharpe ratio, zero risk-free rate.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * periods_per_year.max(0.0).sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 when there is no downside.
pub fn sortino_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * periods_per_year.max(0.0).sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
///
/// Returns 0.0 if max drawdown is zero or CAGR is non-positive.
pub fn calmar_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let c = cagr(equity_curve, periods_per_year);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Fraction of trades with positive net P&L.
pub fn win_rate(net_pnls: &[f64]) -> f64 {
    if net_pnls.is_empty() {
        return 0.0;
    }
    net_pnls.iter().filter(|&&p| p > 0.0).count() as f64 / net_pnls.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 when nothing lost.
pub fn profit_factor(net_pnls: &[f64]) -> f64 {
    if net_pnls.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = net_pnls.iter().map(|p| p.max(0.0)).sum();
    let gross_loss: f64 = net_pnls.iter().map(|p| (-p).max(0.0)).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity points.
pub fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
