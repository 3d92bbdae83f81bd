//! Ordinary least squares.
//!
//! [`simple_ols`] is the closed-form `y = a + b·x` fit used for hedge ratios and
//! half-life. [`least_squares`] solves a general design matrix through the
//! normal equations with Gauss-Jordan inversion; designs here are small
//! (at most a dozen columns) so this is adequate and keeps standard errors
//! available for t-statistics.

use super::StatsError;

/// Fit of `y = intercept + slope · x`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFit {
    pub intercept: f64,
    pub slope: f64,
    pub residuals: Vec<f64>,
}

pub fn simple_ols(y: &[f64], x: &[f64]) -> Result<SimpleFit, StatsError> {
    let n = y.len().min(x.len());
    if n < 3 {
        return Err(StatsError::InsufficientData { needed: 3, got: n });
    }
    let (y, x) = (&y[..n], &x[..n]);
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    if !(sxx.is_finite() && sxy.is_finite()) {
        return Err(StatsError::NonFinite { what: "regression moments" });
    }
    if sxx <= 1e-12 * (1.0 + mx * mx) * n as f64 {
        return Err(StatsError::Degenerate {
            context: "regressor variance",
            value: sxx,
        });
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let residuals = y
        .iter()
        .zip(x)
        .map(|(yi, xi)| yi - intercept - slope * xi)
        .collect();
    Ok(SimpleFit {
        intercept,
        slope,
        residuals,
    })
}

/// General least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub ssr: f64,
    pub nobs: usize,
}

impl LinearFit {
    pub fn t_value(&self, i: usize) -> f64 {
        self.coefficients[i] / self.std_errors[i]
    }

    /// Gaussian log-likelihood at the fitted coefficients.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, `-2·llf + 2·k`.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Solve `y ≈ X β` for row-major `design` (one `Vec` per observation).
pub fn least_squares(design: &[Vec<f64>], y: &[f64]) -> Result<LinearFit, StatsError> {
    let n = design.len();
    let k = design.first().map_or(0, Vec::len);
    if k == 0 || n <= k || y.len() != n {
        return Err(StatsError::InsufficientData {
            needed: k + 1,
            got: n.min(y.len()),
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in design.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    let inv = invert(xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| inv[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = design
        .iter()
        .zip(y)
        .map(|(row, yi)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(x, b)| x * b).sum();
            (yi - fitted).powi(2)
        })
        .sum();
    if !ssr.is_finite() {
        return Err(StatsError::NonFinite { what: "residual sum of squares" });
    }
    let sigma2 = ssr / (n - k) as f64;
    if sigma2 <= f64::MIN_POSITIVE {
        return Err(StatsError::Degenerate {
            context: "residual variance",
            value: sigma2,
        });
    }
    let std_errors = (0..k).map(|i| (sigma2 * inv[i][i]).sqrt()).collect();

    Ok(LinearFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
    })
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut a: Vec<Vec<f64>>) -> Result<Vec<Vec<f64>>, StatsError> {
    let k = a.len();
    let scale = a
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0, f64::max)
        .max(1.0);
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= 1e-12 * scale {
            return Err(StatsError::Singular);
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..k {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        for r in 0..k {
            if r == col {
                continue;
            }
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                a[r][j] -= factor * a[col][j];
                inv[r][j] -= factor * inv[col][j];
            }
        }
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_ols_recovers_line() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 2.0 * v).collect();
        let fit = simple_ols(&y, &x).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 3.0).abs() < 1e-10);
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn simple_ols_rejects_constant_regressor() {
        let x = [5.0; 10];
        let y: Vec<f64> = (0..10).map(f64::from).collect();
        assert!(matches!(
            simple_ols(&y, &x),
            Err(StatsError::Degenerate { .. })
        ));
    }

    #[test]
    fn least_squares_matches_known_solution() {
        // y = 1 + 2 a - b with small deterministic noise
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| {
                let a = i as f64;
                let b = ((i * 7) % 11) as f64;
                vec![1.0, a, b]
            })
            .collect();
        let y: Vec<f64> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| 1.0 + 2.0 * r[1] - r[2] + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let fit = least_squares(&rows, &y).unwrap();
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-3);
        assert!((fit.coefficients[2] + 1.0).abs() < 1e-2);
        assert!(fit.std_errors.iter().all(|s| s.is_finite() && *s > 0.0));
        assert!(fit.aic().is_finite());
    }

    #[test]
    fn collinear_design_is_singular() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert_eq!(least_squares(&rows, &y), Err(StatsError::Singular));
    }

    #[test]
    fn too_few_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![1.0, 3.0]];
        assert!(matches!(
            least_squares(&rows, &[1.0, 2.0]),
            Err(StatsError::InsufficientData { .. })
        ));
    }
}
