//! MacKinnon (1994, 2010) approximate p-values for the Engle-Granger test
//! with a constant and two variables.

/// Statistic below which the small-sample polynomial applies.
const TAU_STAR: f64 = -2.62;
/// p-value is 0 below this statistic.
const TAU_MIN: f64 = -18.86;
/// p-value is 1 above this statistic.
const TAU_MAX: f64 = 0.92;
const SMALL_P: [f64; 3] = [2.92, 1.5012, 0.039796];
const LARGE_P: [f64; 4] = [2.1945, 0.64695, -0.29198, -0.042377];

fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// p-value of an Engle-Granger statistic (residual ADF t-value).
pub fn coint_pvalue(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coeffs: &[f64] = if statistic <= TAU_STAR {
        &SMALL_P
    } else {
        &LARGE_P
    };
    normal_cdf(polyval(coeffs, statistic))
}

/// Standard normal CDF via a Chebyshev-fitted complementary error function
/// (fractional error below 1.2e-7).
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_cdf_reference_points() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((normal_cdf(1.959_964) - 0.975).abs() < 1e-6);
        assert!((normal_cdf(-1.644_854) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn five_percent_critical_value() {
        // tabulated 5% Engle-Granger critical value for two variables with constant
        let p = coint_pvalue(-3.34);
        assert!((p - 0.05).abs() < 0.005, "p = {p}");
    }

    #[test]
    fn continuous_at_tau_star() {
        let below = coint_pvalue(TAU_STAR - 1e-9);
        let above = coint_pvalue(TAU_STAR + 1e-9);
        assert!((below - above).abs() < 0.005);
    }

    #[test]
    fn monotone_in_statistic() {
        let stats = [-6.0, -4.0, -3.0, -2.0, -1.0, 0.0];
        let ps: Vec<f64> = stats.iter().map(|s| coint_pvalue(*s)).collect();
        assert!(ps.windows(2).all(|w| w[0] <= w[1]), "{ps:?}");
    }

    #[test]
    fn clamped_outside_table() {
        assert_eq!(coint_pvalue(-25.0), 0.0);
        assert_eq!(coint_pvalue(1.5), 1.0);
        assert_eq!(coint_pvalue(f64::NAN), 1.0);
    }
}
