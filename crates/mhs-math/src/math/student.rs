//! Student t tail probabilities and quantiles.

use super::beta::{beta_cdf, beta_inv_cdf};

/// Survival function of the Student t distribution, P(T > t).
pub fn student_t_sf(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t == f64::INFINITY {
        return 0.0;
    }
    if t == f64::NEG_INFINITY {
        return 1.0;
    }
    let x = df / (df + t * t);
    let tail = 0.5 * beta_cdf(x, 0.5 * df, 0.5);
    if t >= 0.0 {
        tail
    } else {
        1.0 - tail
    }
}

/// Two-sided p-value for an observed t statistic: P(|T| > |t|).
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    let x = df / (df + t * t);
    beta_cdf(x, 0.5 * df, 0.5).clamp(0.0, 1.0)
}

/// Quantile of the Student t distribution: t such that P(T <= t) = p.
pub fn student_t_quantile(p: f64, df: f64) -> f64 {
    if p.is_nan() || df.is_nan() || df <= 0.0 || p <= 0.0 || p >= 1.0 {
        return f64::NAN;
    }
    if (p - 0.5).abs() < 1e-15 {
        return 0.0;
    }
    let tail = 2.0 * p.min(1.0 - p);
    let x = beta_inv_cdf(tail, 0.5 * df, 0.5);
    if x <= 0.0 {
        return f64::NAN;
    }
    let t = (df * (1.0 - x) / x).sqrt();
    if p < 0.5 {
        -t
    } else {
        t
    }
}
