//! Fisher F tail probabilities.

use super::beta::beta_cdf;

/// Survival function of the F distribution, P(F > f).
pub fn f_sf(f: f64, df1: f64, df2: f64) -> f64 {
    if f.is_nan() || df1.is_nan() || df2.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    if f <= 0.0 {
        return 1.0;
    }
    if f == f64::INFINITY {
        return 0.0;
    }
    let x = df2 / (df2 + df1 * f);
    beta_cdf(x, 0.5 * df2, 0.5 * df1).clamp(0.0, 1.0)
}
