//! Standard normal density and tail probabilities.
//!
//! The tails are computed through the regularized incomplete gamma
//! function: for z >= 0, P(Z > z) = Q(1/2, z^2/2) / 2.

use super::gamma::{gamma_p, gamma_q};
use std::f64::consts::PI;

/// Standard normal density at z.
pub fn normal_pdf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF, P(Z <= z).
pub fn normal_cdf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z == f64::INFINITY {
        return 1.0;
    }
    if z == f64::NEG_INFINITY {
        return 0.0;
    }
    if z >= 0.0 {
        0.5 + 0.5 * gamma_p(0.5, 0.5 * z * z)
    } else {
        0.5 * gamma_q(0.5, 0.5 * z * z)
    }
}

/// Standard normal survival function, P(Z > z).
pub fn normal_sf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    normal_cdf(-z)
}

/// Quantile of the standard normal: z such that P(Z <= z) = p.
///
/// Bisection over the CDF; accurate to ~1e-10.
pub fn normal_quantile(p: f64) -> f64 {
    if p.is_nan() || p <= 0.0 || p >= 1.0 {
        return f64::NAN;
    }
    let mut low = -40.0;
    let mut high = 40.0;
    let mut mid = 0.0;
    for _ in 0..200 {
        mid = 0.5 * (low + high);
        let cdf = normal_cdf(mid);
        if (cdf - p).abs() < 1e-14 {
            return mid;
        }
        if cdf < p {
            low = mid;
        } else {
            high = mid;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    #[test]
    fn cdf_at_zero_is_half() {
        assert!(approx_eq(normal_cdf(0.0), 0.5, 1e-12));
    }

    #[test]
    fn cdf_known_values() {
        assert!(approx_eq(normal_cdf(1.959_963_985), 0.975, 1e-8));
        assert!(approx_eq(normal_cdf(-1.644_853_627), 0.05, 1e-8));
    }

    #[test]
    fn cdf_sf_complement() {
        let z = 0.731;
        assert!(approx_eq(normal_cdf(z) + normal_sf(z), 1.0, 1e-12));
    }

    #[test]
    fn pdf_peak_value() {
        assert!(approx_eq(normal_pdf(0.0), 0.398_942_280_401, 1e-10));
    }

    #[test]
    fn quantile_inverts_cdf() {
        assert!(approx_eq(normal_quantile(0.975), 1.959_963_985, 1e-7));
        assert!(approx_eq(normal_quantile(0.5), 0.0, 1e-10));
        let p = 0.123;
        assert!(approx_eq(normal_cdf(normal_quantile(p)), p, 1e-10));
    }
}
