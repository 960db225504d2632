//! Factor-suitability gate and exploratory factor analysis.
//!
//! The gate computes Bartlett's sphericity test and the KMO
//! sampling-adequacy score over the fixed clinical-score subset and
//! records both regardless of outcome. EFA runs only when the gate
//! passes (KMO > 0.6 and Bartlett p < 0.05); a failed gate leaves an
//! audit record and no loadings artifact.
//!
//! Extraction is iterated principal-axis factoring of one factor with a
//! varimax rotation (an identity for a single factor, kept for the
//! general k case).

use crate::analysis::linalg::{pinv_sym, sym_eigen};
use mhs_common::{Error, Frame, Result};
use mhs_math::{chi_square_sf, pearson};
use mhs_report::{table::fmt_stat, Table};
use ndarray::Array2;
use tracing::{info, warn};

const KMO_THRESHOLD: f64 = 0.6;
const BARTLETT_ALPHA: f64 = 0.05;
const PAF_MAX_ITERS: usize = 50;
const PAF_TOL: f64 = 1.0e-3;
const VARIMAX_MAX_SWEEPS: usize = 30;
const VARIMAX_TOL: f64 = 1.0e-8;

/// Gate statistics, persisted pass or fail.
#[derive(Debug, Clone, PartialEq)]
pub struct GateResult {
    pub chi_square: f64,
    pub p_value: f64,
    pub kmo: f64,
    pub n_obs: usize,
}

impl GateResult {
    pub fn bartlett_ok(&self) -> bool {
        self.p_value < BARTLETT_ALPHA
    }

    pub fn kmo_ok(&self) -> bool {
        self.kmo > KMO_THRESHOLD
    }

    /// Factor analysis is statistically justified.
    pub fn passes(&self) -> bool {
        self.kmo_ok() && self.bartlett_ok()
    }

    /// Decision table in the shape the downstream report expects.
    pub fn table(&self) -> Table {
        let mut table = Table::new(["Statistical_Test", "Result_Value", "Threshold_Requirement"]);
        table.push_row([
            "Bartlett Chi-Square".to_string(),
            fmt_stat(round_to(self.chi_square, 3)),
            "N/A".to_string(),
        ]);
        table.push_row([
            "Bartlett P-Value".to_string(),
            fmt_stat(round_to(self.p_value, 4)),
            "p < 0.05".to_string(),
        ]);
        table.push_row([
            "KMO Score".to_string(),
            fmt_stat(round_to(self.kmo, 3)),
            "Score > 0.6".to_string(),
        ]);
        table
    }
}

fn round_to(v: f64, digits: u32) -> f64 {
    if !v.is_finite() {
        return v;
    }
    let scale = 10f64.powi(digits as i32);
    (v * scale).round() / scale
}

/// Rows of the variable subset with every value present.
fn complete_columns(frame: &Frame, variables: &[&str]) -> Result<Vec<Vec<f64>>> {
    let columns: Vec<Vec<Option<f64>>> = variables
        .iter()
        .map(|v| frame.numeric(v))
        .collect::<Result<_>>()?;
    let nrows = frame.nrows();
    let complete: Vec<usize> = (0..nrows)
        .filter(|&row| columns.iter().all(|col| col[row].is_some()))
        .collect();
    Ok(columns
        .iter()
        .map(|col| complete.iter().map(|&row| col[row].unwrap()).collect())
        .collect())
}

/// Pearson correlation matrix of the columns.
fn correlation_matrix(columns: &[Vec<f64>]) -> Array2<f64> {
    let p = columns.len();
    let mut r = Array2::eye(p);
    for i in 0..p {
        for j in (i + 1)..p {
            let rho = pearson(&columns[i], &columns[j]);
            r[[i, j]] = rho;
            r[[j, i]] = rho;
        }
    }
    r
}

/// Overall KMO sampling adequacy from a correlation matrix.
///
/// Partial correlations come from the eigenvalue pseudo-inverse, so a
/// singular matrix degrades to NaN instead of failing.
pub fn kmo_from_corr(corr: &Array2<f64>) -> f64 {
    let p = corr.nrows();
    let Some(inv) = pinv_sym(corr) else {
        return f64::NAN;
    };
    let mut sum_sq_r = 0.0;
    let mut sum_sq_partial = 0.0;
    for i in 0..p {
        for j in 0..p {
            if i == j {
                continue;
            }
            sum_sq_r += corr[[i, j]] * corr[[i, j]];
            let denom = (inv[[i, i]] * inv[[j, j]]).sqrt();
            if denom > 0.0 {
                let partial = -inv[[i, j]] / denom;
                sum_sq_partial += partial * partial;
            }
        }
    }
    sum_sq_r / (sum_sq_r + sum_sq_partial)
}

/// Bartlett's test of sphericity from a correlation matrix and sample
/// size. Returns (chi_square, p_value); NaN when the determinant is not
/// positive.
pub fn bartlett_from_corr(corr: &Array2<f64>, n_obs: usize) -> (f64, f64) {
    let p = corr.nrows() as f64;
    let Some((eigenvalues, _)) = sym_eigen(corr) else {
        return (f64::NAN, f64::NAN);
    };
    if eigenvalues.iter().any(|&v| v <= 0.0) {
        warn!("correlation matrix is not positive definite; Bartlett undefined");
        return (f64::NAN, f64::NAN);
    }
    let log_det: f64 = eigenvalues.iter().map(|v| v.ln()).sum();
    let chi_square = -((n_obs as f64) - 1.0 - (2.0 * p + 5.0) / 6.0) * log_det;
    let df = p * (p - 1.0) / 2.0;
    (chi_square, chi_square_sf(chi_square, df))
}

/// Compute the gate statistics over the fixed variable subset.
///
/// An empty complete-case subset is degenerate and propagates.
pub fn check_efa_assumptions(frame: &Frame, variables: &[&str]) -> Result<GateResult> {
    let columns = complete_columns(frame, variables)?;
    let n_obs = columns.first().map(Vec::len).unwrap_or(0);
    if n_obs == 0 {
        return Err(Error::Degenerate(
            "no observations after dropping missing factor variables".to_string(),
        ));
    }
    let corr = correlation_matrix(&columns);
    let (chi_square, p_value) = bartlett_from_corr(&corr, n_obs);
    let kmo = kmo_from_corr(&corr);
    info!(kmo, bartlett_p = p_value, "EFA assumptions calculated");
    Ok(GateResult {
        chi_square,
        p_value,
        kmo,
        n_obs,
    })
}

/// Per-variable loadings on the single extracted factor.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorLoadings {
    pub variables: Vec<String>,
    pub loadings: Vec<f64>,
}

impl FactorLoadings {
    pub fn table(&self) -> Table {
        let mut table = Table::new(["variable", "General_Distress_Factor"]);
        for (variable, loading) in self.variables.iter().zip(self.loadings.iter()) {
            table.push_row([variable.clone(), fmt_stat(*loading)]);
        }
        table
    }
}

/// One-factor loadings by iterated principal-axis factoring of a
/// correlation matrix. Initial communalities are squared multiple
/// correlations.
pub fn paf_loadings(corr: &Array2<f64>) -> Option<Vec<f64>> {
    let p = corr.nrows();
    let inv = pinv_sym(corr)?;
    let mut communalities: Vec<f64> = (0..p)
        .map(|i| {
            if inv[[i, i]] > 0.0 {
                (1.0 - 1.0 / inv[[i, i]]).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect();

    let mut loadings = vec![0.0; p];
    for _ in 0..PAF_MAX_ITERS {
        let mut reduced = corr.clone();
        for i in 0..p {
            reduced[[i, i]] = communalities[i];
        }
        let (values, vectors) = sym_eigen(&reduced)?;
        let lambda = values[0].max(0.0);
        for i in 0..p {
            loadings[i] = vectors[[i, 0]] * lambda.sqrt();
        }
        let mut delta = 0.0f64;
        for i in 0..p {
            let h = (loadings[i] * loadings[i]).min(1.0);
            delta = delta.max((h - communalities[i]).abs());
            communalities[i] = h;
        }
        if delta < PAF_TOL {
            break;
        }
    }
    Some(loadings)
}

/// Varimax rotation of a loading matrix in place.
///
/// Pairwise planar rotations until the criterion stops improving; a
/// single-column matrix is already rotated.
pub fn varimax(loadings: &mut Array2<f64>) {
    let n = loadings.nrows();
    let k = loadings.ncols();
    if k < 2 || n == 0 {
        return;
    }
    for _ in 0..VARIMAX_MAX_SWEEPS {
        let mut rotated = 0.0f64;
        for i in 0..k {
            for j in (i + 1)..k {
                let mut a = 0.0;
                let mut b = 0.0;
                let mut c = 0.0;
                let mut d = 0.0;
                for row in 0..n {
                    let u = loadings[[row, i]] * loadings[[row, i]]
                        - loadings[[row, j]] * loadings[[row, j]];
                    let v = 2.0 * loadings[[row, i]] * loadings[[row, j]];
                    a += u;
                    b += v;
                    c += u * u - v * v;
                    d += 2.0 * u * v;
                }
                let num = d - 2.0 * a * b / n as f64;
                let den = c - (a * a - b * b) / n as f64;
                let phi = 0.25 * num.atan2(den);
                if phi.abs() < VARIMAX_TOL {
                    continue;
                }
                rotated = rotated.max(phi.abs());
                let (sin, cos) = phi.sin_cos();
                for row in 0..n {
                    let x = loadings[[row, i]];
                    let y = loadings[[row, j]];
                    loadings[[row, i]] = cos * x + sin * y;
                    loadings[[row, j]] = -sin * x + cos * y;
                }
            }
        }
        if rotated < VARIMAX_TOL {
            break;
        }
    }
}

/// Extract the single latent factor and its per-variable loadings.
///
/// Callers gate this on [`check_efa_assumptions`]; the extraction
/// itself fails only on a degenerate correlation matrix.
pub fn perform_efa(frame: &Frame, variables: &[&str]) -> Result<FactorLoadings> {
    let columns = complete_columns(frame, variables)?;
    let n_obs = columns.first().map(Vec::len).unwrap_or(0);
    if n_obs == 0 {
        return Err(Error::Degenerate(
            "no observations after dropping missing factor variables".to_string(),
        ));
    }
    let corr = correlation_matrix(&columns);
    let mut loadings = paf_loadings(&corr).ok_or_else(|| {
        Error::Degenerate("factor extraction failed on a degenerate correlation matrix".to_string())
    })?;

    let mut matrix = Array2::from_shape_fn((loadings.len(), 1), |(i, _)| loadings[i]);
    varimax(&mut matrix);
    for (i, loading) in loadings.iter_mut().enumerate() {
        *loading = matrix[[i, 0]];
    }
    // Anchor the factor's sign so loadings read positively
    if loadings.iter().sum::<f64>() < 0.0 {
        for loading in loadings.iter_mut() {
            *loading = -*loading;
        }
    }
    info!(n_obs, "EFA completed");
    Ok(FactorLoadings {
        variables: variables.iter().map(|v| v.to_string()).collect(),
        loadings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhs_common::Value;
    use ndarray::array;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return false;
        }
        (a - b).abs() <= tol
    }

    fn equicorrelated(p: usize, rho: f64) -> Array2<f64> {
        Array2::from_shape_fn((p, p), |(i, j)| if i == j { 1.0 } else { rho })
    }

    #[test]
    fn kmo_of_equicorrelated_half_is_point_eight() {
        // Partial correlations of an equicorrelated(0.5) matrix are
        // 0.25, giving KMO = 0.25^2*12 / (0.25^2*12 + 0.0625*12) = 0.8
        let kmo = kmo_from_corr(&equicorrelated(4, 0.5));
        assert!(approx_eq(kmo, 0.8, 1e-9));
    }

    #[test]
    fn kmo_of_identity_is_undefined() {
        let kmo = kmo_from_corr(&equicorrelated(4, 0.0));
        assert!(kmo.is_nan());
    }

    #[test]
    fn bartlett_matches_closed_form() {
        let corr = equicorrelated(4, 0.5);
        // det = (1-rho)^3 (1+3 rho) = 0.3125
        let (chi, p) = bartlett_from_corr(&corr, 30);
        let expected = -(30.0 - 1.0 - 13.0 / 6.0) * 0.3125f64.ln();
        assert!(approx_eq(chi, expected, 1e-9));
        assert!(p < 0.001);
    }

    #[test]
    fn bartlett_identity_has_zero_statistic() {
        let (chi, p) = bartlett_from_corr(&equicorrelated(4, 0.0), 50);
        assert!(approx_eq(chi, 0.0, 1e-9));
        assert!(approx_eq(p, 1.0, 1e-9));
    }

    #[test]
    fn paf_recovers_equicorrelated_loadings() {
        // Fixed point of one-factor PAF on equicorrelated(rho) has
        // uniform loadings sqrt(rho)
        let loadings = paf_loadings(&equicorrelated(4, 0.5)).unwrap();
        for l in &loadings {
            assert!(approx_eq(l.abs(), 0.5f64.sqrt(), 0.02));
        }
    }

    #[test]
    fn varimax_restores_simple_structure() {
        // A 45-degree rotation of a two-block simple structure
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let mut loadings = array![[s, s], [s, s], [s, -s], [s, -s]];
        varimax(&mut loadings);
        for row in 0..4 {
            let small = loadings[[row, 0]].abs().min(loadings[[row, 1]].abs());
            let large = loadings[[row, 0]].abs().max(loadings[[row, 1]].abs());
            assert!(small < 0.05, "row {row} not simple: {loadings:?}");
            assert!(approx_eq(large, 1.0, 0.05));
        }
    }

    fn score_frame(columns: &[(&str, Vec<f64>)]) -> Frame {
        Frame::from_columns(
            columns
                .iter()
                .map(|(name, values)| {
                    (
                        name.to_string(),
                        values.iter().map(|v| Value::Num(*v)).collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    /// Four score columns riding one common pattern with distinct
    /// small perturbations (no exact linear dependency).
    fn correlated_frame() -> Frame {
        let n = 24;
        let common: Vec<f64> = (0..n).map(|i| (i % 5) as f64).collect();
        let wiggle = |shift: usize, amp: f64| -> Vec<f64> {
            common
                .iter()
                .enumerate()
                .map(|(i, c)| c + ((i + shift) % 3) as f64 * amp)
                .collect()
        };
        let financial: Vec<f64> = common
            .iter()
            .enumerate()
            .map(|(i, c)| c + (i % 2) as f64 * 0.6)
            .collect();
        score_frame(&[
            ("Stress_Level", wiggle(0, 0.8)),
            ("Depression_Score", wiggle(1, 0.7)),
            ("Anxiety_Score", wiggle(2, 0.9)),
            ("Financial_Stress", financial),
        ])
    }

    /// Four near-orthogonal score columns.
    fn independent_frame() -> Frame {
        let n = 24;
        let cycle = |period: usize| -> Vec<f64> {
            (0..n).map(|i| ((i / period) % 2) as f64 * 4.0).collect()
        };
        score_frame(&[
            ("Stress_Level", cycle(1)),
            ("Depression_Score", cycle(2)),
            ("Anxiety_Score", cycle(4)),
            ("Financial_Stress", cycle(8)),
        ])
    }

    const VARS: [&str; 4] = [
        "Stress_Level",
        "Depression_Score",
        "Anxiety_Score",
        "Financial_Stress",
    ];

    #[test]
    fn gate_passes_on_correlated_scores() {
        let gate = check_efa_assumptions(&correlated_frame(), &VARS).unwrap();
        assert!(gate.kmo_ok(), "kmo = {}", gate.kmo);
        assert!(gate.bartlett_ok(), "p = {}", gate.p_value);
        assert!(gate.passes());
        assert_eq!(gate.n_obs, 24);
    }

    #[test]
    fn gate_fails_on_near_independent_scores() {
        let gate = check_efa_assumptions(&independent_frame(), &VARS).unwrap();
        assert!(!gate.passes());
    }

    #[test]
    fn gate_errors_with_no_observations() {
        let frame = score_frame(&[
            ("Stress_Level", vec![]),
            ("Depression_Score", vec![]),
            ("Anxiety_Score", vec![]),
            ("Financial_Stress", vec![]),
        ]);
        let err = check_efa_assumptions(&frame, &VARS).unwrap_err();
        assert!(matches!(err, Error::Degenerate(_)));
    }

    #[test]
    fn efa_loadings_are_positive_on_common_factor() {
        let out = perform_efa(&correlated_frame(), &VARS).unwrap();
        assert_eq!(out.variables.len(), 4);
        for loading in &out.loadings {
            assert!(*loading > 0.3, "loadings = {:?}", out.loadings);
        }
    }

    #[test]
    fn gate_table_records_all_three_statistics() {
        let gate = check_efa_assumptions(&correlated_frame(), &VARS).unwrap();
        let table = gate.table();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[2][2], "Score > 0.6");
    }
}
