//! OLS regression with an interaction term and HC3 robust errors.
//!
//! The model is `outcome ~ Is_STEM * SS_c` plus whichever of
//! {Age, Gender_num, CGPA, Semester_Credit_Load} the frame actually
//! carries, resolved once per call. A fit failure (singular design, too
//! few observations) is a legitimate terminal state reported as `None`,
//! never an error; the diagnostics degrade to NaN on a null model.

use crate::analysis::design::{
    available_predictors, build_design, derive_centered_support, derive_gender_code,
    derive_support_numeric, Design, ModelSpec, Term,
};
use crate::analysis::linalg::{inverse_spd, solve_spd};
use mhs_common::schema::{
    AGE, CGPA, GENDER_NUM, IS_STEM, SEMESTER_CREDIT_LOAD, SOCIAL_SUPPORT_CENTERED,
};
use mhs_common::{Frame, Result};
use mhs_math::{chi_square_sf, mean, student_t_quantile, student_t_two_sided};
use mhs_report::{table::fmt_stat, Table};
use ndarray::{Array1, Array2};
use tracing::{error, info, warn};

/// One fitted coefficient with its robust inference columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefRow {
    pub term: String,
    pub estimate: f64,
    pub std_err: f64,
    pub statistic: f64,
    pub p_value: f64,
    pub ci_low: f64,
    pub ci_high: f64,
}

/// Render a coefficient table; `stat_label` is "t" or "z".
pub fn coef_table(coefs: &[CoefRow], stat_label: &str) -> Table {
    let mut table = Table::new([
        "term",
        "coef",
        "std_err",
        stat_label,
        "p",
        "ci_low",
        "ci_high",
    ]);
    for row in coefs {
        table.push_row([
            row.term.clone(),
            fmt_stat(row.estimate),
            fmt_stat(row.std_err),
            fmt_stat(row.statistic),
            fmt_stat(row.p_value),
            fmt_stat(row.ci_low),
            fmt_stat(row.ci_high),
        ]);
    }
    table
}

/// A fitted OLS model.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefs: Vec<CoefRow>,
    pub residuals: Vec<f64>,
    pub design: Array2<f64>,
    pub nobs: usize,
    pub df_resid: f64,
}

impl OlsFit {
    pub fn term_names(&self) -> Vec<String> {
        self.coefs.iter().map(|c| c.term.clone()).collect()
    }
}

/// Build the model terms for a frame: the mandatory flag/support main
/// effects, the available optional predictors, and the interaction
/// ordered last.
pub fn regression_spec(frame: &Frame, outcome: &str) -> ModelSpec {
    let optional = available_predictors(frame, &[AGE, GENDER_NUM, CGPA, SEMESTER_CREDIT_LOAD]);
    let mut terms = vec![
        Term::Column(IS_STEM.to_string()),
        Term::Column(SOCIAL_SUPPORT_CENTERED.to_string()),
    ];
    terms.extend(optional.into_iter().map(Term::Column));
    terms.push(Term::Interaction(
        IS_STEM.to_string(),
        SOCIAL_SUPPORT_CENTERED.to_string(),
    ));
    ModelSpec {
        response: outcome.to_string(),
        terms,
    }
}

/// Fit the interaction model with HC3 standard errors.
///
/// Returns `Ok(None)` on fit failure; a missing mandatory column is
/// still a schema violation and propagates.
pub fn run_regression(frame: &Frame, outcome: &str) -> Result<Option<OlsFit>> {
    info!(outcome, "running OLS regression with interaction");
    let mut local = frame.clone();
    derive_support_numeric(&mut local)?;
    derive_centered_support(&mut local)?;
    derive_gender_code(&mut local)?;

    let spec = regression_spec(&local, outcome);
    let formula: Vec<String> = spec.terms.iter().map(Term::name).collect();
    info!(formula = %format!("{outcome} ~ {}", formula.join(" + ")), "regression formula");

    let design = build_design(&local, &spec)?;
    match fit_ols_hc3(&design) {
        Some(fit) => Ok(Some(fit)),
        None => {
            error!("regression failed; returning no model");
            Ok(None)
        }
    }
}

/// OLS with HC3 heteroscedasticity-robust covariance.
fn fit_ols_hc3(design: &Design) -> Option<OlsFit> {
    let x = &design.matrix;
    let n = x.nrows();
    let p = x.ncols();
    if n <= p {
        warn!(nobs = n, params = p, "too few observations to fit");
        return None;
    }
    let y = Array1::from_vec(design.response.clone());

    let xtx = x.t().dot(x);
    let xty = x.t().dot(&y).insert_axis(ndarray::Axis(1));
    let beta = solve_spd(&xtx, &xty)?;
    let xtx_inv = inverse_spd(&xtx)?;

    let beta_vec: Vec<f64> = beta.column(0).to_vec();
    let fitted = x.dot(&Array1::from_vec(beta_vec.clone()));
    let residuals: Vec<f64> = y
        .iter()
        .zip(fitted.iter())
        .map(|(obs, fit)| obs - fit)
        .collect();

    // HC3: weight each squared residual by (1 - h_ii)^-2
    let mut meat = Array2::zeros((p, p));
    for i in 0..n {
        let xi = x.row(i);
        let hat = xi.dot(&xtx_inv.dot(&xi.t()));
        let one_minus = 1.0 - hat;
        let w = residuals[i] * residuals[i] / (one_minus * one_minus);
        for a in 0..p {
            for b in 0..p {
                meat[[a, b]] += w * xi[a] * xi[b];
            }
        }
    }
    let cov = xtx_inv.dot(&meat).dot(&xtx_inv);

    let df_resid = (n - p) as f64;
    let t_crit = student_t_quantile(0.975, df_resid);
    let mut coefs = Vec::with_capacity(p);
    for idx in 0..p {
        let estimate = beta[[idx, 0]];
        let variance = cov[[idx, idx]];
        if !variance.is_finite() || variance < 0.0 {
            warn!(term = %design.names[idx], "non-finite robust variance");
            return None;
        }
        let std_err = variance.sqrt();
        let statistic = estimate / std_err;
        coefs.push(CoefRow {
            term: design.names[idx].clone(),
            estimate,
            std_err,
            statistic,
            p_value: student_t_two_sided(statistic, df_resid),
            ci_low: estimate - t_crit * std_err,
            ci_high: estimate + t_crit * std_err,
        });
    }
    Some(OlsFit {
        coefs,
        residuals,
        design: x.clone(),
        nobs: n,
        df_resid,
    })
}

/// Breusch-Pagan heteroscedasticity diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct BreuschPagan {
    pub lm: f64,
    pub p_value: f64,
}

impl BreuschPagan {
    fn undefined() -> BreuschPagan {
        BreuschPagan {
            lm: f64::NAN,
            p_value: f64::NAN,
        }
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(["breusch_lm", "breusch_pvalue"]);
        table.push_row([fmt_stat(self.lm), fmt_stat(self.p_value)]);
        table
    }
}

/// Lagrange-multiplier test of the squared residuals against the fitted
/// design. A null model records NaN rather than skipping the artifact.
pub fn regression_diagnostics(fit: Option<&OlsFit>) -> BreuschPagan {
    info!("running regression diagnostics");
    let Some(fit) = fit else {
        warn!("no model object; diagnostics undefined");
        return BreuschPagan::undefined();
    };
    let x = &fit.design;
    let n = x.nrows();
    let p = x.ncols();
    if p < 2 {
        return BreuschPagan::undefined();
    }
    let sq: Vec<f64> = fit.residuals.iter().map(|e| e * e).collect();
    let y = Array1::from_vec(sq.clone());
    let xtx = x.t().dot(x);
    let xty = x.t().dot(&y).insert_axis(ndarray::Axis(1));
    let Some(beta) = solve_spd(&xtx, &xty) else {
        return BreuschPagan::undefined();
    };
    let beta_vec: Vec<f64> = beta.column(0).to_vec();
    let fitted = x.dot(&Array1::from_vec(beta_vec));
    let ssr: f64 = y
        .iter()
        .zip(fitted.iter())
        .map(|(obs, fit)| (obs - fit) * (obs - fit))
        .sum();
    let grand = mean(&sq);
    let sst: f64 = sq.iter().map(|v| (v - grand) * (v - grand)).sum();
    if sst <= 0.0 {
        return BreuschPagan::undefined();
    }
    let r_sq = 1.0 - ssr / sst;
    let lm = n as f64 * r_sq;
    BreuschPagan {
        lm,
        p_value: chi_square_sf(lm, (p - 1) as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhs_common::schema;
    use mhs_common::Value;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|v| Value::Num(*v)).collect()
    }

    /// Frame with the mandatory columns plus whatever extras are given.
    fn regression_frame(extra: &[(&str, Vec<Value>)]) -> Frame {
        let flags = [1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let support = [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 2.0];
        let outcome = [3.9, 3.1, 2.2, 4.1, 2.8, 1.9, 3.1, 2.4, 1.6, 2.3];
        let mut cols = vec![
            (schema::IS_STEM.to_string(), nums(&flags)),
            (schema::SOCIAL_SUPPORT.to_string(), nums(&support)),
            (schema::ANXIETY_SCORE.to_string(), nums(&outcome)),
        ];
        for (name, values) in extra {
            cols.push((name.to_string(), values.clone()));
        }
        Frame::from_columns(cols).unwrap()
    }

    #[test]
    fn predictor_set_tracks_available_columns() {
        let bare = regression_frame(&[]);
        let mut local = bare.clone();
        derive_support_numeric(&mut local).unwrap();
        derive_centered_support(&mut local).unwrap();
        derive_gender_code(&mut local).unwrap();
        let spec = regression_spec(&local, schema::ANXIETY_SCORE);
        assert_eq!(
            spec.term_names(),
            vec!["Intercept", "Is_STEM", "SS_c", "Is_STEM:SS_c"]
        );

        let richer = regression_frame(&[
            (schema::AGE, nums(&[20.0; 10])),
            (schema::CGPA, nums(&[3.0; 10])),
        ]);
        let mut local = richer.clone();
        derive_support_numeric(&mut local).unwrap();
        derive_centered_support(&mut local).unwrap();
        derive_gender_code(&mut local).unwrap();
        let spec = regression_spec(&local, schema::ANXIETY_SCORE);
        assert_eq!(
            spec.term_names(),
            vec!["Intercept", "Is_STEM", "SS_c", "Age", "CGPA", "Is_STEM:SS_c"]
        );
    }

    #[test]
    fn fit_recovers_group_effect() {
        let frame = regression_frame(&[]);
        let fit = run_regression(&frame, schema::ANXIETY_SCORE)
            .unwrap()
            .expect("model should fit");
        assert_eq!(fit.nobs, 10);
        let stem = fit
            .coefs
            .iter()
            .find(|c| c.term == schema::IS_STEM)
            .unwrap();
        // STEM rows sit roughly one point above the rest
        assert!(stem.estimate > 0.4);
        assert!(stem.std_err.is_finite() && stem.std_err > 0.0);
        assert!(stem.ci_low < stem.estimate && stem.estimate < stem.ci_high);
    }

    #[test]
    fn too_few_observations_yield_no_model() {
        let frame = Frame::from_columns(vec![
            (schema::IS_STEM.to_string(), nums(&[1.0, 0.0])),
            (schema::SOCIAL_SUPPORT.to_string(), nums(&[1.0, 2.0])),
            (schema::ANXIETY_SCORE.to_string(), nums(&[2.0, 3.0])),
        ])
        .unwrap();
        let fit = run_regression(&frame, schema::ANXIETY_SCORE).unwrap();
        assert!(fit.is_none());
    }

    #[test]
    fn missing_mandatory_column_is_schema_violation() {
        let frame = Frame::from_columns(vec![
            (schema::SOCIAL_SUPPORT.to_string(), nums(&[1.0, 2.0])),
            (schema::ANXIETY_SCORE.to_string(), nums(&[2.0, 3.0])),
        ])
        .unwrap();
        assert!(run_regression(&frame, schema::ANXIETY_SCORE).is_err());
    }

    #[test]
    fn diagnostics_on_null_model_are_nan() {
        let out = regression_diagnostics(None);
        assert!(out.lm.is_nan());
        assert!(out.p_value.is_nan());
    }

    #[test]
    fn diagnostics_on_fitted_model_are_defined() {
        let frame = regression_frame(&[]);
        let fit = run_regression(&frame, schema::ANXIETY_SCORE).unwrap().unwrap();
        let out = regression_diagnostics(Some(&fit));
        assert!(out.lm.is_finite());
        assert!((0.0..=1.0).contains(&out.p_value));
    }

    #[test]
    fn coef_table_shape() {
        let frame = regression_frame(&[]);
        let fit = run_regression(&frame, schema::ANXIETY_SCORE).unwrap().unwrap();
        let table = coef_table(&fit.coefs, "t");
        assert_eq!(table.columns.len(), 7);
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[0][0], "Intercept");
    }
}
