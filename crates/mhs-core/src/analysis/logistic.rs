//! Logistic screening of a thresholded outcome.
//!
//! The continuous outcome is binarized at `score >= threshold` and fit
//! against whichever of the fixed candidate predictors the frame
//! carries. No available predictors means no attempt; a fit failure
//! (non-convergence, singular information, separation) is logged and
//! reported as `None`.

use crate::analysis::design::{
    available_predictors, build_design, derive_gender_code, derive_support_numeric, Design,
    ModelSpec, Term,
};
use crate::analysis::linalg::{inverse_spd, solve_spd};
use crate::analysis::regression::CoefRow;
use mhs_common::schema::{AGE, CGPA, GENDER_NUM, IS_STEM, SOCIAL_SUPPORT_NUM};
use mhs_common::{Frame, Result, Value};
use mhs_math::{normal_quantile, normal_sf};
use ndarray::{Array1, Array2};
use tracing::{info, warn};

const MAX_ITERS: usize = 35;
const TOL: f64 = 1.0e-8;
const PROB_FLOOR: f64 = 1.0e-10;

/// Binary label column derived from the outcome.
const HIGH_LABEL: &str = "Outcome_high";

/// A fitted logistic model.
#[derive(Debug, Clone)]
pub struct LogitFit {
    pub coefs: Vec<CoefRow>,
    pub nobs: usize,
    pub iterations: usize,
}

impl LogitFit {
    pub fn term_names(&self) -> Vec<String> {
        self.coefs.iter().map(|c| c.term.clone()).collect()
    }
}

/// Threshold the outcome and fit a logistic model over the available
/// predictors.
///
/// A missing outcome column skips the engine entirely (`None`), as does
/// an empty predictor set.
pub fn logistic_check(frame: &Frame, outcome: &str, threshold: f64) -> Result<Option<LogitFit>> {
    info!(outcome, threshold, "running logistic regression");
    if !frame.has_column(outcome) {
        warn!(outcome, "outcome column not found; skipping logistic");
        return Ok(None);
    }
    let mut local = frame.clone();

    // A missing score fails the threshold, labeling the row low-risk.
    let labels: Vec<Value> = local
        .numeric(outcome)?
        .iter()
        .map(|v| {
            let high = v.map_or(false, |score| score >= threshold);
            Value::Num(if high { 1.0 } else { 0.0 })
        })
        .collect();
    local.with_column(HIGH_LABEL, labels)?;

    derive_support_numeric(&mut local)?;
    derive_gender_code(&mut local)?;

    let predictors =
        available_predictors(&local, &[IS_STEM, SOCIAL_SUPPORT_NUM, AGE, GENDER_NUM, CGPA]);
    if predictors.is_empty() {
        warn!("no predictors available for logistic model; skipping");
        return Ok(None);
    }
    info!(
        formula = %format!("{HIGH_LABEL} ~ {}", predictors.join(" + ")),
        "logistic formula"
    );
    let spec = ModelSpec {
        response: HIGH_LABEL.to_string(),
        terms: predictors.into_iter().map(Term::Column).collect(),
    };
    let design = build_design(&local, &spec)?;
    match fit_logit(&design) {
        Some(fit) => Ok(Some(fit)),
        None => {
            warn!("logistic regression failed; returning no model");
            Ok(None)
        }
    }
}

/// Newton/IRLS fit of the logistic likelihood.
fn fit_logit(design: &Design) -> Option<LogitFit> {
    let x = &design.matrix;
    let n = x.nrows();
    let p = x.ncols();
    if n <= p {
        warn!(nobs = n, params = p, "too few observations to fit");
        return None;
    }
    let y = Array1::from_vec(design.response.clone());

    let mut beta = Array1::<f64>::zeros(p);
    let mut ll_prev = f64::NEG_INFINITY;
    let mut iterations = 0;
    for iter in 0..MAX_ITERS {
        iterations = iter + 1;
        let eta = x.dot(&beta);
        let mu: Array1<f64> = eta
            .iter()
            .map(|e| (1.0 / (1.0 + (-e).exp())).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR))
            .collect();

        // Information matrix X' W X with W = mu (1 - mu)
        let mut info_mat = Array2::<f64>::zeros((p, p));
        let mut score = Array1::<f64>::zeros(p);
        for i in 0..n {
            let w = mu[i] * (1.0 - mu[i]);
            let r = y[i] - mu[i];
            for a in 0..p {
                score[a] += x[[i, a]] * r;
                for b in 0..p {
                    info_mat[[a, b]] += w * x[[i, a]] * x[[i, b]];
                }
            }
        }
        let rhs = score.clone().insert_axis(ndarray::Axis(1));
        let delta = solve_spd(&info_mat, &rhs)?;
        let step: Array1<f64> = delta.column(0).to_owned();

        // Step-halving keeps the likelihood monotone
        let mut scale = 1.0;
        let mut accepted = false;
        for _ in 0..8 {
            let candidate = &beta + &(step.clone() * scale);
            let ll = log_likelihood(x, &y, &candidate);
            if ll.is_finite() && ll >= ll_prev - 1e-12 {
                beta = candidate;
                ll_prev = ll;
                accepted = true;
                break;
            }
            scale *= 0.5;
        }
        if !accepted {
            warn!("logistic step-halving exhausted");
            return None;
        }
        if step.iter().map(|d| d.abs() * scale).fold(0.0, f64::max) < TOL {
            let cov = observed_information_inverse(x, &beta)?;
            return Some(summarize(design, &beta, &cov, n, iterations));
        }
    }
    warn!(iterations, "logistic regression did not converge");
    None
}

fn log_likelihood(x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> f64 {
    let eta = x.dot(beta);
    eta.iter()
        .zip(y.iter())
        .map(|(e, obs)| obs * e - (1.0 + e.exp()).ln())
        .sum()
}

fn observed_information_inverse(x: &Array2<f64>, beta: &Array1<f64>) -> Option<Array2<f64>> {
    let n = x.nrows();
    let p = x.ncols();
    let eta = x.dot(beta);
    let mut info_mat = Array2::<f64>::zeros((p, p));
    for i in 0..n {
        let mu = (1.0 / (1.0 + (-eta[i]).exp())).clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
        let w = mu * (1.0 - mu);
        for a in 0..p {
            for b in 0..p {
                info_mat[[a, b]] += w * x[[i, a]] * x[[i, b]];
            }
        }
    }
    inverse_spd(&info_mat)
}

fn summarize(
    design: &Design,
    beta: &Array1<f64>,
    cov: &Array2<f64>,
    nobs: usize,
    iterations: usize,
) -> LogitFit {
    // Normal-based inference for the logistic coefficients
    let z_crit = normal_quantile(0.975);
    let coefs = design
        .names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let estimate = beta[idx];
            let std_err = cov[[idx, idx]].max(0.0).sqrt();
            let statistic = estimate / std_err;
            CoefRow {
                term: name.clone(),
                estimate,
                std_err,
                statistic,
                p_value: (2.0 * normal_sf(statistic.abs())).min(1.0),
                ci_low: estimate - z_crit * std_err,
                ci_high: estimate + z_crit * std_err,
            }
        })
        .collect();
    LogitFit {
        coefs,
        nobs,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhs_common::schema;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|v| Value::Num(*v)).collect()
    }

    fn logistic_frame() -> Frame {
        // Labels stay mixed within every flag and support level so the
        // likelihood has a finite maximum
        let flags = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let support = [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0];
        let outcome = [4.0, 3.0, 2.0, 1.0, 5.0, 4.0, 3.0, 1.0, 2.0, 0.0, 4.0, 2.0];
        Frame::from_columns(vec![
            (schema::IS_STEM.to_string(), nums(&flags)),
            (schema::SOCIAL_SUPPORT.to_string(), nums(&support)),
            (schema::ANXIETY_SCORE.to_string(), nums(&outcome)),
        ])
        .unwrap()
    }

    #[test]
    fn fits_available_predictors_only() {
        let frame = logistic_frame();
        let fit = logistic_check(&frame, schema::ANXIETY_SCORE, 3.0)
            .unwrap()
            .expect("model should fit");
        assert_eq!(
            fit.term_names(),
            vec!["Intercept", "Is_STEM", "Social_Support_num"]
        );
        assert!(fit.iterations < MAX_ITERS);
        for coef in &fit.coefs {
            assert!(coef.std_err.is_finite());
            assert!((0.0..=1.0).contains(&coef.p_value));
        }
    }

    #[test]
    fn missing_outcome_skips_engine() {
        let frame = logistic_frame();
        let fit = logistic_check(&frame, "No_Such_Score", 3.0).unwrap();
        assert!(fit.is_none());
    }

    #[test]
    fn no_predictors_means_no_attempt() {
        let frame = Frame::from_columns(vec![(
            schema::ANXIETY_SCORE.to_string(),
            nums(&[1.0, 4.0, 2.0, 5.0]),
        )])
        .unwrap();
        // Social_Support_num is derived all-missing, so every design row
        // is incomplete and the only candidate column carries no data;
        // the availability list is still non-empty, but the fit cannot
        // proceed and reports no model.
        let fit = logistic_check(&frame, schema::ANXIETY_SCORE, 3.0).unwrap();
        assert!(fit.is_none());
    }

    #[test]
    fn separated_data_reports_no_model() {
        // Perfectly separated on the flag: likelihood diverges
        let flags = [1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let support = [1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0];
        let outcome = [5.0, 4.0, 5.0, 4.0, 1.0, 0.0, 1.0, 2.0];
        let frame = Frame::from_columns(vec![
            (schema::IS_STEM.to_string(), nums(&flags)),
            (schema::SOCIAL_SUPPORT.to_string(), nums(&support)),
            (schema::ANXIETY_SCORE.to_string(), nums(&outcome)),
        ])
        .unwrap();
        let fit = logistic_check(&frame, schema::ANXIETY_SCORE, 3.0).unwrap();
        assert!(fit.is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        // The label uses score >= threshold; a frame where every score
        // sits exactly at the threshold is all-positive and cannot fit.
        let frame = Frame::from_columns(vec![
            (schema::IS_STEM.to_string(), nums(&[1.0, 0.0, 1.0, 0.0, 1.0, 0.0])),
            (schema::SOCIAL_SUPPORT.to_string(), nums(&[1.0, 2.0, 3.0, 1.0, 2.0, 3.0])),
            (schema::ANXIETY_SCORE.to_string(), nums(&[3.0; 6])),
        ])
        .unwrap();
        let fit = logistic_check(&frame, schema::ANXIETY_SCORE, 3.0).unwrap();
        assert!(fit.is_none());
    }
}
