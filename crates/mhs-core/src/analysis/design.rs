//! Model-matrix assembly.
//!
//! The predictor set of a model is resolved in two explicit steps so it
//! is testable without any fitting:
//!
//! 1. [`available_predictors`] computes the ordered intersection of a
//!    candidate list with the frame's columns, once per call.
//! 2. [`ModelSpec`] carries the fully resolved term list; the fitting
//!    step consumes it verbatim and never re-derives availability.
//!
//! Helper-column derivations operate on the engine's local clone of the
//! frame, never on the shared clean frame.

use mhs_common::schema::{
    GENDER, GENDER_NUM, SOCIAL_SUPPORT, SOCIAL_SUPPORT_CENTERED, SOCIAL_SUPPORT_NUM,
};
use mhs_common::{Frame, Result, Value};
use ndarray::Array2;
use tracing::{info, warn};

/// Ordered intersection of `candidates` with the frame's columns.
pub fn available_predictors(frame: &Frame, candidates: &[&str]) -> Vec<String> {
    let mut available = Vec::new();
    for &candidate in candidates {
        if frame.has_column(candidate) {
            available.push(candidate.to_string());
        } else {
            warn!(column = candidate, "column not found, removed from model");
        }
    }
    available
}

/// One right-hand-side term of a model.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A single named column.
    Column(String),
    /// The elementwise product of two named columns.
    Interaction(String, String),
}

impl Term {
    /// Display name of the term, patsy-style for interactions.
    pub fn name(&self) -> String {
        match self {
            Term::Column(name) => name.clone(),
            Term::Interaction(a, b) => format!("{a}:{b}"),
        }
    }

    fn columns(&self) -> Vec<&str> {
        match self {
            Term::Column(name) => vec![name.as_str()],
            Term::Interaction(a, b) => vec![a.as_str(), b.as_str()],
        }
    }
}

/// A fully resolved model specification.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub response: String,
    pub terms: Vec<Term>,
}

impl ModelSpec {
    /// Term names in design-matrix order, intercept first.
    pub fn term_names(&self) -> Vec<String> {
        let mut names = vec!["Intercept".to_string()];
        names.extend(self.terms.iter().map(Term::name));
        names
    }
}

/// Response vector plus intercept-led design matrix over complete
/// cases.
#[derive(Debug, Clone)]
pub struct Design {
    pub response: Vec<f64>,
    pub matrix: Array2<f64>,
    pub names: Vec<String>,
}

/// Materialize a spec against a frame, keeping only rows where the
/// response and every referenced column are present.
pub fn build_design(frame: &Frame, spec: &ModelSpec) -> Result<Design> {
    let response = frame.numeric(&spec.response)?;
    let mut referenced: Vec<&str> = Vec::new();
    for term in &spec.terms {
        for col in term.columns() {
            if !referenced.contains(&col) {
                referenced.push(col);
            }
        }
    }
    let columns: Vec<Vec<Option<f64>>> = referenced
        .iter()
        .map(|col| frame.numeric(col))
        .collect::<Result<_>>()?;

    let complete: Vec<usize> = (0..frame.nrows())
        .filter(|&row| response[row].is_some() && columns.iter().all(|col| col[row].is_some()))
        .collect();

    let col_value = |name: &str, row: usize| -> f64 {
        let idx = referenced.iter().position(|c| *c == name).unwrap();
        columns[idx][row].unwrap()
    };

    let n = complete.len();
    let p = spec.terms.len() + 1;
    let mut matrix = Array2::zeros((n, p));
    let mut y = Vec::with_capacity(n);
    for (out_row, &row) in complete.iter().enumerate() {
        y.push(response[row].unwrap());
        matrix[[out_row, 0]] = 1.0;
        for (term_idx, term) in spec.terms.iter().enumerate() {
            matrix[[out_row, term_idx + 1]] = match term {
                Term::Column(name) => col_value(name, row),
                Term::Interaction(a, b) => col_value(a, row) * col_value(b, row),
            };
        }
    }
    Ok(Design {
        response: y,
        matrix,
        names: spec.term_names(),
    })
}

/// Ensure `Social_Support_num` exists: a numeric view of
/// `Social_Support` when that column is present, all-missing otherwise.
pub fn derive_support_numeric(frame: &mut Frame) -> Result<()> {
    if frame.has_column(SOCIAL_SUPPORT_NUM) {
        return Ok(());
    }
    let column = if frame.has_column(SOCIAL_SUPPORT) {
        info!("created Social_Support_num from Social_Support");
        frame
            .column(SOCIAL_SUPPORT)?
            .iter()
            .map(|cell| match cell {
                Value::Num(v) => Value::Num(*v),
                Value::Str(s) => s
                    .parse::<f64>()
                    .map(Value::Num)
                    .unwrap_or(Value::Null),
                Value::Null => Value::Null,
            })
            .collect()
    } else {
        warn!("no Social_Support column found; filling missing");
        vec![Value::Null; frame.nrows()]
    };
    frame.with_column(SOCIAL_SUPPORT_NUM, column)
}

/// Append the mean-centered support predictor `SS_c`.
pub fn derive_centered_support(frame: &mut Frame) -> Result<()> {
    let support = frame.numeric(SOCIAL_SUPPORT_NUM)?;
    let present: Vec<f64> = support.iter().flatten().copied().collect();
    let center = mhs_math::mean(&present);
    let centered: Vec<Value> = support
        .iter()
        .map(|v| match v {
            Some(value) => Value::Num(value - center),
            None => Value::Null,
        })
        .collect();
    frame.with_column(SOCIAL_SUPPORT_CENTERED, centered)
}

/// Ensure `Gender_num` exists via order-of-appearance factorization of
/// `Gender`. Missing gender factorizes to -1, matching the reference
/// encoding.
pub fn derive_gender_code(frame: &mut Frame) -> Result<()> {
    if frame.has_column(GENDER_NUM) || !frame.has_column(GENDER) {
        return Ok(());
    }
    info!("created Gender_num from Gender");
    let mut seen: Vec<String> = Vec::new();
    let codes: Vec<Value> = frame
        .column(GENDER)?
        .iter()
        .map(|cell| match cell.as_str() {
            Some(label) => {
                let code = match seen.iter().position(|s| s == label) {
                    Some(idx) => idx,
                    None => {
                        seen.push(label.to_string());
                        seen.len() - 1
                    }
                };
                Value::Num(code as f64)
            }
            None => Value::Num(-1.0),
        })
        .collect();
    frame.with_column(GENDER_NUM, codes)
}
