//! Cleaning orchestrator.
//!
//! Transforms the raw survey export into the analysis-ready frame in a
//! fixed order with no knobs:
//!
//! 1. CGPA mean over the original unfiltered frame
//! 2. Drop rows with missing `Substance_Use`
//! 3. Impute remaining missing CGPA with the step-1 mean
//! 4. Derive `Is_STEM`
//! 5. Recode the six ordinal lifestyle columns
//! 6. IQR fences on {Age, CGPA, Semester_Credit_Load}, then literal
//!    [0, 5] bounds on the four clinical scores
//!
//! `pre_process` is pure; the caller persists the returned frame as the
//! clean snapshot, which is the single source of truth for every
//! downstream analysis (and for re-runs, which load the snapshot rather
//! than recompute it).

pub mod outliers;
pub mod recode;

use mhs_common::schema::{CGPA, OUTLIER_COLUMNS, SCORE_COLUMNS, SUBSTANCE_USE};
use mhs_common::{Frame, Result, Value};
use mhs_math::mean;
use serde::Serialize;
use tracing::{info, warn};

pub use outliers::{iqr_filter, range_filter, DropCounts};
pub use recode::{derive_stem, recode_ordinals, UnmappedCounts};

/// What the cleaning pass did, for the run log and summary payload.
#[derive(Debug, Clone, Serialize)]
pub struct CleanSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_missing_substance: usize,
    pub imputed_cgpa: usize,
    pub unmapped_labels: UnmappedCounts,
    pub outlier_drops: Vec<(String, usize)>,
    pub range_drops: Vec<(String, usize)>,
}

/// Run the full cleaning sequence over a raw frame.
pub fn pre_process(raw: &Frame) -> Result<(Frame, CleanSummary)> {
    let rows_in = raw.nrows();
    let mut frame = raw.clone();

    // The imputation mean comes from the column before any row is
    // dropped, so retention of other rows cannot shift it.
    let cgpa_mean = mean(&frame.numeric_dropna(CGPA)?);

    let substance = frame.column(SUBSTANCE_USE)?;
    let keep: Vec<bool> = substance.iter().map(|v| !v.is_null()).collect();
    let dropped_missing_substance = keep.iter().filter(|k| !**k).count();
    frame.retain(&keep);

    let mut imputed_cgpa = 0usize;
    if cgpa_mean.is_finite() {
        let filled: Vec<Value> = frame
            .column(CGPA)?
            .iter()
            .map(|cell| {
                if cell.is_null() {
                    imputed_cgpa += 1;
                    Value::Num(cgpa_mean)
                } else {
                    cell.clone()
                }
            })
            .collect();
        frame.with_column(CGPA, filled)?;
    }

    derive_stem(&mut frame)?;
    let unmapped_labels = recode_ordinals(&mut frame)?;
    for (column, count) in &unmapped_labels {
        warn!(column, count, "ordinal labels left unmapped");
    }

    let outlier_columns: Vec<&str> = OUTLIER_COLUMNS.to_vec();
    let outlier_drops = iqr_filter(&mut frame, &outlier_columns)?;
    let score_columns: Vec<&str> = SCORE_COLUMNS.to_vec();
    let range_drops = range_filter(&mut frame, &score_columns, 0.0, 5.0)?;

    let summary = CleanSummary {
        rows_in,
        rows_out: frame.nrows(),
        dropped_missing_substance,
        imputed_cgpa,
        unmapped_labels,
        outlier_drops,
        range_drops,
    };
    info!(
        rows_in = summary.rows_in,
        rows_out = summary.rows_out,
        "cleaning complete"
    );
    Ok((frame, summary))
}
