//! Ordinal recoding and STEM-flag derivation.

use mhs_common::schema::{COURSE, IS_STEM, ORDINAL_COLUMNS, STEM_COURSES};
use mhs_common::{Frame, Result, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Label -> level lookup for one ordinal column.
///
/// Poor/Low/Never = 1, Average/Moderate/Occasionally = 2,
/// Good/High/Frequently = 3.
fn ordinal_levels(column: &str) -> &'static [(&'static str, f64)] {
    match column {
        "Sleep_Quality" | "Diet_Quality" => {
            &[("Poor", 1.0), ("Average", 2.0), ("Good", 3.0)]
        }
        "Social_Support" | "Physical_Activity" => {
            &[("Low", 1.0), ("Moderate", 2.0), ("High", 3.0)]
        }
        "Counseling_Service_Use" | "Substance_Use" => {
            &[("Never", 1.0), ("Occasionally", 2.0), ("Frequently", 3.0)]
        }
        _ => &[],
    }
}

/// Per-column counts of labels the lookup did not recognize.
///
/// Unrecognized labels pass through unchanged; the count exists so a run
/// can surface them instead of hiding a possible data-quality defect.
pub type UnmappedCounts = BTreeMap<String, usize>;

/// Recode the six ordinal lifestyle columns to 1/2/3 in place.
///
/// Numeric and missing cells are left alone, which makes a second pass
/// over already-recoded data a no-op.
pub fn recode_ordinals(frame: &mut Frame) -> Result<UnmappedCounts> {
    let mut unmapped = UnmappedCounts::new();
    for &col in ORDINAL_COLUMNS.iter() {
        let levels = ordinal_levels(col);
        let mut misses = 0usize;
        let recoded: Vec<Value> = frame
            .column(col)?
            .iter()
            .map(|cell| match cell {
                Value::Str(label) => match levels.iter().find(|(name, _)| name == label) {
                    Some((_, level)) => Value::Num(*level),
                    None => {
                        misses += 1;
                        cell.clone()
                    }
                },
                other => other.clone(),
            })
            .collect();
        frame.with_column(col, recoded)?;
        if misses > 0 {
            unmapped.insert(col.to_string(), misses);
        }
        debug!(column = col, unmapped = misses, "recoded ordinal column");
    }
    Ok(unmapped)
}

/// Append the binary STEM indicator derived from `Course`.
///
/// The flag is derived exactly once during cleaning and never
/// recomputed downstream.
pub fn derive_stem(frame: &mut Frame) -> Result<()> {
    let flags: Vec<Value> = frame
        .column(COURSE)?
        .iter()
        .map(|cell| {
            let is_stem = cell
                .as_str()
                .map(|course| STEM_COURSES.contains(&course))
                .unwrap_or(false);
            Value::Num(if is_stem { 1.0 } else { 0.0 })
        })
        .collect();
    frame.with_column(IS_STEM, flags)
}
