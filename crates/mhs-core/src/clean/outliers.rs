//! Outlier and range filters.
//!
//! Both filters drop rows whose cell is missing or non-numeric in the
//! filtered column: a bound comparison against a missing value fails,
//! matching the reference behavior of the cleaning stage.

use mhs_common::{Frame, Result};
use mhs_math::quantile;
use tracing::debug;

/// Rows dropped per filtered column, in application order.
pub type DropCounts = Vec<(String, usize)>;

/// IQR fence filter, applied column by column.
///
/// Each column's quartiles are computed over the frame as it stands
/// after the previous column's filter, so the order of `columns` is part
/// of the contract: a row is dropped as soon as it fails one column's
/// fences, and later columns never see it.
pub fn iqr_filter(frame: &mut Frame, columns: &[&str]) -> Result<DropCounts> {
    let mut drops = DropCounts::new();
    for &col in columns {
        let values = frame.numeric(col)?;
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let q1 = quantile(&present, 0.25);
        let q3 = quantile(&present, 0.75);
        let iqr = q3 - q1;
        let lower = q1 - 1.5 * iqr;
        let upper = q3 + 1.5 * iqr;
        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.map_or(false, |x| x >= lower && x <= upper))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        debug!(
            column = col,
            lower, upper, dropped, "applied IQR fences"
        );
        frame.retain(&keep);
        drops.push((col.to_string(), dropped));
    }
    Ok(drops)
}

/// Literal range filter: retain rows with `lo <= value <= hi`.
pub fn range_filter(frame: &mut Frame, columns: &[&str], lo: f64, hi: f64) -> Result<DropCounts> {
    let mut drops = DropCounts::new();
    for &col in columns {
        let values = frame.numeric(col)?;
        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.map_or(false, |x| x >= lo && x <= hi))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        debug!(column = col, lo, hi, dropped, "applied range bounds");
        frame.retain(&keep);
        drops.push((col.to_string(), dropped));
    }
    Ok(drops)
}
