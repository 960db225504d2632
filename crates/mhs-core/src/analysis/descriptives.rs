//! Per-group descriptive statistics and the point-biserial screen.

use mhs_common::frame::format_cell;
use mhs_common::{Frame, Result};
use mhs_math::{mean, pearson, sample_std, student_t_two_sided};
use mhs_report::{table::fmt_stat, Table};
use tracing::{info, warn};

/// Mean/std/count of the outcome for one group value.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStat {
    pub group: String,
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

/// Group the outcome by the distinct values of `group_col`.
///
/// Rows with a missing group key are excluded; missing outcomes do not
/// count toward a group's `count`.
pub fn describe_by_group(frame: &Frame, group_col: &str, outcome: &str) -> Result<Vec<GroupStat>> {
    info!(group = group_col, outcome, "computing descriptive statistics by group");
    let groups = frame.column(group_col)?;
    let outcomes = frame.numeric(outcome)?;

    let mut keys: Vec<String> = groups
        .iter()
        .filter(|g| !g.is_null())
        .map(format_cell)
        .collect();
    keys.sort();
    keys.dedup();

    let mut stats = Vec::with_capacity(keys.len());
    for key in keys {
        let sample: Vec<f64> = groups
            .iter()
            .zip(outcomes.iter())
            .filter(|(g, _)| !g.is_null() && format_cell(g) == key)
            .filter_map(|(_, v)| *v)
            .collect();
        stats.push(GroupStat {
            group: key,
            mean: mean(&sample),
            std: sample_std(&sample),
            count: sample.len(),
        });
    }
    Ok(stats)
}

/// Render the group statistics as a flat table.
pub fn group_stats_table(group_col: &str, stats: &[GroupStat]) -> Table {
    let mut table = Table::new([group_col, "mean", "std", "count"]);
    for s in stats {
        table.push_row([
            s.group.clone(),
            fmt_stat(s.mean),
            fmt_stat(s.std),
            s.count.to_string(),
        ]);
    }
    table
}

/// Point-biserial correlation between a binary flag and an outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBiserial {
    pub r: f64,
    pub p: f64,
    pub n: usize,
}

impl PointBiserial {
    fn undefined(n: usize) -> PointBiserial {
        PointBiserial {
            r: f64::NAN,
            p: f64::NAN,
            n,
        }
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(["r", "p", "n"]);
        table.push_row([fmt_stat(self.r), fmt_stat(self.p), self.n.to_string()]);
        table
    }
}

/// Correlate `bin_col` with `cont_col` over pairwise-complete rows.
///
/// Fewer than 3 complete pairs yields the NaN sentinel, never an error.
pub fn point_biserial(frame: &Frame, bin_col: &str, cont_col: &str) -> Result<PointBiserial> {
    info!(bin = bin_col, cont = cont_col, "running point-biserial correlation");
    let flags = frame.numeric(bin_col)?;
    let values = frame.numeric(cont_col)?;
    let pairs: Vec<(f64, f64)> = flags
        .iter()
        .zip(values.iter())
        .filter_map(|(f, v)| Some(((*f)?, (*v)?)))
        .collect();
    let n = pairs.len();
    if n < 3 {
        warn!(n, "not enough data for correlation");
        return Ok(PointBiserial::undefined(n));
    }
    let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    let r = pearson(&x, &y);
    if r.is_nan() {
        return Ok(PointBiserial::undefined(n));
    }
    let df = (n - 2) as f64;
    let p = if (1.0 - r * r) <= f64::EPSILON {
        0.0
    } else {
        student_t_two_sided(r * (df / (1.0 - r * r)).sqrt(), df)
    };
    Ok(PointBiserial { r, p, n })
}
