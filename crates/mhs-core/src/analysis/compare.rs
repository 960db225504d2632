//! Group-comparison engine.
//!
//! Two-sample path: Welch t-test and Mann-Whitney U between the two
//! values of a binary grouping column, with Cohen's d as the effect
//! size. Undersized samples yield NaN sentinels that are persisted, not
//! raised.
//!
//! k-sample path: one-way ANOVA across every distinct value of a
//! multi-valued grouping column, with Tukey HSD pairwise comparisons
//! when the omnibus test is significant. Degenerate designs here are
//! errors that propagate to the caller.

use mhs_common::{Error, Frame, Result};
use mhs_math::{
    average_ranks, f_sf, mean, normal_sf, sample_var, student_t_two_sided,
    studentized_range_quantile, studentized_range_sf,
};
use mhs_report::{table::fmt_stat, Table};
use tracing::{info, warn};

/// Split the outcome into the group-1 and group-0 samples, dropping
/// missing outcome values independently per side.
fn split_binary(frame: &Frame, group_col: &str, outcome: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let groups = frame.numeric(group_col)?;
    let values = frame.numeric(outcome)?;
    let mut a = Vec::new();
    let mut b = Vec::new();
    for (g, v) in groups.iter().zip(values.iter()) {
        match (g, v) {
            (Some(flag), Some(value)) if *flag == 1.0 => a.push(*value),
            (Some(flag), Some(value)) if *flag == 0.0 => b.push(*value),
            _ => {}
        }
    }
    Ok((a, b))
}

/// Cohen's d with pooled (n-1)-weighted variance.
///
/// NaN when either sample has fewer than 2 observations or the pooled
/// standard deviation is zero.
pub fn cohens_d(x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 || y.len() < 2 {
        return f64::NAN;
    }
    let nx = x.len() as f64;
    let ny = y.len() as f64;
    let pooled = (((nx - 1.0) * sample_var(x, 1) + (ny - 1.0) * sample_var(y, 1))
        / (nx + ny - 2.0))
        .sqrt();
    if pooled > 0.0 {
        (mean(x) - mean(y)) / pooled
    } else {
        f64::NAN
    }
}

/// Welch t-test result; NaN-valued when a side is undersized.
#[derive(Debug, Clone, PartialEq)]
pub struct WelchResult {
    pub t: f64,
    pub p: f64,
    pub cohens_d: f64,
}

impl WelchResult {
    fn undefined() -> WelchResult {
        WelchResult {
            t: f64::NAN,
            p: f64::NAN,
            cohens_d: f64::NAN,
        }
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(["t", "p", "cohens_d"]);
        table.push_row([fmt_stat(self.t), fmt_stat(self.p), fmt_stat(self.cohens_d)]);
        table
    }
}

/// Welch's unequal-variance t-test of `outcome` between group 1 and 0.
pub fn welch_test(frame: &Frame, group_col: &str, outcome: &str) -> Result<WelchResult> {
    info!(group = group_col, outcome, "running Welch t-test");
    let (a, b) = split_binary(frame, group_col, outcome)?;
    info!(n1 = a.len(), n0 = b.len(), "group sizes");
    if a.len() < 2 || b.len() < 2 {
        warn!("not enough data for Welch test");
        return Ok(WelchResult::undefined());
    }
    let na = a.len() as f64;
    let nb = b.len() as f64;
    let va = sample_var(&a, 1) / na;
    let vb = sample_var(&b, 1) / nb;
    let se = (va + vb).sqrt();
    let t = (mean(&a) - mean(&b)) / se;
    let df = (va + vb) * (va + vb) / (va * va / (na - 1.0) + vb * vb / (nb - 1.0));
    let p = student_t_two_sided(t, df);
    Ok(WelchResult {
        t,
        p,
        cohens_d: cohens_d(&a, &b),
    })
}

/// Mann-Whitney U result; NaN-valued when a side is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MannWhitneyResult {
    pub u: f64,
    pub p: f64,
}

impl MannWhitneyResult {
    fn undefined() -> MannWhitneyResult {
        MannWhitneyResult {
            u: f64::NAN,
            p: f64::NAN,
        }
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new(["U", "p"]);
        table.push_row([fmt_stat(self.u), fmt_stat(self.p)]);
        table
    }
}

/// Two-sided Mann-Whitney U test via the tie-corrected normal
/// approximation with continuity correction. The reported statistic is
/// the group-1 sample's U.
pub fn mann_whitney(frame: &Frame, group_col: &str, outcome: &str) -> Result<MannWhitneyResult> {
    info!(group = group_col, outcome, "running Mann-Whitney U test");
    let (a, b) = split_binary(frame, group_col, outcome)?;
    if a.is_empty() || b.is_empty() {
        warn!("not enough data for Mann-Whitney");
        return Ok(MannWhitneyResult::undefined());
    }
    let n1 = a.len() as f64;
    let n2 = b.len() as f64;
    let n = n1 + n2;

    let mut pooled = a.clone();
    pooled.extend_from_slice(&b);
    let ranks = average_ranks(&pooled);
    let r1: f64 = ranks[..a.len()].iter().sum();
    let u1 = r1 - n1 * (n1 + 1.0) / 2.0;
    let u2 = n1 * n2 - u1;

    // Tie correction over the pooled sample
    let mut sorted = pooled.clone();
    sorted.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
    let mut tie_sum = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        tie_sum += t * t * t - t;
        i = j + 1;
    }

    let mu = n1 * n2 / 2.0;
    let sigma_sq = n1 * n2 / 12.0 * ((n + 1.0) - tie_sum / (n * (n - 1.0)));
    if sigma_sq <= 0.0 {
        warn!("zero rank variance; p undefined");
        return Ok(MannWhitneyResult { u: u1, p: f64::NAN });
    }
    let big_u = u1.max(u2);
    let z = (big_u - mu - 0.5) / sigma_sq.sqrt();
    let p = (2.0 * normal_sf(z)).min(1.0);
    Ok(MannWhitneyResult { u: u1, p })
}

/// One-way ANOVA result.
#[derive(Debug, Clone, PartialEq)]
pub struct AnovaResult {
    pub f: f64,
    pub p: f64,
    pub groups: usize,
    pub df_within: f64,
}

impl AnovaResult {
    pub fn table(&self) -> Table {
        let mut table = Table::new(["F", "p", "groups", "df_within"]);
        table.push_row([
            fmt_stat(self.f),
            fmt_stat(self.p),
            self.groups.to_string(),
            fmt_stat(self.df_within),
        ]);
        table
    }
}

/// Outcome samples keyed by the sorted distinct values of `group_col`.
fn split_k(frame: &Frame, group_col: &str, outcome: &str) -> Result<Vec<(String, Vec<f64>)>> {
    let groups = frame.column(group_col)?;
    let values = frame.numeric(outcome)?;
    let mut keys: Vec<String> = groups
        .iter()
        .filter_map(|g| g.as_str().map(str::to_string))
        .collect();
    keys.sort();
    keys.dedup();

    let mut samples = Vec::with_capacity(keys.len());
    for key in keys {
        let sample: Vec<f64> = groups
            .iter()
            .zip(values.iter())
            .filter(|(g, _)| g.as_str() == Some(key.as_str()))
            .filter_map(|(_, v)| *v)
            .collect();
        samples.push((key, sample));
    }
    Ok(samples)
}

/// One-way ANOVA of `outcome` across every distinct value of
/// `group_col`.
///
/// There is deliberately no minimum-group-size guard: a degenerate
/// design (fewer than two groups, an empty group, no within-group
/// degrees of freedom) is an error the caller sees, not a sentinel.
pub fn one_way_anova(frame: &Frame, group_col: &str, outcome: &str) -> Result<AnovaResult> {
    info!(group = group_col, outcome, "running one-way ANOVA");
    let samples = split_k(frame, group_col, outcome)?;
    let k = samples.len();
    if k < 2 {
        return Err(Error::Degenerate(format!(
            "ANOVA needs at least 2 groups, found {k}"
        )));
    }
    if let Some((key, _)) = samples.iter().find(|(_, s)| s.is_empty()) {
        return Err(Error::Degenerate(format!("group '{key}' has no observations")));
    }
    let n: usize = samples.iter().map(|(_, s)| s.len()).sum();
    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    if df_within <= 0.0 {
        return Err(Error::Degenerate(
            "no within-group degrees of freedom".to_string(),
        ));
    }

    let all: Vec<f64> = samples.iter().flat_map(|(_, s)| s.iter().copied()).collect();
    let grand = mean(&all);
    let ss_between: f64 = samples
        .iter()
        .map(|(_, s)| s.len() as f64 * (mean(s) - grand) * (mean(s) - grand))
        .sum();
    let ss_within: f64 = samples
        .iter()
        .map(|(_, s)| {
            let m = mean(s);
            s.iter().map(|v| (v - m) * (v - m)).sum::<f64>()
        })
        .sum();
    let f = (ss_between / df_between) / (ss_within / df_within);
    let p = f_sf(f, df_between, df_within);
    Ok(AnovaResult {
        f,
        p,
        groups: k,
        df_within,
    })
}

/// One Tukey HSD pairwise comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct TukeyPair {
    pub group_a: String,
    pub group_b: String,
    pub mean_diff: f64,
    pub p_adj: f64,
    pub lower: f64,
    pub upper: f64,
    pub reject: bool,
}

/// Render only the statistically distinguishable pairs.
pub fn tukey_table(pairs: &[TukeyPair]) -> Table {
    let mut table = Table::new([
        "group1", "group2", "meandiff", "p_adj", "lower", "upper", "reject",
    ]);
    for pair in pairs.iter().filter(|p| p.reject) {
        table.push_row([
            pair.group_a.clone(),
            pair.group_b.clone(),
            fmt_stat(pair.mean_diff),
            fmt_stat(pair.p_adj),
            fmt_stat(pair.lower),
            fmt_stat(pair.upper),
            pair.reject.to_string(),
        ]);
    }
    table
}

/// Tukey HSD over all group pairs at family-wise level `alpha`.
pub fn tukey_hsd(
    frame: &Frame,
    group_col: &str,
    outcome: &str,
    alpha: f64,
) -> Result<Vec<TukeyPair>> {
    info!(group = group_col, outcome, alpha, "running Tukey HSD post-hoc");
    let samples = split_k(frame, group_col, outcome)?;
    let k = samples.len();
    if k < 2 {
        return Err(Error::Degenerate(format!(
            "Tukey HSD needs at least 2 groups, found {k}"
        )));
    }
    let n: usize = samples.iter().map(|(_, s)| s.len()).sum();
    let df_within = (n - k) as f64;
    if df_within <= 0.0 {
        return Err(Error::Degenerate(
            "no within-group degrees of freedom".to_string(),
        ));
    }
    let ms_within: f64 = samples
        .iter()
        .map(|(_, s)| {
            let m = mean(s);
            s.iter().map(|v| (v - m) * (v - m)).sum::<f64>()
        })
        .sum::<f64>()
        / df_within;

    let q_crit = studentized_range_quantile(1.0 - alpha, k as f64, df_within);
    let mut pairs = Vec::new();
    for i in 0..k {
        for j in (i + 1)..k {
            let (ref name_a, ref sample_a) = samples[i];
            let (ref name_b, ref sample_b) = samples[j];
            let na = sample_a.len() as f64;
            let nb = sample_b.len() as f64;
            let diff = mean(sample_b) - mean(sample_a);
            let se = (ms_within / 2.0 * (1.0 / na + 1.0 / nb)).sqrt();
            let q = diff.abs() / se;
            let p_adj = studentized_range_sf(q, k as f64, df_within);
            let half_width = q_crit * se;
            pairs.push(TukeyPair {
                group_a: name_a.clone(),
                group_b: name_b.clone(),
                mean_diff: diff,
                p_adj,
                lower: diff - half_width,
                upper: diff + half_width,
                reject: p_adj < alpha,
            });
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhs_common::Value;

    fn binary_frame(flags: &[f64], outcomes: &[f64]) -> Frame {
        Frame::from_columns(vec![
            (
                "Is_STEM".to_string(),
                flags.iter().map(|v| Value::Num(*v)).collect(),
            ),
            (
                "Anxiety_Score".to_string(),
                outcomes.iter().map(|v| Value::Num(*v)).collect(),
            ),
        ])
        .unwrap()
    }

    fn course_frame(courses: &[&str], outcomes: &[f64]) -> Frame {
        Frame::from_columns(vec![
            (
                "Course".to_string(),
                courses.iter().map(|c| Value::Str(c.to_string())).collect(),
            ),
            (
                "Anxiety_Score".to_string(),
                outcomes.iter().map(|v| Value::Num(*v)).collect(),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn welch_sentinel_for_undersized_group() {
        let frame = binary_frame(&[1.0, 0.0, 0.0], &[2.0, 3.0, 4.0]);
        let out = welch_test(&frame, "Is_STEM", "Anxiety_Score").unwrap();
        assert!(out.t.is_nan());
        assert!(out.p.is_nan());
        assert!(out.cohens_d.is_nan());
    }

    #[test]
    fn welch_detects_separated_groups() {
        let frame = binary_frame(
            &[1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            &[4.0, 4.5, 5.0, 4.2, 1.0, 1.5, 0.8, 1.2],
        );
        let out = welch_test(&frame, "Is_STEM", "Anxiety_Score").unwrap();
        assert!(out.t > 5.0);
        assert!(out.p < 0.01);
        assert!(out.cohens_d > 2.0);
    }

    #[test]
    fn cohens_d_zero_spread_is_nan() {
        let d = cohens_d(&[2.0, 2.0, 2.0], &[2.0, 2.0]);
        assert!(d.is_nan());
    }

    #[test]
    fn cohens_d_known_value() {
        // Two unit-variance samples one mean apart
        let x = [1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 2.0];
        let d = cohens_d(&x, &y);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mann_whitney_sentinel_for_empty_side() {
        let frame = binary_frame(&[1.0, 1.0], &[2.0, 3.0]);
        let out = mann_whitney(&frame, "Is_STEM", "Anxiety_Score").unwrap();
        assert!(out.u.is_nan());
        assert!(out.p.is_nan());
    }

    #[test]
    fn mann_whitney_u_statistic_counts_wins() {
        // Group 1 values all above group 0: U1 = n1 * n2
        let frame = binary_frame(&[1.0, 1.0, 0.0, 0.0], &[10.0, 9.0, 1.0, 2.0]);
        let out = mann_whitney(&frame, "Is_STEM", "Anxiety_Score").unwrap();
        assert!((out.u - 4.0).abs() < 1e-12);
        assert!(out.p > 0.0 && out.p <= 1.0);
    }

    #[test]
    fn anova_distinguishes_separated_groups() {
        let frame = course_frame(
            &["Law", "Law", "Law", "Engineering", "Engineering", "Engineering", "Medical", "Medical", "Medical"],
            &[1.0, 1.2, 0.8, 3.0, 3.1, 2.9, 5.0, 4.9, 5.1],
        );
        let out = one_way_anova(&frame, "Course", "Anxiety_Score").unwrap();
        assert_eq!(out.groups, 3);
        assert!(out.f > 10.0);
        assert!(out.p < 0.001);
    }

    #[test]
    fn anova_single_group_propagates_error() {
        let frame = course_frame(&["Law", "Law", "Law"], &[1.0, 2.0, 3.0]);
        let err = one_way_anova(&frame, "Course", "Anxiety_Score").unwrap_err();
        assert!(matches!(err, Error::Degenerate(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn anova_saturated_design_propagates_error() {
        let frame = course_frame(&["Law", "Engineering"], &[1.0, 2.0]);
        let err = one_way_anova(&frame, "Course", "Anxiety_Score").unwrap_err();
        assert!(matches!(err, Error::Degenerate(_)));
    }

    #[test]
    fn tukey_flags_only_separated_pairs() {
        let frame = course_frame(
            &["Law", "Law", "Law", "Law", "Engineering", "Engineering", "Engineering", "Engineering", "Medical", "Medical", "Medical", "Medical"],
            &[1.0, 1.2, 0.8, 1.1, 1.1, 1.3, 0.9, 1.2, 5.0, 4.9, 5.1, 5.2],
        );
        let pairs = tukey_hsd(&frame, "Course", "Anxiety_Score", 0.05).unwrap();
        assert_eq!(pairs.len(), 3);
        let rejected: Vec<_> = pairs.iter().filter(|p| p.reject).collect();
        // Medical differs from both others; Law vs Engineering does not.
        assert_eq!(rejected.len(), 2);
        assert!(rejected
            .iter()
            .all(|p| p.group_a == "Medical" || p.group_b == "Medical"));
        let table = tukey_table(&pairs);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn tukey_interval_brackets_mean_difference() {
        let frame = course_frame(
            &["Law", "Law", "Law", "Engineering", "Engineering", "Engineering"],
            &[1.0, 1.5, 0.5, 4.0, 4.5, 3.5],
        );
        let pairs = tukey_hsd(&frame, "Course", "Anxiety_Score", 0.05).unwrap();
        assert_eq!(pairs.len(), 1);
        let pair = &pairs[0];
        assert!(pair.lower < pair.mean_diff && pair.mean_diff < pair.upper);
    }
}
