//! Course-level risk profiling.
//!
//! For each clinical score, the empirical probability that a student in
//! a given course scores in the high-risk band (strictly above 3; the
//! logistic screen deliberately uses a different, inclusive threshold).
//! Output is the one human-readable artifact of the pipeline, with a
//! fixed layout the downstream tests assert on literally.

use mhs_common::schema::{ANXIETY_SCORE, COURSE, DEPRESSION_SCORE, STRESS_LEVEL};
use mhs_common::{Frame, Result};
use tracing::info;

/// Strict high-risk cut: a clinical score of 4 or 5.
const HIGH_RISK_CUT: f64 = 3.0;

/// Score columns profiled, with their report labels, in report order.
const TARGETS: [(&str, &str); 3] = [
    (DEPRESSION_SCORE, "Depression"),
    (ANXIETY_SCORE, "Anxiety"),
    (STRESS_LEVEL, "Stress"),
];

/// One course's empirical high-risk percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskEntry {
    pub course: String,
    pub percentage: f64,
}

/// All courses' percentages for one clinical score.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskSection {
    pub label: String,
    pub entries: Vec<RiskEntry>,
}

/// Compute the per-course high-risk percentages for every target score.
///
/// Rows with a missing course are excluded; a missing score fails the
/// strict cut and counts as low-risk in its course's denominator.
pub fn risk_sections(frame: &Frame) -> Result<Vec<RiskSection>> {
    info!("starting risk prediction modeling");
    let courses = frame.column(COURSE)?;
    let mut sections = Vec::with_capacity(TARGETS.len());
    for (column, label) in TARGETS {
        let scores = frame.numeric(column)?;

        let mut keys: Vec<String> = courses
            .iter()
            .filter_map(|c| c.as_str().map(str::to_string))
            .collect();
        keys.sort();
        keys.dedup();

        let mut entries: Vec<RiskEntry> = keys
            .into_iter()
            .map(|key| {
                let mut total = 0usize;
                let mut high = 0usize;
                for (course, score) in courses.iter().zip(scores.iter()) {
                    if course.as_str() != Some(key.as_str()) {
                        continue;
                    }
                    total += 1;
                    if score.map_or(false, |v| v > HIGH_RISK_CUT) {
                        high += 1;
                    }
                }
                RiskEntry {
                    course: key,
                    percentage: high as f64 / total as f64 * 100.0,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.percentage
                .partial_cmp(&a.percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.course.cmp(&b.course))
        });
        sections.push(RiskSection {
            label: label.to_string(),
            entries,
        });
    }
    Ok(sections)
}

/// Render the fixed-layout text report.
pub fn format_report(sections: &[RiskSection]) -> String {
    let mut report = String::from("STUDENT MENTAL HEALTH: RISK PREDICTION REPORT\n");
    report.push_str(&"=".repeat(50));
    report.push('\n');
    report.push_str("Criteria: 'High Risk' defined as a clinical score of 4 or 5.\n\n");

    for section in sections {
        report.push_str(&format!(
            "--- PREDICTION PROFILE: {} ---\n",
            section.label.to_uppercase()
        ));
        report.push_str(&format!("{:<25} | {:<15}\n", "Academic Major", "Risk Chance (%)"));
        report.push_str(&"-".repeat(45));
        report.push('\n');
        for entry in &section.entries {
            report.push_str(&format!(
                "{:<25} | {:>12.1}%\n",
                entry.course, entry.percentage
            ));
        }
        report.push('\n');
    }
    report
}
