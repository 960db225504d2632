//! Pipeline configuration.
//!
//! Resolution order is CLI flags over config file over defaults. The
//! analysis semantics themselves (cleaning order, thresholds baked into
//! the engines) are deliberately not configurable.

use mhs_common::schema::{ANXIETY_SCORE, COURSE, IS_STEM};
use mhs_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runtime configuration for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Raw survey export consumed by `clean` and `run`.
    pub input: PathBuf,
    /// Canonical clean snapshot written by `clean`, read by `analyze`.
    pub snapshot: PathBuf,
    /// Root directory for result artifacts.
    pub reports_dir: PathBuf,
    /// Binary grouping column for the two-sample comparisons.
    pub group_column: String,
    /// Outcome column shared by the comparison and model engines.
    pub outcome: String,
    /// Multi-valued grouping column for ANOVA and the risk profile.
    pub course_column: String,
    /// Inclusive high-risk cut for the logistic screen.
    pub logistic_threshold: f64,
    /// Significance level gating the Tukey post-hoc.
    pub alpha: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input: PathBuf::from("data/students.csv"),
            snapshot: PathBuf::from("clean_data.csv"),
            reports_dir: PathBuf::from("reports"),
            group_column: IS_STEM.to_string(),
            outcome: ANXIETY_SCORE.to_string(),
            course_column: COURSE.to_string(),
            logistic_threshold: 3.0,
            alpha: 0.05,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<PipelineConfig> {
        let config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                toml::from_str(&text)
                    .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?
            }
            None => PipelineConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation beyond what serde enforces.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::Config(format!(
                "alpha must lie in (0, 1), got {}",
                self.alpha
            )));
        }
        if !self.logistic_threshold.is_finite() {
            return Err(Error::Config("logistic_threshold must be finite".into()));
        }
        if self.group_column.is_empty() || self.outcome.is_empty() || self.course_column.is_empty()
        {
            return Err(Error::Config("column names must be non-empty".into()));
        }
        Ok(())
    }
}
