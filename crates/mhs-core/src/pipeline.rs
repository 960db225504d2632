//! Analysis fan-out.
//!
//! Runs every engine over the shared clean frame and persists each
//! result through the artifact store. The engines are independent:
//! sentinel results and null models are recorded and the run continues;
//! a degenerate k-sample design is logged and leaves a header-only
//! artifact; only schema violations abort the run.

use crate::analysis::compare::{mann_whitney, one_way_anova, tukey_hsd, tukey_table, welch_test};
use crate::analysis::descriptives::{describe_by_group, group_stats_table, point_biserial};
use crate::analysis::factor::{check_efa_assumptions, perform_efa};
use crate::analysis::logistic::logistic_check;
use crate::analysis::regression::{coef_table, regression_diagnostics, run_regression};
use crate::analysis::risk::{format_report, risk_sections};
use crate::config::PipelineConfig;
use crate::TOOL_VERSION;
use mhs_common::schema::FACTOR_VARIABLES;
use mhs_common::{Error, Frame, Result};
use mhs_report::{ArtifactStore, RunMetadata, Table};
use serde::Serialize;
use tracing::{error, info, warn};

/// What a run produced, reported on stdout as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub artifacts: Vec<String>,
    pub regression_fitted: bool,
    pub logistic_fitted: bool,
    pub efa_performed: bool,
}

fn persist(
    store: &dyn ArtifactStore,
    name: &str,
    table: &Table,
    artifacts: &mut Vec<String>,
) -> Result<()> {
    store
        .write_table(name, table)
        .map_err(|e| Error::Artifact(e.to_string()))?;
    artifacts.push(name.to_string());
    Ok(())
}

/// Run every analysis engine over the clean frame.
pub fn run_analyses(
    frame: &Frame,
    config: &PipelineConfig,
    store: &dyn ArtifactStore,
) -> Result<RunSummary> {
    let mut artifacts = Vec::new();
    let group = config.group_column.as_str();
    let outcome = config.outcome.as_str();
    let course = config.course_column.as_str();

    let stats = describe_by_group(frame, group, outcome)?;
    persist(store, "describe_by_group", &group_stats_table(group, &stats), &mut artifacts)?;

    let pb = point_biserial(frame, group, outcome)?;
    if pb.r.is_nan() {
        warn!(n = pb.n, "point-biserial undefined; sentinel persisted");
    }
    persist(store, "pointbiserial", &pb.table(), &mut artifacts)?;

    let welch = welch_test(frame, group, outcome)?;
    if welch.t.is_nan() {
        warn!("Welch test undefined; sentinel persisted");
    }
    persist(store, "welch_results", &welch.table(), &mut artifacts)?;

    let mw = mann_whitney(frame, group, outcome)?;
    if mw.u.is_nan() {
        warn!("Mann-Whitney undefined; sentinel persisted");
    }
    persist(store, "mannwhitney", &mw.table(), &mut artifacts)?;

    let fit = run_regression(frame, outcome)?;
    if let Some(fit) = &fit {
        persist(store, "regression_summary", &coef_table(&fit.coefs, "t"), &mut artifacts)?;
    } else {
        persist(
            store,
            "regression_summary",
            &coef_table(&[], "t"),
            &mut artifacts,
        )?;
    }
    let diag = regression_diagnostics(fit.as_ref());
    persist(store, "regression_diagnostics", &diag.table(), &mut artifacts)?;

    let logit = logistic_check(frame, outcome, config.logistic_threshold)?;
    if let Some(logit) = &logit {
        persist(store, "logistic_summary", &coef_table(&logit.coefs, "z"), &mut artifacts)?;
    } else {
        persist(store, "logistic_summary", &coef_table(&[], "z"), &mut artifacts)?;
    }

    // k-sample path: degenerate designs propagate out of the engine;
    // the run records the empty artifact and moves on.
    match one_way_anova(frame, course, outcome) {
        Ok(anova) => {
            persist(store, "anova_results", &anova.table(), &mut artifacts)?;
            let pairs = if anova.p < config.alpha {
                tukey_hsd(frame, course, outcome, config.alpha)?
            } else {
                info!(p = anova.p, "ANOVA not significant; skipping post-hoc");
                Vec::new()
            };
            persist(store, "tukey_posthoc", &tukey_table(&pairs), &mut artifacts)?;
        }
        Err(e) if !e.is_fatal() => {
            error!(error = %e, "ANOVA failed on degenerate design");
            persist(
                store,
                "anova_results",
                &Table::new(["F", "p", "groups", "df_within"]),
                &mut artifacts,
            )?;
            persist(store, "tukey_posthoc", &tukey_table(&[]), &mut artifacts)?;
        }
        Err(e) => return Err(e),
    }

    // Factor-suitability gate, recorded pass or fail; EFA only on pass.
    let mut efa_performed = false;
    match check_efa_assumptions(frame, &FACTOR_VARIABLES) {
        Ok(gate) => {
            persist(store, "efa_assumptions", &gate.table(), &mut artifacts)?;
            if gate.passes() {
                let loadings = perform_efa(frame, &FACTOR_VARIABLES)?;
                persist(store, "efa_loadings", &loadings.table(), &mut artifacts)?;
                efa_performed = true;
            } else {
                warn!(
                    kmo = gate.kmo,
                    bartlett_p = gate.p_value,
                    "data does not meet EFA requirements; skipping factor analysis"
                );
            }
        }
        Err(e) if !e.is_fatal() => {
            error!(error = %e, "EFA gate failed on degenerate input");
            persist(
                store,
                "efa_assumptions",
                &Table::new(["Statistical_Test", "Result_Value", "Threshold_Requirement"]),
                &mut artifacts,
            )?;
        }
        Err(e) => return Err(e),
    }

    let sections = risk_sections(frame)?;
    store
        .write_text("risk_prediction_report", &format_report(&sections))
        .map_err(|e| Error::Artifact(e.to_string()))?;
    artifacts.push("risk_prediction_report".to_string());

    persist(
        store,
        "run_metadata",
        &RunMetadata::now(TOOL_VERSION).table(),
        &mut artifacts,
    )?;

    info!("all statistical analysis completed successfully");
    Ok(RunSummary {
        rows: frame.nrows(),
        artifacts,
        regression_fitted: fit.is_some(),
        logistic_fitted: logit.is_some(),
        efa_performed,
    })
}
