//! MHS Core - Survey Cleaning and Analysis Engine
//!
//! The main library for the student mental-health survey pipeline:
//! - Deterministic cleaning of the raw survey export
//! - Group comparisons (Welch, Mann-Whitney, ANOVA with Tukey post-hoc)
//! - OLS regression with robust errors and logistic screening
//! - Factor-suitability gating (KMO, Bartlett) and one-factor EFA
//! - Course-level risk profiling
//!
//! Every analysis is a pure function of the cleaned frame; persistence
//! goes through `mhs_report::ArtifactStore` so tests can run against an
//! in-memory sink.

pub mod analysis;
pub mod clean;
pub mod config;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{run_analyses, RunSummary};

/// Version string recorded in run metadata.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
