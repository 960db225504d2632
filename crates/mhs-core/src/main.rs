//! MHS - Student Mental-Health Survey Pipeline
//!
//! The command-line entry point:
//! - `mhs clean` turns the raw survey export into the clean snapshot
//! - `mhs analyze` runs the analysis fan-out over the snapshot
//! - `mhs run` does both in one pass
//!
//! Command payloads (run summaries) go to stdout as JSON; all logging
//! goes to stderr.

use clap::{Args, Parser, Subcommand};
use mhs_common::{Error, Frame, Result};
use mhs_core::clean::{pre_process, CleanSummary};
use mhs_core::config::PipelineConfig;
use mhs_core::logging::init_logging;
use mhs_core::pipeline::{run_analyses, RunSummary};
use mhs_report::FsStore;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Student mental-health survey cleaning and analysis
#[derive(Parser)]
#[command(name = "mhs")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "MHS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the reports output directory
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    /// Override the clean snapshot path
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean the raw survey export and write the canonical snapshot
    Clean {
        /// Raw survey CSV (overrides the configured input)
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Run the analysis fan-out over an existing clean snapshot
    Analyze,
    /// Clean then analyze in one pass
    Run {
        /// Raw survey CSV (overrides the configured input)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

/// Combined payload for `mhs run`.
#[derive(Serialize)]
struct FullRunSummary {
    clean: CleanSummary,
    analyses: RunSummary,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(category = %e.category(), "{e}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(global: &GlobalOpts) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(global.config.as_deref())?;
    if let Some(dir) = &global.reports_dir {
        config.reports_dir = dir.clone();
    }
    if let Some(snapshot) = &global.snapshot {
        config.snapshot = snapshot.clone();
    }
    Ok(config)
}

fn print_payload<T: Serialize>(payload: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).unwrap_or_else(|_| String::from("{}"))
    );
}

fn clean_step(config: &PipelineConfig) -> Result<(Frame, CleanSummary)> {
    info!(input = %config.input.display(), "loading raw dataset");
    let raw = Frame::read_csv(&config.input)?;
    info!(rows = raw.nrows(), columns = raw.ncols(), "loaded raw frame");
    let (clean, summary) = pre_process(&raw)?;
    clean.write_csv(&config.snapshot)?;
    info!(snapshot = %config.snapshot.display(), "wrote clean snapshot");
    Ok((clean, summary))
}

fn analyze_step(config: &PipelineConfig, frame: &Frame) -> Result<RunSummary> {
    let store =
        FsStore::new(&config.reports_dir).map_err(|e| Error::Artifact(e.to_string()))?;
    run_analyses(frame, config, &store)
}

fn execute(cli: Cli) -> Result<()> {
    let mut config = resolve_config(&cli.global)?;
    match cli.command {
        Commands::Clean { input } => {
            if let Some(input) = input {
                config.input = input;
            }
            let (_, summary) = clean_step(&config)?;
            print_payload(&summary);
        }
        Commands::Analyze => {
            info!(snapshot = %config.snapshot.display(), "loading clean snapshot");
            let frame = Frame::read_csv(&config.snapshot)?;
            let summary = analyze_step(&config, &frame)?;
            print_payload(&summary);
        }
        Commands::Run { input } => {
            if let Some(input) = input {
                config.input = input;
            }
            let (clean, clean_summary) = clean_step(&config)?;
            let analyses = analyze_step(&config, &clean)?;
            print_payload(&FullRunSummary {
                clean: clean_summary,
                analyses,
            });
        }
    }
    Ok(())
}
