//! `run`: the full QA pipeline over a notes file.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::backend::OllamaBackend;
use crate::adapters::store::FsArtifactStore;
use crate::cli::output::{output, spinner_if_interactive, CommandOutput, ProgressBarExt, TableFormatter};
use crate::domain::models::{Config, RunReport, TerminalState};
use crate::infrastructure::config::ConfigLoader;
use crate::services::QaPipeline;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// File with free-text QA notes describing the UDP services
    #[arg(short, long)]
    pub notes: PathBuf,

    /// Output directory (default: timestamped directory from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Repair attempts allowed per asset after the initial run
    #[arg(short = 'r', long)]
    pub retry_budget: Option<u32>,

    /// Backend model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Skip edge-case suggestions for passing assets
    #[arg(long)]
    pub no_edge_cases: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(budget) = self.retry_budget {
            config.refinement.retry_budget = budget;
        }
        if let Some(model) = &self.model {
            config.backend.model.clone_from(model);
        }
        if self.no_edge_cases {
            config.refinement.edge_cases = false;
        }
        ConfigLoader::validate(config).context("Invalid command-line override")?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    #[serde(flatten)]
    pub report: RunReport,
    pub all_passed: bool,
}

impl From<RunReport> for RunOutput {
    fn from(report: RunReport) -> Self {
        Self {
            all_passed: report.all_passed(),
            report,
        }
    }
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let elapsed = report.finished_at - report.started_at;
        let mut lines = vec![
            TableFormatter::new().format_outcomes(&report.outcomes),
            format!(
                "\n{} passed, {} exhausted, {} aborted in {}s",
                report.count(TerminalState::Passed),
                report.count(TerminalState::Exhausted),
                report.count(TerminalState::Aborted),
                elapsed.num_seconds()
            ),
            format!("Artifacts: {}", report.output_dir.display()),
        ];

        for outcome in report.outcomes.iter().filter(|o| !o.warnings.is_empty()) {
            for warning in &outcome.warnings {
                lines.push(format!("warning [{}]: {warning}", outcome.service.name));
            }
        }

        let verdict = if self.all_passed {
            console::style("All services passed.").green().to_string()
        } else {
            console::style("Some services did not pass.").red().to_string()
        };
        lines.push(verdict);
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Returns whether every asset passed.
pub async fn execute(args: RunArgs, mut config: Config, json: bool) -> Result<bool> {
    args.apply_to(&mut config)?;

    let notes = tokio::fs::read_to_string(&args.notes)
        .await
        .with_context(|| format!("Failed to read notes from {}", args.notes.display()))?;
    if notes.trim().is_empty() {
        anyhow::bail!("Notes file {} is empty", args.notes.display());
    }

    let backend = OllamaBackend::new(&config.backend).context("Failed to create backend client")?;
    let store = match &args.output {
        Some(dir) => FsArtifactStore::create_at(dir.clone()).await,
        None => FsArtifactStore::for_run(&config.output.base_dir).await,
    }
    .context("Failed to create output directory")?;

    let pipeline = QaPipeline::new(&config, Arc::new(backend), Arc::new(store));
    let spinner = spinner_if_interactive(
        format!("Running QA pipeline into {}", pipeline.output_dir().display()),
        json,
    );

    let report = match pipeline.run(&notes).await {
        Ok(report) => {
            spinner.finish_success("QA pipeline finished");
            report
        }
        Err(e) => {
            spinner.finish_error("QA pipeline failed");
            return Err(e).context("QA run failed");
        }
    };

    let result = RunOutput::from(report);
    output(&result, json);
    Ok(result.all_passed)
}
