//! `verify`: one supervised mock/test attempt, without repair.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{Classification, Config, RunResult, Verdict};
use crate::infrastructure::process::{ProcessLogs, ProcessSupervisor, TestRunner};
use crate::services::OutcomeClassifier;

const OUTPUT_PREVIEW_CHARS: usize = 2_000;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Mock listener script
    #[arg(long)]
    pub mock: PathBuf,

    /// Test script to run against the mock
    #[arg(long)]
    pub test: PathBuf,

    /// UDP port of the mock, used by the `port` readiness probe
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Test timeout in seconds (default from config)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct VerifyOutput {
    pub mock: PathBuf,
    pub test: PathBuf,
    #[serde(flatten)]
    pub classification: Classification,
    pub run: RunResult,
    pub mock_stdout: String,
    pub mock_stderr: String,
}

impl CommandOutput for VerifyOutput {
    fn to_human(&self) -> String {
        let verdict = match self.classification.verdict {
            Verdict::Pass => console::style("PASS").green().bold(),
            Verdict::Fail => console::style("FAIL").red().bold(),
        };
        let mut lines = vec![
            format!("{verdict}: {}", self.classification.reason),
            format!("Mock: {}", self.mock.display()),
            format!("Test: {}", self.test.display()),
            format!(
                "Exit code: {}{}",
                self.run.exit_code,
                if self.run.timed_out { " (timed out)" } else { "" }
            ),
        ];
        for (title, text) in [
            ("Test stdout", &self.run.stdout),
            ("Test stderr", &self.run.stderr),
            ("Mock stdout", &self.mock_stdout),
            ("Mock stderr", &self.mock_stderr),
        ] {
            if !text.trim().is_empty() {
                lines.push(format!("\n{title}:\n{}", truncate(text.trim_end(), OUTPUT_PREVIEW_CHARS)));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn working_dir(artifact: &Path) -> PathBuf {
    match artifact.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Returns whether the test passed.
pub async fn execute(args: VerifyArgs, config: Config, json: bool) -> Result<bool> {
    for path in [&args.mock, &args.test] {
        if !path.is_file() {
            anyhow::bail!("Script not found: {}", path.display());
        }
    }

    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(config.process.test_timeout_secs));
    let supervisor = ProcessSupervisor::new(config.process.clone());
    let runner = TestRunner::new(config.process.clone());
    let classifier = OutcomeClassifier::new(&config.classifier);

    let mut mock = supervisor
        .start(&args.mock, &working_dir(&args.mock), args.port)
        .await
        .map_err(crate::domain::errors::QaError::from)
        .context("Mock listener did not start")?;

    let run = runner.run(&args.test, &working_dir(&args.test), timeout).await;
    let ProcessLogs { stdout, stderr, .. } = mock.stop().await;

    let classification = classifier.classify_detailed(&run);
    let passed = classification.verdict == Verdict::Pass;

    output(
        &VerifyOutput {
            mock: args.mock,
            test: args.test,
            classification,
            run,
            mock_stdout: stdout,
            mock_stderr: stderr,
        },
        json,
    );
    Ok(passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_dir_of_bare_file_is_current_dir() {
        assert_eq!(working_dir(Path::new("mock.py")), PathBuf::from("."));
        assert_eq!(working_dir(Path::new("out/mocks/mock.py")), PathBuf::from("out/mocks"));
    }
}
