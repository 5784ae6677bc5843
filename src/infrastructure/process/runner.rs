//! Test script runner.
//!
//! Runs one test artifact to completion under a wall-clock timeout. Every
//! failure mode is folded into a [`RunResult`]; the runner itself never
//! returns an error.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::capture::OutputCapture;
use crate::domain::errors::QaError;
use crate::domain::models::{ProcessConfig, RunResult};

const PIPE_DRAIN: Duration = Duration::from_secs(1);

/// Executes test scripts against a running mock.
#[derive(Debug, Clone)]
pub struct TestRunner {
    config: ProcessConfig,
}

impl TestRunner {
    pub const fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// Timeout taken from configuration.
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.config.test_timeout_secs)
    }

    /// Run `artifact` in `working_dir`, killing it once `limit` elapses.
    #[instrument(skip(self), fields(artifact = %artifact.display()))]
    pub async fn run(&self, artifact: &Path, working_dir: &Path, limit: Duration) -> RunResult {
        let artifact = match std::path::absolute(artifact) {
            Ok(path) => path,
            Err(e) => {
                return RunResult::failed_to_run(format!(
                    "cannot resolve {}: {e}",
                    artifact.display()
                ))
            }
        };

        let spawned = Command::new(&self.config.interpreter)
            .args(&self.config.interpreter_args)
            .arg(&artifact)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(error = %e, "failed to launch test script");
                return RunResult::failed_to_run(format!(
                    "failed to launch {} {}: {e}",
                    self.config.interpreter,
                    artifact.display()
                ));
            }
        };

        let max = self.config.max_output_bytes;
        let stdout = child.stdout.take().map(|s| OutputCapture::spawn(s, max));
        let stderr = child.stderr.take().map(|s| OutputCapture::spawn(s, max));

        match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => {
                let code = status.code().unwrap_or(-1);
                info!(exit_code = code, "test script finished");
                RunResult::completed(code, drain(stdout).await, drain(stderr).await)
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                RunResult::failed_to_run(format!("error waiting for test script: {e}"))
            }
            Err(_) => {
                warn!(timeout = ?limit, "test script timed out, killing");
                let _ = child.kill().await;
                let message = QaError::ProcessTimeout(limit).to_string();
                RunResult::timed_out(drain(stdout).await, message)
            }
        }
    }
}

async fn drain(capture: Option<OutputCapture>) -> String {
    match capture {
        Some(capture) => capture.finish(PIPE_DRAIN).await,
        None => String::new(),
    }
}
