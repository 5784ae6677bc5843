//! Per-asset refinement state machine.
//!
//! ```text
//! Init -> Attempting -> Evaluating -> Passed
//!              ^             |
//!              |             +-> Exhausted   (budget spent)
//!              |             v
//!              +--------- Fixing -> Aborted (no patch, backend or store failure)
//! Attempting -> Aborted (mock failed to start)
//! ```
//!
//! At most `retry_budget + 1` attempts are made. The mock is stopped before
//! every classification, and a failing asset never affects another one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::outcome_classifier::OutcomeClassifier;
use super::patch_parser::parse_patches;
use super::prompts::PromptBuilder;
use crate::domain::errors::{QaError, QaResult};
use crate::domain::models::{
    AssetOutcome, FailureReason, GeneratedAsset, PatchBlock, RefinementAttempt, RefinementState,
    RunResult, ServiceDescriptor, TerminalState, Verdict,
};
use crate::domain::ports::{ArtifactStore, GenerativeBackend};
use crate::infrastructure::process::{ProcessLogs, ProcessSupervisor, TestRunner};

/// Collaborators and limits for driving assets to a terminal state.
pub struct RefinementController {
    backend: Arc<dyn GenerativeBackend>,
    store: Arc<dyn ArtifactStore>,
    supervisor: ProcessSupervisor,
    runner: TestRunner,
    classifier: OutcomeClassifier,
    prompts: PromptBuilder,
    retry_budget: u32,
    test_timeout: Duration,
}

/// Mutable state of one asset's trajectory.
struct Trajectory {
    service: ServiceDescriptor,
    state: RefinementState,
    attempts: Vec<RefinementAttempt>,
}

impl Trajectory {
    fn new(service: &ServiceDescriptor) -> Self {
        Self {
            service: service.clone(),
            state: RefinementState::Init,
            attempts: Vec::new(),
        }
    }

    fn transition(&mut self, to: RefinementState) {
        info!(
            service = %self.service.name,
            port = self.service.port,
            from = %self.state,
            to = %to,
            attempt = self.attempts.len(),
            "refinement transition"
        );
        self.state = to;
    }

    fn finish(mut self, state: TerminalState, failure: Option<QaError>) -> AssetOutcome {
        self.transition(state.into());
        let failure = failure.map(|err| FailureReason {
            kind: err.kind(),
            message: err.to_string(),
        });
        AssetOutcome {
            service: self.service,
            state,
            failure,
            attempts: self.attempts,
            edge_cases: None,
            warnings: Vec::new(),
        }
    }
}

impl RefinementController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn ArtifactStore>,
        supervisor: ProcessSupervisor,
        runner: TestRunner,
        classifier: OutcomeClassifier,
        prompts: PromptBuilder,
        retry_budget: u32,
        test_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            supervisor,
            runner,
            classifier,
            prompts,
            retry_budget,
            test_timeout,
        }
    }

    pub const fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// Drive `asset` until it passes, exhausts its budget, or aborts.
    ///
    /// Patches are applied to `asset` in place and persisted immediately.
    #[instrument(skip(self, asset), fields(service = %asset.descriptor.name, port = asset.descriptor.port))]
    pub async fn refine(&self, asset: &mut GeneratedAsset) -> AssetOutcome {
        let mut trajectory = Trajectory::new(&asset.descriptor);

        let paths = match self.resolve_paths(asset) {
            Ok(paths) => paths,
            Err(e) => return trajectory.finish(TerminalState::Aborted, Some(e)),
        };

        let mut index: u32 = 0;
        loop {
            trajectory.transition(RefinementState::Attempting);
            let (run, mock_logs) = match self.attempt(asset, &paths).await {
                Ok(result) => result,
                Err(e) => return trajectory.finish(TerminalState::Aborted, Some(e)),
            };

            trajectory.transition(RefinementState::Evaluating);
            let classification = self.classifier.classify_detailed(&run);
            debug!(verdict = %classification.verdict, reason = %classification.reason, "attempt classified");
            let reason = classification.reason.clone();
            trajectory.attempts.push(RefinementAttempt {
                index,
                verdict: classification.verdict,
                reason: classification.reason,
                run_result: run.clone(),
            });

            if classification.verdict == Verdict::Pass {
                return trajectory.finish(TerminalState::Passed, None);
            }

            if index >= self.retry_budget {
                warn!(attempts = index + 1, last_reason = %reason, "retry budget exhausted");
                let err = QaError::RetriesExhausted { attempts: index + 1 };
                return trajectory.finish(TerminalState::Exhausted, Some(err));
            }

            trajectory.transition(RefinementState::Fixing);
            if let Err(e) = self.repair(asset, &run, &mock_logs).await {
                warn!(error = %e, "repair failed, aborting asset");
                return trajectory.finish(TerminalState::Aborted, Some(e));
            }
            index += 1;
        }
    }

    fn resolve_paths(&self, asset: &GeneratedAsset) -> QaResult<AttemptPaths> {
        let mock = self.store.path_of(&asset.mock.path)?;
        let test = self.store.path_of(&asset.test.path)?;
        Ok(AttemptPaths {
            mock_dir: parent_or_root(&mock, self.store.root()),
            test_dir: parent_or_root(&test, self.store.root()),
            mock,
            test,
        })
    }

    /// Start the mock, run the test against it, and stop the mock.
    async fn attempt(
        &self,
        asset: &GeneratedAsset,
        paths: &AttemptPaths,
    ) -> QaResult<(RunResult, ProcessLogs)> {
        let mut mock = self
            .supervisor
            .start(&paths.mock, &paths.mock_dir, Some(asset.descriptor.port))
            .await?;

        let run = self
            .runner
            .run(&paths.test, &paths.test_dir, self.test_timeout)
            .await;

        let logs = mock.stop().await;
        debug!(
            exit_code = run.exit_code,
            timed_out = run.timed_out,
            mock_stdout_bytes = logs.stdout.len(),
            "attempt finished"
        );
        Ok((run, logs))
    }

    /// Ask the backend for a fix, then apply and persist every patch.
    async fn repair(
        &self,
        asset: &mut GeneratedAsset,
        run: &RunResult,
        mock_logs: &ProcessLogs,
    ) -> QaResult<()> {
        let prompt = self
            .prompts
            .fix_failure(asset, run, &format_mock_logs(mock_logs));
        let response = self.backend.generate(&prompt).await?;
        let patches = parse_patches(&response)?;

        for patch in patches {
            self.apply(asset, patch).await?;
        }
        Ok(())
    }

    async fn apply(&self, asset: &mut GeneratedAsset, patch: PatchBlock) -> QaResult<()> {
        let artifact = asset.artifact_mut(patch.target);
        artifact.content = patch.content;
        self.store.write(&artifact.path, &artifact.content).await?;
        info!(target = %patch.target, path = %artifact.path.display(), "patch applied");
        Ok(())
    }
}

struct AttemptPaths {
    mock: PathBuf,
    mock_dir: PathBuf,
    test: PathBuf,
    test_dir: PathBuf,
}

fn parent_or_root(path: &Path, root: &Path) -> PathBuf {
    path.parent().map_or_else(|| root.to_path_buf(), Path::to_path_buf)
}

/// Mock output as embedded in the repair prompt.
pub fn format_mock_logs(logs: &ProcessLogs) -> String {
    let mut text = String::new();
    if !logs.stdout.trim().is_empty() {
        text.push_str("stdout:\n");
        text.push_str(logs.stdout.trim_end());
        text.push('\n');
    }
    if !logs.stderr.trim().is_empty() {
        text.push_str("stderr:\n");
        text.push_str(logs.stderr.trim_end());
        text.push('\n');
    }
    if text.is_empty() {
        text.push_str("(mock produced no output)");
    }
    text
}
