use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use super::run::{RefinementAttempt, RunResult};
use super::service::ServiceDescriptor;
use crate::domain::errors::ErrorKind;

/// States of the per-asset refinement machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementState {
    Init,
    Attempting,
    Evaluating,
    Fixing,
    Passed,
    Exhausted,
    Aborted,
}

impl RefinementState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Exhausted | Self::Aborted)
    }
}

impl fmt::Display for RefinementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Attempting => "attempting",
            Self::Evaluating => "evaluating",
            Self::Fixing => "fixing",
            Self::Passed => "passed",
            Self::Exhausted => "exhausted",
            Self::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// Where an asset's trajectory ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Passed,
    Exhausted,
    Aborted,
}

impl From<TerminalState> for RefinementState {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Passed => Self::Passed,
            TerminalState::Exhausted => Self::Exhausted,
            TerminalState::Aborted => Self::Aborted,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        RefinementState::from(*self).fmt(f)
    }
}

/// Diagnostic attached to every non-passing terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: ErrorKind,
    pub message: String,
}

/// Advisory output of the edge-case pass. Never alters the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCaseReport {
    /// Store-relative path of the recorded suggestions
    pub path: PathBuf,
    /// False when the backend said the mock needs no changes
    pub mock_changes_suggested: bool,
    pub suggestion_chars: usize,
}

/// Terminal result of driving one asset through the refinement machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetOutcome {
    pub service: ServiceDescriptor,
    pub state: TerminalState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
    pub attempts: Vec<RefinementAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_cases: Option<EdgeCaseReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AssetOutcome {
    pub fn passed(&self) -> bool {
        self.state == TerminalState::Passed
    }

    pub fn last_run(&self) -> Option<&RunResult> {
        self.attempts.last().map(|a| &a.run_result)
    }

    /// One-line reason suitable for a summary table.
    pub fn summary(&self) -> String {
        match (&self.failure, self.attempts.last()) {
            (Some(failure), _) => failure.message.clone(),
            (None, Some(attempt)) => attempt.reason.to_string(),
            (None, None) => self.state.to_string(),
        }
    }
}

/// Per-asset outcomes of one pipeline run, reduced once at the end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<AssetOutcome>,
}

impl RunReport {
    /// True only when there was at least one asset and every asset passed.
    pub fn all_passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(AssetOutcome::passed)
    }

    pub fn count(&self, state: TerminalState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::run::{ClassificationReason, Verdict};

    fn outcome(state: TerminalState) -> AssetOutcome {
        AssetOutcome {
            service: ServiceDescriptor::new("svc", 4000, "echo"),
            state,
            failure: None,
            attempts: vec![],
            edge_cases: None,
            warnings: vec![],
        }
    }

    fn report(outcomes: Vec<AssetOutcome>) -> RunReport {
        RunReport {
            run_id: Uuid::new_v4(),
            output_dir: PathBuf::from("out"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes,
        }
    }

    #[test]
    fn test_all_passed_requires_every_outcome() {
        assert!(report(vec![outcome(TerminalState::Passed)]).all_passed());
        let mixed = report(vec![
            outcome(TerminalState::Passed),
            outcome(TerminalState::Aborted),
        ]);
        assert!(!mixed.all_passed());
        assert_eq!(mixed.count(TerminalState::Aborted), 1);
    }

    #[test]
    fn test_empty_report_is_not_a_pass() {
        assert!(!report(vec![]).all_passed());
    }

    #[test]
    fn test_summary_prefers_failure_message() {
        let mut o = outcome(TerminalState::Exhausted);
        o.attempts.push(RefinementAttempt {
            index: 0,
            verdict: Verdict::Fail,
            reason: ClassificationReason::NonZeroExit(1),
            run_result: RunResult::completed(1, "", "FAILED"),
        });
        assert_eq!(o.summary(), "test script exited with code 1");

        o.failure = Some(FailureReason {
            kind: ErrorKind::RetriesExhausted,
            message: "gave up".to_string(),
        });
        assert_eq!(o.summary(), "gave up");
    }

    #[test]
    fn test_terminal_states() {
        assert!(RefinementState::Passed.is_terminal());
        assert!(RefinementState::Aborted.is_terminal());
        assert!(!RefinementState::Fixing.is_terminal());
        assert_eq!(TerminalState::Exhausted.to_string(), "exhausted");
    }
}
