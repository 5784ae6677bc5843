use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit code reported for runs that did not produce one of their own
/// (timeout or spawn failure).
pub const SYNTHETIC_FAILURE_EXIT_CODE: i32 = 1;

/// Captured outcome of one foreground test-script execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl RunResult {
    pub fn completed(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    /// A run that never got far enough to report its own exit status.
    pub fn failed_to_run(message: impl Into<String>) -> Self {
        Self {
            exit_code: SYNTHETIC_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: message.into(),
            timed_out: false,
        }
    }

    /// A run killed after exceeding its wall-clock bound.
    pub fn timed_out(stdout: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exit_code: SYNTHETIC_FAILURE_EXIT_CODE,
            stdout: stdout.into(),
            stderr: message.into(),
            timed_out: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Why a run was classified the way it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ClassificationReason {
    Passed,
    TimedOut,
    NonZeroExit(i32),
    FailureMarker(String),
    MissingSuccessMarker,
}

impl fmt::Display for ClassificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "tests passed"),
            Self::TimedOut => write!(f, "test run timed out"),
            Self::NonZeroExit(code) => write!(f, "test script exited with code {code}"),
            Self::FailureMarker(token) => write!(f, "failure marker '{token}' in stderr"),
            Self::MissingSuccessMarker => write!(f, "success marker missing from stderr"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub verdict: Verdict,
    pub reason: ClassificationReason,
}

/// One start-run-classify cycle of the refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementAttempt {
    /// 0 for the initial run, 1..=retry_budget for repairs
    pub index: u32,
    pub verdict: Verdict,
    pub reason: ClassificationReason,
    pub run_result: RunResult,
}
