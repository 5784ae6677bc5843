//! Pass/fail classification of a test run.
//!
//! The rule is a text heuristic over stderr (unittest prints its summary
//! there): exit code 0, the success marker present, no failure marker. It
//! is fragile by nature; markers are configurable.

use crate::domain::models::{
    Classification, ClassificationReason, ClassifierConfig, RunResult, Verdict,
};

#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    success_marker: String,
    failure_markers: Vec<String>,
}

impl OutcomeClassifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            success_marker: config.success_marker.clone(),
            failure_markers: config.failure_markers.clone(),
        }
    }

    pub fn classify(&self, run: &RunResult) -> Verdict {
        self.classify_detailed(run).verdict
    }

    /// Verdict plus the first reason that decided it.
    pub fn classify_detailed(&self, run: &RunResult) -> Classification {
        let reason = if run.timed_out {
            ClassificationReason::TimedOut
        } else if run.exit_code != 0 {
            ClassificationReason::NonZeroExit(run.exit_code)
        } else if let Some(marker) = self
            .failure_markers
            .iter()
            .find(|m| run.stderr.contains(m.as_str()))
        {
            ClassificationReason::FailureMarker(marker.clone())
        } else if !run.stderr.contains(&self.success_marker) {
            ClassificationReason::MissingSuccessMarker
        } else {
            ClassificationReason::Passed
        };

        let verdict = if reason == ClassificationReason::Passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Classification { verdict, reason }
    }
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::new(&ClassifierConfig::default())
    }
}
