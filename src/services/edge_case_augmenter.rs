//! Edge-case suggestions for assets whose main tests pass.
//!
//! Purely advisory: the suggestions are recorded next to the run's other
//! artifacts and never change the verdict.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

use super::prompts::PromptBuilder;
use crate::domain::errors::{QaError, QaResult};
use crate::domain::models::{EdgeCaseReport, GeneratedAsset};
use crate::domain::ports::{ArtifactStore, GenerativeBackend};

/// Phrase the backend uses when the mock already covers the suggested cases.
pub const NO_MOCK_CHANGES_PHRASE: &str = "no mock changes are needed";

pub struct EdgeCaseAugmenter {
    backend: Arc<dyn GenerativeBackend>,
    store: Arc<dyn ArtifactStore>,
    prompts: PromptBuilder,
}

impl EdgeCaseAugmenter {
    pub fn new(
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn ArtifactStore>,
        prompts: PromptBuilder,
    ) -> Self {
        Self {
            backend,
            store,
            prompts,
        }
    }

    pub fn report_path_for(asset: &GeneratedAsset) -> PathBuf {
        PathBuf::from("edge_cases").join(format!("{}.md", asset.descriptor.artifact_stem()))
    }

    /// Request edge cases for a passing asset and record them.
    #[instrument(skip(self, asset), fields(service = %asset.descriptor.name))]
    pub async fn augment(&self, asset: &GeneratedAsset) -> QaResult<EdgeCaseReport> {
        let suggestions = self.backend.generate(&self.prompts.edge_cases(asset)).await?;
        if suggestions.trim().is_empty() {
            return Err(QaError::BackendMalformedResponse(
                "backend returned no edge-case suggestions".to_string(),
            ));
        }

        let mock_changes_suggested = !suggestions.to_lowercase().contains(NO_MOCK_CHANGES_PHRASE);
        let path = Self::report_path_for(asset);
        let document = format!(
            "# Edge cases: {} (port {})\n\n{}\n",
            asset.descriptor.name,
            asset.descriptor.port,
            suggestions.trim_end()
        );
        self.store.write(&path, &document).await?;

        info!(
            path = %path.display(),
            mock_changes_suggested,
            chars = suggestions.chars().count(),
            "edge-case suggestions recorded"
        );
        Ok(EdgeCaseReport {
            path,
            mock_changes_suggested,
            suggestion_chars: suggestions.chars().count(),
        })
    }
}
