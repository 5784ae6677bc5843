//! Mock/test pair generation for one catalog entry.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::prompts::PromptBuilder;
use crate::domain::errors::{QaError, QaResult};
use crate::domain::models::{Artifact, GeneratedAsset, ServiceDescriptor};
use crate::domain::ports::{ArtifactStore, GenerativeBackend};

pub struct AssetGenerator {
    backend: Arc<dyn GenerativeBackend>,
    store: Arc<dyn ArtifactStore>,
    prompts: PromptBuilder,
}

impl AssetGenerator {
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

    /// QA context embedded in every prompt for `service`.
    pub fn context_snippet(service: &ServiceDescriptor, notes: &str) -> String {
        format!(
            "Service: {}, Port: {}, Functionality: {}\nDetails from QA notes:\n{}",
            service.name, service.port, service.functionality, notes
        )
    }

    /// Generate and persist the mock listener and test script for `service`.
    ///
    /// Either both artifacts end up in the store or neither does: a failure
    /// after the mock was written removes it again.
    #[instrument(skip(self, notes), fields(service = %service.name, port = service.port))]
    pub async fn generate(&self, service: &ServiceDescriptor, notes: &str) -> QaResult<GeneratedAsset> {
        let context_snippet = Self::context_snippet(service, notes);

        let mock_code = self
            .request_code(&self.prompts.mock_listener(service, &context_snippet), "mock listener")
            .await?;
        let mock = Artifact::new(GeneratedAsset::mock_path_for(service), mock_code);
        self.store.write(&mock.path, &mock.content).await?;
        info!(path = %mock.path.display(), "mock listener generated");

        let test = match self.generate_test(service, &context_snippet, &mock.content).await {
            Ok(test) => test,
            Err(e) => {
                warn!(error = %e, "test generation failed, removing orphaned mock");
                if let Err(remove_err) = self.store.remove(&mock.path).await {
                    warn!(error = %remove_err, path = %mock.path.display(), "failed to remove orphaned mock");
                }
                return Err(e);
            }
        };
        info!(path = %test.path.display(), "test script generated");

        Ok(GeneratedAsset {
            descriptor: service.clone(),
            mock,
            test,
            context_snippet,
        })
    }

    async fn generate_test(
        &self,
        service: &ServiceDescriptor,
        context: &str,
        mock_code: &str,
    ) -> QaResult<Artifact> {
        let prompt = self.prompts.test_script(service, context, mock_code);
        let test_code = self.request_code(&prompt, "test script").await?;
        let test = Artifact::new(GeneratedAsset::test_path_for(service), test_code);
        self.store.write(&test.path, &test.content).await?;
        Ok(test)
    }

    async fn request_code(&self, prompt: &str, what: &str) -> QaResult<String> {
        let code = self.backend.generate(prompt).await?;
        if code.trim().is_empty() {
            return Err(QaError::BackendMalformedResponse(format!(
                "backend returned no {what} code"
            )));
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::backend::MockBackend;
    use crate::adapters::store::FsArtifactStore;
    use crate::domain::ports::BackendError;
    use tempfile::TempDir;

    async fn setup(backend: MockBackend) -> (TempDir, Arc<FsArtifactStore>, AssetGenerator) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsArtifactStore::create_at(dir.path().join("run")).await.unwrap());
        let generator = AssetGenerator::new(
            Arc::new(backend),
            Arc::clone(&store) as Arc<dyn ArtifactStore>,
            PromptBuilder::default(),
        );
        (dir, store, generator)
    }

    #[tokio::test]
    async fn test_generates_and_persists_both_artifacts() {
        let backend = MockBackend::with_replies(["```python\nMOCK\n```", "TEST"]);
        let (_dir, store, generator) = setup(backend.clone()).await;
        let service = ServiceDescriptor::new("Echo Svc", 9000, "echo");

        let asset = generator.generate(&service, "notes").await.unwrap();

        assert_eq!(asset.mock.content, "MOCK");
        assert_eq!(store.read(&asset.mock.path).await.unwrap(), "MOCK");
        assert_eq!(store.read(&asset.test.path).await.unwrap(), "TEST");
        assert!(asset.context_snippet.contains("Port: 9000"));

        let prompts = backend.prompts().await;
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("MOCK"), "test prompt embeds the mock code");
    }

    #[tokio::test]
    async fn test_failed_test_generation_removes_mock() {
        let backend = MockBackend::with_replies(["MOCK"]);
        backend
            .push_error(BackendError::Unavailable("connection refused".into()))
            .await;
        let (_dir, store, generator) = setup(backend).await;
        let service = ServiceDescriptor::new("Echo", 9000, "echo");

        let err = generator.generate(&service, "notes").await.unwrap_err();

        assert!(matches!(err, QaError::BackendUnavailable(_)));
        assert!(!store.path_of(&GeneratedAsset::mock_path_for(&service)).unwrap().exists());
        assert!(!store.path_of(&GeneratedAsset::test_path_for(&service)).unwrap().exists());
    }

    #[tokio::test]
    async fn test_empty_mock_reply_writes_nothing() {
        let backend = MockBackend::with_replies(["   "]);
        let (_dir, store, generator) = setup(backend).await;
        let service = ServiceDescriptor::new("Echo", 9000, "echo");

        let err = generator.generate(&service, "notes").await.unwrap_err();

        assert!(matches!(err, QaError::BackendMalformedResponse(_)));
        assert!(!store.path_of(&GeneratedAsset::mock_path_for(&service)).unwrap().exists());
    }
}
