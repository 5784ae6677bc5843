use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::patch::PatchTarget;
use super::service::ServiceDescriptor;

/// One persisted source file (mock listener or test script).
///
/// `path` is relative to the artifact store root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// A mock listener paired with the test script that exercises it.
///
/// Both artifacts are persisted or neither is; the refinement controller
/// mutates them in place and persists every change immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAsset {
    pub descriptor: ServiceDescriptor,
    pub mock: Artifact,
    pub test: Artifact,
    /// QA context the artifacts were generated from, reused in repair prompts
    pub context_snippet: String,
}

impl GeneratedAsset {
    pub fn artifact(&self, target: PatchTarget) -> &Artifact {
        match target {
            PatchTarget::Mock => &self.mock,
            PatchTarget::Test => &self.test,
        }
    }

    pub fn artifact_mut(&mut self, target: PatchTarget) -> &mut Artifact {
        match target {
            PatchTarget::Mock => &mut self.mock,
            PatchTarget::Test => &mut self.test,
        }
    }

    /// Relative path of the mock listener inside the store.
    pub fn mock_path_for(descriptor: &ServiceDescriptor) -> PathBuf {
        PathBuf::from("mocks").join(format!("mock_{}.py", descriptor.artifact_stem()))
    }

    /// Relative path of the test script inside the store.
    pub fn test_path_for(descriptor: &ServiceDescriptor) -> PathBuf {
        PathBuf::from("tests").join(format!("test_{}.py", descriptor.artifact_stem()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_follow_descriptor() {
        let svc = ServiceDescriptor::new("Auth UDP", 5005, "login packets");
        assert_eq!(
            GeneratedAsset::mock_path_for(&svc),
            PathBuf::from("mocks/mock_auth_udp_port5005.py")
        );
        assert_eq!(
            GeneratedAsset::test_path_for(&svc),
            PathBuf::from("tests/test_auth_udp_port5005.py")
        );
    }

    #[test]
    fn test_artifact_mut_targets_requested_file() {
        let svc = ServiceDescriptor::new("Echo", 9999, "echo");
        let mut asset = GeneratedAsset {
            mock: Artifact::new(GeneratedAsset::mock_path_for(&svc), "mock"),
            test: Artifact::new(GeneratedAsset::test_path_for(&svc), "test"),
            descriptor: svc,
            context_snippet: String::new(),
        };

        asset.artifact_mut(PatchTarget::Test).content = "patched".to_string();
        assert_eq!(asset.artifact(PatchTarget::Test).content, "patched");
        assert_eq!(asset.artifact(PatchTarget::Mock).content, "mock");
    }
}
