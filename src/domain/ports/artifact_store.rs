//! Artifact Store Port
//!
//! Byte-for-byte persistence of generated artifacts, keyed by a path relative
//! to the store root.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Artifact path escapes the store root: {0}")]
    InvalidPath(PathBuf),

    #[error("Artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Directory every relative artifact path is resolved against
    fn root(&self) -> &Path;

    /// Absolute location of `relative`, validated to stay under the root
    fn path_of(&self, relative: &Path) -> Result<PathBuf, StoreError>;

    /// Write `content` verbatim, creating parent directories as needed
    async fn write(&self, relative: &Path, content: &str) -> Result<PathBuf, StoreError>;

    async fn read(&self, relative: &Path) -> Result<String, StoreError>;

    /// Remove an artifact; removing a missing artifact is not an error
    async fn remove(&self, relative: &Path) -> Result<(), StoreError>;
}
