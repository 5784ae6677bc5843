//! Filesystem artifact store rooted at one run directory.

use async_trait::async_trait;
use chrono::Local;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::domain::ports::{ArtifactStore, StoreError};

/// Subdirectories created for every run.
pub const RUN_SUBDIRS: [&str; 4] = ["mocks", "tests", "qa_reference", "edge_cases"];

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Store over an existing (or yet to be created) directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create `<base>_<YYYYmmdd_HHMMSS>` with the standard subdirectories.
    pub async fn for_run(base: &Path) -> Result<Self, StoreError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let mut name = base.as_os_str().to_owned();
        name.push(format!("_{stamp}"));
        Self::create_at(PathBuf::from(name)).await
    }

    /// Create the standard layout under an explicit directory.
    pub async fn create_at(root: PathBuf) -> Result<Self, StoreError> {
        for sub in RUN_SUBDIRS {
            let dir = root.join(sub);
            fs::create_dir_all(&dir)
                .await
                .map_err(|source| StoreError::Io { path: dir, source })?;
        }
        let root = fs::canonicalize(&root)
            .await
            .map_err(|source| StoreError::Io {
                path: root.clone(),
                source,
            })?;
        debug!(root = %root.display(), "artifact store initialized");
        Ok(Self { root })
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, relative: &Path) -> Result<PathBuf, StoreError> {
        let escapes = relative.as_os_str().is_empty()
            || relative.components().any(|c| {
                matches!(
                    c,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });
        if escapes {
            return Err(StoreError::InvalidPath(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }

    async fn write(&self, relative: &Path, content: &str) -> Result<PathBuf, StoreError> {
        let path = self.path_of(relative)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, content.as_bytes())
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), bytes = content.len(), "artifact written");
        Ok(path)
    }

    async fn read(&self, relative: &Path) -> Result<String, StoreError> {
        let path = self.path_of(relative)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(path)),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn remove(&self, relative: &Path) -> Result<(), StoreError> {
        let path = self.path_of(relative)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
