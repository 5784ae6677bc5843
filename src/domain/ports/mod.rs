//! Ports the engine depends on; adapters live in `crate::adapters`.

pub mod artifact_store;
pub mod generative_backend;

pub use artifact_store::{ArtifactStore, StoreError};
pub use generative_backend::{BackendError, GenerativeBackend};
