//! Generative backend adapters.

pub mod mock;
pub mod ollama;
pub mod retry;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use retry::RetryPolicy;
