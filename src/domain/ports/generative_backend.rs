//! Generative Backend Port
//!
//! The engine treats the backend as an opaque text-in/text-out service.
//! Implementations strip one pair of code fences from the reply before
//! returning it and surface every failure as a [`BackendError`] value.

use async_trait::async_trait;

/// Error types for backend calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Transport failure (connection refused, reset, DNS)
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend answered with a non-success HTTP status
    #[error("Backend rejected request ({status}): {body}")]
    Status { status: u16, body: String },

    /// No reply within the configured request timeout
    #[error("Backend request timed out after {0}s")]
    Timeout(u64),

    /// Reply could not be decoded into text
    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Returns true if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

/// Port trait for text generation backends
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the pipeline holds them behind an
/// `Arc<dyn GenerativeBackend>`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short identifier used in logs, e.g. `"ollama"`
    fn backend_id(&self) -> &str;

    /// Model identifier requests are sent with
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    /// - `BackendError::Unavailable` - transport error
    /// - `BackendError::Status` - HTTP failure status
    /// - `BackendError::Timeout` - request exceeded its timeout
    /// - `BackendError::Malformed` - payload was not decodable text
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}
