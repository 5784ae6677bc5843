//! Scripted backend for tests and offline runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::ports::{BackendError, GenerativeBackend};
use crate::domain::text::strip_code_fences;

/// Backend that replays queued replies in order and records every prompt.
///
/// Once the queue is drained it falls back to `default_reply`, or fails with
/// `BackendError::Unavailable` when none is set.
#[derive(Clone, Default)]
pub struct MockBackend {
    replies: Arc<Mutex<VecDeque<Result<String, BackendError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    default_reply: Option<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend preloaded with successful replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Arc::new(Mutex::new(
                replies.into_iter().map(|r| Ok(r.into())).collect(),
            )),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Ok(reply.into()));
    }

    pub async fn push_error(&self, error: BackendError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    fn backend_id(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.prompts.lock().await.push(prompt.to_string());

        let next = self.replies.lock().await.pop_front();
        match next {
            Some(reply) => reply.map(|text| strip_code_fences(&text)),
            None => self.default_reply.as_deref().map_or_else(
                || Err(BackendError::Unavailable("mock backend has no scripted reply".to_string())),
                |text| Ok(strip_code_fences(text)),
            ),
        }
    }
}
