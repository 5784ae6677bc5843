//! Ollama backend implementation.
//!
//! Calls the non-streaming `/api/generate` endpoint of a local Ollama server
//! and returns the `response` field with one pair of code fences stripped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::retry::RetryPolicy;
use crate::domain::models::BackendConfig;
use crate::domain::ports::{BackendError, GenerativeBackend};
use crate::domain::text::strip_code_fences;

/// Sampling options forwarded verbatim to Ollama.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub num_ctx: u32,
}

/// Request body of `POST /api/generate`.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: &'a GenerateOptions,
}

/// The subset of the `/api/generate` reply the agent reads.
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}

/// Ollama HTTP backend.
pub struct OllamaBackend {
    client: Client,
    endpoint: String,
    model: String,
    options: GenerateOptions,
    timeout_secs: u64,
    retry_policy: RetryPolicy,
}

impl OllamaBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BackendError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let endpoint = format!("{}/api/generate", config.base_url.trim_end_matches('/'));
        info!(
            endpoint = %endpoint,
            model = %config.model,
            timeout_secs = config.request_timeout_secs,
            "initializing ollama backend"
        );

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            options: GenerateOptions {
                temperature: config.temperature,
                top_k: config.top_k,
                top_p: config.top_p,
                num_ctx: config.num_ctx,
            },
            timeout_secs: config.request_timeout_secs,
            retry_policy: RetryPolicy::new(
                config.max_retries,
                config.initial_backoff_ms,
                config.max_backoff_ms,
            ),
        })
    }

    /// Replace the retry policy (tests use [`RetryPolicy::none`]).
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn send_once(&self, prompt: &str) -> Result<String, BackendError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: &self.options,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(&e))?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::Malformed(format!("undecodable generate reply: {e}")))?;

        debug!(chars = parsed.response.len(), done = parsed.done, "backend reply received");
        Ok(strip_code_fences(&parsed.response))
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout_secs)
        } else if err.is_decode() {
            BackendError::Malformed(err.to_string())
        } else {
            BackendError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl GenerativeBackend for OllamaBackend {
    fn backend_id(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_chars = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        self.retry_policy.execute(|| self.send_once(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = BackendConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..Default::default()
        };
        let backend = OllamaBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(backend.model(), "llama3:latest");
    }

    #[test]
    fn test_request_serializes_ollama_shape() {
        let options = GenerateOptions {
            temperature: 0.3,
            top_k: 40,
            top_p: 0.9,
            num_ctx: 4096,
        };
        let body = GenerateRequest {
            model: "llama3:latest",
            prompt: "hi",
            stream: false,
            options: &options,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_ctx"], 4096);
        assert_eq!(json["model"], "llama3:latest");
    }
}
