use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Upper bound on repair attempts per asset
pub const MAX_RETRY_BUDGET: u32 = 20;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid retry_budget: {0}. Must be at most {MAX_RETRY_BUDGET}")]
    InvalidRetryBudget(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Backend base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("Backend model cannot be empty")]
    EmptyModel,

    #[error("Process interpreter cannot be empty")]
    EmptyInterpreter,

    #[error("Invalid {0}: must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Classifier success_marker cannot be empty")]
    EmptySuccessMarker,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .udp-qa/config.yaml (project config)
    /// 3. .udp-qa/local.yaml (local overrides, optional)
    /// 4. Environment variables (UDP_QA_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::base()
            .merge(Yaml::file(".udp-qa/config.yaml"))
            .merge(Yaml::file(".udp-qa/local.yaml"))
            .merge(Env::prefixed("UDP_QA_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Self::base()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("UDP_QA_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// `load_from_file` when a path is given, `load` otherwise
    pub fn load_with(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    fn base() -> Figment {
        Figment::new().merge(Serialized::defaults(Config::default()))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.refinement.retry_budget > MAX_RETRY_BUDGET {
            return Err(ConfigError::InvalidRetryBudget(
                config.refinement.retry_budget,
            ));
        }

        let backend = &config.backend;
        if backend.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if backend.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        if backend.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("backend.request_timeout_secs"));
        }
        if backend.initial_backoff_ms > backend.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                backend.initial_backoff_ms,
                backend.max_backoff_ms,
            ));
        }

        let process = &config.process;
        if process.interpreter.trim().is_empty() {
            return Err(ConfigError::EmptyInterpreter);
        }
        if process.test_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("process.test_timeout_secs"));
        }
        if process.stop_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("process.stop_timeout_ms"));
        }
        if process.max_output_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "process.max_output_bytes must be greater than zero".to_string(),
            ));
        }

        if config.classifier.success_marker.is_empty() {
            return Err(ConfigError::EmptySuccessMarker);
        }
        if config.classifier.failure_markers.iter().any(String::is_empty) {
            return Err(ConfigError::ValidationFailed(
                "classifier.failure_markers cannot contain empty strings".to_string(),
            ));
        }

        if config.prompts.max_section_chars == 0 {
            return Err(ConfigError::ValidationFailed(
                "prompts.max_section_chars must be greater than zero".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
