//! udp-qa-agent - test doubles for UDP services
//!
//! Reads free-text QA notes, asks a generative backend to identify the UDP
//! services they describe, and for each service produces a mock listener and
//! a test script. Each pair is executed under supervision and repaired from
//! backend suggestions until the test passes or the retry budget runs out.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the backend/store ports
//! - **Service Layer** (`services`): parsing, classification and the refinement loop
//! - **Adapters** (`adapters`): Ollama backend, scripted mock backend, filesystem store
//! - **Infrastructure Layer** (`infrastructure`): config, logging, process supervision
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use udp_qa_agent::{Config, QaPipeline};
//! use udp_qa_agent::adapters::{backend::OllamaBackend, store::FsArtifactStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let backend = Arc::new(OllamaBackend::new(&config.backend)?);
//!     let store = Arc::new(FsArtifactStore::for_run(&config.output.base_dir).await?);
//!     let report = QaPipeline::new(&config, backend, store).run("notes").await?;
//!     println!("all passed: {}", report.all_passed());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{ErrorKind, QaError, QaResult};
pub use domain::models::{AssetOutcome, Config, GeneratedAsset, RunReport, ServiceDescriptor};
pub use domain::ports::{ArtifactStore, GenerativeBackend};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{OutcomeClassifier, QaPipeline, RefinementController};
