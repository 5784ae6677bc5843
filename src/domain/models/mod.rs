//! Domain models for catalogs, assets, runs and refinement outcomes.

pub mod asset;
pub mod config;
pub mod outcome;
pub mod patch;
pub mod run;
pub mod service;

pub use asset::{Artifact, GeneratedAsset};
pub use config::{
    BackendConfig, ClassifierConfig, Config, LogFormat, LoggingConfig, OutputConfig,
    ProcessConfig, PromptConfig, ReadinessProbe, RefinementConfig, RotationPolicy,
};
pub use outcome::{
    AssetOutcome, EdgeCaseReport, FailureReason, RefinementState, RunReport, TerminalState,
};
pub use patch::{PatchBlock, PatchTarget};
pub use run::{Classification, ClassificationReason, RefinementAttempt, RunResult, Verdict};
pub use service::ServiceDescriptor;
