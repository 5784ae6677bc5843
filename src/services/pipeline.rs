//! End-to-end QA run: notes to catalog to assets to outcomes.
//!
//! Assets are processed strictly one after another; each reaches a terminal
//! state before the next one is generated.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::asset_generator::AssetGenerator;
use super::catalog_parser::parse_catalog;
use super::edge_case_augmenter::EdgeCaseAugmenter;
use super::outcome_classifier::OutcomeClassifier;
use super::prompts::PromptBuilder;
use super::refinement_controller::RefinementController;
use crate::domain::errors::{QaError, QaResult};
use crate::domain::models::{
    AssetOutcome, Config, FailureReason, RunReport, ServiceDescriptor, TerminalState,
};
use crate::domain::ports::{ArtifactStore, GenerativeBackend};
use crate::infrastructure::process::{ProcessSupervisor, TestRunner};

pub const NOTES_PATH: &str = "qa_reference/qa_notes.md";
pub const CATALOG_PATH: &str = "qa_reference/identified_services.txt";
pub const REPORT_PATH: &str = "report.json";

pub struct QaPipeline {
    backend: Arc<dyn GenerativeBackend>,
    store: Arc<dyn ArtifactStore>,
    prompts: PromptBuilder,
    generator: AssetGenerator,
    controller: RefinementController,
    augmenter: Option<EdgeCaseAugmenter>,
}

impl QaPipeline {
    /// Wire every stage from configuration.
    pub fn new(
        config: &Config,
        backend: Arc<dyn GenerativeBackend>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        let prompts = PromptBuilder::new(&config.prompts);
        let generator = AssetGenerator::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            prompts.clone(),
        );
        let controller = RefinementController::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            ProcessSupervisor::new(config.process.clone()),
            TestRunner::new(config.process.clone()),
            OutcomeClassifier::new(&config.classifier),
            prompts.clone(),
            config.refinement.retry_budget,
            Duration::from_secs(config.process.test_timeout_secs),
        );
        let augmenter = config.refinement.edge_cases.then(|| {
            EdgeCaseAugmenter::new(Arc::clone(&backend), Arc::clone(&store), prompts.clone())
        });

        Self {
            backend,
            store,
            prompts,
            generator,
            controller,
            augmenter,
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.store.root()
    }

    /// Ask the backend for the service catalog described by `notes`.
    ///
    /// # Errors
    /// Backend failures, or `CatalogParseEmpty` when no usable service is listed.
    pub async fn identify_services(&self, notes: &str) -> QaResult<Vec<ServiceDescriptor>> {
        let catalog_text = self
            .backend
            .generate(&self.prompts.identify_services(notes))
            .await?;
        self.store.write(Path::new(CATALOG_PATH), &catalog_text).await?;

        let services = parse_catalog(&catalog_text)?;
        info!(count = services.len(), "services identified");
        Ok(services)
    }

    /// Run the whole pipeline over `notes`.
    ///
    /// # Errors
    /// Only failures that prevent any asset work (backend unreachable while
    /// identifying services, empty catalog, unwritable store). Per-asset
    /// failures are reported in the returned [`RunReport`].
    #[instrument(skip(self, notes), fields(output = %self.store.root().display()))]
    pub async fn run(&self, notes: &str) -> QaResult<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, backend = self.backend.backend_id(), model = self.backend.model(), "qa run started");

        self.store.write(Path::new(NOTES_PATH), notes).await?;
        let services = self.identify_services(notes).await?;

        let mut outcomes = Vec::with_capacity(services.len());
        for (position, service) in services.iter().enumerate() {
            info!(
                service = %service.name,
                port = service.port,
                position = position + 1,
                total = services.len(),
                "processing service"
            );
            outcomes.push(self.process_service(service, notes).await);
        }

        let report = RunReport {
            run_id,
            output_dir: self.store.root().to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        self.write_report(&report).await;

        info!(
            %run_id,
            passed = report.count(TerminalState::Passed),
            exhausted = report.count(TerminalState::Exhausted),
            aborted = report.count(TerminalState::Aborted),
            "qa run finished"
        );
        Ok(report)
    }

    async fn process_service(&self, service: &ServiceDescriptor, notes: &str) -> AssetOutcome {
        let mut asset = match self.generator.generate(service, notes).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!(service = %service.name, error = %e, "asset generation failed");
                return generation_failure(service, &e);
            }
        };

        let mut outcome = self.controller.refine(&mut asset).await;

        if outcome.passed() {
            if let Some(augmenter) = &self.augmenter {
                match augmenter.augment(&asset).await {
                    Ok(report) => outcome.edge_cases = Some(report),
                    Err(e) => {
                        warn!(service = %service.name, error = %e, "edge-case augmentation failed");
                        outcome.warnings.push(format!("edge cases unavailable: {e}"));
                    }
                }
            }
        }
        outcome
    }

    async fn write_report(&self, report: &RunReport) {
        let json = match serde_json::to_string_pretty(report) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to serialize run report");
                return;
            }
        };
        if let Err(e) = self.store.write(Path::new(REPORT_PATH), &json).await {
            error!(error = %e, "failed to write run report");
        }
    }
}

fn generation_failure(service: &ServiceDescriptor, err: &QaError) -> AssetOutcome {
    AssetOutcome {
        service: service.clone(),
        state: TerminalState::Aborted,
        failure: Some(FailureReason {
            kind: err.kind(),
            message: format!("generation failed: {err}"),
        }),
        attempts: Vec::new(),
        edge_cases: None,
        warnings: Vec::new(),
    }
}
