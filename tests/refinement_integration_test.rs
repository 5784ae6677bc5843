//! End-to-end refinement tests: scripted backend, real filesystem store and
//! real child processes.

mod common;

use common::*;
use std::path::Path;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use udp_qa_agent::adapters::backend::MockBackend;
use udp_qa_agent::adapters::store::FsArtifactStore;
use udp_qa_agent::domain::errors::{ErrorKind, QaError};
use udp_qa_agent::domain::models::{RunReport, TerminalState, Verdict};
use udp_qa_agent::domain::ports::ArtifactStore;
use udp_qa_agent::services::QaPipeline;

async fn run_pipeline(
    backend: &MockBackend,
    store: &Arc<FsArtifactStore>,
    retry_budget: u32,
    edge_cases: bool,
) -> Result<RunReport, QaError> {
    let config = sh_config(retry_budget, edge_cases);
    let pipeline = QaPipeline::new(&config, Arc::new(backend.clone()), store.clone());
    pipeline.run("A UDP echo service listens on 5101.").await
}

async fn temp_store(dir: &Path) -> Arc<FsArtifactStore> {
    Arc::new(FsArtifactStore::create_at(dir.join("run")).await.unwrap())
}

#[tokio::test]
async fn test_passes_on_first_attempt() {
    setup_test_logging();
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        PASSING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 3, false).await);

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state, TerminalState::Passed);
    assert!(outcome.failure.is_none());
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.attempts[0].verdict, Verdict::Pass);
    assert!(report.all_passed());

    for path in [
        "mocks/mock_echo_port5101.py",
        "tests/test_echo_port5101.py",
        "qa_reference/qa_notes.md",
        "qa_reference/identified_services.txt",
        "report.json",
    ] {
        assert!(store.root().join(path).is_file(), "missing {path}");
    }
    assert_eq!(backend.remaining().await, 0);
}

#[tokio::test]
async fn test_repair_patch_is_applied_and_persisted() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        FAILING_TEST.to_string(),
        json_patch(None, Some(PASSING_TEST)),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 3, false).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Passed);
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].verdict, Verdict::Fail);
    assert_eq!(outcome.attempts[1].index, 1);

    let test_on_disk = std::fs::read_to_string(store.root().join("tests/test_echo_port5101.py")).unwrap();
    assert!(test_on_disk.contains("echo OK"));
    let mock_on_disk = std::fs::read_to_string(store.root().join("mocks/mock_echo_port5101.py")).unwrap();
    assert!(mock_on_disk.contains("exec sleep 30"));

    // The repair prompt carries the failing run's stderr and the mock's output.
    let prompts = backend.prompts().await;
    let repair_prompt = prompts.last().unwrap();
    assert!(repair_prompt.contains("FAIL: test_echo"));
    assert!(repair_prompt.contains("listening"));
}

#[tokio::test]
async fn test_tagged_repair_response_is_accepted() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let tagged = format!("The assertion was wrong.\n\nUpdated Test Script Code:\n```python\n{PASSING_TEST}```\n");
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        FAILING_TEST.to_string(),
        tagged,
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 1, false).await);
    assert_eq!(report.outcomes[0].state, TerminalState::Passed);
}

#[tokio::test]
async fn test_exhausts_after_budget_plus_one_attempts() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        FAILING_TEST.to_string(),
        json_patch(None, Some(FAILING_TEST)),
        json_patch(Some(LONG_RUNNING_MOCK), Some(FAILING_TEST)),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 2, false).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Exhausted);
    assert_eq!(outcome.attempts.len(), 3);
    assert!(outcome.attempts.iter().all(|a| a.verdict == Verdict::Fail));
    assert_eq!(outcome.failure.as_ref().unwrap().kind, ErrorKind::RetriesExhausted);
    // Initial generation (2) + catalog (1) + two repairs; no repair after the last attempt.
    assert_eq!(backend.prompts().await.len(), 5);
    assert!(!report.all_passed());
}

#[tokio::test]
async fn test_zero_budget_runs_exactly_once() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        FAILING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 0, false).await);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.state, TerminalState::Exhausted);
    assert_eq!(outcome.attempts.len(), 1);
}

#[tokio::test]
async fn test_unparseable_repair_aborts() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        FAILING_TEST.to_string(),
        "I am not sure what is wrong here.".to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 3, false).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Aborted);
    assert_eq!(outcome.failure.as_ref().unwrap().kind, ErrorKind::PatchUnparseable);
    assert_eq!(outcome.attempts.len(), 1);
}

#[tokio::test]
async fn test_mock_start_failure_aborts_without_attempts() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        CRASHING_MOCK.to_string(),
        PASSING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 3, false).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Aborted);
    let failure = outcome.failure.as_ref().unwrap();
    assert_eq!(failure.kind, ErrorKind::ProcessStartFailure);
    assert!(failure.message.contains("address in use"));
    assert!(outcome.attempts.is_empty());
}

#[tokio::test]
async fn test_failing_asset_does_not_affect_the_next() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Broken", 5201), ("Echo", 5202)]),
        CRASHING_MOCK.to_string(),
        PASSING_TEST.to_string(),
        LONG_RUNNING_MOCK.to_string(),
        PASSING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 2, false).await);

    let states: Vec<_> = report.outcomes.iter().map(|o| (o.service.name.as_str(), o.state)).collect();
    assert_eq!(
        states,
        vec![("Broken", TerminalState::Aborted), ("Echo", TerminalState::Passed)]
    );
    assert_eq!(report.count(TerminalState::Passed), 1);
}

#[tokio::test]
async fn test_generation_failure_is_scoped_to_its_asset() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    // Test-script generation for the only service fails: no reply left.
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 2, false).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Aborted);
    assert_eq!(outcome.failure.as_ref().unwrap().kind, ErrorKind::BackendUnavailable);
    // The orphaned mock was removed again.
    assert!(!store.root().join("mocks/mock_echo_port5101.py").exists());
}

#[tokio::test]
async fn test_edge_cases_recorded_for_passing_asset() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        PASSING_TEST.to_string(),
        "1. Empty datagram\n2. Oversized datagram\n\nNo mock changes are needed.".to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 1, true).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Passed);
    let edge_cases = outcome.edge_cases.as_ref().unwrap();
    assert!(!edge_cases.mock_changes_suggested);
    let doc = std::fs::read_to_string(store.root().join(&edge_cases.path)).unwrap();
    assert!(doc.starts_with("# Edge cases: Echo (port 5101)"));
    assert!(doc.contains("Oversized datagram"));
}

#[tokio::test]
async fn test_edge_case_failure_is_only_a_warning() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        PASSING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 1, true).await);
    let outcome = &report.outcomes[0];

    assert_eq!(outcome.state, TerminalState::Passed);
    assert!(outcome.edge_cases.is_none());
    assert_eq!(outcome.warnings.len(), 1);
}

#[tokio::test]
async fn test_no_services_is_fatal_to_the_run() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies(["No clear services can be identified from these notes."]);

    let err = assert_err!(run_pipeline(&backend, &store, 1, false).await);
    assert_eq!(err.kind(), ErrorKind::CatalogParseEmpty);
    // The raw catalog is still kept for inspection.
    assert!(store.root().join("qa_reference/identified_services.txt").is_file());
}

#[tokio::test]
async fn test_report_json_round_trips_outcomes() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    let backend = MockBackend::with_replies([
        catalog(&[("Echo", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        PASSING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 1, false).await);
    let written = store.read(Path::new("report.json")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();

    assert_eq!(json["run_id"], report.run_id.to_string());
    assert_eq!(json["outcomes"][0]["state"], "passed");
    assert_eq!(json["outcomes"][0]["service"]["port"], 5101);
}

#[tokio::test]
async fn test_colliding_catalog_entries_yield_one_asset() {
    let dir = temp_dir();
    let store = temp_store(dir.path()).await;
    // Both names slug to `auth_udp` on the same port; only one pair is generated.
    let backend = MockBackend::with_replies([
        catalog(&[("Auth UDP", 5101), ("auth  udp", 5101)]),
        LONG_RUNNING_MOCK.to_string(),
        PASSING_TEST.to_string(),
    ]);

    let report = assert_ok!(run_pipeline(&backend, &store, 1, false).await);

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].service.name, "Auth UDP");
    assert_eq!(report.outcomes[0].state, TerminalState::Passed);
    assert_eq!(backend.prompts().await.len(), 3);
    assert!(store.root().join("mocks/mock_auth_udp_port5101.py").is_file());
}
