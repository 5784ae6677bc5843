//! Common test utilities for integration tests
//!
//! Mock listeners and test scripts are small `/bin/sh` programs so the
//! refinement loop can be exercised without a Python toolchain.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use udp_qa_agent::domain::models::{Config, ProcessConfig, ReadinessProbe};

/// Mock that stays up until signalled.
pub const LONG_RUNNING_MOCK: &str = "echo listening\nexec sleep 30\n";

/// Mock that exits before the readiness check.
pub const CRASHING_MOCK: &str = "echo 'bind failed: address in use' >&2\nexit 3\n";

/// Mock that ignores SIGTERM, forcing the supervisor to SIGKILL it.
pub const STUBBORN_MOCK: &str = "trap '' TERM\necho stubborn\nwhile true; do sleep 1; done\n";

/// Test script that reports success the way unittest does.
pub const PASSING_TEST: &str = "echo 'Ran 1 test' >&2\necho OK >&2\n";

/// Test script that fails an assertion.
pub const FAILING_TEST: &str = "echo 'FAIL: test_echo' >&2\nexit 1\n";

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Initialize tracing output for tests that want it.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Write `body` to `dir/name` and return the full path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create script dir");
    }
    std::fs::write(&path, body).expect("Failed to write script");
    path
}

/// Process settings that run artifacts with `/bin/sh` and short timeouts.
pub fn sh_process_config() -> ProcessConfig {
    ProcessConfig {
        interpreter: "/bin/sh".to_string(),
        interpreter_args: vec![],
        grace_period_ms: 300,
        stop_timeout_ms: 500,
        test_timeout_secs: 5,
        readiness: ReadinessProbe::Grace,
        max_output_bytes: 16 * 1024,
    }
}

/// Full configuration for pipeline tests.
pub fn sh_config(retry_budget: u32, edge_cases: bool) -> Config {
    let mut config = Config::default();
    config.process = sh_process_config();
    config.refinement.retry_budget = retry_budget;
    config.refinement.edge_cases = edge_cases;
    config
}

/// A one-service catalog reply.
pub fn catalog(services: &[(&str, u16)]) -> String {
    services
        .iter()
        .map(|(name, port)| {
            format!("Service Name: {name}\nPort: {port}\nFunctionality Summary: echoes datagrams\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A repair reply in the JSON envelope format.
pub fn json_patch(mock: Option<&str>, test: Option<&str>) -> String {
    serde_json::json!({
        "analysis": "the test expected a different reply",
        "updated_mock": mock,
        "updated_test": test,
    })
    .to_string()
}
