//! CLI tests that run the compiled binary.

mod common;

use common::*;
use std::process::{Command, Output};

fn udp_qa_agent(dir: &std::path::Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_udp-qa-agent"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("UDP_QA_LOGGING__LEVEL", "error")
        .output()
        .expect("Failed to run udp-qa-agent")
}

#[test]
fn test_help_lists_subcommands() {
    let dir = temp_dir();
    let output = udp_qa_agent(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["run", "catalog", "verify"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_catalog_json_output() {
    let dir = temp_dir();
    write_script(
        dir.path(),
        "catalog.txt",
        "Service Name: Auth\nPort: 5005\nFunctionality Summary: login\n\nService Name: Bad\nPort: 0\n",
    );

    let output = udp_qa_agent(dir.path(), &["catalog", "--input", "catalog.txt", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["services"][0]["name"], "Auth");
    assert_eq!(json["services"][0]["port"], 5005);
    assert_eq!(json["dropped"], 1);
}

#[test]
fn test_catalog_without_services_exits_nonzero() {
    let dir = temp_dir();
    write_script(dir.path(), "catalog.txt", "No clear services can be identified.\n");

    let output = udp_qa_agent(dir.path(), &["catalog", "--input", "catalog.txt"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let dir = temp_dir();
    write_script(dir.path(), "qa.yaml", "refinement:\n  retry_budget: 500\n");
    write_script(dir.path(), "catalog.txt", "Service Name: A\nPort: 1\n");

    let output = udp_qa_agent(
        dir.path(),
        &["--config", "qa.yaml", "--json", "catalog", "--input", "catalog.txt"],
    );
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr.lines().find(|l| l.starts_with('{')).unwrap();
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert!(json["error"].is_string());
}

#[test]
fn test_verify_passes_with_sh_scripts() {
    let dir = temp_dir();
    write_script(
        dir.path(),
        ".udp-qa/config.yaml",
        "process:\n  interpreter: /bin/sh\n  grace_period_ms: 200\n  stop_timeout_ms: 500\n",
    );
    write_script(dir.path(), "mocks/mock_echo.py", LONG_RUNNING_MOCK);
    write_script(dir.path(), "tests/test_echo.py", PASSING_TEST);

    let output = udp_qa_agent(
        dir.path(),
        &["verify", "--mock", "mocks/mock_echo.py", "--test", "tests/test_echo.py", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["verdict"], "pass");
    assert!(json["mock_stdout"].as_str().unwrap().contains("listening"));
}

#[test]
fn test_verify_fails_with_failing_test() {
    let dir = temp_dir();
    write_script(
        dir.path(),
        ".udp-qa/config.yaml",
        "process:\n  interpreter: /bin/sh\n  grace_period_ms: 200\n  stop_timeout_ms: 500\n",
    );
    write_script(dir.path(), "mocks/mock_echo.py", LONG_RUNNING_MOCK);
    write_script(dir.path(), "tests/test_echo.py", FAILING_TEST);

    let output = udp_qa_agent(
        dir.path(),
        &["verify", "--mock", "mocks/mock_echo.py", "--test", "tests/test_echo.py"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAIL"));
}
