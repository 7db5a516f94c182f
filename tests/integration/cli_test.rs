//! CLI binary smoke tests: argument validation exit codes and report
//! output formats.

use std::process::{Command, Output};

const PROBE: &str = env!("CARGO_BIN_EXE_mcp-probe");
const VALID_SERVER: &str = env!("CARGO_BIN_EXE_mock_server_valid");
const BROKEN_SERVER: &str = env!("CARGO_BIN_EXE_mock_server_broken");

fn run_probe(args: &[&str]) -> Output {
    Command::new(PROBE)
        .args(args)
        .output()
        .expect("probe binary should run")
}

#[test]
fn test_valid_server_exits_zero() {
    let output = run_probe(&[VALID_SERVER]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("passed"));
    // Not a terminal, so no ANSI escapes.
    assert!(!stdout.contains("\x1b["));
}

#[test]
fn test_broken_server_exits_one() {
    let output = run_probe(&[BROKEN_SERVER]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("failed"));
}

#[test]
fn test_json_format_round_trips() {
    let output = run_probe(&[VALID_SERVER, "--format", "json"]);
    assert_eq!(output.status.code(), Some(0));

    let data: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert!(data.get("mcp_probe_version").is_some());
    assert!(data["suites"].is_array());
    assert!(data["summary"]["total"].as_u64().unwrap() > 0);
    assert_eq!(data["transport"], "stdio");
}

#[test]
fn test_suite_filter_runs_only_lifecycle() {
    let output = run_probe(&[VALID_SERVER, "--suite", "lifecycle", "--format", "json"]);
    let data: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = data["suites"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["lifecycle"]);
}

#[test]
fn test_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let output = run_probe(&[
        VALID_SERVER,
        "--format",
        "json",
        "--output",
        path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0));

    let data: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(data["suites"].is_array());
}

#[test]
fn test_no_args_exits_two() {
    let output = run_probe(&[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_command_and_url_exits_two() {
    let output = run_probe(&["cmd", "--url", "http://localhost:9999"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unknown_suite_exits_two() {
    let output = run_probe(&[VALID_SERVER, "--suite", "nonexistent"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown suite"));
}

#[test]
fn test_sse_transport_exits_two_with_guidance() {
    let output = run_probe(&["--url", "http://localhost:9999", "--transport", "sse"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("http"));
}

#[test]
fn test_version_flag() {
    let output = run_probe(&["--version"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}
