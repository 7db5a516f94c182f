//! Report schema and round-trip tests.

use pretty_assertions::assert_eq;
use serde_json::json;

use mcp_probe::report::{format_report, report_json};
use mcp_probe::types::{CapabilityFlags, CheckResult, ProbeReport, Severity, Status, SuiteResult};

fn sample_report() -> ProbeReport {
    let mut report = ProbeReport::new(
        "python server.py",
        "stdio",
        "2026-08-01T12:00:00.000000Z".to_string(),
    );
    report.duration_ms = 842.0;
    report.server_info = Some(json!({"name": "mock-valid", "version": "1.0.0"}));
    report.capabilities = CapabilityFlags {
        tools: true,
        resources: true,
        prompts: false,
        tasks: false,
    };
    report.suites.push(SuiteResult {
        name: "jsonrpc".to_string(),
        checks: vec![
            CheckResult {
                id: "RPC-001".to_string(),
                description: "Response contains jsonrpc 2.0 field".to_string(),
                status: Status::Pass,
                severity: Severity::Critical,
                duration_ms: 2.5,
                details: None,
            },
            CheckResult {
                id: "RPC-005".to_string(),
                description: "Unknown method returns -32601".to_string(),
                status: Status::Warn,
                severity: Severity::Warning,
                duration_ms: 1.0,
                details: Some("code is -32000".to_string()),
            },
            CheckResult {
                id: "RPC-007".to_string(),
                description: "Error codes summary".to_string(),
                status: Status::Skip,
                severity: Severity::Info,
                duration_ms: 0.1,
                details: None,
            },
        ],
    });
    report
}

#[test]
fn test_json_schema_field_names() {
    let value = sample_report().to_json();
    assert_eq!(value["mcp_probe_version"], json!(env!("CARGO_PKG_VERSION")));
    assert_eq!(value["spec_version"], json!("2025-11-25"));
    assert_eq!(value["transport"], json!("stdio"));
    assert_eq!(value["capabilities"]["tools"], json!(true));
    assert_eq!(value["capabilities"]["prompts"], json!(false));
    assert_eq!(value["server_info"]["name"], json!("mock-valid"));

    let check = &value["suites"][0]["checks"][0];
    assert_eq!(check["id"], json!("RPC-001"));
    assert_eq!(check["status"], json!("PASS"));
    assert_eq!(check["severity"], json!("CRITICAL"));
    assert_eq!(check["duration_ms"], json!(2.5));
}

#[test]
fn test_summary_in_json_output() {
    let value = sample_report().to_json();
    assert_eq!(value["summary"]["total"], json!(3));
    assert_eq!(value["summary"]["passed"], json!(1));
    assert_eq!(value["summary"]["warnings"], json!(1));
    assert_eq!(value["summary"]["skipped"], json!(1));
    assert_eq!(value["summary"]["failed"], json!(0));
}

#[test]
fn test_report_round_trips_through_json() {
    let report = sample_report();
    let rendered = report_json(&report);
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed, report.to_json());
}

#[test]
fn test_format_report_dispatch() {
    let report = sample_report();
    let json_out = format_report(&report, "json", false, false);
    assert!(serde_json::from_str::<serde_json::Value>(&json_out).is_ok());

    let console_out = format_report(&report, "console", false, false);
    assert!(console_out.contains("JSON-RPC Protocol"));
    assert!(console_out.contains("RPC-001"));
}

#[test]
fn test_warn_details_shown_without_verbose() {
    let console_out = format_report(&sample_report(), "console", false, false);
    assert!(console_out.contains("code is -32000"));
}
