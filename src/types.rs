//! Core result and report types shared across the probe.
//!
//! A run produces one [`ProbeReport`] holding one [`SuiteResult`] per
//! executed suite, each holding one [`CheckResult`] per declared check.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// MCP specification revision the probe validates against.
pub const SPEC_VERSION: &str = "2025-11-25";

/// Probe version reported in headers and JSON output.
pub const PROBE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
    Warn,
    Skip,
    Info,
}

/// Weight of a check in exit-code computation.
///
/// Ordering matters: `Critical` and `Error` failures always gate, `Warning`
/// only under strict mode, `Info` never.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Error,
    Warning,
    Info,
}

/// Well-known JSON-RPC 2.0 error codes, used by the RPC-007 summary.
pub fn error_code_label(code: i64) -> Option<&'static str> {
    match code {
        -32700 => Some("Parse error"),
        -32600 => Some("Invalid Request"),
        -32601 => Some("Method not found"),
        -32602 => Some("Invalid params"),
        -32603 => Some("Internal error"),
        -32800 => Some("Request cancelled"),
        -32801 => Some("Content too large"),
        _ => None,
    }
}

/// The recorded outcome of one check, immutable once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check identifier, e.g. `INIT-001`.
    pub id: String,
    /// Human-readable description of what the check verifies.
    pub description: String,
    pub status: Status,
    pub severity: Severity,
    /// Wall-clock duration of the check body in milliseconds.
    pub duration_ms: f64,
    /// Supporting detail, shown on FAIL/WARN and in verbose output.
    #[serde(default)]
    pub details: Option<String>,
}

/// All results from one suite, ordered by check identifier ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub checks: Vec<CheckResult>,
}

/// Aggregate counters over every check in a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub info: usize,
}

/// Top-level report for one probe run.
///
/// Built incrementally by the runner; `duration_ms` is stamped after the
/// final suite completes.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub probe_version: String,
    pub spec_version: String,
    pub target: String,
    pub transport: String,
    /// ISO-8601 UTC timestamp with `Z` suffix.
    pub timestamp: String,
    pub duration_ms: f64,
    /// Opaque `serverInfo` object as supplied by the server.
    pub server_info: Option<Value>,
    /// Recognized capability flags derived from the initialize response.
    pub capabilities: CapabilityFlags,
    pub suites: Vec<SuiteResult>,
}

/// The four top-level capability keys the probe recognizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
    pub tasks: bool,
}

impl CapabilityFlags {
    /// Derives flags from the raw capabilities object of an initialize
    /// response. Presence of a key means the feature exists.
    pub fn from_capabilities(caps: &Value) -> Self {
        let has = |key: &str| caps.get(key).is_some();
        Self {
            tools: has("tools"),
            resources: has("resources"),
            prompts: has("prompts"),
            tasks: has("tasks"),
        }
    }
}

impl ProbeReport {
    pub fn new(target: &str, transport: &str, timestamp: String) -> Self {
        Self {
            probe_version: PROBE_VERSION.to_string(),
            spec_version: SPEC_VERSION.to_string(),
            target: target.to_string(),
            transport: transport.to_string(),
            timestamp,
            duration_ms: 0.0,
            server_info: None,
            capabilities: CapabilityFlags::default(),
            suites: Vec::new(),
        }
    }

    pub fn summary(&self) -> Summary {
        let mut s = Summary::default();
        for suite in &self.suites {
            for check in &suite.checks {
                s.total += 1;
                match check.status {
                    Status::Pass => s.passed += 1,
                    Status::Fail => s.failed += 1,
                    Status::Warn => s.warnings += 1,
                    Status::Skip => s.skipped += 1,
                    Status::Info => s.info += 1,
                }
            }
        }
        s
    }

    /// Serializes the report to the published JSON schema.
    pub fn to_json(&self) -> Value {
        json!({
            "mcp_probe_version": self.probe_version,
            "spec_version": self.spec_version,
            "target": self.target,
            "transport": self.transport,
            "timestamp": self.timestamp,
            "duration_ms": self.duration_ms,
            "server_info": self.server_info,
            "capabilities": self.capabilities,
            "summary": self.summary(),
            "suites": self.suites,
        })
    }
}
