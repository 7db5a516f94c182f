//! mcp-probe - compliance validator for Model Context Protocol servers.
//!
//! Drives a target server (child process over stdio, or streaming HTTP)
//! through a battery of conformance checks and emits a structured report
//! with a deterministic exit code for CI gating.

pub mod client;
pub mod error;
pub mod harness;
pub mod oauth;
pub mod report;
pub mod runner;
pub mod schema;
pub mod suites;
pub mod transport;
pub mod types;

// Re-export core types for convenient access
pub use client::McpClient;
pub use error::{ProbeError, ProbeResult};
pub use runner::{compute_exit_code, Runner, RunnerOptions};
pub use types::{CheckResult, ProbeReport, Severity, Status, SuiteResult};
