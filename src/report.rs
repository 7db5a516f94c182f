//! Report rendering: console text with ANSI colors, or pretty JSON.

use std::io::IsTerminal;

use crate::types::{ProbeReport, Status, PROBE_VERSION, SPEC_VERSION};

const SEPARATOR_WIDTH: usize = 60;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GREY: &str = "\x1b[90m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

fn status_color(status: Status) -> &'static str {
    match status {
        Status::Pass => GREEN,
        Status::Fail => RED,
        Status::Warn => YELLOW,
        Status::Skip => GREY,
        Status::Info => BLUE,
    }
}

fn status_label(status: Status) -> &'static str {
    match status {
        Status::Pass => "PASS",
        Status::Fail => "FAIL",
        Status::Warn => "WARN",
        Status::Skip => "SKIP",
        Status::Info => "INFO",
    }
}

fn suite_title(name: &str) -> &str {
    match name {
        "lifecycle" => "Lifecycle & Handshake",
        "jsonrpc" => "JSON-RPC Protocol",
        "tools" => "Tools",
        "resources" => "Resources",
        "prompts" => "Prompts",
        "notifications" => "Notifications & Subscriptions",
        "tasks" => "Tasks",
        "auth" => "Authentication (OAuth)",
        "edge_cases" => "Edge Cases",
        other => other,
    }
}

fn colorize(text: &str, status: Status, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    format!("{}{text}{RESET}", status_color(status))
}

/// Colors are suppressed when stdout is not a terminal, `NO_COLOR` is set,
/// or the caller disabled them.
fn resolve_color(color: bool) -> bool {
    color && std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

/// Renders the human-readable console report.
#[must_use]
pub fn report_console(report: &ProbeReport, color: bool, verbose: bool) -> String {
    let color = resolve_color(color);
    let separator = "\u{2500}".repeat(SEPARATOR_WIDTH);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!(
        "mcp-probe v{PROBE_VERSION} \u{2014} MCP Server Protocol Compliance Validator"
    ));
    lines.push(format!("Target: {}", report.target));
    lines.push(format!("Transport: {}", report.transport));
    lines.push(format!("Spec: MCP {SPEC_VERSION}"));
    lines.push(String::new());

    for suite in &report.suites {
        lines.push(separator.clone());
        lines.push(format!(" {}", suite_title(&suite.name)));
        lines.push(separator.clone());

        for check in &suite.checks {
            let status = colorize(
                &format!("{:5}", status_label(check.status)),
                check.status,
                color,
            );
            lines.push(format!(
                " {status}  {:10} {:40} {:.0}ms",
                check.id, check.description, check.duration_ms
            ));
            let show_details =
                verbose || matches!(check.status, Status::Fail | Status::Warn);
            if let Some(details) = check.details.as_deref() {
                if show_details {
                    lines.push(format!("       \u{2192} {details}"));
                }
            }
        }
        lines.push(String::new());
    }

    let summary = report.summary();
    lines.push(separator);

    let mut parts: Vec<String> = Vec::new();
    if summary.passed > 0 {
        parts.push(colorize(
            &format!("{} passed", summary.passed),
            Status::Pass,
            color,
        ));
    }
    if summary.failed > 0 {
        parts.push(colorize(
            &format!("{} failed", summary.failed),
            Status::Fail,
            color,
        ));
    }
    if summary.warnings > 0 {
        parts.push(colorize(
            &format!("{} warnings", summary.warnings),
            Status::Warn,
            color,
        ));
    }
    if summary.skipped > 0 {
        parts.push(colorize(
            &format!("{} skipped", summary.skipped),
            Status::Skip,
            color,
        ));
    }

    lines.push(format!(" Summary: {}", parts.join(", ")));
    lines.push(format!(" Duration: {:.1}s", report.duration_ms / 1000.0));

    lines.join("\n")
}

/// Renders the machine-readable JSON report.
#[must_use]
pub fn report_json(report: &ProbeReport) -> String {
    serde_json::to_string_pretty(&report.to_json()).unwrap_or_else(|_| "{}".to_string())
}

/// Formats the report per the selected output format.
#[must_use]
pub fn format_report(report: &ProbeReport, format: &str, verbose: bool, color: bool) -> String {
    if format == "json" {
        report_json(report)
    } else {
        report_console(report, color, verbose)
    }
}
