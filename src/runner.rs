//! Suite orchestration: sequencing, capability gating, artifact plumbing
//! between suites, and the critical-failure abort.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::info;

use crate::client::McpClient;
use crate::error::{ProbeError, ProbeResult};
use crate::suites::auth::AuthSuite;
use crate::suites::edge::EdgeSuite;
use crate::suites::jsonrpc::JsonRpcSuite;
use crate::suites::lifecycle::LifecycleSuite;
use crate::suites::notifications::NotificationsSuite;
use crate::suites::prompts::PromptsSuite;
use crate::suites::resources::ResourcesSuite;
use crate::suites::tasks::TasksSuite;
use crate::suites::tools::ToolsSuite;
use crate::transport::{Transport, TransportConfig};
use crate::types::{CapabilityFlags, ProbeReport, Severity, Status, SuiteResult};

/// The fixed set of selectable suite names.
pub const VALID_SUITE_NAMES: [&str; 9] = [
    "lifecycle",
    "tools",
    "resources",
    "prompts",
    "jsonrpc",
    "notifications",
    "tasks",
    "auth",
    "edge",
];

/// Raised internally when lifecycle INIT-001 fails; remaining suites are
/// skipped but the partial report is still emitted.
struct AbortRun;

/// Probe configuration beyond the transport itself.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Explicit suite selection; `None` runs everything applicable.
    pub suites: Option<Vec<String>>,
    pub timeout: Duration,
    /// Server URL, present on HTTP transports; needed by the auth suite.
    pub server_url: Option<String>,
    pub oauth_enabled: bool,
    pub oauth_client_id: String,
    pub redirect_port: u16,
}

pub struct Runner {
    client: McpClient,
    config: TransportConfig,
    options: RunnerOptions,
    explicitly_requested: HashSet<String>,
    tools: Vec<Value>,
    resources: Vec<Value>,
}

impl Runner {
    /// Validates the suite selection and builds the runner.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] for unknown suite names; this is a
    /// pre-run validation failure (exit code 2).
    pub fn new(
        client: McpClient,
        config: TransportConfig,
        options: RunnerOptions,
    ) -> ProbeResult<Self> {
        let mut explicitly_requested = HashSet::new();
        if let Some(suites) = &options.suites {
            for name in suites {
                if !VALID_SUITE_NAMES.contains(&name.as_str()) {
                    return Err(ProbeError::Config(format!(
                        "Unknown suite '{name}'. Valid suites: {}",
                        VALID_SUITE_NAMES.join(", ")
                    )));
                }
                explicitly_requested.insert(name.clone());
            }
        }
        Ok(Self {
            client,
            config,
            options,
            explicitly_requested,
            tools: Vec::new(),
            resources: Vec::new(),
        })
    }

    /// Runs all applicable suites and returns the report.
    ///
    /// # Errors
    ///
    /// Only transport startup failures propagate; anything after that is
    /// recorded in the report.
    pub async fn run(&mut self) -> ProbeResult<ProbeReport> {
        let start = Instant::now();
        let mut report = ProbeReport::new(
            self.config.target(),
            self.client.transport().name(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        );

        self.client.transport_mut().start().await?;

        if self.run_suites(&mut report).await.is_err() {
            info!("run aborted due to critical failure");
        }

        report.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(report)
    }

    /// Tears down the transport after the final suite.
    pub async fn shutdown(&mut self) {
        let _ = self.client.transport_mut().stop().await;
    }

    fn is_http(&self) -> bool {
        matches!(self.config, TransportConfig::Http { .. })
    }

    /// Lifecycle is mandatory under explicit selection; every capability
    /// flag comes from its initialize response.
    fn should_run(&self, name: &str) -> bool {
        if self.explicitly_requested.is_empty() {
            return true;
        }
        name == "lifecycle" || self.explicitly_requested.contains(name)
    }

    async fn run_suites(&mut self, report: &mut ProbeReport) -> Result<(), AbortRun> {
        self.run_auth(report).await;
        self.run_lifecycle(report).await?;

        let caps = self.client.capabilities().clone();
        report.capabilities = CapabilityFlags::from_capabilities(&caps);
        report.server_info = self.client.server_info().cloned();

        let flags = report.capabilities;
        let has_subscribe = caps["resources"]["subscribe"].as_bool().unwrap_or(false);

        if self.should_run("jsonrpc") {
            let suite = JsonRpcSuite::new(&mut self.client);
            report.suites.push(suite.run().await);
        }

        if self.should_run("tools")
            && (flags.tools || self.explicitly_requested.contains("tools"))
        {
            let suite = ToolsSuite::new(&mut self.client);
            let (result, tools) = suite.run().await;
            if suite_check_passed(&result, "TOOL-001") {
                self.tools = tools;
            }
            report.suites.push(result);
        }

        if self.should_run("resources")
            && (flags.resources || self.explicitly_requested.contains("resources"))
        {
            let suite = ResourcesSuite::new(&mut self.client);
            let (result, resources) = suite.run().await;
            if suite_check_passed(&result, "RES-001") {
                self.resources = resources;
            }
            report.suites.push(result);
        }

        if self.should_run("prompts")
            && (flags.prompts || self.explicitly_requested.contains("prompts"))
        {
            let suite = PromptsSuite::new(&mut self.client);
            report.suites.push(suite.run().await);
        }

        if self.should_run("notifications") {
            let resources_for_sub = if has_subscribe {
                self.resources.clone()
            } else {
                Vec::new()
            };
            let suite = NotificationsSuite::new(&mut self.client, resources_for_sub);
            report.suites.push(suite.run().await);
        }

        if self.should_run("tasks")
            && (flags.tasks || self.explicitly_requested.contains("tasks"))
        {
            let suite = TasksSuite::new(&mut self.client, self.tools.clone());
            report.suites.push(suite.run().await);
        }

        if self.should_run("edge") {
            let suite = EdgeSuite::new(&mut self.client, self.tools.clone(), self.options.timeout);
            report.suites.push(suite.run().await);
        }

        Ok(())
    }

    async fn run_auth(&mut self, report: &mut ProbeReport) {
        if !self.should_run("auth") {
            return;
        }
        let Some(server_url) = self.options.server_url.clone() else {
            return;
        };
        if !self.is_http() || !self.options.oauth_enabled {
            return;
        }
        let suite = AuthSuite::new(
            &server_url,
            &self.options.oauth_client_id,
            self.options.redirect_port,
            self.options.timeout,
        );
        report.suites.push(suite.run().await);
    }

    async fn run_lifecycle(&mut self, report: &mut ProbeReport) -> Result<(), AbortRun> {
        let suite = LifecycleSuite::new(&mut self.client, &self.config, self.options.timeout);
        let result = suite.run().await;
        let init_failed = result
            .checks
            .iter()
            .any(|c| c.id == "INIT-001" && c.status == Status::Fail);
        report.suites.push(result);
        if init_failed {
            return Err(AbortRun);
        }
        Ok(())
    }
}

fn suite_check_passed(result: &SuiteResult, id: &str) -> bool {
    result
        .checks
        .iter()
        .any(|c| c.id == id && c.status == Status::Pass)
}

/// Exit code as a pure function of the report and strict flag.
///
/// `0` when no CRITICAL/ERROR failure (and, under strict, no WARNING-level
/// noise); `1` otherwise. FAIL at INFO severity never gates.
#[must_use]
pub fn compute_exit_code(report: &ProbeReport, strict: bool) -> i32 {
    for suite in &report.suites {
        for check in &suite.checks {
            if check.status == Status::Fail {
                if matches!(check.severity, Severity::Critical | Severity::Error) {
                    return 1;
                }
                if strict && check.severity == Severity::Warning {
                    return 1;
                }
            }
            if strict
                && check.status == Status::Warn
                && matches!(
                    check.severity,
                    Severity::Critical | Severity::Error | Severity::Warning
                )
            {
                return 1;
            }
        }
    }
    0
}
