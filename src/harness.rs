//! Check execution harness.
//!
//! Suites declare their checks in a static registration table and feed
//! each body through [`Harness::run`], which stamps identifier,
//! description, severity and duration onto the outcome. A failing body
//! never terminates the suite: errors become FAIL results.

use std::time::Instant;

use tracing::debug;

use crate::error::ProbeError;
use crate::types::{CheckResult, Severity, Status, SuiteResult};

/// Declarative metadata for one check.
#[derive(Debug, Clone, Copy)]
pub struct CheckSpec {
    pub id: &'static str,
    pub description: &'static str,
    pub severity: Severity,
}

/// What a check body reports back to the harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass(Option<String>),
    Fail(String),
    Warn(String),
    Info(String),
    Skip(Option<String>),
}

impl Outcome {
    #[must_use]
    pub fn pass() -> Self {
        Self::Pass(None)
    }

    #[must_use]
    pub fn pass_with(details: impl Into<String>) -> Self {
        Self::Pass(Some(details.into()))
    }

    #[must_use]
    pub fn fail(details: impl Into<String>) -> Self {
        Self::Fail(details.into())
    }

    #[must_use]
    pub fn warn(details: impl Into<String>) -> Self {
        Self::Warn(details.into())
    }

    #[must_use]
    pub fn info(details: impl Into<String>) -> Self {
        Self::Info(details.into())
    }

    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip(Some(reason.into()))
    }
}

/// Collects exactly one [`CheckResult`] per executed check.
pub struct Harness {
    name: String,
    results: Vec<CheckResult>,
}

impl Harness {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            results: Vec::new(),
        }
    }

    /// Runs one check body under timing and failure isolation.
    pub async fn run<F>(&mut self, spec: &CheckSpec, body: F)
    where
        F: std::future::Future<Output = Result<Outcome, ProbeError>>,
    {
        let start = Instant::now();
        let outcome = body.await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        let (status, details) = match outcome {
            Ok(Outcome::Pass(d)) => (Status::Pass, d),
            Ok(Outcome::Fail(d)) => (Status::Fail, Some(d)),
            Ok(Outcome::Warn(d)) => (Status::Warn, Some(d)),
            Ok(Outcome::Info(d)) => (Status::Info, Some(d)),
            Ok(Outcome::Skip(d)) => (Status::Skip, d),
            Err(e) => {
                debug!("check {} failed with error: {e}", spec.id);
                (Status::Fail, Some(e.to_string()))
            }
        };

        self.results.push(CheckResult {
            id: spec.id.to_string(),
            description: spec.description.to_string(),
            status,
            severity: spec.severity,
            duration_ms,
            details,
        });
    }

    /// Finishes the suite, ordering results by check identifier ascending.
    #[must_use]
    pub fn finish(mut self) -> SuiteResult {
        self.results.sort_by(|a, b| a.id.cmp(&b.id));
        SuiteResult {
            name: self.name,
            checks: self.results,
        }
    }
}
