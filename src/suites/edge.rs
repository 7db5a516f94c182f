//! Edge-case behavior checks (EDGE-001..005).

use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::transport::ProbeTransport;
use crate::types::{Severity, SuiteResult};

const EDGE_001: CheckSpec = CheckSpec {
    id: "EDGE-001",
    description: "tools/list accepts empty params object",
    severity: Severity::Warning,
};
const EDGE_002: CheckSpec = CheckSpec {
    id: "EDGE-002",
    description: "tools/list accepts missing params field",
    severity: Severity::Warning,
};
const EDGE_003: CheckSpec = CheckSpec {
    id: "EDGE-003",
    description: "Server handles 100KB+ payload",
    severity: Severity::Info,
};
const EDGE_004: CheckSpec = CheckSpec {
    id: "EDGE-004",
    description: "Response time within timeout",
    severity: Severity::Warning,
};
const EDGE_005: CheckSpec = CheckSpec {
    id: "EDGE-005",
    description: "Server graceful shutdown on SIGTERM",
    severity: Severity::Info,
};

pub struct EdgeSuite<'a> {
    client: &'a mut McpClient,
    tools: Vec<Value>,
    timeout: Duration,
}

impl<'a> EdgeSuite<'a> {
    /// Report name; the CLI selector for this suite is `edge`.
    pub const NAME: &'static str = "edge_cases";

    pub fn new(client: &'a mut McpClient, tools: Vec<Value>, timeout: Duration) -> Self {
        Self {
            client,
            tools,
            timeout,
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&EDGE_001, self.check_edge_001()).await;
        harness.run(&EDGE_002, self.check_edge_002()).await;
        harness.run(&EDGE_003, self.check_edge_003()).await;
        harness.run(&EDGE_004, self.check_edge_004()).await;
        harness.run(&EDGE_005, self.check_edge_005()).await;
        harness.finish()
    }

    /// First tool declaring a string-typed parameter, for the oversized
    /// payload probe.
    fn find_string_param_tool(&self) -> Option<(String, String)> {
        for tool in &self.tools {
            let Some(name) = tool.get("name").and_then(Value::as_str) else {
                continue;
            };
            let Some(props) = tool["inputSchema"]["properties"].as_object() else {
                continue;
            };
            for (param_name, param_schema) in props {
                if param_schema["type"].as_str() == Some("string") {
                    return Some((name.to_string(), param_name.clone()));
                }
            }
        }
        None
    }

    async fn check_edge_001(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 9001,
            "method": "tools/list",
            "params": {},
        });
        let Some(response) = self.client.send_raw(&request).await? else {
            return Ok(Outcome::fail("No response (timeout)"));
        };
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!(
                "Server returned error for empty params: {error}"
            )));
        }
        Ok(Outcome::pass_with("Server accepted empty params object"))
    }

    async fn check_edge_002(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 9002,
            "method": "tools/list",
        });
        let Some(response) = self.client.send_raw(&request).await? else {
            return Ok(Outcome::fail("No response (timeout)"));
        };
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!(
                "Server returned error for missing params: {error}"
            )));
        }
        Ok(Outcome::pass_with("Server accepted request without params field"))
    }

    async fn check_edge_003(&mut self) -> ProbeResult<Outcome> {
        let Some((tool_name, param_name)) = self.find_string_param_tool() else {
            return Ok(Outcome::skip("No tool with string parameter found"));
        };
        let huge_string = "x".repeat(102_400);
        let mut args = serde_json::Map::new();
        args.insert(param_name, json!(huge_string));
        let response = match self.client.call_tool(&tool_name, Value::Object(args)).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Ok(Outcome::fail("Server timed out on 100KB+ payload"));
            }
            Err(e) => {
                return Ok(Outcome::pass_with(format!(
                    "Server responded with error: {e}"
                )));
            }
        };
        if let Some(error) = response.get("error") {
            let message: String = error["message"]
                .as_str()
                .unwrap_or_default()
                .chars()
                .take(100)
                .collect();
            return Ok(Outcome::pass_with(format!(
                "Server returned error for large payload: {message}"
            )));
        }
        Ok(Outcome::pass_with("Server handled 100KB+ payload successfully"))
    }

    async fn check_edge_004(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 9004,
            "method": "tools/list",
            "params": {},
        });
        let start = Instant::now();
        let response = self.client.send_raw(&request).await?;
        let elapsed = start.elapsed().as_secs_f64();
        if response.is_none() {
            return Ok(Outcome::fail("No response (timeout)"));
        }
        let timeout = self.timeout.as_secs_f64();
        let threshold_80 = timeout * 0.8;
        if elapsed > timeout {
            return Ok(Outcome::fail(format!(
                "Response took {elapsed:.2}s (timeout={timeout}s)"
            )));
        }
        if elapsed > threshold_80 {
            return Ok(Outcome::warn(format!(
                "Response took {elapsed:.2}s (>{threshold_80:.1}s = 80% of timeout)"
            )));
        }
        Ok(Outcome::pass_with(format!("Response in {elapsed:.3}s")))
    }

    async fn check_edge_005(&mut self) -> ProbeResult<Outcome> {
        let ProbeTransport::Stdio(transport) = self.client.transport_mut() else {
            return Ok(Outcome::skip("SIGTERM test only applicable to stdio transport"));
        };
        if let Err(e) = transport.signal_terminate() {
            return Ok(Outcome::fail(format!("Could not send SIGTERM: {e}")));
        }
        match transport.wait_exit(Duration::from_secs(5)).await? {
            Some(0) => Ok(Outcome::pass_with("Process exited with code 0 after SIGTERM")),
            Some(code) => Ok(Outcome::warn(format!(
                "Process exited with code {code} after SIGTERM"
            ))),
            None => {
                transport.force_kill().await?;
                Ok(Outcome::fail(
                    "Process did not terminate within 5s after SIGTERM (required SIGKILL)",
                ))
            }
        }
    }
}
