//! JSON-RPC 2.0 conformance checks (RPC-001..007).

use std::time::Duration;

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::transport::Transport;
use crate::types::{error_code_label, Severity, SuiteResult};

const RPC_001: CheckSpec = CheckSpec {
    id: "RPC-001",
    description: "Response contains jsonrpc 2.0 field",
    severity: Severity::Critical,
};
const RPC_002: CheckSpec = CheckSpec {
    id: "RPC-002",
    description: "Response id matches request id",
    severity: Severity::Critical,
};
const RPC_003: CheckSpec = CheckSpec {
    id: "RPC-003",
    description: "Error response has valid structure",
    severity: Severity::Error,
};
const RPC_004: CheckSpec = CheckSpec {
    id: "RPC-004",
    description: "Server survives invalid JSON input",
    severity: Severity::Error,
};
const RPC_005: CheckSpec = CheckSpec {
    id: "RPC-005",
    description: "Unknown method returns -32601",
    severity: Severity::Warning,
};
const RPC_006: CheckSpec = CheckSpec {
    id: "RPC-006",
    description: "Server ignores unknown notification",
    severity: Severity::Info,
};
const RPC_007: CheckSpec = CheckSpec {
    id: "RPC-007",
    description: "Error codes summary",
    severity: Severity::Info,
};

pub struct JsonRpcSuite<'a> {
    client: &'a mut McpClient,
    error_codes_seen: Vec<i64>,
}

impl<'a> JsonRpcSuite<'a> {
    pub const NAME: &'static str = "jsonrpc";

    pub fn new(client: &'a mut McpClient) -> Self {
        Self {
            client,
            error_codes_seen: Vec::new(),
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&RPC_001, self.check_rpc_001()).await;
        harness.run(&RPC_002, self.check_rpc_002()).await;
        harness.run(&RPC_003, self.check_rpc_003()).await;
        harness.run(&RPC_004, self.check_rpc_004()).await;
        harness.run(&RPC_005, self.check_rpc_005()).await;
        harness.run(&RPC_006, self.check_rpc_006()).await;
        harness.run(&RPC_007, self.check_rpc_007()).await;
        harness.finish()
    }

    fn record_error(&mut self, response: &Value) {
        if let Some(code) = response["error"]["code"].as_i64() {
            self.error_codes_seen.push(code);
        }
    }

    async fn check_rpc_001(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 8001,
            "method": "tools/list",
            "params": {},
        });
        let Some(response) = self.client.send_raw(&request).await? else {
            return Ok(Outcome::fail("No response received"));
        };
        match response.get("jsonrpc") {
            Some(Value::String(version)) if version == "2.0" => Ok(Outcome::pass()),
            other => Ok(Outcome::fail(format!(
                "jsonrpc field is {other:?}, expected '2.0'"
            ))),
        }
    }

    async fn check_rpc_002(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 8042,
            "method": "tools/list",
            "params": {},
        });
        let Some(response) = self.client.send_raw(&request).await? else {
            return Ok(Outcome::fail("No response received"));
        };
        if response.get("id") != Some(&json!(8042)) {
            return Ok(Outcome::fail(format!(
                "Response id is {:?}, expected 8042",
                response.get("id")
            )));
        }
        Ok(Outcome::pass())
    }

    async fn check_rpc_003(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 8003,
            "method": "nonexistent/method_for_rpc003",
            "params": {},
        });
        let Some(response) = self.client.send_raw(&request).await? else {
            return Ok(Outcome::fail("No response received"));
        };
        self.record_error(&response);
        let Some(error) = response.get("error") else {
            return Ok(Outcome::fail(
                "Server did not return an error for unknown method",
            ));
        };
        let Some(code) = error["code"].as_i64() else {
            return Ok(Outcome::fail(format!(
                "error.code is not an integer: {:?}",
                error.get("code")
            )));
        };
        let Some(message) = error["message"].as_str() else {
            return Ok(Outcome::fail(format!(
                "error.message is not a string: {:?}",
                error.get("message")
            )));
        };
        Ok(Outcome::pass_with(format!(
            "code={code}, message={message:?}"
        )))
    }

    async fn check_rpc_004(&mut self) -> ProbeResult<Outcome> {
        // On stdio, write a raw non-JSON line; HTTP servers get a sentinel
        // message instead since the wire always carries valid JSON.
        if let Some(stdio) = self.client.transport_mut().as_stdio_mut() {
            let _ = stdio.send_raw_line("not json at all").await;
        } else {
            let transport = self.client.transport_mut();
            let _ = transport.send(&json!({"__raw_invalid__": true})).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;

        let request = json!({
            "jsonrpc": "2.0",
            "id": 8004,
            "method": "tools/list",
            "params": {},
        });
        match self.client.send_raw(&request).await {
            Ok(Some(_)) => Ok(Outcome::pass_with(
                "Server still responds after invalid JSON",
            )),
            Ok(None) => Ok(Outcome::fail(
                "Server stopped responding after invalid JSON",
            )),
            Err(e) => Ok(Outcome::fail(format!(
                "Server crashed after invalid JSON: {e}"
            ))),
        }
    }

    async fn check_rpc_005(&mut self) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 8005,
            "method": "nonexistent/method_for_rpc005",
            "params": {},
        });
        let Some(response) = self.client.send_raw(&request).await? else {
            return Ok(Outcome::fail("No response received"));
        };
        self.record_error(&response);
        let Some(error) = response.get("error") else {
            return Ok(Outcome::fail(
                "Server did not return an error for unknown method",
            ));
        };
        match error["code"].as_i64() {
            Some(-32601) => Ok(Outcome::pass_with(
                "Correct error code -32601 (Method not found)",
            )),
            code => Ok(Outcome::warn(format!(
                "Error returned but code is {code:?}, expected -32601"
            ))),
        }
    }

    async fn check_rpc_006(&mut self) -> ProbeResult<Outcome> {
        self.client
            .notify("nonexistent/notification_for_rpc006", None)
            .await?;
        tokio::time::sleep(Duration::from_millis(300)).await;

        let request = json!({
            "jsonrpc": "2.0",
            "id": 8006,
            "method": "tools/list",
            "params": {},
        });
        match self.client.send_raw(&request).await {
            Ok(Some(_)) => Ok(Outcome::pass_with(
                "Server still responds after unknown notification",
            )),
            Ok(None) => Ok(Outcome::fail(
                "Server stopped responding after unknown notification",
            )),
            Err(e) => Ok(Outcome::fail(format!(
                "Server crashed after unknown notification: {e}"
            ))),
        }
    }

    async fn check_rpc_007(&mut self) -> ProbeResult<Outcome> {
        if self.error_codes_seen.is_empty() {
            return Ok(Outcome::info("No error codes observed during testing"));
        }
        let mut codes: Vec<i64> = self.error_codes_seen.clone();
        codes.sort_unstable();
        codes.dedup();
        let summary: Vec<String> = codes
            .iter()
            .map(|&code| {
                let label = error_code_label(code).unwrap_or("custom");
                format!("{code} ({label})")
            })
            .collect();
        Ok(Outcome::info(format!(
            "Error codes seen: {}",
            summary.join(", ")
        )))
    }
}
