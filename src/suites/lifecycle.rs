//! Lifecycle & handshake checks (INIT-001..006).
//!
//! INIT-005 and INIT-006 probe ordering violations on fresh transports so
//! the main session is never contaminated; INIT-001 performs the real
//! handshake whose response feeds capability gating for the whole run.

use std::time::Duration;

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::{ProbeError, ProbeResult};
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::transport::{ProbeTransport, Transport, TransportConfig};
use crate::types::{Severity, SuiteResult, PROBE_VERSION, SPEC_VERSION};

const INIT_001: CheckSpec = CheckSpec {
    id: "INIT-001",
    description: "Server responds to initialize",
    severity: Severity::Critical,
};
const INIT_002: CheckSpec = CheckSpec {
    id: "INIT-002",
    description: "protocolVersion is present and valid",
    severity: Severity::Critical,
};
const INIT_003: CheckSpec = CheckSpec {
    id: "INIT-003",
    description: "capabilities object is present",
    severity: Severity::Critical,
};
const INIT_004: CheckSpec = CheckSpec {
    id: "INIT-004",
    description: "notifications/initialized does not crash server",
    severity: Severity::Critical,
};
const INIT_005: CheckSpec = CheckSpec {
    id: "INIT-005",
    description: "Request before initialize is rejected",
    severity: Severity::Warning,
};
const INIT_006: CheckSpec = CheckSpec {
    id: "INIT-006",
    description: "Double initialize is rejected",
    severity: Severity::Warning,
};

pub struct LifecycleSuite<'a> {
    client: &'a mut McpClient,
    config: &'a TransportConfig,
    timeout: Duration,
    init_response: Option<Value>,
}

impl<'a> LifecycleSuite<'a> {
    pub const NAME: &'static str = "lifecycle";

    pub fn new(
        client: &'a mut McpClient,
        config: &'a TransportConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            config,
            timeout,
            init_response: None,
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&INIT_001, self.check_init_001()).await;
        harness.run(&INIT_002, self.check_init_002()).await;
        harness.run(&INIT_003, self.check_init_003()).await;
        harness.run(&INIT_004, self.check_init_004()).await;
        harness.run(&INIT_005, self.check_init_005()).await;
        harness.run(&INIT_006, self.check_init_006()).await;
        harness.finish()
    }

    async fn check_init_001(&mut self) -> ProbeResult<Outcome> {
        let response = self.client.initialize().await?;
        let has_result = response.get("result").is_some();
        self.init_response = Some(response.clone());
        if !has_result {
            return Ok(Outcome::fail(format!("No 'result' in response: {response}")));
        }
        Ok(Outcome::pass())
    }

    async fn check_init_002(&mut self) -> ProbeResult<Outcome> {
        let Some(response) = &self.init_response else {
            return Ok(Outcome::skip("INIT-001 did not complete"));
        };
        match response["result"].get("protocolVersion") {
            Some(Value::String(version)) if !version.is_empty() => {
                Ok(Outcome::pass_with(format!("protocolVersion={version}")))
            }
            other => Ok(Outcome::fail(format!(
                "protocolVersion missing or not a string: {other:?}"
            ))),
        }
    }

    async fn check_init_003(&mut self) -> ProbeResult<Outcome> {
        let Some(response) = &self.init_response else {
            return Ok(Outcome::skip("INIT-001 did not complete"));
        };
        match response["result"].get("capabilities") {
            Some(Value::Object(caps)) => {
                let keys: Vec<&str> = caps.keys().map(String::as_str).collect();
                Ok(Outcome::pass_with(format!("capabilities keys: {keys:?}")))
            }
            other => Ok(Outcome::fail(format!(
                "capabilities missing or not an object: {other:?}"
            ))),
        }
    }

    async fn check_init_004(&mut self) -> ProbeResult<Outcome> {
        if self.init_response.is_none() {
            return Ok(Outcome::skip("INIT-001 did not complete"));
        }
        let ping = json!({
            "jsonrpc": "2.0",
            "id": 9992,
            "method": "ping",
        });
        let response = match self.client.send_raw(&ping).await {
            Ok(response) => response,
            Err(_) => None,
        };
        if response.is_none() {
            if self.client.request("tools/list", None).await.is_err() {
                return Ok(Outcome::fail(
                    "Server stopped responding after notifications/initialized",
                ));
            }
        }
        Ok(Outcome::pass_with(
            "Server still responds after notifications/initialized",
        ))
    }

    async fn check_init_005(&mut self) -> ProbeResult<Outcome> {
        let mut transport = self.config.build();
        transport.start().await?;
        let outcome = self.probe_before_initialize(&mut transport).await;
        let _ = transport.stop().await;
        outcome
    }

    async fn probe_before_initialize(
        &mut self,
        transport: &mut ProbeTransport,
    ) -> ProbeResult<Outcome> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 9990,
            "method": "tools/list",
            "params": {},
        });
        transport.send(&request).await?;
        let response = match transport.receive(self.timeout).await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connection_closed() => {
                return Ok(Outcome::pass_with("Server did not respond (acceptable)"));
            }
            Err(e) => return Err(e),
        };
        if let Some(error) = response.get("error") {
            let message = error["message"].as_str().unwrap_or_default();
            return Ok(Outcome::pass_with(format!(
                "Server rejected with error: {message}"
            )));
        }
        Ok(Outcome::warn(
            "Server accepted request without prior initialize",
        ))
    }

    async fn check_init_006(&mut self) -> ProbeResult<Outcome> {
        let transport = self.config.build();
        let mut temp = McpClient::new(transport, self.timeout);
        temp.transport_mut().start().await?;
        let outcome = Self::probe_double_initialize(&mut temp).await;
        let _ = temp.transport_mut().stop().await;
        outcome
    }

    async fn probe_double_initialize(temp: &mut McpClient) -> ProbeResult<Outcome> {
        temp.initialize().await?;
        let second_init = json!({
            "jsonrpc": "2.0",
            "id": 9991,
            "method": "initialize",
            "params": {
                "protocolVersion": SPEC_VERSION,
                "capabilities": {},
                "clientInfo": { "name": "mcp-probe", "version": PROBE_VERSION },
            },
        });
        let response = match temp.send_raw(&second_init).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                return Ok(Outcome::pass_with(
                    "Server did not respond to second initialize",
                ));
            }
            Err(ProbeError::ConnectionClosed(_)) => {
                return Ok(Outcome::pass_with(
                    "Server did not respond to second initialize",
                ));
            }
            Err(e) => return Err(e),
        };
        if let Some(error) = response.get("error") {
            let message = error["message"].as_str().unwrap_or_default();
            return Ok(Outcome::pass_with(format!(
                "Server rejected double init: {message}"
            )));
        }
        Ok(Outcome::warn("Server accepted double initialize"))
    }
}
