//! Notification format and subscription checks (NOTIF-001..005,
//! SUB-001..003).
//!
//! Format checks read the client's notification buffer, which holds
//! whatever the server pushed while earlier suites were running.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::types::{Severity, SuiteResult};

const NOTIF_001: CheckSpec = CheckSpec {
    id: "NOTIF-001",
    description: "Server accepts notifications/initialized",
    severity: Severity::Critical,
};
const NOTIF_002: CheckSpec = CheckSpec {
    id: "NOTIF-002",
    description: "notifications/tools/list_changed format",
    severity: Severity::Error,
};
const NOTIF_003: CheckSpec = CheckSpec {
    id: "NOTIF-003",
    description: "notifications/resources/list_changed format",
    severity: Severity::Error,
};
const NOTIF_004: CheckSpec = CheckSpec {
    id: "NOTIF-004",
    description: "notifications/prompts/list_changed format",
    severity: Severity::Error,
};
const NOTIF_005: CheckSpec = CheckSpec {
    id: "NOTIF-005",
    description: "notifications/progress format and monotonicity",
    severity: Severity::Warning,
};
const SUB_001: CheckSpec = CheckSpec {
    id: "SUB-001",
    description: "resources/subscribe returns success",
    severity: Severity::Error,
};
const SUB_002: CheckSpec = CheckSpec {
    id: "SUB-002",
    description: "resources/unsubscribe returns success",
    severity: Severity::Error,
};
const SUB_003: CheckSpec = CheckSpec {
    id: "SUB-003",
    description: "Resource update triggers notification",
    severity: Severity::Warning,
};

/// Checks one buffered message against the notification format rule.
fn validate_notification_format(notif: &Value) -> Option<String> {
    if notif.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Some(format!(
            "jsonrpc is {:?}, expected '2.0'",
            notif.get("jsonrpc")
        ));
    }
    if notif.get("method").is_none() {
        return Some("missing 'method' field".to_string());
    }
    if notif.get("id").is_some() {
        return Some("notification should not have 'id' field".to_string());
    }
    if let Some(params) = notif.get("params") {
        if !params.is_object() && !params.is_null() {
            return Some(format!("params is {params}, expected object or absent"));
        }
    }
    None
}

pub struct NotificationsSuite<'a> {
    client: &'a mut McpClient,
    resources: Vec<Value>,
    subscribed_uri: Option<String>,
}

impl<'a> NotificationsSuite<'a> {
    pub const NAME: &'static str = "notifications";

    pub fn new(client: &'a mut McpClient, resources: Vec<Value>) -> Self {
        Self {
            client,
            resources,
            subscribed_uri: None,
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&NOTIF_001, self.check_notif_001()).await;
        harness.run(&NOTIF_002, self.check_notif_002()).await;
        harness.run(&NOTIF_003, self.check_notif_003()).await;
        harness.run(&NOTIF_004, self.check_notif_004()).await;
        harness.run(&NOTIF_005, self.check_notif_005()).await;
        harness.run(&SUB_001, self.check_sub_001()).await;
        harness.run(&SUB_002, self.check_sub_002()).await;
        harness.run(&SUB_003, self.check_sub_003()).await;
        harness.finish()
    }

    fn find_notifications(&self, method: &str) -> Vec<Value> {
        self.client
            .received_notifications()
            .iter()
            .filter(|n| n.get("method").and_then(Value::as_str) == Some(method))
            .cloned()
            .collect()
    }

    fn check_format_of(&self, method: &str) -> Outcome {
        let notifs = self.find_notifications(method);
        if notifs.is_empty() {
            return Outcome::skip(format!("No {method} notifications received"));
        }
        for notif in &notifs {
            if let Some(err) = validate_notification_format(notif) {
                return Outcome::fail(format!("Invalid format: {err}"));
            }
        }
        Outcome::pass_with(format!("Validated {} notification(s)", notifs.len()))
    }

    async fn check_notif_001(&mut self) -> ProbeResult<Outcome> {
        let ping = json!({
            "jsonrpc": "2.0",
            "id": 7001,
            "method": "ping",
        });
        if let Ok(Some(_)) = self.client.send_raw(&ping).await {
            return Ok(Outcome::pass_with(
                "Server responds after notifications/initialized",
            ));
        }
        let response = self.client.request("tools/list", None).await?;
        if response.get("result").is_some() || response.get("error").is_some() {
            return Ok(Outcome::pass_with(
                "Server still operational after notifications/initialized",
            ));
        }
        Ok(Outcome::fail(
            "Server not responding after notifications/initialized",
        ))
    }

    async fn check_notif_002(&mut self) -> ProbeResult<Outcome> {
        Ok(self.check_format_of("notifications/tools/list_changed"))
    }

    async fn check_notif_003(&mut self) -> ProbeResult<Outcome> {
        Ok(self.check_format_of("notifications/resources/list_changed"))
    }

    async fn check_notif_004(&mut self) -> ProbeResult<Outcome> {
        Ok(self.check_format_of("notifications/prompts/list_changed"))
    }

    async fn check_notif_005(&mut self) -> ProbeResult<Outcome> {
        let notifs = self.find_notifications("notifications/progress");
        if notifs.is_empty() {
            return Ok(Outcome::skip("No progress notifications received"));
        }

        let mut issues: Vec<String> = Vec::new();
        let mut by_token: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for notif in &notifs {
            if let Some(err) = validate_notification_format(notif) {
                issues.push(err);
                continue;
            }
            let params = notif.get("params").cloned().unwrap_or(json!({}));
            let Some(token) = params.get("progressToken") else {
                issues.push("progress notification missing progressToken".to_string());
                continue;
            };
            let Some(progress) = params.get("progress").and_then(Value::as_f64) else {
                issues.push(format!(
                    "progress is {:?}, expected number >= 0",
                    params.get("progress")
                ));
                continue;
            };
            if progress < 0.0 {
                issues.push(format!("progress is {progress}, expected number >= 0"));
                continue;
            }
            if let Some(total) = params.get("total") {
                match total.as_f64() {
                    Some(t) if t > 0.0 => {
                        if progress > t {
                            issues.push(format!("progress {progress} > total {t}"));
                        }
                    }
                    _ => issues.push(format!("total is {total}, expected number > 0")),
                }
            }
            by_token.entry(token.to_string()).or_default().push(progress);
        }

        for (token, values) in &by_token {
            for pair in values.windows(2) {
                if pair[1] < pair[0] {
                    issues.push(format!(
                        "token {token}: progress not monotonic ({} -> {})",
                        pair[0], pair[1]
                    ));
                }
            }
        }

        if !issues.is_empty() {
            issues.truncate(5);
            return Ok(Outcome::fail(issues.join("; ")));
        }
        Ok(Outcome::pass_with(format!(
            "Validated {} progress notification(s)",
            notifs.len()
        )))
    }

    async fn check_sub_001(&mut self) -> ProbeResult<Outcome> {
        let subscribe_advertised = self.client.capabilities()["resources"]["subscribe"]
            .as_bool()
            .unwrap_or(false);
        if !subscribe_advertised {
            return Ok(Outcome::skip(
                "Server does not advertise resources.subscribe capability",
            ));
        }
        let Some(resource) = self.resources.first() else {
            return Ok(Outcome::skip("No resources available for subscribe test"));
        };
        let uri = resource
            .get("uri")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = self.client.subscribe_resource(&uri).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("subscribe error: {error}")));
        }
        self.subscribed_uri = Some(uri.clone());
        Ok(Outcome::pass_with(format!("Subscribed to '{uri}'")))
    }

    async fn check_sub_002(&mut self) -> ProbeResult<Outcome> {
        let Some(uri) = self.subscribed_uri.clone() else {
            return Ok(Outcome::skip(
                "No active subscription (SUB-001 did not run or failed)",
            ));
        };
        let response = self.client.unsubscribe_resource(&uri).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("unsubscribe error: {error}")));
        }
        Ok(Outcome::pass_with(format!("Unsubscribed from '{uri}'")))
    }

    async fn check_sub_003(&mut self) -> ProbeResult<Outcome> {
        Ok(Outcome::skip(
            "No automatic way to trigger resource update (requires server-specific tool)",
        ))
    }
}
