//! Resource listing and read checks (RES-001..005).

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::types::{Severity, SuiteResult};

const RES_001: CheckSpec = CheckSpec {
    id: "RES-001",
    description: "resources/list returns a list of resources",
    severity: Severity::Critical,
};
const RES_002: CheckSpec = CheckSpec {
    id: "RES-002",
    description: "Each resource has uri and name",
    severity: Severity::Error,
};
const RES_003: CheckSpec = CheckSpec {
    id: "RES-003",
    description: "resources/read returns content",
    severity: Severity::Error,
};
const RES_004: CheckSpec = CheckSpec {
    id: "RES-004",
    description: "Nonexistent resource returns error",
    severity: Severity::Warning,
};
const RES_005: CheckSpec = CheckSpec {
    id: "RES-005",
    description: "resources/list pagination works",
    severity: Severity::Warning,
};

pub struct ResourcesSuite<'a> {
    client: &'a mut McpClient,
    resources: Vec<Value>,
    first_page_had_cursor: bool,
}

impl<'a> ResourcesSuite<'a> {
    pub const NAME: &'static str = "resources";

    pub fn new(client: &'a mut McpClient) -> Self {
        Self {
            client,
            resources: Vec::new(),
            first_page_had_cursor: false,
        }
    }

    /// Runs the suite, returning the discovered resource list for the
    /// subscription checks downstream.
    pub async fn run(mut self) -> (SuiteResult, Vec<Value>) {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&RES_001, self.check_res_001()).await;
        harness.run(&RES_002, self.check_res_002()).await;
        harness.run(&RES_003, self.check_res_003()).await;
        harness.run(&RES_004, self.check_res_004()).await;
        harness.run(&RES_005, self.check_res_005()).await;
        (harness.finish(), self.resources)
    }

    async fn check_res_001(&mut self) -> ProbeResult<Outcome> {
        let paged = self
            .client
            .paginated_list("resources/list", "resources")
            .await?;
        let result = paged
            .first_response
            .get("result")
            .cloned()
            .unwrap_or(json!({}));
        let Some(resources) = result.get("resources") else {
            let keys: Vec<&str> = result
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Ok(Outcome::fail(format!(
                "No 'resources' key in result: {keys:?}"
            )));
        };
        if !resources.is_array() {
            return Ok(Outcome::fail(format!(
                "'resources' is not a list: {resources}"
            )));
        }
        self.first_page_had_cursor = paged.paginated;
        self.resources = paged.items;
        Ok(Outcome::pass_with(format!(
            "Found {} resources",
            self.resources.len()
        )))
    }

    async fn check_res_002(&mut self) -> ProbeResult<Outcome> {
        if self.resources.is_empty() {
            return Ok(Outcome::skip("No resources discovered"));
        }
        let mut issues = Vec::new();
        for resource in &self.resources {
            let name = resource.get("name").and_then(Value::as_str);
            if resource
                .get("uri")
                .and_then(Value::as_str)
                .map_or(true, str::is_empty)
            {
                issues.push(format!("resource missing 'uri': {resource}"));
            }
            if name.map_or(true, str::is_empty) {
                issues.push(format!("resource missing 'name': {resource}"));
            }
            if let Some(mime) = resource.get("mimeType") {
                if !mime.is_string() {
                    issues.push(format!(
                        "resource '{}' mimeType is not a string: {mime}",
                        name.unwrap_or("?")
                    ));
                }
            }
        }
        if !issues.is_empty() {
            issues.truncate(5);
            return Ok(Outcome::fail(issues.join("; ")));
        }
        Ok(Outcome::pass_with(format!(
            "All {} resources have required fields",
            self.resources.len()
        )))
    }

    async fn check_res_003(&mut self) -> ProbeResult<Outcome> {
        let Some(resource) = self.resources.first() else {
            return Ok(Outcome::skip("No resources discovered"));
        };
        let uri = resource
            .get("uri")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = self.client.read_resource(&uri).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("Error reading '{uri}': {error}")));
        }
        let Some(contents) = response["result"].get("contents") else {
            return Ok(Outcome::fail(format!(
                "No 'contents' in read response for '{uri}'"
            )));
        };
        let count = contents.as_array().map_or(0, Vec::len);
        Ok(Outcome::pass_with(format!(
            "Read '{uri}' returned {count} content item(s)"
        )))
    }

    async fn check_res_004(&mut self) -> ProbeResult<Outcome> {
        let response = match self
            .client
            .read_resource("nonexistent://fake-resource-uri")
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(Outcome::fail(format!(
                    "Server crashed on nonexistent resource: {e}"
                )));
            }
        };
        if response.get("error").is_some() {
            return Ok(Outcome::pass_with(
                "Server returned error for nonexistent resource",
            ));
        }
        Ok(Outcome::fail(
            "Server did not return error for nonexistent resource",
        ))
    }

    async fn check_res_005(&mut self) -> ProbeResult<Outcome> {
        if !self.first_page_had_cursor {
            return Ok(Outcome::skip(
                "Server returned all resources in a single page",
            ));
        }
        Ok(Outcome::pass_with("Pagination verified during RES-001"))
    }
}
