//! Tool discovery and invocation checks (TOOL-001..008).

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::schema::{generate_invalid_args, generate_valid_args};
use crate::types::{Severity, SuiteResult};

const TOOL_001: CheckSpec = CheckSpec {
    id: "TOOL-001",
    description: "tools/list returns a list of tools",
    severity: Severity::Critical,
};
const TOOL_002: CheckSpec = CheckSpec {
    id: "TOOL-002",
    description: "Each tool has name, description, inputSchema",
    severity: Severity::Critical,
};
const TOOL_003: CheckSpec = CheckSpec {
    id: "TOOL-003",
    description: "inputSchema is valid JSON Schema",
    severity: Severity::Error,
};
const TOOL_004: CheckSpec = CheckSpec {
    id: "TOOL-004",
    description: "Tool call with valid arguments succeeds",
    severity: Severity::Error,
};
const TOOL_005: CheckSpec = CheckSpec {
    id: "TOOL-005",
    description: "Tool call with invalid arguments returns error",
    severity: Severity::Error,
};
const TOOL_006: CheckSpec = CheckSpec {
    id: "TOOL-006",
    description: "Nonexistent tool returns error",
    severity: Severity::Warning,
};
const TOOL_007: CheckSpec = CheckSpec {
    id: "TOOL-007",
    description: "Tool names follow naming convention",
    severity: Severity::Info,
};
const TOOL_008: CheckSpec = CheckSpec {
    id: "TOOL-008",
    description: "tools/list pagination works",
    severity: Severity::Warning,
};

fn is_conventional_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

pub struct ToolsSuite<'a> {
    client: &'a mut McpClient,
    tools: Vec<Value>,
    first_page_had_cursor: bool,
}

impl<'a> ToolsSuite<'a> {
    pub const NAME: &'static str = "tools";

    pub fn new(client: &'a mut McpClient) -> Self {
        Self {
            client,
            tools: Vec::new(),
            first_page_had_cursor: false,
        }
    }

    /// Runs the suite; the discovered tool list is returned alongside the
    /// results so the runner can feed it to later suites.
    pub async fn run(mut self) -> (SuiteResult, Vec<Value>) {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&TOOL_001, self.check_tool_001()).await;
        harness.run(&TOOL_002, self.check_tool_002()).await;
        harness.run(&TOOL_003, self.check_tool_003()).await;
        harness.run(&TOOL_004, self.check_tool_004()).await;
        harness.run(&TOOL_005, self.check_tool_005()).await;
        harness.run(&TOOL_006, self.check_tool_006()).await;
        harness.run(&TOOL_007, self.check_tool_007()).await;
        harness.run(&TOOL_008, self.check_tool_008()).await;
        (harness.finish(), self.tools)
    }

    async fn check_tool_001(&mut self) -> ProbeResult<Outcome> {
        let paged = self.client.paginated_list("tools/list", "tools").await?;
        let result = paged
            .first_response
            .get("result")
            .cloned()
            .unwrap_or(json!({}));
        let Some(tools) = result.get("tools") else {
            let keys: Vec<&str> = result
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Ok(Outcome::fail(format!("No 'tools' key in result: {keys:?}")));
        };
        if !tools.is_array() {
            return Ok(Outcome::fail(format!("'tools' is not a list: {tools}")));
        }
        self.first_page_had_cursor = paged.paginated;
        self.tools = paged.items;
        Ok(Outcome::pass_with(format!(
            "Found {} tools",
            self.tools.len()
        )))
    }

    async fn check_tool_002(&mut self) -> ProbeResult<Outcome> {
        if self.tools.is_empty() {
            return Ok(Outcome::skip("No tools discovered"));
        }
        let mut missing = Vec::new();
        for tool in &self.tools {
            let name = tool.get("name").and_then(Value::as_str);
            if name.map_or(true, str::is_empty) {
                missing.push(format!("tool missing 'name': {tool}"));
            }
            if !tool.get("inputSchema").is_some_and(Value::is_object) {
                missing.push(format!(
                    "tool '{}' missing 'inputSchema' (object)",
                    name.unwrap_or("?")
                ));
            }
        }
        if !missing.is_empty() {
            missing.truncate(5);
            return Ok(Outcome::fail(missing.join("; ")));
        }
        Ok(Outcome::pass_with(format!(
            "All {} tools have required fields",
            self.tools.len()
        )))
    }

    async fn check_tool_003(&mut self) -> ProbeResult<Outcome> {
        if self.tools.is_empty() {
            return Ok(Outcome::skip("No tools discovered"));
        }
        let mut invalid = Vec::new();
        for tool in &self.tools {
            let name = tool.get("name").and_then(Value::as_str).unwrap_or("?");
            let schema = tool.get("inputSchema").cloned().unwrap_or(json!({}));
            if let Some(problem) = validate_schema(&schema) {
                invalid.push(format!("'{name}': {problem}"));
            }
        }
        if !invalid.is_empty() {
            invalid.truncate(5);
            return Ok(Outcome::fail(invalid.join("; ")));
        }
        let suffix = if cfg!(feature = "schema-validation") {
            ""
        } else {
            " (enable schema-validation for full validation)"
        };
        Ok(Outcome::pass_with(format!("All schemas valid{suffix}")))
    }

    async fn check_tool_004(&mut self) -> ProbeResult<Outcome> {
        if self.tools.is_empty() {
            return Ok(Outcome::skip("No tools discovered"));
        }
        let candidates: Vec<(String, Value)> = self
            .tools
            .iter()
            .filter_map(|tool| {
                let name = tool.get("name").and_then(Value::as_str)?;
                let schema = tool.get("inputSchema")?;
                let args = generate_valid_args(schema)?;
                Some((name.to_string(), args))
            })
            .collect();
        let Some((name, args)) = candidates.into_iter().next() else {
            return Ok(Outcome::skip(
                "All tool schemas too complex for auto-generation",
            ));
        };
        let response = self.client.call_tool(&name, args).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!(
                "Tool '{name}' returned error: {error}"
            )));
        }
        Ok(Outcome::pass_with(format!(
            "Tool '{name}' called successfully"
        )))
    }

    async fn check_tool_005(&mut self) -> ProbeResult<Outcome> {
        let Some(tool) = self.tools.first() else {
            return Ok(Outcome::skip("No tools discovered"));
        };
        let name = tool
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        let schema = tool.get("inputSchema").cloned().unwrap_or(json!({}));
        let args = generate_invalid_args(&schema);

        let response = match self.client.call_tool(&name, args).await {
            Ok(response) => response,
            Err(e) => {
                return Ok(Outcome::fail(format!("Server crashed on invalid args: {e}")));
            }
        };
        if response.get("error").is_some() {
            return Ok(Outcome::pass_with(format!(
                "Server returned error for invalid args on '{name}'"
            )));
        }
        let result = response.get("result").cloned().unwrap_or(json!({}));
        if result["isError"].as_bool() == Some(true) {
            return Ok(Outcome::pass_with(format!(
                "Server returned isError=true for invalid args on '{name}'"
            )));
        }
        let error_labeled_content = result["content"]
            .as_array()
            .is_some_and(|items| {
                items.iter().any(|item| {
                    item["type"].as_str() == Some("text")
                        && item["text"]
                            .as_str()
                            .is_some_and(|t| t.to_lowercase().contains("error"))
                })
            });
        if error_labeled_content {
            return Ok(Outcome::pass_with(format!(
                "Server returned error content for invalid args on '{name}'"
            )));
        }
        Ok(Outcome::warn(format!(
            "Server accepted invalid args without error on '{name}'"
        )))
    }

    async fn check_tool_006(&mut self) -> ProbeResult<Outcome> {
        let response = match self
            .client
            .call_tool("__nonexistent_tool_name__", json!({}))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(Outcome::fail(format!(
                    "Server crashed on nonexistent tool: {e}"
                )));
            }
        };
        if response.get("error").is_some() {
            return Ok(Outcome::pass_with(
                "Server returned error for nonexistent tool",
            ));
        }
        if response["result"]["isError"].as_bool() == Some(true) {
            return Ok(Outcome::pass_with(
                "Server returned isError=true for nonexistent tool",
            ));
        }
        Ok(Outcome::fail(
            "Server did not return error for nonexistent tool",
        ))
    }

    async fn check_tool_007(&mut self) -> ProbeResult<Outcome> {
        if self.tools.is_empty() {
            return Ok(Outcome::skip("No tools discovered"));
        }
        let non_conforming: Vec<&str> = self
            .tools
            .iter()
            .filter_map(|t| t.get("name").and_then(Value::as_str))
            .filter(|name| !is_conventional_name(name))
            .collect();
        if !non_conforming.is_empty() {
            let shown: Vec<&str> = non_conforming.into_iter().take(10).collect();
            return Ok(Outcome::info(format!(
                "Non-standard names: {}",
                shown.join(", ")
            )));
        }
        Ok(Outcome::pass_with(
            "All tool names follow [a-z0-9_-] convention",
        ))
    }

    async fn check_tool_008(&mut self) -> ProbeResult<Outcome> {
        if !self.first_page_had_cursor {
            return Ok(Outcome::skip("Server returned all tools in a single page"));
        }
        Ok(Outcome::pass_with("Pagination verified during TOOL-001"))
    }
}

#[cfg(feature = "schema-validation")]
fn validate_schema(schema: &Value) -> Option<String> {
    jsonschema::meta::validate(schema)
        .err()
        .map(|e| e.to_string())
}

#[cfg(not(feature = "schema-validation"))]
fn validate_schema(schema: &Value) -> Option<String> {
    if !schema.is_object() {
        return Some("schema is not an object".to_string());
    }
    if schema["type"].as_str() == Some("object") && schema.get("properties").is_none() {
        return Some("object schema without properties".to_string());
    }
    None
}
