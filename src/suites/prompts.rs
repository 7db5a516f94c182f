//! Prompt listing and retrieval checks (PROMPT-001..004).

use serde_json::{json, Map, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::types::{Severity, SuiteResult};

const PROMPT_001: CheckSpec = CheckSpec {
    id: "PROMPT-001",
    description: "prompts/list returns a list of prompts",
    severity: Severity::Critical,
};
const PROMPT_002: CheckSpec = CheckSpec {
    id: "PROMPT-002",
    description: "Each prompt has name and description",
    severity: Severity::Error,
};
const PROMPT_003: CheckSpec = CheckSpec {
    id: "PROMPT-003",
    description: "prompts/get returns messages",
    severity: Severity::Error,
};
const PROMPT_004: CheckSpec = CheckSpec {
    id: "PROMPT-004",
    description: "prompts/list pagination works",
    severity: Severity::Warning,
};

pub struct PromptsSuite<'a> {
    client: &'a mut McpClient,
    prompts: Vec<Value>,
    first_page_had_cursor: bool,
}

impl<'a> PromptsSuite<'a> {
    pub const NAME: &'static str = "prompts";

    pub fn new(client: &'a mut McpClient) -> Self {
        Self {
            client,
            prompts: Vec::new(),
            first_page_had_cursor: false,
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&PROMPT_001, self.check_prompt_001()).await;
        harness.run(&PROMPT_002, self.check_prompt_002()).await;
        harness.run(&PROMPT_003, self.check_prompt_003()).await;
        harness.run(&PROMPT_004, self.check_prompt_004()).await;
        harness.finish()
    }

    async fn check_prompt_001(&mut self) -> ProbeResult<Outcome> {
        let paged = self.client.paginated_list("prompts/list", "prompts").await?;
        let result = paged
            .first_response
            .get("result")
            .cloned()
            .unwrap_or(json!({}));
        let Some(prompts) = result.get("prompts") else {
            let keys: Vec<&str> = result
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Ok(Outcome::fail(format!(
                "No 'prompts' key in result: {keys:?}"
            )));
        };
        if !prompts.is_array() {
            return Ok(Outcome::fail(format!("'prompts' is not a list: {prompts}")));
        }
        self.first_page_had_cursor = paged.paginated;
        self.prompts = paged.items;
        Ok(Outcome::pass_with(format!(
            "Found {} prompts",
            self.prompts.len()
        )))
    }

    async fn check_prompt_002(&mut self) -> ProbeResult<Outcome> {
        if self.prompts.is_empty() {
            return Ok(Outcome::skip("No prompts discovered"));
        }
        let mut issues = Vec::new();
        for prompt in &self.prompts {
            if prompt
                .get("name")
                .and_then(Value::as_str)
                .map_or(true, str::is_empty)
            {
                issues.push(format!("prompt missing 'name': {prompt}"));
            }
        }
        if !issues.is_empty() {
            issues.truncate(5);
            return Ok(Outcome::fail(issues.join("; ")));
        }
        Ok(Outcome::pass_with(format!(
            "All {} prompts have required fields",
            self.prompts.len()
        )))
    }

    async fn check_prompt_003(&mut self) -> ProbeResult<Outcome> {
        let Some(prompt) = self.prompts.first() else {
            return Ok(Outcome::skip("No prompts discovered"));
        };
        let name = prompt
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        // Supply "test" for every declared argument.
        let arguments = prompt.get("arguments").and_then(Value::as_array).map(|args| {
            let mut map = Map::new();
            for arg in args {
                if let Some(arg_name) = arg.get("name").and_then(Value::as_str) {
                    map.insert(arg_name.to_string(), json!("test"));
                }
            }
            Value::Object(map)
        });

        let response = self.client.get_prompt(&name, arguments).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!(
                "Error getting prompt '{name}': {error}"
            )));
        }
        let Some(messages) = response["result"].get("messages") else {
            return Ok(Outcome::fail(format!(
                "No 'messages' in get_prompt response for '{name}'"
            )));
        };
        let Some(messages) = messages.as_array() else {
            return Ok(Outcome::fail(format!(
                "'messages' is not a list: {messages}"
            )));
        };
        Ok(Outcome::pass_with(format!(
            "Prompt '{name}' returned {} message(s)",
            messages.len()
        )))
    }

    async fn check_prompt_004(&mut self) -> ProbeResult<Outcome> {
        if !self.first_page_had_cursor {
            return Ok(Outcome::skip(
                "Server returned all prompts in a single page",
            ));
        }
        Ok(Outcome::pass_with("Pagination verified during PROMPT-001"))
    }
}
