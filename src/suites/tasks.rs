//! Task lifecycle checks (TASK-001..008).

use std::time::Duration;

use serde_json::{json, Value};

use crate::client::McpClient;
use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::schema::generate_valid_args;
use crate::types::{Severity, SuiteResult};

const TASK_001: CheckSpec = CheckSpec {
    id: "TASK-001",
    description: "tasks/list returns a list of tasks",
    severity: Severity::Critical,
};
const TASK_002: CheckSpec = CheckSpec {
    id: "TASK-002",
    description: "Each task has taskId, status, createdAt",
    severity: Severity::Error,
};
const TASK_003: CheckSpec = CheckSpec {
    id: "TASK-003",
    description: "tasks/get returns task status",
    severity: Severity::Error,
};
const TASK_004: CheckSpec = CheckSpec {
    id: "TASK-004",
    description: "Nonexistent taskId returns error",
    severity: Severity::Warning,
};
const TASK_005: CheckSpec = CheckSpec {
    id: "TASK-005",
    description: "tasks/cancel cancels a working task",
    severity: Severity::Error,
};
const TASK_006: CheckSpec = CheckSpec {
    id: "TASK-006",
    description: "tasks/cancel on terminal task returns error",
    severity: Severity::Warning,
};
const TASK_007: CheckSpec = CheckSpec {
    id: "TASK-007",
    description: "tasks/result returns completed task result",
    severity: Severity::Error,
};
const TASK_008: CheckSpec = CheckSpec {
    id: "TASK-008",
    description: "Task-augmented tools/call returns task handle",
    severity: Severity::Error,
};

const VALID_STATUSES: [&str; 5] = [
    "working",
    "input_required",
    "completed",
    "failed",
    "cancelled",
];
const TERMINAL_STATUSES: [&str; 3] = ["completed", "failed", "cancelled"];

fn task_status(task: &Value) -> Option<&str> {
    task.get("status").and_then(Value::as_str)
}

fn is_terminal(status: &str) -> bool {
    TERMINAL_STATUSES.contains(&status)
}

pub struct TasksSuite<'a> {
    client: &'a mut McpClient,
    tools: Vec<Value>,
    tasks: Vec<Value>,
}

impl<'a> TasksSuite<'a> {
    pub const NAME: &'static str = "tasks";

    pub fn new(client: &'a mut McpClient, tools: Vec<Value>) -> Self {
        Self {
            client,
            tools,
            tasks: Vec::new(),
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&TASK_001, self.check_task_001()).await;
        harness.run(&TASK_002, self.check_task_002()).await;
        harness.run(&TASK_003, self.check_task_003()).await;
        harness.run(&TASK_004, self.check_task_004()).await;
        harness.run(&TASK_005, self.check_task_005()).await;
        harness.run(&TASK_006, self.check_task_006()).await;
        harness.run(&TASK_007, self.check_task_007()).await;
        harness.run(&TASK_008, self.check_task_008()).await;
        harness.finish()
    }

    async fn check_task_001(&mut self) -> ProbeResult<Outcome> {
        let response = self.client.request("tasks/list", None).await?;
        let result = response.get("result").cloned().unwrap_or(json!({}));
        let Some(tasks) = result.get("tasks") else {
            let keys: Vec<&str> = result
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Ok(Outcome::fail(format!("No 'tasks' key in result: {keys:?}")));
        };
        let Some(tasks) = tasks.as_array() else {
            return Ok(Outcome::fail(format!("'tasks' is not a list: {tasks}")));
        };
        self.tasks = tasks.clone();
        Ok(Outcome::pass_with(format!("Found {} tasks", tasks.len())))
    }

    async fn check_task_002(&mut self) -> ProbeResult<Outcome> {
        if self.tasks.is_empty() {
            return Ok(Outcome::skip("No tasks discovered"));
        }
        let mut issues = Vec::new();
        for task in &self.tasks {
            let task_id = task.get("taskId").and_then(Value::as_str);
            if task_id.map_or(true, str::is_empty) {
                issues.push(format!("task missing 'taskId': {task}"));
            }
            let tid = task_id.unwrap_or("?");
            match task_status(task) {
                Some(status) if VALID_STATUSES.contains(&status) => {}
                other => issues.push(format!("task '{tid}' has invalid status: {other:?}")),
            }
            if task
                .get("createdAt")
                .and_then(Value::as_str)
                .map_or(true, str::is_empty)
            {
                issues.push(format!("task '{tid}' missing 'createdAt'"));
            }
        }
        if !issues.is_empty() {
            issues.truncate(5);
            return Ok(Outcome::fail(issues.join("; ")));
        }
        Ok(Outcome::pass_with(format!(
            "All {} tasks have required fields",
            self.tasks.len()
        )))
    }

    async fn check_task_003(&mut self) -> ProbeResult<Outcome> {
        let Some(task) = self.tasks.first() else {
            return Ok(Outcome::skip("No tasks to get"));
        };
        let task_id = task
            .get("taskId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = self.client.get_task(&task_id).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("tasks/get error: {error}")));
        }
        let result = response.get("result").cloned().unwrap_or(json!({}));
        if result.get("taskId").is_none() || result.get("status").is_none() {
            let keys: Vec<&str> = result
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Ok(Outcome::fail(format!(
                "Response missing taskId or status: {keys:?}"
            )));
        }
        Ok(Outcome::pass_with(format!(
            "Task '{task_id}' status: {}",
            result["status"]
        )))
    }

    async fn check_task_004(&mut self) -> ProbeResult<Outcome> {
        let response = match self.client.get_task("nonexistent-task-id-00000").await {
            Ok(response) => response,
            Err(e) => return Ok(Outcome::fail(format!("Server crashed: {e}"))),
        };
        if response.get("error").is_some() {
            return Ok(Outcome::pass_with(
                "Server returned error for nonexistent taskId",
            ));
        }
        Ok(Outcome::fail(
            "Server did not return error for nonexistent taskId",
        ))
    }

    async fn check_task_005(&mut self) -> ProbeResult<Outcome> {
        let Some(task) = self
            .tasks
            .iter()
            .find(|t| task_status(t) == Some("working"))
            .cloned()
        else {
            return Ok(Outcome::skip("No tasks in 'working' status"));
        };
        let task_id = task
            .get("taskId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = self.client.cancel_task(&task_id).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("tasks/cancel error: {error}")));
        }
        if response["result"]["status"].as_str() == Some("cancelled") {
            return Ok(Outcome::pass_with(format!("Task '{task_id}' cancelled")));
        }
        Ok(Outcome::warn(format!(
            "Task '{task_id}' status after cancel: {}",
            response["result"]["status"]
        )))
    }

    async fn check_task_006(&mut self) -> ProbeResult<Outcome> {
        let Some(task) = self
            .tasks
            .iter()
            .find(|t| task_status(t).is_some_and(is_terminal))
            .cloned()
        else {
            return Ok(Outcome::skip("No tasks in terminal status"));
        };
        let task_id = task
            .get("taskId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = self.client.cancel_task(&task_id).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::pass_with(format!(
                "Server returned error (code={}) for cancel on terminal task",
                error["code"]
            )));
        }
        Ok(Outcome::warn(
            "Server did not return error for cancel on terminal task",
        ))
    }

    async fn check_task_007(&mut self) -> ProbeResult<Outcome> {
        let Some(task) = self
            .tasks
            .iter()
            .find(|t| task_status(t) == Some("completed"))
            .cloned()
        else {
            return Ok(Outcome::skip("No completed tasks"));
        };
        let task_id = task
            .get("taskId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let response = self.client.get_task_result(&task_id).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("tasks/get_result error: {error}")));
        }
        Ok(Outcome::pass_with(format!(
            "Got result for completed task '{task_id}'"
        )))
    }

    async fn check_task_008(&mut self) -> ProbeResult<Outcome> {
        let tools_augmentation = match &self.client.capabilities()["tasks"]["tools"] {
            Value::Bool(b) => *b,
            Value::Object(o) => !o.is_empty(),
            _ => false,
        };
        if !tools_augmentation {
            return Ok(Outcome::skip(
                "Server does not advertise tasks.tools capability",
            ));
        }
        if self.tools.is_empty() {
            return Ok(Outcome::skip("No tools available for task-augmented call"));
        }
        let Some((name, args)) = self.tools.iter().find_map(|tool| {
            let name = tool.get("name").and_then(Value::as_str)?;
            let args = generate_valid_args(tool.get("inputSchema")?)?;
            Some((name.to_string(), args))
        }) else {
            return Ok(Outcome::skip(
                "No tool with simple enough schema for task-augmented call",
            ));
        };

        let response = self.client.call_tool_with_task(&name, args, 30_000).await?;
        if let Some(error) = response.get("error") {
            return Ok(Outcome::fail(format!("Task-augmented call error: {error}")));
        }
        let result = response.get("result").cloned().unwrap_or(json!({}));
        if result["type"].as_str() != Some("task") {
            return Ok(Outcome::fail(format!(
                "Response type is {:?}, expected 'task'",
                result.get("type")
            )));
        }
        let Some(task_id) = result.get("taskId").and_then(Value::as_str) else {
            return Ok(Outcome::fail("Response missing taskId"));
        };
        let task_id = task_id.to_string();
        let status = result["status"].as_str().unwrap_or_default().to_string();

        let mut details = format!("Task '{task_id}' created with status '{status}'");
        if status == "working" {
            // Poll at the server-advised interval, up to three times.
            let poll_interval = result["pollInterval"].as_u64().unwrap_or(1000);
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(poll_interval)).await;
                let poll = self.client.get_task(&task_id).await?;
                let poll_status = poll["result"]["status"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if is_terminal(&poll_status) {
                    details.push_str(&format!(" -> {poll_status}"));
                    if poll_status == "completed" {
                        self.client.get_task_result(&task_id).await?;
                        details.push_str(" (result fetched)");
                    }
                    break;
                }
            }
        }
        Ok(Outcome::pass_with(details))
    }
}
