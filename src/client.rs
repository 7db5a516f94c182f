//! JSON-RPC client with request/response correlation and pagination.
//!
//! The client owns the transport exclusively. Responses are matched by id;
//! server-initiated notifications arriving in between are buffered in
//! arrival order and never returned as a response.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::error::ProbeResult;
use crate::transport::{ProbeTransport, Transport};
use crate::types::{PROBE_VERSION, SPEC_VERSION};

/// Result of following a paginated listing to completion.
#[derive(Debug, Clone)]
pub struct PagedResponse {
    /// Raw first-page response, kept for field-level inspection.
    pub first_response: Value,
    /// Concatenated entries from every page, in order.
    pub items: Vec<Value>,
    /// Whether the first page carried a `nextCursor` field; distinguishes
    /// a single-page server from one whose pagination was exercised.
    pub paginated: bool,
}

pub struct McpClient<T: Transport = ProbeTransport> {
    transport: T,
    timeout: Duration,
    next_id: i64,
    server_info: Option<Value>,
    capabilities: Value,
    notifications: Vec<Value>,
}

impl<T: Transport> McpClient<T> {
    #[must_use]
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            next_id: 1,
            server_info: None,
            capabilities: json!({}),
            notifications: Vec::new(),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Raw `serverInfo` object from the initialize response.
    #[must_use]
    pub fn server_info(&self) -> Option<&Value> {
        self.server_info.as_ref()
    }

    /// Raw capabilities object from the initialize response.
    #[must_use]
    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    /// Notifications buffered while waiting for responses, arrival order.
    #[must_use]
    pub fn received_notifications(&self) -> &[Value] {
        &self.notifications
    }

    /// Sends a request and waits for the response with a matching id.
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> ProbeResult<Value> {
        let id = self.next_id;
        self.next_id += 1;
        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.unwrap_or_else(|| json!({})),
        });
        self.transport.send(&message).await?;
        self.receive_response(&json!(id)).await
    }

    /// Sends a notification; does not wait.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> ProbeResult<()> {
        let mut message = json!({
            "jsonrpc": "2.0",
            "method": method,
        });
        if let Some(params) = params {
            message["params"] = params;
        }
        self.transport.send(&message).await
    }

    /// Performs the initialize handshake and fires
    /// `notifications/initialized`.
    ///
    /// The raw response is returned for field-level inspection; missing
    /// `serverInfo` or `capabilities` leave the stored values empty.
    pub async fn initialize(&mut self) -> ProbeResult<Value> {
        let response = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": SPEC_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "mcp-probe",
                        "version": PROBE_VERSION,
                    },
                })),
            )
            .await?;
        if let Some(result) = response.get("result") {
            self.server_info = result.get("serverInfo").cloned();
            if let Some(caps) = result.get("capabilities") {
                self.capabilities = caps.clone();
            }
        }
        self.notify("notifications/initialized", None).await?;
        Ok(response)
    }

    /// Follows a cursor-paginated listing, concatenating `result[key]`
    /// entries until `nextCursor` is absent or empty.
    pub async fn paginated_list(&mut self, method: &str, key: &str) -> ProbeResult<PagedResponse> {
        let first_response = self.request(method, None).await?;
        let first_result = first_response.get("result").cloned().unwrap_or(json!({}));

        let mut items: Vec<Value> = first_result
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let paginated = first_result
            .as_object()
            .is_some_and(|o| o.contains_key("nextCursor"));

        let mut cursor = next_cursor(&first_result);
        while let Some(c) = cursor {
            let response = self.request(method, Some(json!({ "cursor": c }))).await?;
            let result = response.get("result").cloned().unwrap_or(json!({}));
            if let Some(page) = result.get(key).and_then(Value::as_array) {
                items.extend(page.iter().cloned());
            }
            cursor = next_cursor(&result);
        }

        Ok(PagedResponse {
            first_response,
            items,
            paginated,
        })
    }

    /// Sends an arbitrary message, possibly malformed or unusual.
    ///
    /// If the message carries an `id`, waits for the matching response and
    /// returns `Ok(None)` on timeout; otherwise returns immediately.
    pub async fn send_raw(&mut self, message: &Value) -> ProbeResult<Option<Value>> {
        self.transport.send(message).await?;
        let Some(id) = message.get("id") else {
            return Ok(None);
        };
        let id = id.clone();
        match self.receive_response(&id).await {
            Ok(response) => Ok(Some(response)),
            Err(e) if e.is_timeout() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> ProbeResult<Value> {
        self.request(
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    /// Task-augmented tool call with the given time-to-live in
    /// milliseconds.
    pub async fn call_tool_with_task(
        &mut self,
        name: &str,
        arguments: Value,
        ttl: u64,
    ) -> ProbeResult<Value> {
        self.request(
            "tools/call",
            Some(json!({
                "name": name,
                "arguments": arguments,
                "task": { "ttl": ttl },
            })),
        )
        .await
    }

    pub async fn read_resource(&mut self, uri: &str) -> ProbeResult<Value> {
        self.request("resources/read", Some(json!({ "uri": uri })))
            .await
    }

    pub async fn subscribe_resource(&mut self, uri: &str) -> ProbeResult<Value> {
        self.request("resources/subscribe", Some(json!({ "uri": uri })))
            .await
    }

    pub async fn unsubscribe_resource(&mut self, uri: &str) -> ProbeResult<Value> {
        self.request("resources/unsubscribe", Some(json!({ "uri": uri })))
            .await
    }

    pub async fn get_prompt(&mut self, name: &str, arguments: Option<Value>) -> ProbeResult<Value> {
        let mut params = json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        self.request("prompts/get", Some(params)).await
    }

    pub async fn get_task(&mut self, task_id: &str) -> ProbeResult<Value> {
        self.request("tasks/get", Some(json!({ "taskId": task_id })))
            .await
    }

    pub async fn cancel_task(&mut self, task_id: &str) -> ProbeResult<Value> {
        self.request("tasks/cancel", Some(json!({ "taskId": task_id })))
            .await
    }

    pub async fn get_task_result(&mut self, task_id: &str) -> ProbeResult<Value> {
        self.request("tasks/get_result", Some(json!({ "taskId": task_id })))
            .await
    }

    async fn receive_response(&mut self, expected_id: &Value) -> ProbeResult<Value> {
        loop {
            let message = self.transport.receive(self.timeout).await?;
            let Some(id) = message.get("id") else {
                self.notifications.push(message);
                continue;
            };
            if id == expected_id {
                return Ok(message);
            }
            debug!("unexpected id {id} (expected {expected_id}), skipping");
        }
    }
}

fn next_cursor(result: &Value) -> Option<String> {
    match result.get("nextCursor") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
