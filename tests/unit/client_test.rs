//! Client correlation, buffering, and pagination tests against a
//! scripted in-memory transport.

use std::collections::VecDeque;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use mcp_probe::client::McpClient;
use mcp_probe::error::{ProbeError, ProbeResult};
use mcp_probe::transport::Transport;

/// In-memory transport replaying a fixed sequence of incoming messages.
#[derive(Default)]
struct FakeTransport {
    incoming: VecDeque<Value>,
    sent: Vec<Value>,
    running: bool,
}

impl FakeTransport {
    fn scripted(messages: Vec<Value>) -> Self {
        Self {
            incoming: messages.into(),
            sent: Vec::new(),
            running: true,
        }
    }
}

impl Transport for FakeTransport {
    async fn start(&mut self) -> ProbeResult<()> {
        self.running = true;
        Ok(())
    }

    async fn send(&mut self, message: &Value) -> ProbeResult<()> {
        self.sent.push(message.clone());
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> ProbeResult<Value> {
        self.incoming
            .pop_front()
            .ok_or(ProbeError::Timeout(timeout.as_secs_f64()))
    }

    async fn stop(&mut self) -> ProbeResult<()> {
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

fn client_with(messages: Vec<Value>) -> McpClient<FakeTransport> {
    McpClient::new(FakeTransport::scripted(messages), Duration::from_secs(1))
}

#[tokio::test]
async fn test_request_ids_start_at_one_and_increment() {
    let mut client = client_with(vec![
        json!({"jsonrpc": "2.0", "id": 1, "result": {}}),
        json!({"jsonrpc": "2.0", "id": 2, "result": {}}),
    ]);

    client.request("ping", None).await.unwrap();
    client.request("ping", None).await.unwrap();

    assert_eq!(client.transport().sent[0]["id"], json!(1));
    assert_eq!(client.transport().sent[1]["id"], json!(2));
    assert_eq!(client.transport().sent[0]["params"], json!({}));
}

#[tokio::test]
async fn test_response_id_always_matches_request_id() {
    let mut client = client_with(vec![json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": 1}})]);
    let response = client.request("tools/list", None).await.unwrap();
    assert_eq!(response["id"], json!(1));
}

#[tokio::test]
async fn test_notifications_buffered_not_returned() {
    let notification = json!({
        "jsonrpc": "2.0",
        "method": "notifications/tools/list_changed",
    });
    let mut client = client_with(vec![
        notification.clone(),
        json!({"jsonrpc": "2.0", "id": 1, "result": {}}),
    ]);

    let response = client.request("tools/list", None).await.unwrap();
    assert_eq!(response["id"], json!(1));
    assert_eq!(client.received_notifications(), &[notification]);
}

#[tokio::test]
async fn test_mismatched_ids_dropped() {
    let mut client = client_with(vec![
        json!({"jsonrpc": "2.0", "id": 99, "result": {"wrong": true}}),
        json!({"jsonrpc": "2.0", "id": 1, "result": {"right": true}}),
    ]);

    let response = client.request("tools/list", None).await.unwrap();
    assert_eq!(response["result"]["right"], json!(true));
    assert!(client.received_notifications().is_empty());
}

#[tokio::test]
async fn test_initialize_records_state_and_notifies() {
    let mut client = client_with(vec![json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "protocolVersion": "2025-11-25",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "fake", "version": "1.0"},
        },
    })]);

    client.initialize().await.unwrap();

    assert_eq!(client.server_info().unwrap()["name"], json!("fake"));
    assert!(client.capabilities().get("tools").is_some());

    let sent = &client.transport().sent;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["method"], json!("initialize"));
    assert_eq!(sent[0]["params"]["protocolVersion"], json!("2025-11-25"));
    assert_eq!(sent[1]["method"], json!("notifications/initialized"));
    assert!(sent[1].get("id").is_none());
}

#[tokio::test]
async fn test_paginated_list_concatenates_in_order() {
    let mut client = client_with(vec![
        json!({"jsonrpc": "2.0", "id": 1, "result": {
            "tools": [{"name": "a"}, {"name": "b"}],
            "nextCursor": "p2",
        }}),
        json!({"jsonrpc": "2.0", "id": 2, "result": {
            "tools": [{"name": "c"}, {"name": "d"}, {"name": "e"}],
        }}),
    ]);

    let paged = client.paginated_list("tools/list", "tools").await.unwrap();
    let names: Vec<&str> = paged
        .items
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    assert!(paged.paginated);

    // The second request carries the cursor from the first page.
    assert_eq!(client.transport().sent[1]["params"]["cursor"], json!("p2"));
}

#[tokio::test]
async fn test_paginated_list_single_page() {
    let mut client = client_with(vec![json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {"tools": [{"name": "only"}]},
    })]);

    let paged = client.paginated_list("tools/list", "tools").await.unwrap();
    assert_eq!(paged.items.len(), 1);
    assert!(!paged.paginated);
}

#[tokio::test]
async fn test_paginated_list_stops_on_empty_cursor() {
    let mut client = client_with(vec![json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {"tools": [], "nextCursor": ""},
    })]);

    let paged = client.paginated_list("tools/list", "tools").await.unwrap();
    assert!(paged.items.is_empty());
    // Presence of the field still marks the server as paginating.
    assert!(paged.paginated);
    assert_eq!(client.transport().sent.len(), 1);
}

#[tokio::test]
async fn test_send_raw_without_id_returns_immediately() {
    let mut client = client_with(vec![]);
    let message = json!({"jsonrpc": "2.0", "method": "notifications/custom"});
    let result = client.send_raw(&message).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_send_raw_timeout_yields_none() {
    let mut client = client_with(vec![]);
    let message = json!({"jsonrpc": "2.0", "id": 8042, "method": "tools/list"});
    let result = client.send_raw(&message).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_send_raw_matches_arbitrary_id() {
    let mut client = client_with(vec![
        json!({"jsonrpc": "2.0", "id": 8042, "result": {"echo": true}}),
    ]);
    let message = json!({"jsonrpc": "2.0", "id": 8042, "method": "tools/list", "params": {}});
    let response = client.send_raw(&message).await.unwrap().unwrap();
    assert_eq!(response["id"], json!(8042));
}

#[tokio::test]
async fn test_notify_omits_params_when_none() {
    let mut client = client_with(vec![]);
    client.notify("notifications/initialized", None).await.unwrap();
    let sent = &client.transport().sent[0];
    assert!(sent.get("params").is_none());
    assert!(sent.get("id").is_none());
}
