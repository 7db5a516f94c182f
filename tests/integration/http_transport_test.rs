//! HTTP transport tests against wiremock: JSON bodies, SSE bodies,
//! session header adoption, 401 handling, and session teardown.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_probe::transport::{HttpTransport, Transport};

fn transport_for(server: &MockServer) -> HttpTransport {
    HttpTransport::new(server.uri(), Vec::new(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_json_response_enqueued() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}})),
        )
        .mount(&server)
        .await;

    let mut transport = transport_for(&server);
    transport.start().await.unwrap();
    transport
        .send(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "params": {}}))
        .await
        .unwrap();

    let message = transport.receive(Duration::from_secs(1)).await.unwrap();
    assert_eq!(message["result"]["ok"], json!(true));
}

#[tokio::test]
async fn test_sse_response_enqueues_each_event_in_order() {
    let server = MockServer::start().await;
    let body = "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\n\
                data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n\
                data: not json\n\n";
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"),
        )
        .mount(&server)
        .await;

    let mut transport = transport_for(&server);
    transport.start().await.unwrap();
    transport
        .send(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "params": {}}))
        .await
        .unwrap();

    let first = transport.receive(Duration::from_secs(1)).await.unwrap();
    assert_eq!(first["method"], json!("notifications/progress"));
    let second = transport.receive(Duration::from_secs(1)).await.unwrap();
    assert_eq!(second["id"], json!(1));

    // The malformed third event was dropped.
    let err = transport
        .receive(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_session_id_adopted_and_echoed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Mcp-Session-Id", "sess-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 2, "result": {"second": true}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .insert_header("Mcp-Session-Id", "sess-42")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {"first": true}})),
        )
        .mount(&server)
        .await;

    let mut transport = transport_for(&server);
    transport.start().await.unwrap();

    transport
        .send(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .await
        .unwrap();
    assert_eq!(transport.session_id(), Some("sess-42"));

    // Second request must carry the adopted session header; the matching
    // mock is the one that answers with "second".
    transport
        .send(&json!({"jsonrpc": "2.0", "id": 2, "method": "ping", "params": {}}))
        .await
        .unwrap();

    let _ = transport.receive(Duration::from_secs(1)).await.unwrap();
    let second = transport.receive(Duration::from_secs(1)).await.unwrap();
    assert_eq!(second["result"]["second"], json!(true));
}

#[tokio::test]
async fn test_401_raises_auth_required() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Bearer realm=\"mcp\""),
        )
        .mount(&server)
        .await;

    let mut transport = transport_for(&server);
    transport.start().await.unwrap();
    let err = transport
        .send(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "params": {}}))
        .await
        .unwrap_err();
    assert!(err.is_auth_required(), "got: {err}");
}

#[tokio::test]
async fn test_custom_headers_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Probe-Trace", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut transport = HttpTransport::new(
        server.uri(),
        vec![("X-Probe-Trace".to_string(), "1".to_string())],
        Duration::from_secs(5),
    );
    transport.start().await.unwrap();
    transport
        .send(&json!({"jsonrpc": "2.0", "id": 1, "method": "ping", "params": {}}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_stop_deletes_session_and_tolerates_405() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .insert_header("Mcp-Session-Id", "sess-del")
                .set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": {}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(header("Mcp-Session-Id", "sess-del"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&server)
        .await;

    let mut transport = transport_for(&server);
    transport.start().await.unwrap();
    transport
        .send(&json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}))
        .await
        .unwrap();

    // 405 means "session deletion unsupported" and is silently ignored.
    transport.stop().await.unwrap();
    assert!(!transport.is_running());
}

#[tokio::test]
async fn test_stop_without_session_skips_delete() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut transport = transport_for(&server);
    transport.start().await.unwrap();
    transport.stop().await.unwrap();
}

#[tokio::test]
async fn test_receive_timeout_on_empty_queue() {
    let server = MockServer::start().await;
    let mut transport = transport_for(&server);
    transport.start().await.unwrap();
    let err = transport
        .receive(Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}
