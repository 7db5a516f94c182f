//! Stdio transport tests against the mock server binary and small shell
//! fixtures.

use std::time::Duration;

use serde_json::json;

use mcp_probe::client::McpClient;
use mcp_probe::transport::{ProbeTransport, StdioTransport, Transport};

const VALID_SERVER: &str = env!("CARGO_BIN_EXE_mock_server_valid");

fn script_command(dir: &tempfile::TempDir, body: &str) -> String {
    let path = dir.path().join("server.sh");
    std::fs::write(&path, body).expect("write script");
    format!("sh {}", path.display())
}

#[tokio::test]
async fn test_initialize_roundtrip() {
    let mut transport = StdioTransport::new(VALID_SERVER);
    transport.start().await.expect("transport should start");

    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-11-25",
            "capabilities": {},
            "clientInfo": {"name": "mcp-probe", "version": "0.1.0"},
        },
    });
    transport.send(&request).await.expect("send");
    let response = transport
        .receive(Duration::from_secs(5))
        .await
        .expect("receive");

    assert_eq!(response["id"], json!(1));
    assert_eq!(response["result"]["protocolVersion"], json!("2025-11-25"));
    assert!(response["result"]["capabilities"].is_object());

    transport.stop().await.expect("stop");
}

#[tokio::test]
async fn test_non_json_lines_skipped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let command = script_command(
        &dir,
        "echo 'this is not json'\n\
         echo '{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}'\n\
         sleep 2\n",
    );

    let mut transport = StdioTransport::new(command);
    transport.start().await.expect("start");

    let message = transport
        .receive(Duration::from_secs(5))
        .await
        .expect("should skip to the JSON line");
    assert_eq!(message["result"]["ok"], json!(true));
    assert_eq!(transport.non_json_lines(), 1);

    transport.stop().await.expect("stop");
}

#[tokio::test]
async fn test_eof_raises_connection_closed() {
    let dir = tempfile::tempdir().unwrap();
    let command = script_command(&dir, "exit 0\n");

    let mut transport = StdioTransport::new(command);
    transport.start().await.expect("start");

    let err = transport
        .receive(Duration::from_secs(5))
        .await
        .expect_err("EOF should be an error");
    assert!(err.is_connection_closed(), "got: {err}");

    transport.stop().await.expect("stop");
}

#[tokio::test]
async fn test_receive_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let command = script_command(&dir, "sleep 5\n");

    let mut transport = StdioTransport::new(command);
    transport.start().await.expect("start");

    let err = transport
        .receive(Duration::from_millis(200))
        .await
        .expect_err("silence should time out");
    assert!(err.is_timeout(), "got: {err}");

    transport.stop().await.expect("stop");
}

#[tokio::test]
async fn test_stderr_drained_for_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let command = script_command(
        &dir,
        "echo 'boot warning' >&2\n\
         echo '{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}'\n\
         sleep 2\n",
    );

    let mut transport = StdioTransport::new(command);
    transport.start().await.expect("start");
    let _ = transport.receive(Duration::from_secs(5)).await;
    // Give the drain task a beat to pick up the stderr line.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(transport.stderr_output().contains("boot warning"));
    transport.stop().await.expect("stop");
}

#[tokio::test]
async fn test_stop_captures_exit_code() {
    let mut transport = StdioTransport::new(VALID_SERVER);
    transport.start().await.expect("start");
    transport.stop().await.expect("stop");
    assert!(transport.exit_code().is_some());
    assert!(!transport.is_running());
}

#[tokio::test]
async fn test_spawn_failure_is_reported() {
    let mut transport = StdioTransport::new("/nonexistent/binary/for/probe");
    assert!(transport.start().await.is_err());
}

#[tokio::test]
async fn test_client_over_stdio_full_handshake() {
    let mut transport = ProbeTransport::Stdio(StdioTransport::new(VALID_SERVER));
    transport.start().await.expect("start");
    let mut client = McpClient::new(transport, Duration::from_secs(5));

    let response = client.initialize().await.expect("initialize");
    assert!(response["result"]["serverInfo"].is_object());
    assert_eq!(client.server_info().unwrap()["name"], json!("mock-valid"));
    assert!(client.capabilities()["resources"]["subscribe"]
        .as_bool()
        .unwrap());

    let paged = client
        .paginated_list("tools/list", "tools")
        .await
        .expect("tools/list");
    assert_eq!(paged.items.len(), 2);
    assert!(!paged.paginated);

    client.transport_mut().stop().await.expect("stop");
}
