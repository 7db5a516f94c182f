//! OAuth discovery and auth-suite tests against wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_probe::oauth::{discover_oauth_metadata, discover_protected_resource};
use mcp_probe::suites::auth::AuthSuite;
use mcp_probe::types::Status;

async fn mount_discovery(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-protected-resource"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resource": server.uri(),
            "authorization_servers": [server.uri()],
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": server.uri(),
            "authorization_endpoint": format!("{}/authorize", server.uri()),
            "token_endpoint": format!("{}/token", server.uri()),
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_discover_protected_resource() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    let meta = discover_protected_resource(&server.uri()).await.unwrap();
    let servers = meta["authorization_servers"].as_array().unwrap();
    assert_eq!(servers.len(), 1);
}

#[tokio::test]
async fn test_discover_protected_resource_absent() {
    let server = MockServer::start().await;
    assert!(discover_protected_resource(&server.uri()).await.is_none());
}

#[tokio::test]
async fn test_discover_oauth_metadata() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;

    let meta = discover_oauth_metadata(&server.uri()).await.unwrap();
    assert!(meta["authorization_endpoint"]
        .as_str()
        .unwrap()
        .ends_with("/authorize"));
    assert!(meta["token_endpoint"].as_str().unwrap().ends_with("/token"));
}

#[tokio::test]
async fn test_auth_suite_against_discoverable_server() {
    let server = MockServer::start().await;
    mount_discovery(&server).await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("WWW-Authenticate", "Bearer resource_metadata=\"...\""),
        )
        .mount(&server)
        .await;

    let suite = AuthSuite::new(&server.uri(), "mcp-probe", 8765, Duration::from_secs(5));
    let result = suite.run().await;

    assert_eq!(result.name, "auth");
    assert_eq!(result.checks.len(), 4);

    let by_id = |id: &str| result.checks.iter().find(|c| c.id == id).unwrap();
    assert_eq!(by_id("AUTH-001").status, Status::Pass);
    assert!(by_id("AUTH-001")
        .details
        .as_deref()
        .unwrap()
        .contains("Bearer"));
    assert_eq!(by_id("AUTH-002").status, Status::Pass);
    assert_eq!(by_id("AUTH-003").status, Status::Pass);
    // No interactive terminal under the test runner.
    assert_eq!(by_id("AUTH-004").status, Status::Skip);
}

#[tokio::test]
async fn test_auth_suite_without_auth_requirement() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let suite = AuthSuite::new(&server.uri(), "mcp-probe", 8765, Duration::from_secs(5));
    let result = suite.run().await;

    let auth_001 = result.checks.iter().find(|c| c.id == "AUTH-001").unwrap();
    assert_eq!(auth_001.status, Status::Info);
    assert!(auth_001.details.as_deref().unwrap().contains("not 401"));

    let auth_002 = result.checks.iter().find(|c| c.id == "AUTH-002").unwrap();
    assert_eq!(auth_002.status, Status::Fail);

    let auth_003 = result.checks.iter().find(|c| c.id == "AUTH-003").unwrap();
    assert_eq!(auth_003.status, Status::Skip);
}
