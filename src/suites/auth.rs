//! OAuth discovery and flow checks (AUTH-001..004).
//!
//! HTTP-only; runs before the handshake, talking to the server with its
//! own HTTP client rather than the probe's transport.

use std::io::IsTerminal;
use std::time::Duration;

use serde_json::Value;

use crate::error::ProbeResult;
use crate::harness::{CheckSpec, Harness, Outcome};
use crate::oauth::{discover_oauth_metadata, discover_protected_resource, perform_oauth_flow};
use crate::types::{Severity, SuiteResult};

const AUTH_001: CheckSpec = CheckSpec {
    id: "AUTH-001",
    description: "Server returns 401 with WWW-Authenticate",
    severity: Severity::Info,
};
const AUTH_002: CheckSpec = CheckSpec {
    id: "AUTH-002",
    description: "Protected Resource Metadata discovery",
    severity: Severity::Info,
};
const AUTH_003: CheckSpec = CheckSpec {
    id: "AUTH-003",
    description: "OAuth Authorization Server Metadata discovery",
    severity: Severity::Info,
};
const AUTH_004: CheckSpec = CheckSpec {
    id: "AUTH-004",
    description: "Full OAuth flow with Bearer token",
    severity: Severity::Error,
};

pub struct AuthSuite {
    server_url: String,
    client_id: String,
    redirect_port: u16,
    timeout: Duration,
    http: reqwest::Client,
    auth_server: Option<String>,
}

impl AuthSuite {
    pub const NAME: &'static str = "auth";

    #[must_use]
    pub fn new(server_url: &str, client_id: &str, redirect_port: u16, timeout: Duration) -> Self {
        Self {
            server_url: server_url.to_string(),
            client_id: client_id.to_string(),
            redirect_port,
            timeout,
            http: reqwest::Client::new(),
            auth_server: None,
        }
    }

    pub async fn run(mut self) -> SuiteResult {
        let mut harness = Harness::new(Self::NAME);
        harness.run(&AUTH_001, self.check_auth_001()).await;
        harness.run(&AUTH_002, self.check_auth_002()).await;
        harness.run(&AUTH_003, self.check_auth_003()).await;
        harness.run(&AUTH_004, self.check_auth_004()).await;
        harness.finish()
    }

    async fn post_no_auth(&self) -> ProbeResult<(u16, Option<String>)> {
        let response = self
            .http
            .post(&self.server_url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .body("{}")
            .send()
            .await?;
        let www_auth = response
            .headers()
            .get("WWW-Authenticate")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok((response.status().as_u16(), www_auth))
    }

    async fn check_auth_001(&mut self) -> ProbeResult<Outcome> {
        let (status, www_auth) = self.post_no_auth().await?;
        if status != 401 {
            return Ok(Outcome::info(format!(
                "Server returned {status}, not 401 (no auth required)"
            )));
        }
        match www_auth {
            Some(value) if value.contains("Bearer") => {
                let preview: String = value.chars().take(100).collect();
                Ok(Outcome::pass_with(format!(
                    "401 with WWW-Authenticate: {preview}"
                )))
            }
            Some(value) => {
                let preview: String = value.chars().take(100).collect();
                Ok(Outcome::info(format!(
                    "401 with WWW-Authenticate but no Bearer: {preview}"
                )))
            }
            None => Ok(Outcome::info("401 without WWW-Authenticate header")),
        }
    }

    async fn check_auth_002(&mut self) -> ProbeResult<Outcome> {
        let Some(meta) = discover_protected_resource(&self.server_url).await else {
            return Ok(Outcome::fail(
                "Protected Resource Metadata endpoint unavailable or invalid JSON",
            ));
        };
        let Some(auth_servers) = meta
            .get("authorization_servers")
            .and_then(Value::as_array)
            .filter(|servers| !servers.is_empty())
        else {
            let keys: Vec<&str> = meta
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            return Ok(Outcome::fail(format!(
                "authorization_servers missing or empty: {keys:?}"
            )));
        };
        let first = auth_servers[0].as_str().unwrap_or_default().to_string();
        let count = auth_servers.len();
        self.auth_server = Some(first.clone());
        Ok(Outcome::pass_with(format!(
            "Found {count} authorization server(s): {first}"
        )))
    }

    async fn check_auth_003(&mut self) -> ProbeResult<Outcome> {
        let Some(auth_server) = self.auth_server.clone() else {
            return Ok(Outcome::skip(
                "No authorization server discovered (AUTH-002 did not run or failed)",
            ));
        };
        let Some(meta) = discover_oauth_metadata(&auth_server).await else {
            return Ok(Outcome::fail(format!(
                "OAuth metadata unavailable for {auth_server}"
            )));
        };
        let auth_ep = meta.get("authorization_endpoint").and_then(Value::as_str);
        let token_ep = meta.get("token_endpoint").and_then(Value::as_str);
        let Some(auth_ep) = auth_ep.filter(|s| !s.is_empty()) else {
            return Ok(Outcome::fail(
                "Missing authorization_endpoint in OAuth metadata",
            ));
        };
        let Some(token_ep) = token_ep.filter(|s| !s.is_empty()) else {
            return Ok(Outcome::fail("Missing token_endpoint in OAuth metadata"));
        };
        Ok(Outcome::pass_with(format!(
            "authorization_endpoint={auth_ep}, token_endpoint={token_ep}"
        )))
    }

    async fn check_auth_004(&mut self) -> ProbeResult<Outcome> {
        if !std::io::stdin().is_terminal() {
            return Ok(Outcome::skip(
                "Non-interactive terminal, cannot perform OAuth flow",
            ));
        }
        if self.auth_server.is_none() {
            return Ok(Outcome::skip("No authorization server discovered"));
        }
        let token = match perform_oauth_flow(&self.server_url, &self.client_id, self.redirect_port)
            .await
        {
            Ok(token) => token,
            Err(e) => return Ok(Outcome::fail(format!("OAuth flow failed: {e}"))),
        };

        let response = self
            .http
            .post(&self.server_url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {token}"))
            .body("{}")
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 401 {
            return Ok(Outcome::fail(
                "Still 401 after OAuth flow - token not accepted",
            ));
        }
        Ok(Outcome::pass_with(format!(
            "Authenticated request returned {status}"
        )))
    }
}
