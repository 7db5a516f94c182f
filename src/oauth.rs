//! OAuth 2.1 helper: PKCE, metadata discovery, and the browser-redirect
//! authorization-code flow.
//!
//! The flow is the standard loopback dance:
//!
//! 1. Discover the protected-resource and authorization-server metadata
//! 2. Generate a PKCE challenge and a random state
//! 3. Start a one-shot local callback server
//! 4. Open the browser to the authorization URL
//! 5. Wait for the callback with the authorization code
//! 6. Exchange the code for an access token
//!
//! Its interface to the probe core is a single operation:
//! [`perform_oauth_flow`] returns a bearer token.

use std::time::Duration;

use base64::engine::{general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::prelude::*;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tiny_http::{Response, Server};
use tracing::{debug, info, warn};

use crate::error::{ProbeError, ProbeResult};

/// Length of the PKCE code verifier in bytes (before base64 encoding).
const VERIFIER_LENGTH: usize = 32;

/// Length of the state parameter in bytes (before base64 encoding).
const STATE_LENGTH: usize = 16;

/// Timeout for waiting for the OAuth callback.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the discovery requests.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// PKCE challenge for OAuth 2.1 authorization.
///
/// The verifier stays with the client; the S256 challenge goes to the
/// authorization server.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    verifier: String,
    challenge: String,
}

impl PkceChallenge {
    /// Generates a new challenge from a cryptographically random verifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_urlsafe_token(VERIFIER_LENGTH))
    }

    /// Builds the challenge for an existing verifier.
    #[must_use]
    pub fn from_verifier(verifier: String) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(hasher.finalize());
        Self {
            verifier,
            challenge,
        }
    }

    #[must_use]
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    #[must_use]
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

/// Generates a random URL-safe token of `len` bytes of entropy.
fn generate_urlsafe_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Fetches `/.well-known/oauth-protected-resource` for the server's
/// origin. Returns `None` on any failure.
pub async fn discover_protected_resource(server_url: &str) -> Option<Value> {
    let parsed = reqwest::Url::parse(server_url).ok()?;
    let origin = format!(
        "{}://{}",
        parsed.scheme(),
        parsed.host_str()?.to_string()
            + &parsed.port().map(|p| format!(":{p}")).unwrap_or_default()
    );
    let well_known = format!("{origin}/.well-known/oauth-protected-resource");
    fetch_json(&well_known).await
}

/// Fetches the authorization server's
/// `/.well-known/oauth-authorization-server` metadata.
pub async fn discover_oauth_metadata(auth_server_url: &str) -> Option<Value> {
    let url = format!(
        "{}/.well-known/oauth-authorization-server",
        auth_server_url.trim_end_matches('/')
    );
    fetch_json(&url).await
}

async fn fetch_json(url: &str) -> Option<Value> {
    let client = reqwest::Client::new();
    let response = match client.get(url).timeout(DISCOVERY_TIMEOUT).send().await {
        Ok(response) if response.status().is_success() => response,
        _ => {
            debug!("discovery request failed for {url}");
            return None;
        }
    };
    match response.json().await {
        Ok(value) => Some(value),
        Err(_) => {
            debug!("discovery response at {url} is not valid JSON");
            None
        }
    }
}

/// Runs the full authorization-code flow with PKCE and returns the
/// access token.
pub async fn perform_oauth_flow(
    server_url: &str,
    client_id: &str,
    redirect_port: u16,
) -> ProbeResult<String> {
    let pr_meta = discover_protected_resource(server_url)
        .await
        .ok_or_else(|| {
            ProbeError::Oauth(format!(
                "could not discover Protected Resource Metadata for {server_url}"
            ))
        })?;
    let auth_server = pr_meta["authorization_servers"][0]
        .as_str()
        .ok_or_else(|| {
            ProbeError::Oauth("no authorization_servers in Protected Resource Metadata".to_string())
        })?
        .to_string();

    let oauth_meta = discover_oauth_metadata(&auth_server).await.ok_or_else(|| {
        ProbeError::Oauth(format!(
            "could not discover OAuth Server Metadata for {auth_server}"
        ))
    })?;
    let authorization_endpoint = oauth_meta["authorization_endpoint"]
        .as_str()
        .ok_or_else(|| {
            ProbeError::Oauth("OAuth metadata missing authorization_endpoint".to_string())
        })?;
    let token_endpoint = oauth_meta["token_endpoint"]
        .as_str()
        .ok_or_else(|| ProbeError::Oauth("OAuth metadata missing token_endpoint".to_string()))?
        .to_string();

    let pkce = PkceChallenge::generate();
    let state = generate_urlsafe_token(STATE_LENGTH);
    let redirect_uri = format!("http://localhost:{redirect_port}/callback");

    let auth_url = format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&code_challenge={}&code_challenge_method={}&state={}&resource={}&scope=mcp",
        authorization_endpoint,
        urlencoding::encode(client_id),
        urlencoding::encode(&redirect_uri),
        urlencoding::encode(pkce.challenge()),
        pkce.challenge_method(),
        urlencoding::encode(&state),
        urlencoding::encode(server_url),
    );

    if webbrowser::open(&auth_url).is_err() {
        warn!("failed to open browser automatically");
        println!("\nOpen this URL in your browser to authenticate:\n{auth_url}\n");
    } else {
        info!("opened browser for authorization");
    }

    let (code, callback_state) = wait_for_callback(redirect_port).await?;
    if callback_state != state {
        return Err(ProbeError::Oauth(format!(
            "state mismatch: expected {state}, got {callback_state}"
        )));
    }

    exchange_code(
        &token_endpoint,
        client_id,
        &code,
        pkce.verifier(),
        &redirect_uri,
        server_url,
    )
    .await
}

/// Waits for the single authorization callback on the loopback server.
async fn wait_for_callback(port: u16) -> ProbeResult<(String, String)> {
    let server = Server::http(format!("127.0.0.1:{port}")).map_err(|e| {
        ProbeError::Oauth(format!("failed to start callback server on port {port}: {e}"))
    })?;
    let (tx, rx) = tokio::sync::oneshot::channel();

    // tiny_http blocks, so the single-request accept loop lives on its
    // own thread.
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            let url = request.url().to_string();
            if let Some(code) = query_param(&url, "code") {
                let state = query_param(&url, "state").unwrap_or_default();
                let response = Response::from_string(
                    "<html><body><h1>Authorization complete.</h1><p>You can close this tab.</p></body></html>",
                )
                .with_header(
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..])
                        .expect("static header"),
                );
                let _ = request.respond(response);
                let _ = tx.send(Ok((code, state)));
                return;
            } else if let Some(error) = query_param(&url, "error") {
                let response = Response::from_string(format!(
                    "<html><body><h1>Authorization failed</h1><p>{error}</p></body></html>"
                ));
                let _ = request.respond(response);
                let _ = tx.send(Err(ProbeError::Oauth(format!("authorization error: {error}"))));
                return;
            }
            let _ = request.respond(Response::from_string("Not found").with_status_code(404));
        }
    });

    tokio::select! {
        result = rx => {
            result.map_err(|_| ProbeError::Oauth("callback server channel closed".to_string()))?
        }
        () = tokio::time::sleep(CALLBACK_TIMEOUT) => {
            Err(ProbeError::Oauth(format!(
                "no authorization callback within {} seconds",
                CALLBACK_TIMEOUT.as_secs()
            )))
        }
    }
}

async fn exchange_code(
    token_endpoint: &str,
    client_id: &str,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
    resource: &str,
) -> ProbeResult<String> {
    let client = reqwest::Client::new();
    let response = client
        .post(token_endpoint)
        .timeout(Duration::from_secs(30))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", code_verifier),
            ("client_id", client_id),
            ("redirect_uri", redirect_uri),
            ("resource", resource),
        ])
        .send()
        .await
        .map_err(|e| ProbeError::Oauth(format!("token exchange failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ProbeError::Oauth(format!(
            "token exchange failed: HTTP {status} - {body}"
        )));
    }

    let token_json: Value = response
        .json()
        .await
        .map_err(|e| ProbeError::Oauth(format!("invalid token response: {e}")))?;
    token_json["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProbeError::Oauth("no access_token in token response".to_string()))
}

/// Extracts one query parameter from a callback request path.
fn query_param(url: &str, key: &str) -> Option<String> {
    url.split('?').nth(1)?.split('&').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name == key {
            Some(urlencoding::decode(value).ok()?.into_owned())
        } else {
            None
        }
    })
}
