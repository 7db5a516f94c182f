//! Streaming HTTP transport.
//!
//! Each `send` is one POST; the response body may be a single JSON message
//! or an SSE stream carrying several. Decoded messages land in a FIFO
//! queue that `receive` drains. The `Mcp-Session-Id` header is adopted
//! from responses and echoed on every subsequent request.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{ProbeError, ProbeResult};
use crate::transport::sse::parse_sse_json_stream;
use crate::transport::Transport;

const SESSION_HEADER: &str = "Mcp-Session-Id";

pub struct HttpTransport {
    url: String,
    custom_headers: Vec<(String, String)>,
    timeout: Duration,
    client: reqwest::Client,
    session_id: Option<String>,
    pending_tx: mpsc::UnboundedSender<Value>,
    pending_rx: mpsc::UnboundedReceiver<Value>,
    running: bool,
}

impl HttpTransport {
    #[must_use]
    pub fn new<S: Into<String>>(
        url: S,
        custom_headers: Vec<(String, String)>,
        timeout: Duration,
    ) -> Self {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        Self {
            url: url.into(),
            custom_headers,
            timeout,
            client: reqwest::Client::new(),
            session_id: None,
            pending_tx,
            pending_rx,
            running: false,
        }
    }

    /// Session id assigned by the server, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn enqueue(&self, message: Value) {
        // The receiver lives on self, so the channel cannot be closed.
        let _ = self.pending_tx.send(message);
    }
}

impl Transport for HttpTransport {
    async fn start(&mut self) -> ProbeResult<()> {
        // No connection is opened up front; the first POST establishes
        // the session.
        self.running = true;
        Ok(())
    }

    async fn send(&mut self, message: &Value) -> ProbeResult<()> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");
        if let Some(session_id) = &self.session_id {
            request = request.header(SESSION_HEADER, session_id.as_str());
        }
        for (name, value) in &self.custom_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.json(message).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProbeError::AuthRequired(format!(
                "server returned 401 Unauthorized: {}",
                self.url
            )));
        }
        if !status.is_success() {
            return Err(ProbeError::Network(format!("HTTP {status}")));
        }

        if let Some(session_id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await?;

        if content_type.contains("text/event-stream") {
            for msg in parse_sse_json_stream(body.lines()) {
                self.enqueue(msg);
            }
        } else if content_type.contains("application/json") {
            let parsed: Value = serde_json::from_str(&body)?;
            self.enqueue(parsed);
        } else if !body.is_empty() {
            match serde_json::from_str(&body) {
                Ok(parsed) => self.enqueue(parsed),
                Err(_) => {
                    let preview: String = body.chars().take(200).collect();
                    debug!("unhandled content-type {content_type}, body: {preview}");
                }
            }
        }

        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> ProbeResult<Value> {
        match tokio::time::timeout(timeout, self.pending_rx.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(ProbeError::ConnectionClosed(
                "message queue closed".to_string(),
            )),
            Err(_) => Err(ProbeError::Timeout(timeout.as_secs_f64())),
        }
    }

    async fn stop(&mut self) -> ProbeResult<()> {
        self.running = false;
        let Some(session_id) = self.session_id.clone() else {
            return Ok(());
        };

        let mut request = self
            .client
            .delete(&self.url)
            .timeout(self.timeout)
            .header(SESSION_HEADER, session_id.as_str());
        for (name, value) in &self.custom_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        match request.send().await {
            Ok(response) if response.status() == reqwest::StatusCode::METHOD_NOT_ALLOWED => {
                debug!("server does not support session DELETE (405), ignoring");
            }
            Ok(response) if !response.status().is_success() => {
                debug!("session DELETE failed: HTTP {}", response.status());
            }
            Ok(_) => {}
            Err(e) => debug!("session DELETE failed: {e}"),
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
