//! Transport layer: framing and deframing JSON-RPC messages over a child
//! process's standard streams or streaming HTTP.

pub mod http;
pub mod sse;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use std::time::Duration;

use serde_json::Value;

use crate::error::ProbeResult;

/// Wire-level operations every transport provides.
///
/// `receive` always carries an explicit timeout; expiry surfaces as
/// [`crate::error::ProbeError::Timeout`] for the caller to interpret.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Starts the transport (spawns the child process or marks the HTTP
    /// session live).
    async fn start(&mut self) -> ProbeResult<()>;

    /// Sends one JSON-RPC message.
    async fn send(&mut self, message: &Value) -> ProbeResult<()>;

    /// Receives the next message, waiting at most `timeout`.
    async fn receive(&mut self, timeout: Duration) -> ProbeResult<Value>;

    /// Tears the transport down, releasing any OS resources.
    async fn stop(&mut self) -> ProbeResult<()>;

    /// Whether the transport is between `start` and `stop`.
    fn is_running(&self) -> bool;
}

/// The two concrete transports, unified for ownership by the client.
///
/// Checks that must reach transport internals (signal the child, inject
/// raw bytes) match on the variant instead of downcasting.
pub enum ProbeTransport {
    Stdio(StdioTransport),
    Http(HttpTransport),
}

impl ProbeTransport {
    /// Transport name as it appears in reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stdio(_) => "stdio",
            Self::Http(_) => "http",
        }
    }

    #[must_use]
    pub fn as_stdio_mut(&mut self) -> Option<&mut StdioTransport> {
        match self {
            Self::Stdio(t) => Some(t),
            Self::Http(_) => None,
        }
    }
}

impl Transport for ProbeTransport {
    async fn start(&mut self) -> ProbeResult<()> {
        match self {
            Self::Stdio(t) => t.start().await,
            Self::Http(t) => t.start().await,
        }
    }

    async fn send(&mut self, message: &Value) -> ProbeResult<()> {
        match self {
            Self::Stdio(t) => t.send(message).await,
            Self::Http(t) => t.send(message).await,
        }
    }

    async fn receive(&mut self, timeout: Duration) -> ProbeResult<Value> {
        match self {
            Self::Stdio(t) => t.receive(timeout).await,
            Self::Http(t) => t.receive(timeout).await,
        }
    }

    async fn stop(&mut self) -> ProbeResult<()> {
        match self {
            Self::Stdio(t) => t.stop().await,
            Self::Http(t) => t.stop().await,
        }
    }

    fn is_running(&self) -> bool {
        match self {
            Self::Stdio(t) => t.is_running(),
            Self::Http(t) => t.is_running(),
        }
    }
}

/// Recipe for constructing fresh transports.
///
/// The lifecycle suite needs pristine connections for its pre-initialize
/// and double-initialize probes, so construction is repeatable rather than
/// a one-shot.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    Stdio {
        command: String,
    },
    Http {
        url: String,
        headers: Vec<(String, String)>,
        timeout: Duration,
    },
}

impl TransportConfig {
    /// Builds a new, unstarted transport from this recipe.
    #[must_use]
    pub fn build(&self) -> ProbeTransport {
        match self {
            Self::Stdio { command } => ProbeTransport::Stdio(StdioTransport::new(command)),
            Self::Http {
                url,
                headers,
                timeout,
            } => ProbeTransport::Http(HttpTransport::new(url, headers.clone(), *timeout)),
        }
    }

    /// Target string for report headers.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Stdio { command } => command,
            Self::Http { url, .. } => url,
        }
    }
}
