//! Centralized error type for the probe.
//!
//! Checks react differently to different transport failures (a timeout can
//! be a PASS for one check and a FAIL for another), so the taxonomy is
//! carried in the type rather than flattened to strings.

use thiserror::Error;

/// Result type alias using [`ProbeError`].
pub type ProbeResult<T> = Result<T, ProbeError>;

/// All failure conditions surfaced to checks and the top-level entry point.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The peer closed the connection (child EOF, socket shutdown).
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// A `receive` or request did not complete within its timeout.
    #[error("timed out after {0:.1}s")]
    Timeout(f64),

    /// Network-level failure (DNS, refused connection, non-401 HTTP error).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered HTTP 401; authentication is required.
    #[error("authentication required: {0}")]
    AuthRequired(String),

    /// The response body could not be decoded as JSON.
    #[error("invalid JSON in response: {0}")]
    InvalidJson(String),

    /// An operation was attempted on a transport that is not running.
    #[error("transport not started")]
    NotStarted,

    /// OAuth flow failure (discovery, callback, token exchange).
    #[error("oauth: {0}")]
    Oauth(String),

    /// Invalid configuration detected before the run (exit code 2).
    #[error("{0}")]
    Config(String),
}

impl ProbeError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    #[must_use]
    pub fn is_connection_closed(&self) -> bool {
        matches!(self, Self::ConnectionClosed(_))
    }

    #[must_use]
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired(_))
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        Self::ConnectionClosed(err.to_string())
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(0.0)
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}
