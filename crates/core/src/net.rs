//! The live network seam.
//!
//! The gate never talks to the wire directly; it sees the network through the
//! [`Network`] trait so lifecycle and strategy logic can be exercised against
//! scripted implementations. The production implementation lives in
//! `canemap-client`.

use async_trait::async_trait;
use bytes::Bytes;

/// Whether a request is a full-page load or a sub-resource fetch.
///
/// The distinction only changes the shape of the synthesized offline
/// fallback, never the caching strategy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Full-page navigation.
    Navigate,
    /// Script, stylesheet, image, or any other sub-resource.
    Subresource,
}

/// An outbound request as observed by the gate.
#[derive(Debug, Clone)]
pub struct GateRequest {
    /// Uppercase HTTP method.
    pub method: String,
    /// Absolute path with optional query string, e.g. `/frontend/Worker/Workers.html?tab=1`.
    pub path: String,
    pub mode: RequestMode,
    /// End-to-end request headers, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl GateRequest {
    /// Build a bare GET request for the given path.
    pub fn get(path: impl Into<String>, mode: RequestMode) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.into(),
            mode,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// The path component alone, with query string and fragment stripped.
    pub fn pathname(&self) -> &str {
        let end = self.path.find(['?', '#']).unwrap_or(self.path.len());
        &self.path[..end]
    }
}

/// A response flowing back through the gate, live or cached.
#[derive(Debug, Clone)]
pub struct GateResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl GateResponse {
    /// Whether the response may refresh the cache. Only a plain 200 qualifies.
    pub fn is_fully_ok(&self) -> bool {
        self.status == 200
    }

    /// Whether the response satisfies an install-time warm. Any 2xx qualifies.
    pub fn is_ok_class(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Error from the live network layer.
///
/// The managed strategy treats every variant the same way (fall back to the
/// cache); the variants exist for logging and for the gateway's passthrough
/// path, where the failure is surfaced to the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("upstream unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Live HTTP network layer: `fetch(request) -> response | network-failure`.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &GateRequest) -> Result<GateResponse, NetworkError>;
}
