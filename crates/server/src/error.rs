//! Structured errors for the gateway's own surface.
//!
//! Managed requests never produce these: the gate resolves every failure to
//! a response itself. Only the passthrough path and malformed inbound
//! requests surface here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use canemap_core::NetworkError;

/// Structured errors for the gateway server.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The inbound request could not be represented for the upstream.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    /// A passthrough fetch to the upstream failed.
    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    Upstream(#[from] NetworkError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}
