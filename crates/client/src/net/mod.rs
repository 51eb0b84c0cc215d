//! Live HTTP implementation of the core `Network` seam.
//!
//! Resolves gateway paths against the configured upstream origin and carries
//! requests over reqwest. Upstream HTTP error statuses are not network
//! failures: they flow back through the gate as ordinary responses, and only
//! transport-level failures become [`NetworkError`].

pub mod origin;

pub use origin::{OriginError, UpstreamOrigin};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use canemap_core::{GateRequest, GateResponse, Network, NetworkError};

/// Configuration for the live network layer.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// User agent string (default: "canemap-gate/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { user_agent: "canemap-gate/0.1".to_string(), timeout: Duration::from_millis(20_000) }
    }
}

/// HTTP network layer talking to the upstream origin.
pub struct HttpNetwork {
    http: Client,
    origin: UpstreamOrigin,
    config: NetworkConfig,
}

impl HttpNetwork {
    /// Create a new network layer for the given origin.
    pub fn new(origin: UpstreamOrigin, config: NetworkConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| NetworkError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, origin, config })
    }

    pub fn origin(&self) -> &UpstreamOrigin {
        &self.origin
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &GateRequest) -> Result<GateResponse, NetworkError> {
        let start = Instant::now();

        let url = self
            .origin
            .resolve(&request.path)
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(format!("bad method: {e}")))?;

        let mut outbound = self.http.request(method, url.clone());
        for (name, value) in &request.headers {
            if is_end_to_end(name) {
                outbound = outbound.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            outbound = outbound.body(request.body.clone());
        }

        let response = outbound.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout(e.to_string())
            } else {
                NetworkError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::Unreachable(format!("failed to read response: {e}")))?;

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            ms = start.elapsed().as_millis() as u64,
            bytes = body.len(),
            "upstream fetch"
        );

        Ok(GateResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

/// Hop-by-hop headers stay on our side of the proxy.
fn is_end_to_end(name: &str) -> bool {
    !matches!(
        name.to_ascii_lowercase().as_str(),
        "host"
            | "connection"
            | "keep-alive"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
            | "content-length"
            | "accept-encoding"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.user_agent, "canemap-gate/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20_000));
    }

    #[test]
    fn test_http_network_new() {
        let origin = UpstreamOrigin::parse("https://canemap-system.web.app").unwrap();
        let network = HttpNetwork::new(origin, NetworkConfig::default());
        assert!(network.is_ok());
    }

    #[test]
    fn test_hop_by_hop_headers_filtered() {
        assert!(!is_end_to_end("Host"));
        assert!(!is_end_to_end("connection"));
        assert!(!is_end_to_end("Content-Length"));
        assert!(is_end_to_end("Accept"));
        assert!(is_end_to_end("Authorization"));
        assert!(is_end_to_end("Cookie"));
    }
}
