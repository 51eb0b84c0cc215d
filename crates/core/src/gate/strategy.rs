//! Network-first fetch strategy with cache fallback.
//!
//! The live network is always tried first. A fully-OK live response
//! opportunistically refreshes the cache on its way out; a failed fetch falls
//! back to the stored copy, and a miss on top of that synthesizes a 503
//! whose shape depends on the request mode.

use bytes::Bytes;

use crate::cache::{CacheStorage, CachedResponse};
use crate::net::{GateRequest, GateResponse, Network, RequestMode};

const OFFLINE_PAGE_BODY: &str = "Offline - Page not available";
const OFFLINE_RESOURCE_BODY: &str = "Offline";

/// Run one managed request through the network-first strategy.
///
/// Never fails: every network or cache error resolves to some response.
pub(super) async fn network_first(
    store: &dyn CacheStorage,
    network: &dyn Network,
    generation: &str,
    request: &GateRequest,
) -> GateResponse {
    match network.fetch(request).await {
        Ok(response) => {
            if response.is_fully_ok() {
                let entry = CachedResponse::from_response(&request.path, &response);
                // a failed write never alters the delivered response
                if let Err(err) = store.put(generation, entry).await {
                    tracing::debug!(url = %request.path, %err, "cache refresh failed");
                }
            }
            response
        }
        Err(err) => {
            tracing::debug!(url = %request.path, %err, "network fetch failed, falling back to cache");
            match store.get(generation, &request.path).await {
                Ok(Some(entry)) => {
                    tracing::info!(url = %request.path, "serving from offline cache");
                    entry.into_response()
                }
                Ok(None) => offline_response(request.mode),
                Err(err) => {
                    tracing::warn!(url = %request.path, %err, "cache lookup failed while offline");
                    offline_response(request.mode)
                }
            }
        }
    }
}

/// Deterministic 503 served when neither network nor cache can answer.
pub(super) fn offline_response(mode: RequestMode) -> GateResponse {
    match mode {
        RequestMode::Navigate => GateResponse {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: Bytes::from_static(OFFLINE_PAGE_BODY.as_bytes()),
        },
        RequestMode::Subresource => GateResponse {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            headers: Vec::new(),
            body: Bytes::from_static(OFFLINE_RESOURCE_BODY.as_bytes()),
        },
    }
}
