//! The gateway's HTTP surface.
//!
//! Every inbound request funnels through the fallback handler and the gate;
//! the two `/__offline` routes form the out-of-band control surface the
//! deployed registration script drives (status polling and skip-waiting
//! rollout).

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use canemap_core::{
    CacheStorage, ConnectedClients, FetchOutcome, GateRequest, GateResponse, Network, OfflineCacheGate,
    RequestMode, WorkerState,
};

use crate::error::GatewayError;

/// Shared handles for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<OfflineCacheGate>,
    pub network: Arc<dyn Network>,
    pub store: Arc<dyn CacheStorage>,
    pub clients: Arc<ConnectedClients>,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/__offline/status", get(status))
        .route("/__offline/message", post(message))
        .fallback(proxy)
        .with_state(state)
}

/// Offline-support status, the gateway counterpart of the page-side
/// update notifications.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: String,
    pub generation: String,
    pub ready: bool,
    pub entries: u64,
    pub clients: usize,
}

async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    let entries = state
        .store
        .count_entries(state.gate.generation())
        .await
        .unwrap_or_default();

    Json(StatusReport {
        state: state.gate.state().to_string(),
        generation: state.gate.generation().to_string(),
        ready: state.gate.ready(),
        entries,
        clients: state.clients.len(),
    })
}

async fn message(State(state): State<AppState>, Json(payload): Json<serde_json::Value>) -> StatusCode {
    state.gate.on_message(&payload);

    // skip-waiting on an installed generation activates it right away
    if state.gate.ready() && state.gate.state() != WorkerState::Active {
        if let Err(err) = state.gate.on_activate().await {
            tracing::warn!(%err, "activation after skip-waiting failed");
        }
    }

    StatusCode::ACCEPTED
}

async fn proxy(State(state): State<AppState>, request: Request) -> Result<Response, GatewayError> {
    let gate_request = into_gate_request(request).await?;

    match state.gate.on_fetch(&gate_request).await {
        FetchOutcome::Respond(response) => Ok(into_http_response(response)),
        FetchOutcome::Passthrough => {
            let upstream = state.network.fetch(&gate_request).await?;
            Ok(into_http_response(upstream))
        }
    }
}

async fn into_gate_request(request: Request) -> Result<GateRequest, GatewayError> {
    let (parts, body) = request.into_parts();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let mode = detect_mode(&parts.headers);
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| GatewayError::BadRequest(format!("unreadable request body: {e}")))?;

    Ok(GateRequest { method: parts.method.as_str().to_string(), path, mode, headers, body })
}

/// Navigation detection from wire-visible headers.
///
/// Browsers mark full-page loads with `Sec-Fetch-Mode: navigate`; older
/// clients are recognized by an Accept header preferring HTML.
fn detect_mode(headers: &HeaderMap) -> RequestMode {
    if let Some(mode) = headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) {
        return if mode.eq_ignore_ascii_case("navigate") { RequestMode::Navigate } else { RequestMode::Subresource };
    }

    let accepts_html = headers
        .get("accept")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));
    if accepts_html { RequestMode::Navigate } else { RequestMode::Subresource }
}

fn into_http_response(response: GateResponse) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));

    for (name, value) in &response.headers {
        if !matches!(
            name.to_ascii_lowercase().as_str(),
            "connection" | "transfer-encoding" | "content-length"
        ) {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }

    builder
        .body(Body::from(response.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use canemap_core::{CacheDb, ClientRegistry, GateConfig, NetworkError};
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    struct ScriptedNetwork {
        routes: HashMap<String, String>,
        offline: AtomicBool,
    }

    impl ScriptedNetwork {
        fn serving(paths: &[&str]) -> Self {
            let routes = paths
                .iter()
                .map(|path| ((*path).to_string(), format!("live:{path}")))
                .collect();
            Self { routes, offline: AtomicBool::new(false) }
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Network for ScriptedNetwork {
        async fn fetch(&self, request: &GateRequest) -> Result<GateResponse, NetworkError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(NetworkError::Unreachable("offline".to_string()));
            }
            match self.routes.get(request.pathname()) {
                Some(body) => Ok(GateResponse {
                    status: 200,
                    status_text: "OK".to_string(),
                    headers: vec![("Content-Type".to_string(), "text/html".to_string())],
                    body: Bytes::from(body.clone()),
                }),
                None => Ok(GateResponse {
                    status: 404,
                    status_text: "Not Found".to_string(),
                    headers: Vec::new(),
                    body: Bytes::new(),
                }),
            }
        }
    }

    fn gate_config(pages: &[&str]) -> GateConfig {
        GateConfig {
            generation: "canemap-offline-v2".to_string(),
            offline_pages: pages.iter().map(|p| (*p).to_string()).collect(),
            excluded_marker: "handler".to_string(),
            managed_markers: ["/Worker/", "/Driver/", "/Common/"].map(String::from).to_vec(),
        }
    }

    async fn app_state(pages: &[&str], network: ScriptedNetwork) -> (AppState, Arc<ScriptedNetwork>) {
        let network = Arc::new(network);
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let clients = Arc::new(ConnectedClients::new());
        let gate = Arc::new(OfflineCacheGate::new(
            gate_config(pages),
            Arc::clone(&store) as Arc<dyn CacheStorage>,
            Arc::clone(&network) as Arc<dyn Network>,
            Arc::clone(&clients) as Arc<dyn ClientRegistry>,
        ));
        let state = AppState {
            gate,
            network: Arc::clone(&network) as Arc<dyn Network>,
            store: store as Arc<dyn CacheStorage>,
            clients,
        };
        (state, network)
    }

    async fn body_bytes(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_status_reports_active_gate() {
        let (state, _network) = app_state(&[], ScriptedNetwork::serving(&[])).await;
        state.gate.on_install().await.unwrap();
        state.gate.on_activate().await.unwrap();
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/__offline/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let report: StatusReport = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(report.state, "active");
        assert_eq!(report.generation, "canemap-offline-v2");
        assert_eq!(report.entries, 0);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_activates_installed_gate() {
        let (state, _network) = app_state(&[], ScriptedNetwork::serving(&[])).await;
        state.gate.on_install().await.unwrap();
        assert_eq!(state.gate.state(), WorkerState::Installed);
        let gate = Arc::clone(&state.gate);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/__offline/message")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"SKIP_WAITING"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(gate.state(), WorkerState::Active);
    }

    #[tokio::test]
    async fn test_offline_managed_navigation_gets_503_page() {
        let (state, network) = app_state(&[], ScriptedNetwork::serving(&[])).await;
        state.gate.on_install().await.unwrap();
        state.gate.on_activate().await.unwrap();
        network.set_offline(true);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/frontend/Driver/Driver_Dashboard.html")
                    .header("accept", "text/html,application/xhtml+xml")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_bytes(response).await.as_ref(), b"Offline - Page not available");
    }

    #[tokio::test]
    async fn test_excluded_path_proxies_to_upstream() {
        let (state, _network) =
            app_state(&[], ScriptedNetwork::serving(&["/frontend/Handler/lobby.html"])).await;
        state.gate.on_install().await.unwrap();
        state.gate.on_activate().await.unwrap();
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/frontend/Handler/lobby.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.as_ref(), b"live:/frontend/Handler/lobby.html");
    }

    #[tokio::test]
    async fn test_offline_passthrough_maps_to_bad_gateway() {
        let (state, network) = app_state(&[], ScriptedNetwork::serving(&[])).await;
        state.gate.on_install().await.unwrap();
        state.gate.on_activate().await.unwrap();
        network.set_offline(true);
        let app = router(state);

        // unmarked path: the gate passes through, and the dead upstream
        // surfaces as a gateway error rather than an offline page
        let response = app
            .oneshot(Request::builder().uri("/frontend/lobby.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_detect_mode_sec_fetch() {
        let mut headers = HeaderMap::new();
        headers.insert("sec-fetch-mode", "navigate".parse().unwrap());
        assert_eq!(detect_mode(&headers), RequestMode::Navigate);

        headers.insert("sec-fetch-mode", "no-cors".parse().unwrap());
        assert_eq!(detect_mode(&headers), RequestMode::Subresource);
    }

    #[test]
    fn test_detect_mode_accept_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("accept", "text/html,application/xhtml+xml".parse().unwrap());
        assert_eq!(detect_mode(&headers), RequestMode::Navigate);

        headers.insert("accept", "*/*".parse().unwrap());
        assert_eq!(detect_mode(&headers), RequestMode::Subresource);

        assert_eq!(detect_mode(&HeaderMap::new()), RequestMode::Subresource);
    }
}
