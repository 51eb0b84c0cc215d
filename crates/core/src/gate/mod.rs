//! The offline cache gate lifecycle.
//!
//! Reimplements the CaneMap service worker contract as an explicit lifecycle
//! object: `Installing -> Installed -> Activating -> Active`, with the four
//! hooks the hosting runtime fires (install, activate, fetch, message).
//! Collaborators arrive through the [`CacheStorage`], [`Network`], and
//! [`ClientRegistry`] seams so every transition is testable in-process.

pub mod decision;
mod strategy;

pub use decision::InterceptDecision;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use crate::cache::{CacheStorage, CachedResponse};
use crate::clients::ClientRegistry;
use crate::net::{GateRequest, GateResponse, Network, RequestMode};
use crate::Error;

/// Lifecycle states of one cache generation's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Active,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Active => write!(f, "active"),
        }
    }
}

/// Immutable configuration handed to the gate at construction.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Name of the generation this gate installs and serves.
    pub generation: String,
    /// Essential pages warmed at install time, in order.
    pub offline_pages: Vec<String>,
    /// Case-insensitive path marker that excludes a request entirely.
    pub excluded_marker: String,
    /// Path segments opting a GET into the managed strategy.
    pub managed_markers: Vec<String>,
}

/// Out-of-band control payload. Exactly one shape is recognized.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

/// Result of running one request through the gate.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Forward to the network untouched; the gate took no part.
    Passthrough,
    /// The gate produced the response, live or cached or synthesized.
    Respond(GateResponse),
}

/// The offline cache gate.
///
/// One instance per cache generation. Holds no shared mutable state beyond
/// its lifecycle flags; every cache mutation goes through the store seam.
pub struct OfflineCacheGate {
    config: GateConfig,
    store: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    clients: Arc<dyn ClientRegistry>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl OfflineCacheGate {
    pub fn new(
        config: GateConfig,
        store: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        clients: Arc<dyn ClientRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            network,
            clients,
            state: RwLock::new(WorkerState::Installing),
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().expect("gate state poisoned")
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write().expect("gate state poisoned") = state;
    }

    pub fn generation(&self) -> &str {
        &self.config.generation
    }

    /// Whether a skip-waiting instruction has been received or implied.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether the installed generation is eligible for immediate activation.
    pub fn ready(&self) -> bool {
        self.state() == WorkerState::Installed && self.skip_waiting_requested()
    }

    /// Classify a request without running the strategy.
    pub fn classify(&self, request: &GateRequest) -> InterceptDecision {
        decision::classify(&self.config, &request.method, request.pathname())
    }

    /// Install hook: warm every essential page into this generation.
    ///
    /// All-or-nothing: any unreachable or non-OK page fails the attempt and
    /// leaves the store untouched, so a previously active generation remains
    /// authoritative. Success signals immediate readiness, skipping any
    /// waiting period.
    pub async fn on_install(&self) -> Result<(), Error> {
        self.set_state(WorkerState::Installing);
        tracing::info!(generation = %self.config.generation, pages = self.config.offline_pages.len(), "installing offline cache");

        let mut entries = Vec::with_capacity(self.config.offline_pages.len());
        for page in &self.config.offline_pages {
            let request = GateRequest::get(page.clone(), RequestMode::Subresource);
            let response = self
                .network
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed { url: page.clone(), reason: e.to_string() })?;
            if !response.is_ok_class() {
                return Err(Error::InstallFailed { url: page.clone(), reason: format!("status {}", response.status) });
            }
            entries.push(CachedResponse::from_response(page, &response));
        }

        self.store.insert_all(&self.config.generation, entries).await?;

        self.set_state(WorkerState::Installed);
        self.skip_waiting.store(true, Ordering::SeqCst);
        tracing::info!(generation = %self.config.generation, "offline cache installed");
        Ok(())
    }

    /// Activate hook: garbage-collect stale generations and claim clients.
    ///
    /// Deletions are independent per generation; a failure is logged and the
    /// sweep continues. After cleanup the gate takes control of open client
    /// contexts and becomes active.
    pub async fn on_activate(&self) -> Result<(), Error> {
        if self.state() != WorkerState::Installed {
            return Err(Error::InvalidState { expected: "installed", found: self.state().to_string() });
        }
        self.set_state(WorkerState::Activating);

        let names = self.store.list_generations().await?;
        for name in names.iter().filter(|name| **name != self.config.generation) {
            match self.store.delete_generation(name).await {
                Ok(removed) => {
                    tracing::info!(generation = %name, removed, "deleted stale cache generation");
                }
                Err(err) => {
                    tracing::warn!(generation = %name, %err, "failed to delete stale cache generation");
                }
            }
        }

        let claimed = self.clients.claim().await;
        self.set_state(WorkerState::Active);
        tracing::info!(generation = %self.config.generation, claimed, "offline cache gate active");
        Ok(())
    }

    /// Fetch hook: decide whether the gate participates, and answer if so.
    ///
    /// Excluded and passthrough requests never touch the store or the
    /// gate's network path. Until activation completes, everything passes
    /// through.
    pub async fn on_fetch(&self, request: &GateRequest) -> FetchOutcome {
        if self.state() != WorkerState::Active {
            return FetchOutcome::Passthrough;
        }

        match self.classify(request) {
            InterceptDecision::Excluded | InterceptDecision::Passthrough => FetchOutcome::Passthrough,
            InterceptDecision::Managed => FetchOutcome::Respond(
                strategy::network_first(
                    self.store.as_ref(),
                    self.network.as_ref(),
                    &self.config.generation,
                    request,
                )
                .await,
            ),
        }
    }

    /// Message hook: one recognized payload, `{"type": "SKIP_WAITING"}`.
    ///
    /// Anything else is ignored.
    pub fn on_message(&self, payload: &serde_json::Value) {
        match serde_json::from_value::<ControlMessage>(payload.clone()) {
            Ok(ControlMessage::SkipWaiting) => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::debug!(generation = %self.config.generation, "skip-waiting requested");
            }
            Err(_) => {
                tracing::debug!("ignoring unrecognized control message");
            }
        }
    }
}
