//! Core types and shared functionality for the CaneMap offline gateway.
//!
//! This crate provides:
//! - The offline cache gate lifecycle (install, activate, fetch, message)
//! - Request classification and the network-first cache strategy
//! - The SQLite-backed generation store and its `CacheStorage` seam
//! - Configuration and unified error types

pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod gate;
pub mod net;

pub use cache::{CacheDb, CacheStorage, CachedResponse};
pub use clients::{ClientRegistry, ConnectedClients};
pub use config::AppConfig;
pub use error::Error;
pub use gate::{FetchOutcome, GateConfig, InterceptDecision, OfflineCacheGate, WorkerState};
pub use net::{GateRequest, GateResponse, Network, NetworkError, RequestMode};
