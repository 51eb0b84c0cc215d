//! Client code for the CaneMap offline gateway.
//!
//! This crate provides the live HTTP network layer: the reqwest-backed
//! implementation of the core `Network` seam, talking to the configured
//! upstream origin.

pub mod net;

pub use net::{HttpNetwork, NetworkConfig, OriginError, UpstreamOrigin};
