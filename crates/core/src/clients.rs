//! Client contexts and the claim seam.
//!
//! Activation takes immediate control of already-open client contexts, no
//! reload required. The gate sees that through [`ClientRegistry`]; the
//! in-process [`ConnectedClients`] implementation is enough for the gateway,
//! which has no per-tab identity beyond what registers here.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Client-broadcast mechanism consumed by activation.
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Take control of every open client context. Returns how many are now
    /// controlled.
    async fn claim(&self) -> usize;
}

#[derive(Debug, Default)]
struct ClientSet {
    clients: HashSet<String>,
    controlled: bool,
}

/// In-memory registry of open client contexts.
#[derive(Debug, Default)]
pub struct ConnectedClients {
    inner: Mutex<ClientSet>,
}

impl ConnectedClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an open client context.
    pub fn register(&self, id: impl Into<String>) {
        let mut set = self.inner.lock().expect("client registry poisoned");
        set.clients.insert(id.into());
    }

    /// Whether a claim has taken control of the open contexts.
    pub fn is_controlled(&self) -> bool {
        self.inner.lock().expect("client registry poisoned").controlled
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("client registry poisoned").clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ClientRegistry for ConnectedClients {
    async fn claim(&self) -> usize {
        let mut set = self.inner.lock().expect("client registry poisoned");
        set.controlled = true;
        set.clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_controls_registered_clients() {
        let clients = ConnectedClients::new();
        clients.register("tab-1");
        clients.register("tab-2");
        assert!(!clients.is_controlled());

        let claimed = clients.claim().await;
        assert_eq!(claimed, 2);
        assert!(clients.is_controlled());
    }

    #[tokio::test]
    async fn test_claim_with_no_clients() {
        let clients = ConnectedClients::new();
        assert!(clients.is_empty());
        assert_eq!(clients.claim().await, 0);
        assert!(clients.is_controlled());
    }

    #[test]
    fn test_register_deduplicates() {
        let clients = ConnectedClients::new();
        clients.register("tab-1");
        clients.register("tab-1");
        assert_eq!(clients.len(), 1);
    }
}
