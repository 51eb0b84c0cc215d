//! SQLite-backed persistent store for offline cache generations.
//!
//! This module provides the named cache-store abstraction the gate runs
//! against, plus its production implementation over tokio-rusqlite:
//!
//! - Generation-scoped entries keyed by SHA-256 over (generation, URL)
//! - Atomic all-or-nothing batch insert for the install-time warm
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedResponse;

use async_trait::async_trait;

/// Persistent named cache-store abstraction.
///
/// Every call is independently atomic at single-key granularity; only
/// [`CacheStorage::insert_all`] spans multiple keys, as one transaction.
/// Implemented by [`CacheDb`] in production and by scripted stores in tests.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Store a batch of responses under one generation, atomically.
    async fn insert_all(&self, generation: &str, entries: Vec<CachedResponse>) -> Result<(), Error>;

    /// Look up the stored response for a URL in one generation.
    async fn get(&self, generation: &str, url: &str) -> Result<Option<CachedResponse>, Error>;

    /// Store or refresh a single response.
    async fn put(&self, generation: &str, entry: CachedResponse) -> Result<(), Error>;

    /// Every generation name currently present.
    async fn list_generations(&self) -> Result<Vec<String>, Error>;

    /// Delete one generation wholesale. Returns the number of removed entries.
    async fn delete_generation(&self, generation: &str) -> Result<u64, Error>;

    /// Number of entries stored under one generation.
    async fn count_entries(&self, generation: &str) -> Result<u64, Error>;
}
