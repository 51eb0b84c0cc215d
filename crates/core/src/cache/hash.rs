//! Content-addressed cache entry keys.

use sha2::{Digest, Sha256};

/// Compute the storage key for a cached response.
///
/// Keys are scoped to a generation so the same URL cached under two
/// generations never collides.
pub fn compute_entry_key(generation: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(generation.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
