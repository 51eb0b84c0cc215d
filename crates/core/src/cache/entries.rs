//! Cached response CRUD operations.
//!
//! One row per (generation, URL) pair. The install-time warm inserts the
//! whole essential set in a single transaction so a partial install never
//! becomes visible.

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::net::GateResponse;
use crate::{CacheStorage, Error};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response, scoped to the generation it was cached under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub fetched_at: String,
}

impl CachedResponse {
    /// Snapshot a live response for storage under `url`.
    pub fn from_response(url: &str, response: &GateResponse) -> Self {
        Self {
            url: url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body.to_vec(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rehydrate the stored response for delivery to the caller.
    pub fn into_response(self) -> GateResponse {
        GateResponse {
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            body: Bytes::from(self.body),
        }
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<CachedResponse, rusqlite::Error> {
    Ok(CachedResponse {
        url: row.get(0)?,
        status: row.get::<_, i64>(1)? as u16,
        status_text: row.get(2)?,
        headers: serde_json::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
        body: row.get(4)?,
        fetched_at: row.get(5)?,
    })
}

impl CacheDb {
    /// Insert or refresh a single cached response.
    ///
    /// Uses UPSERT semantics keyed on (generation, URL).
    pub async fn upsert_entry(&self, generation: &str, entry: CachedResponse) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                insert_one(conn, &generation, &entry)?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the cached response for a URL in one generation.
    ///
    /// Returns None when the URL was never cached under that generation.
    pub async fn get_entry(&self, generation: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        let key = compute_entry_key(generation, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedResponse>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, status_text, headers_json, body, fetched_at
                     FROM entries WHERE key = ?1",
                    params![key],
                    row_to_entry,
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert a batch of responses into one generation atomically.
    ///
    /// Either every entry lands or none do. Re-running with the same key set
    /// leaves the same final contents.
    pub async fn insert_entries(&self, generation: &str, entries: Vec<CachedResponse>) -> Result<(), Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for entry in &entries {
                    insert_one(&tx, &generation, entry)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// List every generation name present in the store.
    pub async fn list_generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT generation FROM entries ORDER BY generation")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one generation and every entry belonging to it.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_generation_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE generation = ?1", params![generation])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Count the entries stored under one generation.
    pub async fn count_generation_entries(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE generation = ?1",
                    params![generation],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn insert_one(conn: &rusqlite::Connection, generation: &str, entry: &CachedResponse) -> Result<(), Error> {
    let headers_json =
        serde_json::to_string(&entry.headers).map_err(|e| Error::CorruptEntry(e.to_string()))?;
    conn.execute(
        "INSERT INTO entries (
            key, generation, url, status, status_text, headers_json, body, fetched_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(key) DO UPDATE SET
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            fetched_at = excluded.fetched_at",
        params![
            compute_entry_key(generation, &entry.url),
            generation,
            &entry.url,
            entry.status as i64,
            &entry.status_text,
            headers_json,
            &entry.body,
            &entry.fetched_at,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn insert_all(&self, generation: &str, entries: Vec<CachedResponse>) -> Result<(), Error> {
        self.insert_entries(generation, entries).await
    }

    async fn get(&self, generation: &str, url: &str) -> Result<Option<CachedResponse>, Error> {
        self.get_entry(generation, url).await
    }

    async fn put(&self, generation: &str, entry: CachedResponse) -> Result<(), Error> {
        self.upsert_entry(generation, entry).await
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.list_generation_names().await
    }

    async fn delete_generation(&self, generation: &str) -> Result<u64, Error> {
        self.delete_generation_entries(generation).await
    }

    async fn count_entries(&self, generation: &str) -> Result<u64, Error> {
        self.count_generation_entries(generation).await
    }
}
