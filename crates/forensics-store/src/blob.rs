use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Object-store contract (spec §6). Consumed, never reimplemented in-process —
/// the only concrete implementation here is an HTTP-backed bucket client.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// HTTP-backed bucket client plus local TTL bookkeeping (spec §3: blobs
/// expire 24h after upload).
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    db: Mutex<Connection>,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64, conn: Connection) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(StdDuration::from_secs(timeout_secs))
                .build()
                .expect("building reqwest client for blob store"),
            base_url: base_url.into(),
            db: Mutex::new(conn),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn track(&self, key: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR REPLACE INTO blobs (blob_key, stored_at) VALUES (?1, ?2)",
            rusqlite::params![key, now],
        )?;
        Ok(())
    }

    fn untrack(&self, key: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM blobs WHERE blob_key = ?1", rusqlite::params![key])?;
        Ok(())
    }

    /// Delete every tracked blob whose TTL has elapsed. Best-effort: an HTTP
    /// failure for one key is logged and does not stop the sweep.
    pub async fn sweep_expired(&self, ttl_hours: i64) -> Result<usize> {
        let cutoff = (Utc::now() - Duration::hours(ttl_hours)).to_rfc3339();
        let keys: Vec<String> = {
            let db = self.db.lock().unwrap();
            let mut stmt = db.prepare("SELECT blob_key FROM blobs WHERE stored_at < ?1")?;
            let rows = stmt.query_map(rusqlite::params![cutoff], |row| row.get(0))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };

        let mut swept = 0;
        for key in keys {
            if let Err(e) = self.delete(&key).await {
                tracing::warn!(key, error = %e, "failed to delete expired blob, will retry next sweep");
                continue;
            }
            swept += 1;
        }
        Ok(swept)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let resp = self
            .client
            .put(self.url_for(key))
            .body(bytes)
            .send()
            .await?;
        resp.error_for_status_ref().map_err(StoreError::Http)?;
        self.track(key)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(self.url_for(key)).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(key.to_string()));
        }
        let resp = resp.error_for_status().map_err(StoreError::Http)?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let resp = self.client.delete(self.url_for(key)).send().await?;
        if resp.status() != reqwest::StatusCode::NOT_FOUND {
            resp.error_for_status_ref().map_err(StoreError::Http)?;
        }
        self.untrack(key)?;
        Ok(())
    }
}
