//! Session persistence: a shared key-value contract with a Postgres
//! implementation and an in-memory substitute for tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::Instrument;

use super::SessionData;

/// Key-value contract for session records. Keys are token hashes,
/// values are small serialized records; expiry is the store's concern.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, token_hash: &[u8], data: &SessionData, ttl: Duration) -> Result<()>;
    async fn get(&self, token_hash: &[u8]) -> Result<Option<SessionData>>;
    /// Deleting a key that does not exist is not an error.
    async fn delete(&self, token_hash: &[u8]) -> Result<()>;
}

/// Session store backed by the shared session database, so any node
/// can resolve any session.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, token_hash: &[u8], data: &SessionData, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(data).context("failed to serialize session data")?;

        let query = r"
            INSERT INTO sessions (token_hash, data, expires_at)
            VALUES ($1, $2::jsonb, NOW() + ($3 * INTERVAL '1 second'))
            ON CONFLICT (token_hash)
            DO UPDATE SET data = EXCLUDED.data, expires_at = EXCLUDED.expires_at
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(payload)
            .bind(ttl.as_secs() as i64)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store session")?;

        Ok(())
    }

    async fn get(&self, token_hash: &[u8]) -> Result<Option<SessionData>> {
        // Expired rows are filtered here; reaping them is left to the
        // store's own housekeeping.
        let query = r"
            SELECT data::text AS data
            FROM sessions
            WHERE token_hash = $1
              AND expires_at > NOW()
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        match row {
            Some(row) => {
                let payload: String = row.get("data");
                let data = serde_json::from_str(&payload)
                    .context("failed to deserialize session data")?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;

        Ok(())
    }
}

/// In-memory session store honoring TTLs. Used by tests and substitute
/// wiring.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<HashMap<Vec<u8>, (SessionData, Instant)>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, token_hash: &[u8], data: &SessionData, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.insert(token_hash.to_vec(), (data.clone(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, token_hash: &[u8]) -> Result<Option<SessionData>> {
        let mut inner = self.inner.lock().await;
        match inner.get(token_hash) {
            Some((data, expires_at)) if *expires_at > Instant::now() => Ok(Some(data.clone())),
            Some(_) => {
                inner.remove(token_hash);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, token_hash: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.remove(token_hash);
        Ok(())
    }
}
