//! Identity persistence: the shared users table and an in-memory
//! substitute for tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tokio::sync::Mutex;
use tracing::Instrument;

use super::models::{Identity, NewIdentity};

/// Result of an insert attempt. `Conflict` means the storage layer
/// rejected a uniqueness violation; for concurrent signups this is the
/// source of truth, not any pre-insert existence check.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Identity),
    Conflict,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn insert(&self, new: NewIdentity) -> Result<InsertOutcome>;
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>>;
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Identity store backed by the shared Postgres users table.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_identity(row: &PgRow) -> Identity {
    Identity {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn insert(&self, new: NewIdentity) -> Result<InsertOutcome> {
        let query = r"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(row_to_identity(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert identity"),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let query = r"
            SELECT id, username, email, password_hash
            FROM users
            WHERE username = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup identity by username")?;

        Ok(row.as_ref().map(row_to_identity))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>> {
        let query = r"
            SELECT id, username, email, password_hash
            FROM users
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup identity by id")?;

        Ok(row.as_ref().map(row_to_identity))
    }
}

/// In-memory identity store with the same uniqueness semantics as the
/// database table. Used by tests and substitute wiring.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    identities: Vec<Identity>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn insert(&self, new: NewIdentity) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock().await;

        let conflict = inner
            .identities
            .iter()
            .any(|identity| identity.username == new.username || identity.email == new.email);
        if conflict {
            return Ok(InsertOutcome::Conflict);
        }

        inner.next_id += 1;
        let identity = Identity {
            id: inner.next_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
        };
        inner.identities.push(identity.clone());

        Ok(InsertOutcome::Created(identity))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .identities
            .iter()
            .find(|identity| identity.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Identity>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .identities
            .iter()
            .find(|identity| identity.id == id)
            .cloned())
    }
}
