//! Cross-process migration locking.
//!
//! One row per active migration, keyed by schema name. Acquisition is a
//! single conditional insert, so two processes racing for the same
//! schema cannot both win; a crashed holder's row is reaped once its
//! `expires_at` passes. Contention is an expected outcome and comes back
//! as `Ok(false)`, never as an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use escher_core::identifier::sanitize_identifier;
use escher_db::{from_rows, Connection, ConnectionManager, Dialect, SchemaStateCache};

use crate::error::{Error, Result};
use crate::types::MigrationLock;

const LOCK_TABLE_KEY: &str = "_migration_locks";

const CREATE_LOCK_TABLE: &str = "CREATE TABLE IF NOT EXISTS _migration_locks (\
     schema_name TEXT PRIMARY KEY, \
     holder_id TEXT NOT NULL, \
     acquired_at BIGINT NOT NULL, \
     expires_at BIGINT NOT NULL)";

const PG_REAP: &str = "DELETE FROM _migration_locks WHERE expires_at < $1";
const SQLITE_REAP: &str = "DELETE FROM _migration_locks WHERE expires_at < ?1";

const PG_ACQUIRE: &str = "INSERT INTO _migration_locks \
     (schema_name, holder_id, acquired_at, expires_at) \
     VALUES ($1, $2, $3, $4) ON CONFLICT (schema_name) DO NOTHING";
const SQLITE_ACQUIRE: &str = "INSERT INTO _migration_locks \
     (schema_name, holder_id, acquired_at, expires_at) \
     VALUES (?1, ?2, ?3, ?4) ON CONFLICT (schema_name) DO NOTHING";

const PG_RELEASE: &str = "DELETE FROM _migration_locks WHERE schema_name = $1";
const SQLITE_RELEASE: &str = "DELETE FROM _migration_locks WHERE schema_name = ?1";

const PG_CURRENT: &str = "SELECT schema_name AS schema_name, holder_id AS holder_id, \
     acquired_at AS acquired_at, expires_at AS expires_at \
     FROM _migration_locks WHERE schema_name = $1 AND expires_at >= $2";
const SQLITE_CURRENT: &str = "SELECT schema_name AS schema_name, holder_id AS holder_id, \
     acquired_at AS acquired_at, expires_at AS expires_at \
     FROM _migration_locks WHERE schema_name = ?1 AND expires_at >= ?2";

pub struct MigrationLockManager {
    manager: Arc<dyn ConnectionManager>,
    cache: Arc<SchemaStateCache>,
    holder_id: String,
}

impl MigrationLockManager {
    pub fn new(manager: Arc<dyn ConnectionManager>, cache: Arc<SchemaStateCache>) -> Self {
        Self {
            manager,
            cache,
            holder_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn holder_id(&self) -> &str {
        &self.holder_id
    }

    /// Tries to take the lock for `schema_name`.
    ///
    /// Stale rows are reaped first, then a conditional insert decides
    /// the winner: one affected row means the lock is ours, zero means
    /// another holder is active.
    pub async fn acquire(&self, schema_name: &str, ttl: Duration) -> Result<bool> {
        let schema = self.lock_key(schema_name)?;
        let mut conn = self.manager.acquire().await?;
        self.ensure_lock_table(conn.as_mut()).await?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let expires_at = now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));
        let (reap, insert) = match self.manager.dialect() {
            Dialect::Postgres => (PG_REAP, PG_ACQUIRE),
            Dialect::Sqlite => (SQLITE_REAP, SQLITE_ACQUIRE),
        };
        conn.execute(reap, &[json!(now)]).await?;
        let inserted = conn
            .execute(
                insert,
                &[
                    json!(schema),
                    json!(self.holder_id),
                    json!(now),
                    json!(expires_at),
                ],
            )
            .await?;

        let acquired = inserted == 1;
        if acquired {
            tracing::info!(schema = %schema, holder = %self.holder_id, "migration lock acquired");
        } else {
            tracing::debug!(schema = %schema, "migration lock contended");
        }
        Ok(acquired)
    }

    /// Deletes the lock row unconditionally. Releasing a lock that is
    /// not held is a no-op.
    pub async fn release(&self, schema_name: &str) -> Result<()> {
        let schema = self.lock_key(schema_name)?;
        let mut conn = self.manager.acquire().await?;
        self.ensure_lock_table(conn.as_mut()).await?;
        let sql = match self.manager.dialect() {
            Dialect::Postgres => PG_RELEASE,
            Dialect::Sqlite => SQLITE_RELEASE,
        };
        let deleted = conn.execute(sql, &[json!(schema)]).await?;
        tracing::debug!(schema = %schema, deleted, "migration lock released");
        Ok(())
    }

    /// The active, unexpired lock row for `schema_name`, if any.
    pub async fn current_lock(&self, schema_name: &str) -> Result<Option<MigrationLock>> {
        let schema = self.lock_key(schema_name)?;
        let mut conn = self.manager.acquire().await?;
        self.ensure_lock_table(conn.as_mut()).await?;
        let sql = match self.manager.dialect() {
            Dialect::Postgres => PG_CURRENT,
            Dialect::Sqlite => SQLITE_CURRENT,
        };
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let rows = conn.fetch(sql, &[json!(schema), json!(now)]).await?;
        let mut locks: Vec<MigrationLock> = from_rows(rows)?;
        Ok(locks.pop())
    }

    pub async fn is_locked(&self, schema_name: &str) -> Result<bool> {
        Ok(self.current_lock(schema_name).await?.is_some())
    }

    /// Runs `operation` while holding the lock.
    ///
    /// Contention surfaces as [`Error::LockHeld`]; once acquired, the
    /// lock is released on every exit path, and an error from the
    /// operation wins over an error from the release.
    pub async fn with_lock<T, F, Fut>(
        &self,
        schema_name: &str,
        ttl: Duration,
        operation: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.acquire(schema_name, ttl).await? {
            return Err(Error::LockHeld(schema_name.to_string()));
        }
        let outcome = operation().await;
        let released = self.release(schema_name).await;
        let value = outcome?;
        released?;
        Ok(value)
    }

    async fn ensure_lock_table(&self, conn: &mut dyn Connection) -> Result<()> {
        if self.cache.is_ensured(LOCK_TABLE_KEY) {
            return Ok(());
        }
        conn.execute(CREATE_LOCK_TABLE, &[]).await?;
        self.cache.mark_ensured(LOCK_TABLE_KEY);
        Ok(())
    }

    fn lock_key(&self, schema_name: &str) -> Result<String> {
        let schema = sanitize_identifier(schema_name);
        if schema.is_empty() {
            return Err(Error::Generic(
                "schema name is empty after sanitization".to_string(),
            ));
        }
        Ok(schema)
    }
}
