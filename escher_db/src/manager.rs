//! sqlx-backed implementation of the connection capabilities.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{Any, AnyPoolOptions, AnyRow};
use sqlx::pool::PoolConnection;
use sqlx::{AnyPool, Column, Row};

use crate::config::DbConfig;
use crate::dialect::Dialect;
use crate::{Connection, ConnectionManager, DbError, Result};

static INSTALL_DRIVERS: Once = Once::new();

/// Connection manager over a shared `sqlx` pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct SqlxManager {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlxManager {
    /// Validates the configuration, resolves the dialect from the URL
    /// scheme and opens the pool.
    pub async fn connect(config: DbConfig) -> Result<Self> {
        config.validate().map_err(DbError::Configuration)?;
        let dialect = Dialect::from_url(&config.url)?;

        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
        let pool = AnyPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(Duration::from_secs(config.pool.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.pool.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.pool.max_lifetime_secs))
            .connect(&config.url)
            .await?;

        tracing::debug!(dialect = %dialect, "database pool initialized");
        Ok(Self { pool, dialect })
    }
}

#[async_trait]
impl ConnectionManager for SqlxManager {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        let conn = self.pool.acquire().await?;
        Ok(Box::new(SqlxConnection { conn }))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

pub struct SqlxConnection {
    conn: PoolConnection<Any>,
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Value>> {
        let query = bind_params(sqlx::query(sql), params);
        let rows = query.fetch_all(&mut *self.conn).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        let query = bind_params(sqlx::query(sql), params);
        let result = query.execute(&mut *self.conn).await?;
        Ok(result.rows_affected())
    }
}

type AnyQuery<'q> = sqlx::query::Query<'q, Any, sqlx::any::AnyArguments<'q>>;

fn bind_params<'q>(mut query: AnyQuery<'q>, params: &'q [Value]) -> AnyQuery<'q> {
    for param in params {
        query = match param {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(value) => query.bind(*value),
            Value::Number(value) => {
                if let Some(int) = value.as_i64() {
                    query.bind(int)
                } else {
                    query.bind(value.as_f64().unwrap_or_default())
                }
            }
            Value::String(value) => query.bind(value.as_str()),
            other => query.bind(other.to_string()),
        };
    }
    query
}

/// Converts a driver row into a JSON object keyed by column name.
///
/// The `Any` driver exposes a small scalar vocabulary, so each column is
/// probed as integer, float, boolean and text in that order; a NULL
/// decodes as `None` on the first probe. Columns of any other type come
/// back as JSON null.
fn row_to_json(row: &AnyRow) -> Value {
    let mut object = serde_json::Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = if let Ok(int) = row.try_get::<Option<i64>, _>(index) {
            int.map_or(Value::Null, Value::from)
        } else if let Ok(float) = row.try_get::<Option<f64>, _>(index) {
            float.map_or(Value::Null, Value::from)
        } else if let Ok(boolean) = row.try_get::<Option<bool>, _>(index) {
            boolean.map_or(Value::Null, Value::from)
        } else if let Ok(text) = row.try_get::<Option<String>, _>(index) {
            text.map_or(Value::Null, Value::from)
        } else {
            Value::Null
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}
