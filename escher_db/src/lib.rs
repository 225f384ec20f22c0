//! Database access for the schema safety toolkit.
//!
//! The rest of the workspace talks to the database exclusively through the
//! [`ConnectionManager`] and [`Connection`] capabilities defined here, so
//! analysis and execution code stays independent of the concrete driver
//! and tests can substitute canned catalogs.

pub mod cache;
pub mod config;
pub mod dialect;
pub mod manager;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use crate::cache::SchemaStateCache;
pub use crate::config::{DbConfig, PoolConfig};
pub use crate::dialect::Dialect;
pub use crate::manager::SqlxManager;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("unsupported database type: {0}")]
    UnsupportedDatabase(String),
    #[error("invalid database configuration: {0}")]
    Configuration(String),
    /// Driver failures deliberately keep connection internals out of the
    /// display message; the source chain still carries them for logging.
    #[error("database driver error")]
    Driver(#[from] sqlx::Error),
    #[error("failed to decode catalog row")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// A live database connection.
///
/// Methods take `&mut self` so a caller holding a boxed connection can
/// run `BEGIN`/`COMMIT` sequences knowing every statement lands on the
/// same underlying session.
#[async_trait]
pub trait Connection: Send {
    /// Runs a query and returns each row as a JSON object keyed by
    /// column name.
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Value>>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;
}

/// Capability to hand out scoped connections for one database.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn Connection>>;

    fn dialect(&self) -> Dialect;
}

/// Decodes fetched rows into typed values.
pub fn from_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(DbError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct NamedRow {
        name: String,
        position: i64,
    }

    #[test]
    fn from_rows_decodes_typed_structs() {
        let rows = vec![
            json!({"name": "users", "position": 1}),
            json!({"name": "orders", "position": 2}),
        ];
        let decoded: Vec<NamedRow> = from_rows(rows).unwrap();
        assert_eq!(
            decoded,
            vec![
                NamedRow {
                    name: "users".into(),
                    position: 1
                },
                NamedRow {
                    name: "orders".into(),
                    position: 2
                },
            ]
        );
    }

    #[test]
    fn from_rows_surfaces_decode_failures() {
        let rows = vec![json!({"name": 42})];
        let result: Result<Vec<NamedRow>> = from_rows(rows);
        assert!(matches!(result, Err(DbError::Decode(_))));
    }

    #[test]
    fn driver_errors_do_not_leak_internals() {
        let error = DbError::Driver(sqlx::Error::PoolTimedOut);
        assert_eq!(error.to_string(), "database driver error");
    }
}
