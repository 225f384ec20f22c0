use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{DbError, Result};

/// Supported database dialects, selected by connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Resolves the dialect from a connection URL.
    ///
    /// Anything other than `postgres(ql)://` or `sqlite://` is rejected
    /// here, before any connection attempt, so unsupported engines fail
    /// with a typed error instead of a driver-specific one.
    pub fn from_url(url: &str) -> Result<Self> {
        let Some((scheme, _)) = url.split_once("://") else {
            return Err(DbError::Configuration(
                "database url has no scheme".to_string(),
            ));
        };
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(DbError::UnsupportedDatabase(other.to_string())),
        }
    }
}
