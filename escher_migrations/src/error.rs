use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] escher_db::DbError),

    /// Catalog reads fail with a fixed message so connection internals
    /// never reach callers; the source chain keeps the detail.
    #[error("catalog introspection failed")]
    Introspection(#[source] escher_db::DbError),

    #[error("migration lock for schema '{0}' is held by another process")]
    LockHeld(String),

    #[error("Serialization/Deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

pub type Result<T> = std::result::Result<T, Error>;
