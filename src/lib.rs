//! escher - Schema-change safety analysis for SQL databases
//!
//! Named after M. C. Escher, a Dutch graphic artist famous for
//! impossible constructions. This crate discovers every database object
//! that depends on a table or column, scores the risk of changing it,
//! and executes the change in transactionally safe batches behind a
//! cross-process migration lock.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use escher::{DbConfig, SchemaManager, SqlxManager};
//!
//! #[tokio::main]
//! async fn main() -> escher::Result<()> {
//!     let db = SqlxManager::connect(DbConfig::new("postgresql://app@localhost/app")).await?;
//!     let manager = SchemaManager::new(Arc::new(db))?;
//!
//!     let report = manager.analyze_table_rename("users", "customers").await?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod prelude;

pub use escher_core::config::SafetyConfig;
pub use escher_core::graph::{DependencyEdge, DependencyGraph};
pub use escher_core::identifier::{is_valid_identifier, sanitize_identifier};
pub use escher_core::impact::{ImpactSummary, DEFAULT_COORDINATION_THRESHOLD};
pub use escher_core::object::{ImpactLevel, ObjectType, SchemaObject};
pub use escher_core::report::{ChangeKind, CheckResult, Report, Validation};

pub use escher_db::{
    Connection, ConnectionManager, DbConfig, DbError, Dialect, PoolConfig, SchemaStateCache,
    SqlxManager,
};

pub use escher_migrations::{
    validate_rename_operation, Batch, BatchStatus, BatchedExecutor, ChangePlanner, DdlKind,
    DdlOperation, DependencyAnalyzer, Error, MigrationLock, MigrationLockManager, Result,
    SafetyValidator, SchemaIntrospector, SchemaManager,
};
