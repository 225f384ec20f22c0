pub use error::Error;
pub use error::Result;

pub mod analyzer;
pub mod error;
pub mod executor;
pub mod introspection;
pub mod lock;
pub mod manager;
pub mod planner;
pub mod safety;
pub mod types;

pub use analyzer::DependencyAnalyzer;
pub use executor::BatchedExecutor;
pub use introspection::SchemaIntrospector;
pub use lock::MigrationLockManager;
pub use manager::SchemaManager;
pub use planner::{validate_rename_operation, ChangePlanner};
pub use safety::SafetyValidator;
pub use types::{Batch, BatchStatus, DdlKind, DdlOperation, MigrationLock};
