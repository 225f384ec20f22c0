pub use escher_core::config::SafetyConfig;
pub use escher_core::graph::DependencyGraph;
pub use escher_core::identifier::{is_valid_identifier, sanitize_identifier};
pub use escher_core::impact::ImpactSummary;
pub use escher_core::object::{ImpactLevel, ObjectType, SchemaObject};
pub use escher_core::report::{ChangeKind, CheckResult, Report, Validation};
pub use escher_db::{Connection, ConnectionManager, DbConfig, Dialect, SqlxManager};
pub use escher_migrations::{
    Batch, BatchStatus, DdlOperation, Error, Result, SchemaManager,
};
