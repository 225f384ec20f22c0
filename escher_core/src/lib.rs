pub mod config;
pub mod graph;
pub mod identifier;
pub mod impact;
pub mod object;
pub mod report;

pub use config::SafetyConfig;
pub use graph::{DependencyEdge, DependencyGraph};
pub use identifier::{is_valid_identifier, sanitize_identifier};
pub use impact::{ImpactSummary, DEFAULT_COORDINATION_THRESHOLD};
pub use object::{ImpactLevel, ObjectType, SchemaObject};
pub use report::{ChangeKind, CheckResult, Report, Validation};
