use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::Display;

/// Coarse classification of a DDL statement, derived from its leading
/// keywords. Drives batching: destructive statements are never combined
/// with anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum DdlKind {
    Create,
    Alter,
    Destructive,
    Other,
}

impl DdlKind {
    pub fn classify(statement: &str) -> Self {
        let statement = statement.trim_start().to_uppercase();
        if statement.starts_with("DROP") || statement.starts_with("TRUNCATE") {
            DdlKind::Destructive
        } else if statement.starts_with("ALTER") {
            if statement.contains("DROP COLUMN") || statement.contains("DROP CONSTRAINT") {
                DdlKind::Destructive
            } else {
                DdlKind::Alter
            }
        } else if statement.starts_with("CREATE") {
            DdlKind::Create
        } else {
            DdlKind::Other
        }
    }

    pub fn is_destructive(self) -> bool {
        self == DdlKind::Destructive
    }
}

/// A single DDL statement queued for execution.
///
/// `kind` is derived from `statement` at construction and cannot drift
/// from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlOperation {
    statement: String,
    kind: DdlKind,
}

impl DdlOperation {
    pub fn new(statement: impl Into<String>) -> Self {
        let statement = statement.into();
        let kind = DdlKind::classify(&statement);
        Self { statement, kind }
    }

    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn kind(&self) -> DdlKind {
        self.kind
    }

    pub fn is_destructive(&self) -> bool {
        self.kind.is_destructive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum BatchStatus {
    Pending,
    Completed,
    Failed,
    Skipped,
}

/// An ordered group of DDL operations executed as one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Position in the execution sequence, assigned during grouping.
    pub ordinal: usize,
    pub operations: Vec<DdlOperation>,
    pub status: BatchStatus,
    /// Hash of the statements, for audit trails and change tracking.
    pub checksum: String,
    pub execution_time_ms: Option<i64>,
    pub error_message: Option<String>,
}

impl Batch {
    pub fn new(operations: Vec<DdlOperation>) -> Self {
        let checksum = compute_checksum(&operations);
        Self {
            ordinal: 0,
            operations,
            status: BatchStatus::Pending,
            checksum,
            execution_time_ms: None,
            error_message: None,
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.operations.iter().any(DdlOperation::is_destructive)
    }
}

fn compute_checksum(operations: &[DdlOperation]) -> String {
    let mut hasher = Sha256::new();
    for operation in operations {
        hasher.update(operation.statement().as_bytes());
        // Statement separator, so concatenation boundaries stay distinct.
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// One row in the migration lock table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationLock {
    pub schema_name: String,
    pub holder_id: String,
    /// Unix timestamps in seconds.
    pub acquired_at: i64,
    pub expires_at: i64,
}
