//! High-level entry point composing the planners, checks, executor and
//! lock manager over one shared connection manager and schema cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use escher_core::config::SafetyConfig;
use escher_core::report::{CheckResult, Report, Validation};
use escher_db::{ConnectionManager, SchemaStateCache};

use crate::analyzer::DependencyAnalyzer;
use crate::error::{Error, Result};
use crate::executor::BatchedExecutor;
use crate::introspection::SchemaIntrospector;
use crate::lock::MigrationLockManager;
use crate::planner::{self, ChangePlanner};
use crate::safety::SafetyValidator;
use crate::types::{Batch, DdlOperation};

/// Manager for schema change analysis and execution.
pub struct SchemaManager {
    planner: ChangePlanner,
    safety: SafetyValidator,
    executor: BatchedExecutor,
    locks: MigrationLockManager,
    config: SafetyConfig,
}

impl SchemaManager {
    pub fn new(manager: Arc<dyn ConnectionManager>) -> Result<Self> {
        Self::with_config(manager, SafetyConfig::default())
    }

    pub fn with_config(manager: Arc<dyn ConnectionManager>, config: SafetyConfig) -> Result<Self> {
        config.validate().map_err(Error::Generic)?;
        let cache = Arc::new(SchemaStateCache::new());
        let introspector = SchemaIntrospector::new(manager.clone(), cache.clone());
        let analyzer = DependencyAnalyzer::new(introspector.clone());
        Ok(Self {
            planner: ChangePlanner::new(analyzer, config.clone()),
            safety: SafetyValidator::new(introspector),
            executor: BatchedExecutor::new(manager.clone(), cache.clone(), config.clone()),
            locks: MigrationLockManager::new(manager, cache),
            config,
        })
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    pub async fn analyze_table_rename(&self, old: &str, new: &str) -> Result<Report> {
        self.planner.analyze_table_rename(old, new).await
    }

    pub fn validate_rename_operation(&self, old: &str, new: &str) -> Validation {
        planner::validate_rename_operation(old, new)
    }

    pub async fn plan_column_removal(&self, table: &str, column: &str) -> Result<Report> {
        self.planner.plan_column_removal(table, column).await
    }

    pub async fn run_safety_checks(&self, old: &str, new: &str) -> Vec<CheckResult> {
        self.safety.run_safety_checks(old, new).await
    }

    pub fn batch_ddl(&self, operations: Vec<DdlOperation>) -> Vec<Batch> {
        self.executor.batch(operations)
    }

    pub async fn execute_batches(&self, batches: &mut [Batch]) -> Result<bool> {
        self.executor.execute(batches).await
    }

    pub async fn acquire_migration_lock(&self, schema_name: &str, ttl: Duration) -> Result<bool> {
        self.locks.acquire(schema_name, ttl).await
    }

    pub async fn release_migration_lock(&self, schema_name: &str) -> Result<()> {
        self.locks.release(schema_name).await
    }

    pub async fn is_migration_locked(&self, schema_name: &str) -> Result<bool> {
        self.locks.is_locked(schema_name).await
    }

    pub fn default_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.config.default_lock_ttl_secs)
    }

    /// Runs `operation` under the schema's migration lock, using the
    /// configured default lifetime.
    pub async fn with_migration_lock<T, F, Fut>(&self, schema_name: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.locks
            .with_lock(schema_name, self.default_lock_ttl(), operation)
            .await
    }
}
