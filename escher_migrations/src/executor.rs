//! Transactionally batched DDL execution.

use std::sync::Arc;
use std::time::Instant;

use escher_core::config::SafetyConfig;
use escher_db::{ConnectionManager, DbError, SchemaStateCache};

use crate::error::Result;
use crate::types::{Batch, BatchStatus, DdlOperation};

pub struct BatchedExecutor {
    manager: Arc<dyn ConnectionManager>,
    cache: Arc<SchemaStateCache>,
    config: SafetyConfig,
}

impl BatchedExecutor {
    pub fn new(
        manager: Arc<dyn ConnectionManager>,
        cache: Arc<SchemaStateCache>,
        config: SafetyConfig,
    ) -> Self {
        Self {
            manager,
            cache,
            config,
        }
    }

    /// Groups operations into batches without reordering them.
    ///
    /// Caller order already encodes dependency order (creates listed
    /// before the alters that reference them), so grouping only splits:
    /// destructive statements go into single-operation batches, and a
    /// batch never exceeds `max_batch_size` operations.
    pub fn batch(&self, operations: Vec<DdlOperation>) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Vec<DdlOperation> = Vec::new();
        for operation in operations {
            if operation.is_destructive() {
                if !current.is_empty() {
                    batches.push(Batch::new(std::mem::take(&mut current)));
                }
                batches.push(Batch::new(vec![operation]));
                continue;
            }
            current.push(operation);
            if current.len() >= self.config.max_batch_size {
                batches.push(Batch::new(std::mem::take(&mut current)));
            }
        }
        if !current.is_empty() {
            batches.push(Batch::new(current));
        }
        for (ordinal, batch) in batches.iter_mut().enumerate() {
            batch.ordinal = ordinal;
        }
        batches
    }

    /// Runs each batch in its own transaction.
    ///
    /// The first failing batch is rolled back, its error is recorded on
    /// the batch, every later batch is marked skipped and the call
    /// returns `Ok(false)`. Batches committed before the failure stay
    /// committed. `Err` is reserved for connectivity loss, where not
    /// even a rollback could be issued.
    pub async fn execute(&self, batches: &mut [Batch]) -> Result<bool> {
        let mut conn = self.manager.acquire().await?;
        let mut failed = false;
        let mut committed_any = false;

        for batch in batches.iter_mut() {
            if failed {
                batch.status = BatchStatus::Skipped;
                continue;
            }

            let started = Instant::now();
            conn.execute("BEGIN", &[]).await?;
            let mut batch_error: Option<String> = None;
            for operation in &batch.operations {
                if let Err(error) = conn.execute(operation.statement(), &[]).await {
                    batch_error = Some(error_detail(&error));
                    break;
                }
            }

            match batch_error {
                None => {
                    conn.execute("COMMIT", &[]).await?;
                    batch.status = BatchStatus::Completed;
                    batch.execution_time_ms = Some(started.elapsed().as_millis() as i64);
                    committed_any = true;
                    tracing::info!(
                        batch = batch.ordinal,
                        operations = batch.operations.len(),
                        "batch committed"
                    );
                }
                Some(message) => {
                    conn.execute("ROLLBACK", &[]).await?;
                    batch.status = BatchStatus::Failed;
                    batch.execution_time_ms = Some(started.elapsed().as_millis() as i64);
                    batch.error_message = Some(message);
                    failed = true;
                    tracing::error!(batch = batch.ordinal, "batch failed and was rolled back");
                }
            }
        }

        // Committed DDL can change any earlier catalog answer.
        if committed_any {
            self.cache.invalidate_all();
        }
        Ok(!failed)
    }
}

/// Expands the driver's opaque display with its source, since the
/// per-batch error field exists precisely for logging the detail.
fn error_detail(error: &DbError) -> String {
    match error {
        DbError::Driver(source) => format!("{error}: {source}"),
        other => other.to_string(),
    }
}
