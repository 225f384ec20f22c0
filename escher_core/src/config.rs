use serde::{Deserialize, Serialize};

use crate::impact::DEFAULT_COORDINATION_THRESHOLD;

/// Tunables for analysis and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Dependent-object count above which a change requires coordination
    /// regardless of individual impact levels.
    pub coordination_threshold: usize,
    /// Upper bound on operations grouped into a single transaction.
    pub max_batch_size: usize,
    /// Lifetime of a migration lock when the caller does not pass one.
    pub default_lock_ttl_secs: u64,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            coordination_threshold: DEFAULT_COORDINATION_THRESHOLD,
            max_batch_size: 50,
            default_lock_ttl_secs: 300,
        }
    }
}

impl SafetyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_batch_size == 0 {
            return Err("max_batch_size must be at least 1".to_string());
        }
        if self.default_lock_ttl_secs == 0 {
            return Err("default_lock_ttl_secs must be positive".to_string());
        }
        Ok(())
    }
}
