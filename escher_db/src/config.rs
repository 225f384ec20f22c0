/// Connection pool tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 5,
            max_connections: 32,
            connection_timeout_secs: 30,
            idle_timeout_secs: 300,
            max_lifetime_secs: 3600,
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub url: String,
    pub pool: PoolConfig,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool: PoolConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("database url must not be empty".to_string());
        }
        if self.pool.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err("min_connections cannot exceed max_connections".to_string());
        }
        if self.pool.connection_timeout_secs == 0 {
            return Err("connection_timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}
