//! In-memory database double.
//!
//! Implements the connection capabilities over canned catalog fixtures
//! and a real lock-row map, routing each query by the fragments that are
//! unique to it. Tests drive the public engine API against this instead
//! of a live server.

// Each test binary compiles its own copy of this module and none of
// them uses every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use escher_db::{Connection, ConnectionManager, DbError, Dialect};

/// Routes test spans to the captured test output. Safe to call from
/// every test; only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
struct LockRow {
    holder_id: String,
    acquired_at: i64,
    expires_at: i64,
}

#[derive(Default)]
struct Inner {
    foreign_keys: Vec<Value>,
    views: Vec<Value>,
    indexes: Vec<(String, Value)>,
    triggers: Vec<(String, Value)>,
    tables: HashSet<String>,
    locks: HashMap<String, LockRow>,
    executed: Vec<String>,
    fetched: Vec<String>,
    fail_needle: Option<String>,
}

#[derive(Clone)]
pub struct MockDb {
    dialect: Dialect,
    inner: Arc<Mutex<Inner>>,
}

impl MockDb {
    pub fn postgres() -> Self {
        Self {
            dialect: Dialect::Postgres,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn sqlite() -> Self {
        Self {
            dialect: Dialect::Sqlite,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn add_table(&self, name: &str) {
        self.inner.lock().unwrap().tables.insert(name.to_string());
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_foreign_key(
        &self,
        constraint_name: &str,
        child_table: &str,
        column: &str,
        parent_table: &str,
        referenced_column: &str,
        delete_rule: Option<&str>,
        update_rule: Option<&str>,
    ) {
        self.inner.lock().unwrap().foreign_keys.push(json!({
            "constraint_name": constraint_name,
            "table_name": child_table,
            "column_name": column,
            "referenced_table": parent_table,
            "referenced_column": referenced_column,
            "delete_rule": delete_rule,
            "update_rule": update_rule,
        }));
    }

    pub fn add_view(&self, name: &str, definition: &str, materialized: bool) {
        self.inner.lock().unwrap().views.push(json!({
            "view_name": name,
            "definition": definition,
            "is_materialized": if materialized { 1 } else { 0 },
        }));
    }

    pub fn add_index(&self, table: &str, name: &str, definition: &str) {
        self.inner.lock().unwrap().indexes.push((
            table.to_string(),
            json!({"index_name": name, "definition": definition}),
        ));
    }

    pub fn add_trigger(&self, table: &str, name: &str, definition: &str) {
        self.inner.lock().unwrap().triggers.push((
            table.to_string(),
            json!({"trigger_name": name, "definition": definition}),
        ));
    }

    /// Makes fetch and execute fail for any statement containing
    /// `needle`.
    pub fn fail_when_statement_contains(&self, needle: &str) {
        self.inner.lock().unwrap().fail_needle = Some(needle.to_string());
    }

    pub fn clear_failure(&self) {
        self.inner.lock().unwrap().fail_needle = None;
    }

    pub fn executed_statements(&self) -> Vec<String> {
        self.inner.lock().unwrap().executed.clone()
    }

    pub fn fetch_count_containing(&self, needle: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .fetched
            .iter()
            .filter(|sql| sql.contains(needle))
            .count()
    }

    pub fn lock_holder(&self, schema: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .locks
            .get(schema)
            .map(|row| row.holder_id.clone())
    }

    /// Moves a held lock's window `secs` into the past, simulating a
    /// holder that stopped renewing long ago.
    pub fn age_lock(&self, schema: &str, secs: i64) {
        if let Some(row) = self.inner.lock().unwrap().locks.get_mut(schema) {
            row.acquired_at -= secs;
            row.expires_at -= secs;
        }
    }
}

#[async_trait]
impl ConnectionManager for MockDb {
    async fn acquire(&self) -> escher_db::Result<Box<dyn Connection>> {
        Ok(Box::new(MockConn {
            inner: self.inner.clone(),
        }))
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }
}

struct MockConn {
    inner: Arc<Mutex<Inner>>,
}

fn param_str(params: &[Value], index: usize) -> String {
    params
        .get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn param_i64(params: &[Value], index: usize) -> i64 {
    params.get(index).and_then(Value::as_i64).unwrap_or_default()
}

fn forced_failure() -> DbError {
    DbError::Driver(sqlx::Error::Protocol("forced failure for test".into()))
}

#[async_trait]
impl Connection for MockConn {
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> escher_db::Result<Vec<Value>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(needle) = inner.fail_needle.clone() {
            if sql.contains(&needle) {
                return Err(forced_failure());
            }
        }
        inner.fetched.push(sql.to_string());
        let table = param_str(params, 0);

        let rows = if sql.contains("_migration_locks") {
            let now = param_i64(params, 1);
            inner
                .locks
                .get(&table)
                .filter(|row| row.expires_at >= now)
                .map(|row| {
                    vec![json!({
                        "schema_name": table,
                        "holder_id": row.holder_id,
                        "acquired_at": row.acquired_at,
                        "expires_at": row.expires_at,
                    })]
                })
                .unwrap_or_default()
        } else if sql.contains("table_constraints") || sql.contains("pragma_foreign_key_list") {
            inner
                .foreign_keys
                .iter()
                .filter(|row| {
                    row["table_name"] == table.as_str() || row["referenced_table"] == table.as_str()
                })
                .cloned()
                .collect()
        } else if sql.contains("pg_views") || sql.contains("type = 'view'") {
            inner
                .views
                .iter()
                .filter(|row| {
                    row["definition"]
                        .as_str()
                        .unwrap_or_default()
                        .contains(&table)
                })
                .cloned()
                .collect()
        } else if sql.contains("pg_indexes") || sql.contains("pragma_index_list") {
            inner
                .indexes
                .iter()
                .filter(|(owner, _)| owner == &table)
                .map(|(_, row)| row.clone())
                .collect()
        } else if sql.contains("information_schema.triggers") || sql.contains("type = 'trigger'") {
            inner
                .triggers
                .iter()
                .filter(|(owner, _)| owner == &table)
                .map(|(_, row)| row.clone())
                .collect()
        } else if sql.contains("information_schema.tables") || sql.contains("type = 'table'") {
            if inner.tables.contains(&table) {
                vec![json!({"present": 1})]
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };
        Ok(rows)
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> escher_db::Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(needle) = inner.fail_needle.clone() {
            if sql.contains(&needle) {
                return Err(forced_failure());
            }
        }
        inner.executed.push(sql.to_string());

        if sql.starts_with("CREATE TABLE IF NOT EXISTS _migration_locks") {
            return Ok(0);
        }
        if sql.contains("DELETE FROM _migration_locks WHERE expires_at") {
            let now = param_i64(params, 0);
            let before = inner.locks.len();
            inner.locks.retain(|_, row| row.expires_at >= now);
            return Ok((before - inner.locks.len()) as u64);
        }
        if sql.contains("INSERT INTO _migration_locks") {
            let schema = param_str(params, 0);
            if inner.locks.contains_key(&schema) {
                return Ok(0);
            }
            inner.locks.insert(
                schema,
                LockRow {
                    holder_id: param_str(params, 1),
                    acquired_at: param_i64(params, 2),
                    expires_at: param_i64(params, 3),
                },
            );
            return Ok(1);
        }
        if sql.contains("DELETE FROM _migration_locks WHERE schema_name") {
            let schema = param_str(params, 0);
            return Ok(u64::from(inner.locks.remove(&schema).is_some()));
        }
        Ok(0)
    }
}
