//! Dialect-specific catalog introspection.
//!
//! Every query here is read-only and takes the table name as a bound
//! parameter; names are additionally sanitized on entry so nothing a
//! caller passes can reach SQL text unfiltered. Driver failures surface
//! as [`Error::Introspection`] with the detail kept to the source chain.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use escher_core::identifier::sanitize_identifier;
use escher_db::{from_rows, ConnectionManager, Dialect, SchemaStateCache};

use crate::error::{Error, Result};

/// Raw foreign key metadata. A multi-column constraint can span several
/// rows, all sharing `constraint_name` and `table_name`.
#[derive(Debug, Clone, Deserialize)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    /// Child table carrying the constraint.
    pub table_name: String,
    pub column_name: Option<String>,
    /// Parent table the constraint points at.
    pub referenced_table: String,
    pub referenced_column: Option<String>,
    pub delete_rule: Option<String>,
    pub update_rule: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow {
    pub view_name: String,
    pub definition: Option<String>,
    /// 1 for materialized views, 0 otherwise.
    pub is_materialized: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexRow {
    pub index_name: String,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRow {
    pub trigger_name: String,
    pub definition: Option<String>,
}

// Constraint names repeat across tables, so key_column_usage is joined
// on the child table as well as the name.
const PG_FOREIGN_KEYS: &str = r#"
SELECT tc.constraint_name AS constraint_name,
       tc.table_name AS table_name,
       kcu.column_name AS column_name,
       ccu.table_name AS referenced_table,
       ccu.column_name AS referenced_column,
       rc.delete_rule AS delete_rule,
       rc.update_rule AS update_rule
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON tc.constraint_name = kcu.constraint_name
 AND tc.table_schema = kcu.table_schema
 AND tc.table_name = kcu.table_name
JOIN information_schema.constraint_column_usage ccu
  ON tc.constraint_name = ccu.constraint_name
 AND tc.table_schema = ccu.table_schema
JOIN information_schema.referential_constraints rc
  ON tc.constraint_name = rc.constraint_name
 AND tc.table_schema = rc.constraint_schema
WHERE tc.constraint_type = 'FOREIGN KEY'
  AND (tc.table_name = $1 OR ccu.table_name = $1)
"#;

// pragma_foreign_key_list emits one row per column; the rows of a
// composite key share an id. Grouping by id keeps one row per
// constraint, and MIN(seq) pins the bare columns to the first key
// column.
const SQLITE_FOREIGN_KEYS: &str = r#"
SELECT m.name || '_' || fk."from" || '_fkey' AS constraint_name,
       m.name AS table_name,
       fk."from" AS column_name,
       fk."table" AS referenced_table,
       fk."to" AS referenced_column,
       fk.on_delete AS delete_rule,
       fk.on_update AS update_rule,
       MIN(fk.seq) AS first_seq
FROM sqlite_master m
JOIN pragma_foreign_key_list(m.name) fk
WHERE m.type = 'table'
  AND (m.name = ?1 OR fk."table" = ?1)
GROUP BY m.name, fk.id
"#;

const PG_VIEWS: &str = r#"
SELECT viewname AS view_name,
       definition AS definition,
       0 AS is_materialized
FROM pg_views
WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
  AND definition ILIKE '%' || $1 || '%'
UNION ALL
SELECT matviewname AS view_name,
       definition AS definition,
       1 AS is_materialized
FROM pg_matviews
WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
  AND definition ILIKE '%' || $1 || '%'
"#;

const SQLITE_VIEWS: &str = r#"
SELECT name AS view_name,
       sql AS definition,
       0 AS is_materialized
FROM sqlite_master
WHERE type = 'view'
  AND sql LIKE '%' || ?1 || '%'
"#;

const PG_INDEXES: &str = r#"
SELECT indexname AS index_name,
       indexdef AS definition
FROM pg_indexes
WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
  AND tablename = $1
"#;

// Index DDL is not always recorded in sqlite_master (indexes backing
// UNIQUE constraints have no sql), so a canonical definition is
// synthesized when it is missing.
const SQLITE_INDEXES: &str = r#"
SELECT il.name AS index_name,
       COALESCE(m.sql,
                CASE WHEN il."unique" = 1
                     THEN 'CREATE UNIQUE INDEX ' || il.name || ' ON ' || ?1
                     ELSE 'CREATE INDEX ' || il.name || ' ON ' || ?1
                END) AS definition
FROM pragma_index_list(?1) il
LEFT JOIN sqlite_master m
  ON m.type = 'index' AND m.name = il.name
WHERE il.origin != 'pk'
"#;

const PG_TRIGGERS: &str = r#"
SELECT trigger_name AS trigger_name,
       action_statement AS definition
FROM information_schema.triggers
WHERE event_object_table = $1
"#;

const SQLITE_TRIGGERS: &str = r#"
SELECT name AS trigger_name,
       sql AS definition
FROM sqlite_master
WHERE type = 'trigger'
  AND tbl_name = ?1
"#;

const PG_TABLE_EXISTS: &str = r#"
SELECT 1 AS present
FROM information_schema.tables
WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
  AND table_name = $1
LIMIT 1
"#;

const SQLITE_TABLE_EXISTS: &str = r#"
SELECT 1 AS present
FROM sqlite_master
WHERE type = 'table'
  AND name = ?1
LIMIT 1
"#;

/// Read-only catalog access for one database.
#[derive(Clone)]
pub struct SchemaIntrospector {
    manager: Arc<dyn ConnectionManager>,
    cache: Arc<SchemaStateCache>,
}

impl SchemaIntrospector {
    pub fn new(manager: Arc<dyn ConnectionManager>, cache: Arc<SchemaStateCache>) -> Self {
        Self { manager, cache }
    }

    pub fn dialect(&self) -> Dialect {
        self.manager.dialect()
    }

    /// Foreign keys where `table` is either side of the constraint.
    pub async fn find_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyRow>> {
        let table = sanitize_identifier(table);
        let sql = match self.dialect() {
            Dialect::Postgres => PG_FOREIGN_KEYS,
            Dialect::Sqlite => SQLITE_FOREIGN_KEYS,
        };
        self.fetch_rows(sql, table).await
    }

    /// Views whose definition mentions `table`.
    pub async fn find_views(&self, table: &str) -> Result<Vec<ViewRow>> {
        let table = sanitize_identifier(table);
        let sql = match self.dialect() {
            Dialect::Postgres => PG_VIEWS,
            Dialect::Sqlite => SQLITE_VIEWS,
        };
        self.fetch_rows(sql, table).await
    }

    pub async fn find_indexes(&self, table: &str) -> Result<Vec<IndexRow>> {
        let table = sanitize_identifier(table);
        let sql = match self.dialect() {
            Dialect::Postgres => PG_INDEXES,
            Dialect::Sqlite => SQLITE_INDEXES,
        };
        self.fetch_rows(sql, table).await
    }

    pub async fn find_triggers(&self, table: &str) -> Result<Vec<TriggerRow>> {
        let table = sanitize_identifier(table);
        let sql = match self.dialect() {
            Dialect::Postgres => PG_TRIGGERS,
            Dialect::Sqlite => SQLITE_TRIGGERS,
        };
        self.fetch_rows(sql, table).await
    }

    /// Existence probe, memoized until the next DDL invalidation.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let table = sanitize_identifier(table);
        if let Some(cached) = self.cache.table_exists(&table) {
            return Ok(cached);
        }
        let sql = match self.dialect() {
            Dialect::Postgres => PG_TABLE_EXISTS,
            Dialect::Sqlite => SQLITE_TABLE_EXISTS,
        };
        let rows = self.fetch_raw(sql, table.clone()).await?;
        let exists = !rows.is_empty();
        self.cache.record_table_exists(&table, exists);
        Ok(exists)
    }

    async fn fetch_rows<T: serde::de::DeserializeOwned>(
        &self,
        sql: &str,
        table: String,
    ) -> Result<Vec<T>> {
        let rows = self.fetch_raw(sql, table).await?;
        from_rows(rows).map_err(Error::Introspection)
    }

    async fn fetch_raw(&self, sql: &str, table: String) -> Result<Vec<Value>> {
        let mut conn = self.manager.acquire().await.map_err(Error::Introspection)?;
        let rows = conn
            .fetch(sql, &[Value::String(table)])
            .await
            .map_err(Error::Introspection)?;
        tracing::trace!(rows = rows.len(), "catalog query returned");
        Ok(rows)
    }
}
