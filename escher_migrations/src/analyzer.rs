//! Turns raw catalog rows into classified schema objects.

use std::collections::HashSet;

use escher_core::identifier::sanitize_identifier;
use escher_core::object::{ObjectType, SchemaObject};

use crate::error::Result;
use crate::introspection::{ForeignKeyRow, SchemaIntrospector, ViewRow};

#[derive(Clone)]
pub struct DependencyAnalyzer {
    introspector: SchemaIntrospector,
}

impl DependencyAnalyzer {
    pub fn new(introspector: SchemaIntrospector) -> Self {
        Self { introspector }
    }

    /// Everything that depends on `table`: foreign keys on either side,
    /// views selecting from it, its indexes and its triggers.
    ///
    /// A table with no dependents (including one that does not exist)
    /// yields an empty list; absence of dependents is an answer, not an
    /// error.
    pub async fn discover_schema_objects(&self, table: &str) -> Result<Vec<SchemaObject>> {
        let table = sanitize_identifier(table);
        let mut objects = Vec::new();

        // Catalog queries can return one row per constraint column or
        // per trigger event, so each kind dedups by object identity.
        // Constraint names are only unique within their child table, so
        // foreign keys key on name plus table.
        let mut seen = HashSet::new();
        for row in self.introspector.find_foreign_keys(&table).await? {
            if !seen.insert((row.constraint_name.clone(), row.table_name.clone())) {
                continue;
            }
            let definition = foreign_key_definition(&row);
            objects.push(SchemaObject::new(
                row.constraint_name,
                ObjectType::ForeignKey,
                definition,
                row.table_name,
                Some(row.referenced_table),
            ));
        }

        let mut seen = HashSet::new();
        for row in self.introspector.find_views(&table).await? {
            if !seen.insert(row.view_name.clone()) {
                continue;
            }
            let definition = view_definition(&row);
            objects.push(SchemaObject::new(
                row.view_name,
                ObjectType::View,
                definition,
                table.clone(),
                None,
            ));
        }

        let mut seen = HashSet::new();
        for row in self.introspector.find_indexes(&table).await? {
            if !seen.insert(row.index_name.clone()) {
                continue;
            }
            let definition = row
                .definition
                .unwrap_or_else(|| format!("CREATE INDEX {} ON {}", row.index_name, table));
            objects.push(SchemaObject::new(
                row.index_name,
                ObjectType::Index,
                definition,
                table.clone(),
                None,
            ));
        }

        let mut seen = HashSet::new();
        for row in self.introspector.find_triggers(&table).await? {
            if !seen.insert(row.trigger_name.clone()) {
                continue;
            }
            objects.push(SchemaObject::new(
                row.trigger_name,
                ObjectType::Trigger,
                row.definition.unwrap_or_default(),
                table.clone(),
                None,
            ));
        }

        tracing::debug!(table = %table, objects = objects.len(), "dependency discovery finished");
        Ok(objects)
    }
}

/// Canonical constraint text carrying the referential actions, so the
/// CASCADE classification can read them back out.
fn foreign_key_definition(row: &ForeignKeyRow) -> String {
    let mut definition = format!(
        "FOREIGN KEY ({}) REFERENCES {}({})",
        row.column_name.as_deref().unwrap_or("?"),
        row.referenced_table,
        row.referenced_column.as_deref().unwrap_or("?"),
    );
    if let Some(rule) = row.delete_rule.as_deref() {
        if rule != "NO ACTION" {
            definition.push_str(&format!(" ON DELETE {rule}"));
        }
    }
    if let Some(rule) = row.update_rule.as_deref() {
        if rule != "NO ACTION" {
            definition.push_str(&format!(" ON UPDATE {rule}"));
        }
    }
    definition
}

fn view_definition(row: &ViewRow) -> String {
    let body = row.definition.as_deref().unwrap_or("").trim();
    // SQLite stores the full DDL already; Postgres catalogs store only
    // the SELECT body.
    if body.to_uppercase().starts_with("CREATE") {
        return body.to_string();
    }
    let keyword = if row.is_materialized != 0 {
        "MATERIALIZED VIEW"
    } else {
        "VIEW"
    };
    format!("CREATE {keyword} {} AS {body}", row.view_name)
}
