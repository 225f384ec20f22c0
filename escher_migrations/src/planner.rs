//! Read-only planners for proposed schema changes.
//!
//! Planners compose discovery, graph construction and risk aggregation
//! into a [`Report`]. They never execute anything: the report describes
//! what would happen if the change ran.

use escher_core::config::SafetyConfig;
use escher_core::graph::DependencyGraph;
use escher_core::identifier::{
    contains_sql_metacharacters, is_valid_identifier, sanitize_identifier,
};
use escher_core::impact::ImpactSummary;
use escher_core::object::{ObjectType, SchemaObject};
use escher_core::report::{ChangeKind, Report, Validation};

use crate::analyzer::DependencyAnalyzer;
use crate::error::Result;

/// Validates a proposed rename on the raw, pre-sanitization input.
///
/// Running on raw input matters: an injected payload must be rejected
/// outright, not silently stripped into a plausible identifier.
pub fn validate_rename_operation(old: &str, new: &str) -> Validation {
    let mut violations = identifier_violations("old name", old);
    violations.extend(identifier_violations("new name", new));
    if !old.is_empty() && old == new {
        violations.push("old and new names are identical".to_string());
    }
    Validation::from_violations(violations)
}

fn identifier_violations(label: &str, value: &str) -> Vec<String> {
    if value.is_empty() {
        return vec![format!("{label} is empty")];
    }
    let mut violations = Vec::new();
    if contains_sql_metacharacters(value) {
        violations.push(format!("{label} contains SQL metacharacters"));
    }
    if !is_valid_identifier(value) {
        violations.push(format!("{label} is not a valid SQL identifier"));
    }
    violations
}

#[derive(Clone)]
pub struct ChangePlanner {
    analyzer: DependencyAnalyzer,
    config: SafetyConfig,
}

impl ChangePlanner {
    pub fn new(analyzer: DependencyAnalyzer, config: SafetyConfig) -> Self {
        Self { analyzer, config }
    }

    /// Full impact analysis of renaming `old` to `new`.
    ///
    /// Invalid identifiers short-circuit into a report with no objects,
    /// SAFE risk and `validation.is_valid == false`; discovery never
    /// runs on rejected input.
    pub async fn analyze_table_rename(&self, old: &str, new: &str) -> Result<Report> {
        let validation = validate_rename_operation(old, new);
        if !validation.is_valid {
            tracing::warn!(violations = validation.violations.len(), "rename rejected");
            return Ok(self.build_report(
                ChangeKind::TableRename,
                &sanitize_identifier(old),
                old.to_string(),
                Some(new.to_string()),
                Vec::new(),
                validation,
            ));
        }
        let objects = self.analyzer.discover_schema_objects(old).await?;
        Ok(self.build_report(
            ChangeKind::TableRename,
            old,
            old.to_string(),
            Some(new.to_string()),
            objects,
            validation,
        ))
    }

    /// Impact analysis of dropping `table.column`.
    ///
    /// Discovery runs table-wide, then keeps objects whose definition
    /// mentions the column. Triggers are always kept: their bodies do
    /// not reliably name the columns they touch.
    pub async fn plan_column_removal(&self, table: &str, column: &str) -> Result<Report> {
        let mut violations = identifier_violations("table name", table);
        violations.extend(identifier_violations("column name", column));
        let validation = Validation::from_violations(violations);
        let old_name = format!("{table}.{column}");

        if !validation.is_valid {
            tracing::warn!(violations = validation.violations.len(), "column removal rejected");
            return Ok(self.build_report(
                ChangeKind::ColumnRemoval,
                &sanitize_identifier(table),
                old_name,
                None,
                Vec::new(),
                validation,
            ));
        }

        let objects = self.analyzer.discover_schema_objects(table).await?;
        let column_lower = column.to_lowercase();
        let objects: Vec<SchemaObject> = objects
            .into_iter()
            .filter(|object| {
                object.object_type() == ObjectType::Trigger
                    || object.definition().to_lowercase().contains(&column_lower)
            })
            .collect();
        Ok(self.build_report(
            ChangeKind::ColumnRemoval,
            table,
            old_name,
            None,
            objects,
            validation,
        ))
    }

    fn build_report(
        &self,
        kind: ChangeKind,
        root_table: &str,
        old_name: String,
        new_name: Option<String>,
        objects: Vec<SchemaObject>,
        validation: Validation,
    ) -> Report {
        let dependency_graph = DependencyGraph::build(root_table, objects.clone());
        let impact_summary =
            ImpactSummary::summarize(dependency_graph.nodes(), self.config.coordination_threshold);
        Report::new(
            kind,
            old_name,
            new_name,
            objects,
            dependency_graph,
            impact_summary,
            validation,
        )
    }
}
