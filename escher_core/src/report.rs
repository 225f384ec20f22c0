//! Analysis reports and check verdicts.

use serde::{Deserialize, Serialize};
use strum::Display;
use time::OffsetDateTime;

use crate::graph::DependencyGraph;
use crate::impact::ImpactSummary;
use crate::object::{ImpactLevel, SchemaObject};

/// The kind of schema change a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    TableRename,
    ColumnRemoval,
}

/// Outcome of validating a proposed operation's identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub is_valid: bool,
    pub violations: Vec<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
        }
    }

    /// Valid exactly when `violations` is empty.
    pub fn from_violations(violations: Vec<String>) -> Self {
        Self {
            is_valid: violations.is_empty(),
            violations,
        }
    }
}

/// Verdict of a single post-change safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    pub passed: bool,
    pub severity: ImpactLevel,
    pub violations: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CheckResult {
    pub fn passed(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: true,
            severity: ImpactLevel::Safe,
            violations: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn failed(
        check_name: impl Into<String>,
        severity: ImpactLevel,
        violations: Vec<String>,
        recommendations: Vec<String>,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            passed: false,
            severity,
            violations,
            recommendations,
        }
    }
}

/// Full analysis of one proposed schema change.
///
/// Produced fresh per analysis call, never mutated afterwards, and safe
/// to serialize for audit trails or review tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub kind: ChangeKind,
    pub old_name: String,
    pub new_name: Option<String>,
    pub schema_objects: Vec<SchemaObject>,
    pub dependency_graph: DependencyGraph,
    pub impact_summary: ImpactSummary,
    pub validation: Validation,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

impl Report {
    pub fn new(
        kind: ChangeKind,
        old_name: impl Into<String>,
        new_name: Option<String>,
        schema_objects: Vec<SchemaObject>,
        dependency_graph: DependencyGraph,
        impact_summary: ImpactSummary,
        validation: Validation,
    ) -> Self {
        Self {
            kind,
            old_name: old_name.into(),
            new_name,
            schema_objects,
            dependency_graph,
            impact_summary,
            validation,
            generated_at: OffsetDateTime::now_utc(),
        }
    }
}
