//! Post-change integrity checks.
//!
//! These run after a structural change (or speculatively before
//! committing one) and always produce a [`CheckResult`]. A database
//! failure mid-check is itself a failed check, not an error return:
//! callers of safety checks must always get a verdict to act on.

use std::collections::HashSet;

use escher_core::identifier::sanitize_identifier;
use escher_core::object::ImpactLevel;
use escher_core::report::CheckResult;

use crate::error::Error;
use crate::introspection::SchemaIntrospector;

pub const FOREIGN_KEY_CHECK: &str = "foreign_key_references";
pub const VIEW_CHECK: &str = "view_references";

#[derive(Clone)]
pub struct SafetyValidator {
    introspector: SchemaIntrospector,
}

impl SafetyValidator {
    pub fn new(introspector: SchemaIntrospector) -> Self {
        Self { introspector }
    }

    /// After renaming `old` to `new`, no foreign key may still involve
    /// `old` on either side.
    pub async fn validate_foreign_keys(&self, old: &str, new: &str) -> CheckResult {
        let old = sanitize_identifier(old);
        let new = sanitize_identifier(new);
        let rows = match self.introspector.find_foreign_keys(&old).await {
            Ok(rows) => rows,
            Err(error) => return check_unavailable(FOREIGN_KEY_CHECK, &error),
        };

        let mut seen = HashSet::new();
        let mut violations = Vec::new();
        let mut recommendations = Vec::new();
        for row in rows {
            // Constraint names are only unique within their child table.
            if !seen.insert((row.constraint_name.clone(), row.table_name.clone())) {
                continue;
            }
            violations.push(format!(
                "constraint {} on table {} still references {}",
                row.constraint_name, row.table_name, old
            ));
            recommendations.push(format!(
                "recreate constraint {} on {} against table {}",
                row.constraint_name, row.table_name, new
            ));
        }

        if violations.is_empty() {
            CheckResult::passed(FOREIGN_KEY_CHECK)
        } else {
            CheckResult::failed(
                FOREIGN_KEY_CHECK,
                ImpactLevel::Critical,
                violations,
                recommendations,
            )
        }
    }

    /// After renaming `old` to `new`, no view definition may still
    /// mention `old`. The comparison is textual, matching how the
    /// discovery queries find views in the first place.
    pub async fn validate_views(&self, old: &str, new: &str) -> CheckResult {
        let old = sanitize_identifier(old);
        let new = sanitize_identifier(new);
        let rows = match self.introspector.find_views(&old).await {
            Ok(rows) => rows,
            Err(error) => return check_unavailable(VIEW_CHECK, &error),
        };

        let mut seen = HashSet::new();
        let mut violations = Vec::new();
        let mut recommendations = Vec::new();
        for row in rows {
            if !seen.insert(row.view_name.clone()) {
                continue;
            }
            violations.push(format!(
                "view {} still references {} in its definition",
                row.view_name, old
            ));
            recommendations.push(format!(
                "recreate view {} against table {}",
                row.view_name, new
            ));
        }

        if violations.is_empty() {
            CheckResult::passed(VIEW_CHECK)
        } else {
            CheckResult::failed(VIEW_CHECK, ImpactLevel::High, violations, recommendations)
        }
    }

    /// Runs every check and collects the verdicts.
    pub async fn run_safety_checks(&self, old: &str, new: &str) -> Vec<CheckResult> {
        let results = vec![
            self.validate_foreign_keys(old, new).await,
            self.validate_views(old, new).await,
        ];
        let failed = results.iter().filter(|result| !result.passed).count();
        if failed > 0 {
            tracing::warn!(failed, "safety checks reported violations");
        }
        results
    }
}

fn check_unavailable(check_name: &str, error: &Error) -> CheckResult {
    tracing::error!(check = check_name, %error, "safety check could not reach the database");
    CheckResult::failed(
        check_name,
        ImpactLevel::Critical,
        vec![format!("check could not run: {error}")],
        vec!["restore database connectivity and re-run the safety checks".to_string()],
    )
}
