//! Reduction of discovered objects to an overall risk verdict.

use serde::{Deserialize, Serialize};

use crate::object::{ImpactLevel, SchemaObject};

/// Default number of dependent objects above which a change needs
/// coordination even when no single object is high-risk.
pub const DEFAULT_COORDINATION_THRESHOLD: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub overall_risk: ImpactLevel,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub total_objects: usize,
    pub requires_coordination: bool,
}

impl ImpactSummary {
    /// Pure reduction over `objects`: per-level counts, overall risk as
    /// the maximum level present (SAFE only when the set is empty), and
    /// the coordination flag when risk reaches HIGH or the object count
    /// exceeds `coordination_threshold`.
    pub fn summarize(objects: &[SchemaObject], coordination_threshold: usize) -> Self {
        let overall_risk = objects
            .iter()
            .map(SchemaObject::impact_level)
            .max()
            .unwrap_or(ImpactLevel::Safe);
        let count = |level: ImpactLevel| {
            objects
                .iter()
                .filter(|object| object.impact_level() == level)
                .count()
        };
        let total_objects = objects.len();
        Self {
            overall_risk,
            critical_count: count(ImpactLevel::Critical),
            high_count: count(ImpactLevel::High),
            medium_count: count(ImpactLevel::Medium),
            low_count: count(ImpactLevel::Low),
            total_objects,
            requires_coordination: overall_risk >= ImpactLevel::High
                || total_objects > coordination_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::object::ObjectType;

    fn index(name: &str) -> SchemaObject {
        SchemaObject::new(
            name,
            ObjectType::Index,
            format!("CREATE INDEX {name} ON users (id)"),
            "users",
            None,
        )
    }

    #[test]
    fn empty_set_is_safe() {
        let summary = ImpactSummary::summarize(&[], DEFAULT_COORDINATION_THRESHOLD);
        assert_eq!(summary.overall_risk, ImpactLevel::Safe);
        assert_eq!(summary.total_objects, 0);
        assert!(!summary.requires_coordination);
    }

    #[test]
    fn single_critical_object_dominates() {
        let objects = vec![
            index("users_a_idx"),
            SchemaObject::new(
                "orders_user_id_fkey",
                ObjectType::ForeignKey,
                "FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE",
                "orders",
                Some("users".into()),
            ),
        ];
        let summary = ImpactSummary::summarize(&objects, DEFAULT_COORDINATION_THRESHOLD);
        assert_eq!(summary.overall_risk, ImpactLevel::Critical);
        assert_eq!(summary.critical_count, 1);
        assert_eq!(summary.medium_count, 1);
        assert!(summary.requires_coordination);
    }

    #[test]
    fn many_medium_objects_trip_the_coordination_threshold() {
        let objects: Vec<SchemaObject> = (0..6)
            .map(|i| index(&format!("users_idx_{i}")))
            .collect();
        let summary = ImpactSummary::summarize(&objects, DEFAULT_COORDINATION_THRESHOLD);
        assert_eq!(summary.overall_risk, ImpactLevel::Medium);
        assert_eq!(summary.total_objects, 6);
        assert!(summary.requires_coordination);
    }

    #[test]
    fn few_medium_objects_do_not_require_coordination() {
        let objects: Vec<SchemaObject> = (0..3)
            .map(|i| index(&format!("users_idx_{i}")))
            .collect();
        let summary = ImpactSummary::summarize(&objects, DEFAULT_COORDINATION_THRESHOLD);
        assert_eq!(summary.overall_risk, ImpactLevel::Medium);
        assert!(!summary.requires_coordination);
    }
}
