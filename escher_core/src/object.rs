//! Typed schema objects and their impact classification.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The kinds of database objects that can depend on a table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectType {
    ForeignKey,
    View,
    Index,
    Trigger,
    Constraint,
}

/// Ordinal severity of altering an object's parent table.
///
/// Variant order is the severity order, so `Ord` comparisons and `max()`
/// work directly on the enum.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImpactLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

/// A single database object that depends on the table under analysis.
///
/// `impact_level` is computed from `object_type` and `definition` at
/// construction time and is not settable from outside, so a stored level
/// can never disagree with the classification rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaObject {
    object_name: String,
    object_type: ObjectType,
    definition: String,
    /// Table the object is attached to. For a foreign key this is the
    /// child table carrying the constraint; for views, indexes and
    /// triggers it is the table under analysis.
    depends_on_table: String,
    /// For foreign keys, the parent table the constraint points at.
    references_table: Option<String>,
    impact_level: ImpactLevel,
}

impl SchemaObject {
    pub fn new(
        object_name: impl Into<String>,
        object_type: ObjectType,
        definition: impl Into<String>,
        depends_on_table: impl Into<String>,
        references_table: Option<String>,
    ) -> Self {
        let definition = definition.into();
        let impact_level = classify(object_type, &definition);
        Self {
            object_name: object_name.into(),
            object_type,
            definition,
            depends_on_table: depends_on_table.into(),
            references_table,
            impact_level,
        }
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn depends_on_table(&self) -> &str {
        &self.depends_on_table
    }

    pub fn references_table(&self) -> Option<&str> {
        self.references_table.as_deref()
    }

    pub fn impact_level(&self) -> ImpactLevel {
        self.impact_level
    }
}

/// Decoding reclassifies from the decoded type and definition; an
/// `impact_level` present in the input is ignored.
impl<'de> Deserialize<'de> for SchemaObject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wire {
            object_name: String,
            object_type: ObjectType,
            definition: String,
            depends_on_table: String,
            references_table: Option<String>,
        }

        let wire = Wire::deserialize(deserializer)?;
        Ok(SchemaObject::new(
            wire.object_name,
            wire.object_type,
            wire.definition,
            wire.depends_on_table,
            wire.references_table,
        ))
    }
}

/// Classification rules, evaluated most severe first.
///
/// Views carry a floor of HIGH regardless of how trivial the view body
/// is; loosening that floor needs calibration against real schemas
/// before it is safe.
fn classify(object_type: ObjectType, definition: &str) -> ImpactLevel {
    let definition = definition.to_uppercase();
    match object_type {
        ObjectType::ForeignKey => {
            if definition.contains("ON DELETE CASCADE") || definition.contains("ON UPDATE CASCADE")
            {
                ImpactLevel::Critical
            } else {
                ImpactLevel::High
            }
        }
        ObjectType::View => ImpactLevel::High,
        ObjectType::Index => {
            if definition.contains("UNIQUE INDEX") {
                ImpactLevel::High
            } else {
                ImpactLevel::Medium
            }
        }
        ObjectType::Trigger => ImpactLevel::High,
        ObjectType::Constraint => ImpactLevel::Medium,
    }
}
