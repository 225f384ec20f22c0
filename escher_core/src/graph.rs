//! Dependency graph construction and cycle detection.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::object::{ImpactLevel, ObjectType, SchemaObject};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

impl DependencyEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Directed graph of a table and the objects depending on it.
///
/// Built once per analysis and never mutated afterwards; cycle detection
/// runs during construction and the verdict is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    root_table: String,
    nodes: Vec<SchemaObject>,
    edges: Vec<DependencyEdge>,
    circular_dependency_detected: bool,
}

impl DependencyGraph {
    /// Builds the graph for `root_table`.
    ///
    /// Every object gets an edge from the root. Two foreign keys that tie
    /// the same pair of tables in opposite directions additionally get
    /// edges between each other, which is what makes a mutual reference
    /// show up as a cycle. Malformed input never fails construction; it
    /// just contributes no extra edges.
    pub fn build(root_table: impl Into<String>, nodes: Vec<SchemaObject>) -> Self {
        let root_table = root_table.into();
        let mut edges = Vec::new();
        let mut seen = HashSet::new();

        let mut push = |edges: &mut Vec<DependencyEdge>, from: &str, to: &str| {
            if seen.insert((from.to_string(), to.to_string())) {
                edges.push(DependencyEdge::new(from, to));
            }
        };

        for node in &nodes {
            push(&mut edges, &root_table, node.object_name());
        }

        for (i, a) in nodes.iter().enumerate() {
            for b in nodes.iter().skip(i + 1) {
                if !mutually_referencing(a, b) {
                    continue;
                }
                push(&mut edges, a.object_name(), b.object_name());
                push(&mut edges, b.object_name(), a.object_name());
            }
        }

        let circular_dependency_detected = contains_cycle(&edges);
        Self {
            root_table,
            nodes,
            edges,
            circular_dependency_detected,
        }
    }

    pub fn root_table(&self) -> &str {
        &self.root_table
    }

    pub fn nodes(&self) -> &[SchemaObject] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn has_circular_dependencies(&self) -> bool {
        self.circular_dependency_detected
    }

    /// All nodes classified CRITICAL, in discovery order.
    pub fn get_critical_dependencies(&self) -> Vec<&SchemaObject> {
        self.nodes
            .iter()
            .filter(|node| node.impact_level() == ImpactLevel::Critical)
            .collect()
    }
}

fn mutually_referencing(a: &SchemaObject, b: &SchemaObject) -> bool {
    if a.object_type() != ObjectType::ForeignKey || b.object_type() != ObjectType::ForeignKey {
        return false;
    }
    a.references_table() == Some(b.depends_on_table())
        && b.references_table() == Some(a.depends_on_table())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color depth-first search. An edge into a gray node means the
/// traversal re-entered its own active path, which is a cycle.
fn contains_cycle(edges: &[DependencyEdge]) -> bool {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut colors: HashMap<&str, Color> = HashMap::new();
    for edge in edges {
        adjacency.entry(&edge.from).or_default().push(&edge.to);
        colors.insert(&edge.from, Color::White);
        colors.insert(&edge.to, Color::White);
    }

    fn visit<'a>(
        node: &'a str,
        adjacency: &HashMap<&'a str, Vec<&'a str>>,
        colors: &mut HashMap<&'a str, Color>,
    ) -> bool {
        colors.insert(node, Color::Gray);
        for &next in adjacency.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            match colors.get(next).copied().unwrap_or(Color::White) {
                Color::Gray => return true,
                Color::White => {
                    if visit(next, adjacency, colors) {
                        return true;
                    }
                }
                Color::Black => {}
            }
        }
        colors.insert(node, Color::Black);
        false
    }

    let nodes: Vec<&str> = colors.keys().copied().collect();
    for node in nodes {
        if colors.get(node).copied() == Some(Color::White) && visit(node, &adjacency, &mut colors)
        {
            return true;
        }
    }
    false
}
