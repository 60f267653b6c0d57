//! Per-script detail dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::classifier::ClassifiedStatement;
use crate::types::{TableIdentity, TableKind};

/// A table node of the detail graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub identity: TableIdentity,
    pub kind: TableKind,
}

/// One `source -> target` edge contributed by a statement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub statement_index: u32,
}

/// Directed multigraph of one script: an edge per (source, target, statement).
///
/// Nodes are keyed by table id, so iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DetailGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    outgoing: BTreeMap<String, BTreeSet<String>>,
    in_degree: BTreeMap<String, usize>,
    out_degree: BTreeMap<String, usize>,
}

/// Node and edge counts of a detail graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub entity_nodes: usize,
    pub temp_nodes: usize,
}

impl DetailGraph {
    pub fn build(statements: &[ClassifiedStatement]) -> Self {
        let mut graph = Self::default();
        for statement in statements {
            graph.add_node(statement.target.clone(), statement.target_kind);
            for source in &statement.sources {
                let kind = if source.is_entity() {
                    TableKind::Table
                } else {
                    TableKind::Temp
                };
                graph.add_node(source.clone(), kind);
                graph.add_edge(&source.id(), &statement.target.id(), statement.index);
            }
        }
        graph
    }

    /// Adds a node; the first kind seen for an id wins.
    pub fn add_node(&mut self, identity: TableIdentity, kind: TableKind) {
        let id = identity.id();
        self.nodes
            .entry(id)
            .or_insert(GraphNode { identity, kind });
    }

    pub fn add_edge(&mut self, source: &str, target: &str, statement_index: u32) {
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            statement_index,
        });
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
        *self.out_degree.entry(source.to_string()).or_default() += 1;
        *self.in_degree.entry(target.to_string()).or_default() += 1;
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &GraphNode)> {
        self.nodes.iter().map(|(id, node)| (id.as_str(), node))
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn is_entity(&self, id: &str) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|node| node.identity.is_entity())
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.in_degree.get(id).copied().unwrap_or(0)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.out_degree.get(id).copied().unwrap_or(0)
    }

    /// Distinct successors of `id`, sorted.
    pub fn successors(&self, id: &str) -> impl Iterator<Item = &str> {
        self.outgoing
            .get(id)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    /// Adjacency of the deduplicated `(source, target)` projection.
    pub fn adjacency(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.outgoing
    }

    /// Deduplicated `(source, target)` pairs, before any entity filtering.
    pub fn projected_pairs(&self) -> BTreeSet<(String, String)> {
        self.edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let entity_nodes = self
            .nodes
            .values()
            .filter(|n| n.identity.is_entity())
            .count();
        GraphStats {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            entity_nodes,
            temp_nodes: self.nodes.len() - entity_nodes,
        }
    }
}
