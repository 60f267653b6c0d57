//! Detail and Summary lineage layers.
//!
//! The Detail layer is the per-statement graph as built, temporary tables
//! included. The Summary layer is derived from it by contracting every path
//! that runs through temporary tables into a single entity-to-entity edge.
//! The same contraction serves table-level and column-level lineage, since
//! entity-ness can be read off the identifiers alone.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::classifier::{ClassifiedStatement, ScriptScope};
use crate::error::{LineageError, Result};
use crate::graph::DetailGraph;
use crate::ids::{self, normalize_name};
use crate::types::{ColumnDetailEdge, ColumnMapping, ColumnSummaryEdge, DetailEdge, SummaryEdge};

/// Adjacency of a deduplicated `(source, target)` projection.
pub type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// Paths contracted into one `(source, target)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStats {
    pub count: u64,
    pub min_hops: u32,
    pub max_hops: u32,
}

impl PathStats {
    const DIRECT: Self = Self {
        count: 1,
        min_hops: 1,
        max_hops: 1,
    };

    fn extended(self) -> Self {
        Self {
            count: self.count,
            min_hops: self.min_hops.saturating_add(1),
            max_hops: self.max_hops.saturating_add(1),
        }
    }

    fn absorb(&mut self, other: Self) {
        self.count = self.count.saturating_add(other.count);
        self.min_hops = self.min_hops.min(other.min_hops);
        self.max_hops = self.max_hops.max(other.max_hops);
    }
}

/// Entity nodes reachable from one node through temporaries only.
type Reach<'a> = BTreeMap<&'a str, PathStats>;

fn add_reach<'a>(reach: &mut Reach<'a>, node: &'a str, stats: PathStats) {
    reach
        .entry(node)
        .and_modify(|known| known.absorb(stats))
        .or_insert(stats);
}

/// Reach of a node from its successors; temporary successors must already be in `memo`.
fn reach_through<'a>(
    successors: Option<&'a BTreeSet<String>>,
    is_entity: &impl Fn(&str) -> bool,
    memo: &HashMap<&'a str, Reach<'a>>,
) -> Reach<'a> {
    let mut reach = Reach::new();
    for next in successors.into_iter().flatten() {
        let next = next.as_str();
        if is_entity(next) {
            add_reach(&mut reach, next, PathStats::DIRECT);
        } else if let Some(beyond) = memo.get(next) {
            for (&entity, &stats) in beyond {
                add_reach(&mut reach, entity, stats.extended());
            }
        }
    }
    reach
}

enum Step<'a> {
    Enter(&'a str, usize),
    Leave(&'a str),
}

/// Contracts temporary nodes out of `adjacency`.
///
/// Every entity node is a start. Its successors are walked depth first:
/// temporary nodes are passed through, and reaching an entity node emits
/// `(start, node)` and ends that path. A temporary node met again on the
/// current path, or a path longer than `limit`, fails with
/// [`LineageError::LineageCycle`].
///
/// Each pair carries the number of distinct paths it contracts and their
/// shortest and longest length in edges.
pub fn contract(
    adjacency: &Adjacency,
    is_entity: impl Fn(&str) -> bool,
    script: &str,
    limit: usize,
) -> Result<BTreeMap<(String, String), PathStats>> {
    let mut pairs = BTreeMap::new();
    // reach of a fully explored temporary node does not depend on the start
    let mut memo: HashMap<&str, Reach<'_>> = HashMap::new();

    for (start, successors) in adjacency {
        if !is_entity(start) {
            continue;
        }
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut expanded: HashSet<&str> = HashSet::new();
        let mut stack: Vec<Step<'_>> = successors
            .iter()
            .rev()
            .map(|next| Step::Enter(next.as_str(), 1))
            .collect();

        while let Some(step) = stack.pop() {
            let (node, depth) = match step {
                Step::Leave(node) => {
                    on_path.remove(node);
                    if !memo.contains_key(node) {
                        let reach = reach_through(adjacency.get(node), &is_entity, &memo);
                        memo.insert(node, reach);
                    }
                    continue;
                }
                Step::Enter(node, depth) => (node, depth),
            };

            if is_entity(node) {
                continue;
            }
            if on_path.contains(node) || depth > limit {
                return Err(LineageError::LineageCycle {
                    script: script.to_string(),
                    start: start.clone(),
                    node: node.to_string(),
                    limit,
                });
            }
            if !expanded.insert(node) {
                continue;
            }

            on_path.insert(node);
            stack.push(Step::Leave(node));
            if let Some(next) = adjacency.get(node) {
                stack.extend(next.iter().rev().map(|n| Step::Enter(n.as_str(), depth + 1)));
            }
        }

        for (target, stats) in reach_through(Some(successors), &is_entity, &memo) {
            if target != start.as_str() {
                pairs.insert((start.clone(), target.to_string()), stats);
            }
        }
    }

    Ok(pairs)
}

/// Detail edges of a script graph, one per `(statement, source, target)`.
pub fn detail_edges(graph: &DetailGraph, script_id: &str) -> Vec<DetailEdge> {
    let mut edges: Vec<DetailEdge> = graph
        .edges()
        .iter()
        .map(|edge| {
            let statement_id = ids::statement_id(script_id, edge.statement_index);
            DetailEdge {
                id: ids::detail_edge_id(&statement_id, &edge.source, &edge.target),
                source_table_id: edge.source.clone(),
                target_table_id: edge.target.clone(),
                script_id: script_id.to_string(),
                statement_id,
            }
        })
        .collect();
    edges.sort();
    edges.dedup_by(|a, b| a.id == b.id);
    edges
}

/// Derives the Summary layer of a script from its Detail graph.
pub fn derive_summary(graph: &DetailGraph, script_id: &str, limit: usize) -> Result<Vec<SummaryEdge>> {
    let pairs = contract(graph.adjacency(), |id| graph.is_entity(id), script_id, limit)?;
    #[cfg(feature = "tracing")]
    debug!(target: "lineage", "script {}: {} detail edges contracted into {} summary edges", script_id, graph.edges().len(), pairs.len());
    Ok(summary_edges(pairs, script_id))
}

/// Recomputes the Summary layer from persisted Detail edges.
///
/// Yields the same edges [`derive_summary`] produced when the Detail edges
/// were written.
pub fn summarize_detail(
    edges: &[DetailEdge],
    script_id: &str,
    limit: usize,
) -> Result<Vec<SummaryEdge>> {
    let adjacency = adjacency_of(
        edges
            .iter()
            .map(|e| (e.source_table_id.as_str(), e.target_table_id.as_str())),
    );
    let pairs = contract(&adjacency, ids::is_entity_table_id, script_id, limit)?;
    Ok(summary_edges(pairs, script_id))
}

fn summary_edges(pairs: BTreeMap<(String, String), PathStats>, script_id: &str) -> Vec<SummaryEdge> {
    let mut edges: Vec<SummaryEdge> = pairs
        .into_iter()
        .map(|((source, target), stats)| SummaryEdge {
            id: ids::summary_edge_id(&target, &source, script_id),
            source_table_id: source,
            target_table_id: target,
            script_id: script_id.to_string(),
            path_count: stats.count,
            min_hops: stats.min_hops,
            max_hops: stats.max_hops,
        })
        .collect();
    edges.sort();
    edges
}

fn adjacency_of<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for (source, target) in pairs {
        adjacency
            .entry(source.to_string())
            .or_default()
            .insert(target.to_string());
    }
    adjacency
}

/// Column-level Detail edges contributed by one statement.
///
/// A source column maps onto a target column of the statement's target table.
/// Self references (`SET a = a + 1`) carry no lineage and are dropped.
pub fn column_detail_edges(
    statement: &ClassifiedStatement,
    mappings: &[ColumnMapping],
    scope: &ScriptScope,
    script_id: &str,
) -> Vec<ColumnDetailEdge> {
    let target_table = statement.target.id();
    let statement_id = ids::statement_id(script_id, statement.index);
    let mut edges = BTreeMap::new();

    for mapping in mappings {
        let target_name = normalize_name(&mapping.target);
        if target_name.is_empty() {
            continue;
        }
        let target_column = ids::column_id(&target_table, &target_name);
        for source in &mapping.sources {
            let source_name = normalize_name(&source.column);
            if source_name.is_empty() {
                continue;
            }
            let source_table = scope.resolve_source(&source.table).id();
            let source_column = ids::column_id(&source_table, &source_name);
            if source_column == target_column {
                continue;
            }
            let id = ids::detail_edge_id(&statement_id, &source_column, &target_column);
            edges.entry(id.clone()).or_insert_with(|| ColumnDetailEdge {
                id,
                source_column_id: source_column,
                target_column_id: target_column.clone(),
                script_id: script_id.to_string(),
                statement_id: statement_id.clone(),
            });
        }
    }

    edges.into_values().collect()
}

/// Derives column-level Summary edges from column-level Detail edges.
pub fn derive_column_summary(
    edges: &[ColumnDetailEdge],
    script_id: &str,
    limit: usize,
) -> Result<Vec<ColumnSummaryEdge>> {
    let adjacency = adjacency_of(
        edges
            .iter()
            .map(|e| (e.source_column_id.as_str(), e.target_column_id.as_str())),
    );
    let is_entity_column = |id: &str| {
        ids::split_column_id(id).is_some_and(|(table, _)| ids::is_entity_table_id(table))
    };
    let pairs = contract(&adjacency, is_entity_column, script_id, limit)?;

    let mut summary: Vec<ColumnSummaryEdge> = pairs
        .into_keys()
        .map(|(source, target)| ColumnSummaryEdge {
            id: ids::summary_edge_id(&target, &source, script_id),
            source_column_id: source,
            target_column_id: target,
            script_id: script_id.to_string(),
        })
        .collect();
    summary.sort();
    Ok(summary)
}
