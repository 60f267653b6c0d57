//! Target and source selection for a script's detail graph.

use serde::Serialize;

use crate::error::{LineageError, Result};
use crate::graph::DetailGraph;
use crate::types::TableIdentity;

/// Which rule selected the target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetRule {
    /// Entity tables written by some statement.
    WrittenEntities,
    /// Tables nothing reads from.
    Sinks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub rule: TargetRule,
    pub targets: Vec<TableIdentity>,
    pub sources: Vec<TableIdentity>,
}

/// Picks the outputs and pure inputs of a script.
///
/// 1. entity tables with nonzero in-degree;
/// 2. otherwise, every table with zero out-degree;
/// 3. otherwise the script has no output and fails.
///
/// A graph without any entity table has no output either. Sources are all
/// tables with zero in-degree.
pub fn resolve_endpoints(graph: &DetailGraph, script: &str) -> Result<Endpoints> {
    let no_target = || LineageError::NoTargetIdentified {
        script: script.to_string(),
    };
    if graph.stats().entity_nodes == 0 {
        return Err(no_target());
    }

    let written: Vec<TableIdentity> = graph
        .nodes()
        .filter(|(id, node)| node.identity.is_entity() && graph.in_degree(id) > 0)
        .map(|(_, node)| node.identity.clone())
        .collect();

    let (rule, targets) = if !written.is_empty() {
        (TargetRule::WrittenEntities, written)
    } else {
        let sinks: Vec<TableIdentity> = graph
            .nodes()
            .filter(|(id, _)| graph.out_degree(id) == 0)
            .map(|(_, node)| node.identity.clone())
            .collect();
        if sinks.is_empty() {
            return Err(no_target());
        }
        (TargetRule::Sinks, sinks)
    };

    let sources = graph
        .nodes()
        .filter(|(id, _)| graph.in_degree(id) == 0)
        .map(|(_, node)| node.identity.clone())
        .collect();

    Ok(Endpoints {
        rule,
        targets,
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableKind;

    fn entity(name: &str) -> TableIdentity {
        TableIdentity::entity("s", name)
    }

    fn temp(name: &str) -> TableIdentity {
        TableIdentity::temporary("job", name)
    }

    fn graph(edges: &[(&TableIdentity, &TableIdentity)]) -> DetailGraph {
        let mut graph = DetailGraph::default();
        for (i, (source, target)) in edges.iter().enumerate() {
            for identity in [*source, *target] {
                let kind = if identity.is_entity() {
                    TableKind::Table
                } else {
                    TableKind::Temp
                };
                graph.add_node(identity.clone(), kind);
            }
            graph.add_edge(&source.id(), &target.id(), i as u32 + 1);
        }
        graph
    }

    #[test]
    fn written_entities_win_over_sinks() {
        let (a, b, c) = (entity("a"), entity("b"), entity("c"));
        let vt = temp("vt");
        // c is a sink with out-degree 0 too, but b is written
        let g = graph(&[(&a, &b), (&c, &vt)]);
        let endpoints = resolve_endpoints(&g, "JOB").unwrap();
        assert_eq!(endpoints.rule, TargetRule::WrittenEntities);
        assert_eq!(endpoints.targets, vec![b]);
        assert_eq!(endpoints.sources, vec![a, c]);
    }

    #[test]
    fn falls_back_to_sinks_when_no_entity_is_written() {
        let a = entity("a");
        let (t1, t2) = (temp("t1"), temp("t2"));
        let g = graph(&[(&a, &t1), (&t1, &t2)]);
        let endpoints = resolve_endpoints(&g, "JOB").unwrap();
        assert_eq!(endpoints.rule, TargetRule::Sinks);
        assert_eq!(endpoints.targets, vec![t2]);
    }

    #[test]
    fn isolated_entity_is_both_target_and_source() {
        let mut g = DetailGraph::default();
        g.add_node(entity("t"), TableKind::Table);
        let endpoints = resolve_endpoints(&g, "JOB").unwrap();
        assert_eq!(endpoints.rule, TargetRule::Sinks);
        assert_eq!(endpoints.targets, vec![entity("t")]);
        assert_eq!(endpoints.sources, vec![entity("t")]);
    }

    #[test]
    fn script_without_entity_tables_has_no_target() {
        let (t1, t2) = (temp("t1"), temp("t2"));
        let g = graph(&[(&t1, &t2)]);
        let err = resolve_endpoints(&g, "JOB").unwrap_err();
        assert_eq!(err, LineageError::NoTargetIdentified { script: "JOB".into() });
    }

    #[test]
    fn cycle_without_sinks_has_no_target() {
        let a = entity("a");
        let (t1, t2) = (temp("t1"), temp("t2"));
        let g = graph(&[(&t1, &t2), (&t2, &t1), (&t2, &a), (&a, &t1)]);
        // a is written, so the cycle is only reached through priority 1
        assert_eq!(resolve_endpoints(&g, "JOB").unwrap().targets, vec![a.clone()]);

        let g = graph(&[(&t1, &t2), (&t2, &t1), (&a, &t1)]);
        let err = resolve_endpoints(&g, "JOB").unwrap_err();
        assert_eq!(err.code(), "NO_TARGET_IDENTIFIED");
    }

    #[test]
    fn two_written_entities_are_both_targets() {
        let (a, b, c) = (entity("a"), entity("b"), entity("c"));
        let g = graph(&[(&a, &b), (&a, &c)]);
        let endpoints = resolve_endpoints(&g, "JOB").unwrap();
        assert_eq!(endpoints.targets, vec![b, c]);
    }
}
