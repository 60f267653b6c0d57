#![allow(dead_code)]

use dwlineage_core::{
    CatalogRead, ColumnDetailEdge, ColumnSummaryEdge, DetailEdge, EngineConfig, MemoryCatalog,
    ProcessMode, ProcessOutcome, ScriptSource, StatementRecord, SummaryEdge, TableIdentity,
    UpdateCoordinator,
};

/// Every row a script owns, for before/after comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRows {
    pub statements: Vec<StatementRecord>,
    pub detail: Vec<DetailEdge>,
    pub summary: Vec<SummaryEdge>,
    pub column_detail: Vec<ColumnDetailEdge>,
    pub column_summary: Vec<ColumnSummaryEdge>,
}

pub fn rows(catalog: &MemoryCatalog, script_id: &str) -> ScriptRows {
    ScriptRows {
        statements: catalog.statements(script_id).unwrap(),
        detail: catalog.detail_edges(Some(script_id)).unwrap(),
        summary: catalog.summary_edges(Some(script_id)).unwrap(),
        column_detail: catalog.column_detail_edges(Some(script_id)).unwrap(),
        column_summary: catalog.column_summary_edges(Some(script_id)).unwrap(),
    }
}

pub fn run(catalog: &MemoryCatalog, name: &str, sql: &str) -> ProcessOutcome {
    UpdateCoordinator::new(catalog, EngineConfig::default())
        .process(&ScriptSource::new(name, sql), ProcessMode::Clear)
}

pub fn run_ok(catalog: &MemoryCatalog, name: &str, sql: &str) -> ProcessOutcome {
    let outcome = run(catalog, name, sql);
    assert!(outcome.is_success(), "{name} failed: {:?}", outcome.error);
    outcome
}

/// `(source, target)` pairs of a script's summary edges.
pub fn summary_pairs(catalog: &MemoryCatalog, script_id: &str) -> Vec<(String, String)> {
    catalog
        .summary_edges(Some(script_id))
        .unwrap()
        .into_iter()
        .map(|e| (e.source_table_id, e.target_table_id))
        .collect()
}

pub fn entity(schema: &str, name: &str) -> String {
    TableIdentity::entity(schema, name).id()
}

pub fn temp(script: &str, name: &str) -> String {
    TableIdentity::temporary(script, name).id()
}
