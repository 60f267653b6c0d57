//! Transactional reprocessing of one script.
//!
//! [`UpdateCoordinator::reprocess_script`] runs the whole pipeline for a script
//! inside a single storage transaction: purge the script's rows, classify its
//! statements, merge table definitions, build its detail graph, resolve its
//! endpoints and write both lineage layers. Any error rolls the transaction
//! back, so callers only ever observe the script fully replaced or untouched.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

use crate::classifier::{classify, ClassifiedStatement, ScriptScope};
use crate::config::EngineConfig;
use crate::conflict::{resolve, Resolution};
use crate::error::{LineageError, Result};
use crate::graph::{DetailGraph, GraphStats};
use crate::ids;
use crate::lineage;
use crate::normalizer::{external_definition, normalize, positional_mappings};
use crate::parser;
use crate::store::{CatalogStore, CatalogWrite, PurgeCounts};
use crate::targets::{resolve_endpoints, TargetRule};
use crate::types::{
    ColumnDetailEdge, ColumnMapping, Dialect, Provenance, SchemaRecord, ScriptRecord,
    StatementFacts, StatementRecord, TableIdentity,
};

/// A script to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub name: String,
    pub content: String,
    pub dialect: Dialect,
}

impl ScriptSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            dialect: Dialect::default(),
        }
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// File stem of the name; `load_orders.sql` and `load_orders` are the same script.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }

    pub fn script_id(&self) -> String {
        ids::script_id_from_path(&self.name)
    }
}

/// How an already-processed script is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    /// Replace everything the script previously produced.
    #[default]
    Clear,
    /// Refuse to touch a script that is already in the catalog.
    Insert,
}

/// Transaction state of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    Clean,
    InTransaction,
}

/// What a committed reprocessing produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptReport {
    pub script_id: String,
    pub statements: usize,
    pub skipped_statements: usize,
    pub tables_written: usize,
    pub external_tables: usize,
    pub detail_edges: usize,
    pub summary_edges: usize,
    pub column_detail_edges: usize,
    pub column_summary_edges: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_rule: Option<TargetRule>,
    pub targets: Vec<String>,
    pub sources: Vec<String>,
    pub purged: PurgeCounts,
    pub graph: GraphStats,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Success,
    Failed,
    Skipped,
}

/// Machine-readable error attached to a failed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&LineageError> for ErrorReport {
    fn from(err: &LineageError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result of processing one script, success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub name: String,
    pub script_id: String,
    pub status: ProcessStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScriptReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl ProcessOutcome {
    pub fn success(name: &str, report: ScriptReport) -> Self {
        Self {
            name: name.to_string(),
            script_id: report.script_id.clone(),
            status: ProcessStatus::Success,
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(name: &str, err: &LineageError) -> Self {
        Self {
            name: name.to_string(),
            script_id: ids::script_id_from_path(name),
            status: ProcessStatus::Failed,
            report: None,
            error: Some(ErrorReport::from(err)),
        }
    }

    pub fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script_id: ids::script_id_from_path(name),
            status: ProcessStatus::Skipped,
            report: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ProcessStatus::Success
    }
}

/// Runs script reprocessing against a catalog store.
///
/// Runs of the same script are serialized through the store's
/// [`ScriptLocks`](crate::store::ScriptLocks), so any number of coordinators
/// may share one catalog.
pub struct UpdateCoordinator<'s, S: CatalogStore> {
    store: &'s S,
    config: EngineConfig,
}

impl<'s, S: CatalogStore> UpdateCoordinator<'s, S> {
    pub fn new(store: &'s S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self, script_id: &str) -> ScriptState {
        if self.store.script_locks().is_held(script_id) {
            ScriptState::InTransaction
        } else {
            ScriptState::Clean
        }
    }

    /// Parses and reprocesses a script, folding any error into the outcome.
    pub fn process(&self, source: &ScriptSource, mode: ProcessMode) -> ProcessOutcome {
        let result = parser::extract_facts(&source.content, source.dialect)
            .map_err(|err| LineageError::Parse(err.with_dialect(source.dialect)))
            .and_then(|facts| self.reprocess_script(source, &facts, mode));
        match result {
            Ok(report) => ProcessOutcome::success(&source.name, report),
            Err(err) => {
                #[cfg(feature = "tracing")]
                warn!(target: "coordinator", "script {} failed: {} ({})", source.name, err, err.code());
                ProcessOutcome::failed(&source.name, &err)
            }
        }
    }

    /// Replaces everything `source` contributed to the catalog with what `facts`
    /// produce, atomically.
    ///
    /// Commit conflicts with concurrent transactions are retried up to
    /// `max_retries` times; every other error is returned as is.
    pub fn reprocess_script(
        &self,
        source: &ScriptSource,
        facts: &[StatementFacts],
        mode: ProcessMode,
    ) -> Result<ScriptReport> {
        let script_id = source.script_id();
        if script_id.is_empty() {
            return Err(LineageError::InvalidIdentifier(format!(
                "script name '{}' is empty",
                source.name
            )));
        }
        let _scope = self.store.script_locks().acquire(&script_id)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.attempt(source, &script_id, facts, mode) {
                Ok(mut report) => {
                    report.attempts = attempts;
                    #[cfg(feature = "tracing")]
                    info!(target: "coordinator", "script {} committed: {} statements, {} detail edges, {} summary edges", script_id, report.statements, report.detail_edges, report.summary_edges);
                    return Ok(report);
                }
                Err(err) if err.is_retryable() && attempts <= self.config.max_retries => {
                    #[cfg(feature = "tracing")]
                    warn!(target: "coordinator", "script {} attempt {} conflicted, retrying: {}", script_id, attempts, err);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Empties the catalog in one transaction.
    pub fn reset_catalog(&self) -> Result<()> {
        let mut tx = self.store.begin()?;
        tx.reset()?;
        tx.commit()?;
        Ok(())
    }

    fn attempt(
        &self,
        source: &ScriptSource,
        script_id: &str,
        facts: &[StatementFacts],
        mode: ProcessMode,
    ) -> Result<ScriptReport> {
        let mut tx = self.store.begin()?;
        match self.apply(&mut tx, source, script_id, facts, mode) {
            Ok(report) => {
                tx.commit()?;
                Ok(report)
            }
            Err(err) => {
                if let Err(_rollback) = tx.rollback() {
                    #[cfg(feature = "tracing")]
                    warn!(target: "coordinator", "rollback of {} failed: {}", script_id, _rollback);
                }
                Err(err)
            }
        }
    }

    fn apply<T: CatalogWrite>(
        &self,
        tx: &mut T,
        source: &ScriptSource,
        script_id: &str,
        facts: &[StatementFacts],
        mode: ProcessMode,
    ) -> Result<ScriptReport> {
        let mut report = ScriptReport {
            script_id: script_id.to_string(),
            ..ScriptReport::default()
        };

        match mode {
            ProcessMode::Insert => {
                if tx.script(script_id)?.is_some() {
                    return Err(LineageError::ScriptAlreadyProcessed {
                        script: script_id.to_string(),
                    });
                }
            }
            ProcessMode::Clear => {
                report.purged = tx.purge_script(script_id)?;
                #[cfg(feature = "tracing")]
                debug!(target: "coordinator", "script {} purged {} rows", script_id, report.purged.total());
            }
        }

        tx.put_script(&ScriptRecord {
            id: script_id.to_string(),
            name: source.name.clone(),
            content: source.content.clone(),
            dialect: source.dialect,
        })?;

        let scope = ScriptScope::new(source.stem(), facts, self.config.default_schema.as_deref());
        let mut classified: Vec<(ClassifiedStatement, Vec<ColumnMapping>)> = Vec::new();
        for (position, statement_facts) in facts.iter().enumerate() {
            let index = position as u32 + 1;
            let Some(statement) = classify(statement_facts, index, &scope)? else {
                report.skipped_statements += 1;
                #[cfg(feature = "tracing")]
                debug!(target: "coordinator", "script {} statement {} carries no lineage ({})", script_id, index, statement_facts.kind);
                continue;
            };

            tx.put_statement(&StatementRecord {
                id: ids::statement_id(script_id, index),
                script_id: script_id.to_string(),
                index,
                kind: statement.kind,
                text: statement_facts.text.clone(),
                target_table_id: Some(statement.target.id()),
            })?;
            ensure_schema(tx, &statement.target)?;

            let candidate = normalize(&statement, statement_facts, script_id);
            let existing = tx.table(&candidate.table.id)?;
            if let Resolution::Write(merged) = resolve(existing.as_ref(), candidate, script_id)? {
                tx.put_table(&merged)?;
                report.tables_written += 1;
            }

            let mappings = if !self.config.column_lineage {
                Vec::new()
            } else if statement_facts.positional_sources.is_empty() {
                statement_facts.column_mappings.clone()
            } else {
                let target = tx.table(&statement.target.id())?;
                positional_mappings(target.as_ref(), &statement_facts.positional_sources)
            };
            classified.push((statement, mappings));
        }
        report.statements = classified.len();
        if classified.is_empty() {
            return Ok(report);
        }

        let statements: Vec<ClassifiedStatement> =
            classified.iter().map(|(s, _)| s.clone()).collect();
        let graph = DetailGraph::build(&statements);
        report.graph = graph.stats();
        let endpoints = resolve_endpoints(&graph, script_id)?;

        let column_detail: Vec<ColumnDetailEdge> = classified
            .iter()
            .flat_map(|(statement, mappings)| {
                lineage::column_detail_edges(statement, mappings, &scope, script_id)
            })
            .collect();

        let mut referenced: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for edge in &column_detail {
            if let Some((table, column)) = ids::split_column_id(&edge.source_column_id) {
                referenced.entry(table.to_string()).or_default().push(column);
            }
        }
        for identity in &endpoints.sources {
            let columns = referenced.get(&identity.id()).map(Vec::as_slice).unwrap_or(&[]);
            if self.record_external(tx, identity, columns, script_id)? {
                report.external_tables += 1;
            }
        }

        let detail = lineage::detail_edges(&graph, script_id);
        tx.put_detail_edges(&detail)?;
        let summary = lineage::derive_summary(&graph, script_id, self.config.max_traversal_depth)?;
        tx.put_summary_edges(&summary)?;

        let column_summary = lineage::derive_column_summary(
            &column_detail,
            script_id,
            self.config.max_traversal_depth,
        )?;
        tx.put_column_detail_edges(&column_detail)?;
        tx.put_column_summary_edges(&column_summary)?;

        report.detail_edges = detail.len();
        report.summary_edges = summary.len();
        report.column_detail_edges = column_detail.len();
        report.column_summary_edges = column_summary.len();
        report.target_rule = Some(endpoints.rule);
        report.targets = endpoints.targets.iter().map(TableIdentity::to_string).collect();
        report.sources = endpoints.sources.iter().map(TableIdentity::to_string).collect();
        Ok(report)
    }

    /// Creates or widens the EXTERNAL stand-in of a source table.
    ///
    /// Returns whether a new stand-in was created.
    fn record_external<T: CatalogWrite>(
        &self,
        tx: &mut T,
        identity: &TableIdentity,
        columns: &[String],
        script_id: &str,
    ) -> Result<bool> {
        let stand_in = external_definition(identity, columns);
        match tx.table(&stand_in.table.id)? {
            None => {
                #[cfg(feature = "tracing")]
                info!(target: "coordinator", "script {} reads undefined table {}, recording it as EXTERNAL", script_id, identity);
                ensure_schema(tx, identity)?;
                tx.put_table(&stand_in)?;
                Ok(true)
            }
            Some(existing) if existing.table.provenance == Provenance::External => {
                if let Resolution::Write(merged) = resolve(Some(&existing), stand_in, script_id)? {
                    tx.put_table(&merged)?;
                }
                Ok(false)
            }
            Some(_) => Ok(false),
        }
    }
}

fn ensure_schema<T: CatalogWrite>(tx: &mut T, identity: &TableIdentity) -> Result<()> {
    let schema = identity.schema();
    if !identity.is_entity() || schema.is_empty() {
        return Ok(());
    }
    let id = ids::schema_id(schema);
    if tx.schema(&id)?.is_none() {
        tx.put_schema(&SchemaRecord {
            id,
            name: schema.to_string(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogRead, MemoryCatalog};
    use crate::types::ParsedKind;

    fn coordinator(catalog: &MemoryCatalog) -> UpdateCoordinator<'_, MemoryCatalog> {
        UpdateCoordinator::new(catalog, EngineConfig::default())
    }

    #[test]
    fn empty_script_succeeds_without_rows() {
        let catalog = MemoryCatalog::new();
        let outcome = coordinator(&catalog).process(&ScriptSource::new("empty", ""), ProcessMode::Clear);
        assert!(outcome.is_success());
        let report = outcome.report.unwrap();
        assert_eq!(report.statements, 0);
        assert!(catalog.statements("EMPTY").unwrap().is_empty());
        assert!(catalog.detail_edges(None).unwrap().is_empty());
    }

    #[test]
    fn insert_mode_refuses_known_scripts() {
        let catalog = MemoryCatalog::new();
        let coordinator = coordinator(&catalog);
        let source = ScriptSource::new("job", "INSERT INTO dw.t SELECT id FROM src.s");
        assert!(coordinator.process(&source, ProcessMode::Insert).is_success());

        let outcome = coordinator.process(&source, ProcessMode::Insert);
        assert_eq!(outcome.status, ProcessStatus::Failed);
        assert_eq!(outcome.error.unwrap().code, "SCRIPT_ALREADY_PROCESSED");
    }

    #[test]
    fn undefined_sources_become_external_stand_ins() {
        let catalog = MemoryCatalog::new();
        let facts = vec![StatementFacts::new(ParsedKind::Insert)
            .with_target("dw.t")
            .with_sources(["src.s"])
            .with_mapping("id", &[("src.s", "key")])];
        let report = coordinator(&catalog)
            .reprocess_script(&ScriptSource::new("job", ""), &facts, ProcessMode::Clear)
            .unwrap();

        assert_eq!(report.external_tables, 1);
        let stand_in = catalog
            .table(&TableIdentity::entity("src", "s").id())
            .unwrap()
            .unwrap();
        assert_eq!(stand_in.table.provenance, Provenance::External);
        assert_eq!(stand_in.columns[0].name, "KEY");
        assert!(catalog.schema("SRC").unwrap().is_some());
    }

    #[test]
    fn failure_leaves_previous_state_intact() {
        let catalog = MemoryCatalog::new();
        let coordinator = coordinator(&catalog);
        let source = ScriptSource::new("job", "");
        let v1 = vec![StatementFacts::new(ParsedKind::Insert)
            .with_target("dw.t")
            .with_sources(["src.a"])];
        coordinator.reprocess_script(&source, &v1, ProcessMode::Clear).unwrap();
        let before = catalog.summary_edges(Some("JOB")).unwrap();

        let broken = vec![StatementFacts::new(ParsedKind::Insert)];
        let err = coordinator
            .reprocess_script(&source, &broken, ProcessMode::Clear)
            .unwrap_err();
        assert_eq!(err.code(), "CLASSIFICATION_ERROR");
        assert_eq!(catalog.summary_edges(Some("JOB")).unwrap(), before);
        assert_eq!(coordinator.state("JOB"), ScriptState::Clean);
    }

    #[test]
    fn parse_errors_are_reported_with_their_code() {
        let catalog = MemoryCatalog::new();
        let outcome =
            coordinator(&catalog).process(&ScriptSource::new("bad", "INSERT INTO"), ProcessMode::Clear);
        assert_eq!(outcome.error.unwrap().code, "PARSE_ERROR");
        assert!(catalog.scripts().unwrap().is_empty());
    }

    #[test]
    fn file_extension_is_not_part_of_the_script_id() {
        let catalog = MemoryCatalog::new();
        let sql = "CREATE TABLE vt AS SELECT id FROM src.a; INSERT INTO dw.a SELECT id FROM vt;";
        let source = ScriptSource::new("jobs/load_a.sql", sql);
        assert_eq!(source.script_id(), "LOAD_A");

        let outcome = coordinator(&catalog).process(&source, ProcessMode::Clear);
        assert!(outcome.is_success(), "{:?}", outcome.error);
        let temp = TableIdentity::temporary("load_a", "vt").id();
        assert!(catalog.table(&temp).unwrap().is_some());
        assert_eq!(catalog.script("LOAD_A").unwrap().unwrap().name, "jobs/load_a.sql");
    }
}
