//! In-memory catalog with optimistic transactions.
//!
//! A transaction works on a private copy of the catalog and records the rows
//! it reads and writes. Commit fails with [`StoreError::Conflict`] if any of
//! those rows was committed by someone else after the transaction began, so
//! two scripts racing on the same entity table never interleave.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{CatalogRead, CatalogStore, CatalogWrite, PurgeCounts, ScriptLocks, StoreResult};
use crate::error::StoreError;
use crate::types::{
    ColumnDetailEdge, ColumnSummaryEdge, DetailEdge, SchemaRecord, ScriptRecord,
    StatementRecord, SummaryEdge, TableDefinition, TableRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum RowKey {
    Schema(String),
    Table(String),
    Script(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(id) => write!(f, "schema {id}"),
            Self::Table(id) => write!(f, "table {id}"),
            Self::Script(id) => write!(f, "script {id}"),
        }
    }
}

/// Everything one script owns.
#[derive(Debug, Clone)]
struct ScriptRows {
    record: ScriptRecord,
    statements: BTreeMap<u32, StatementRecord>,
    detail: BTreeMap<String, DetailEdge>,
    summary: BTreeMap<String, SummaryEdge>,
    column_detail: BTreeMap<String, ColumnDetailEdge>,
    column_summary: BTreeMap<String, ColumnSummaryEdge>,
}

impl ScriptRows {
    fn new(record: ScriptRecord) -> Self {
        Self {
            record,
            statements: BTreeMap::new(),
            detail: BTreeMap::new(),
            summary: BTreeMap::new(),
            column_detail: BTreeMap::new(),
            column_summary: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CatalogState {
    schemas: BTreeMap<String, SchemaRecord>,
    tables: BTreeMap<String, TableDefinition>,
    scripts: BTreeMap<String, ScriptRows>,
}

impl CatalogState {
    fn rows(&self, script_id: Option<&str>) -> Vec<&ScriptRows> {
        match script_id {
            Some(id) => self.scripts.get(id).into_iter().collect(),
            None => self.scripts.values().collect(),
        }
    }

    fn edges<T: Clone + Ord>(
        &self,
        script_id: Option<&str>,
        pick: impl Fn(&ScriptRows) -> &BTreeMap<String, T>,
    ) -> Vec<T> {
        let mut edges: Vec<T> = self
            .rows(script_id)
            .into_iter()
            .flat_map(|rows| pick(rows).values().cloned())
            .collect();
        edges.sort();
        edges
    }

    fn rows_mut(&mut self, script_id: &str) -> StoreResult<&mut ScriptRows> {
        self.scripts
            .get_mut(script_id)
            .ok_or_else(|| StoreError::Backend(format!("script {script_id} does not exist")))
    }

    fn copy_row(&mut self, from: &CatalogState, key: &RowKey) {
        match key {
            RowKey::Schema(id) => copy_entry(&mut self.schemas, &from.schemas, id),
            RowKey::Table(id) => copy_entry(&mut self.tables, &from.tables, id),
            RowKey::Script(id) => copy_entry(&mut self.scripts, &from.scripts, id),
        }
    }
}

fn copy_entry<T: Clone>(to: &mut BTreeMap<String, T>, from: &BTreeMap<String, T>, id: &str) {
    match from.get(id) {
        Some(value) => {
            to.insert(id.to_string(), value.clone());
        }
        None => {
            to.remove(id);
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: CatalogState,
    versions: HashMap<RowKey, u64>,
    clock: u64,
    reset_at: u64,
}

/// Catalog held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    shared: RwLock<Shared>,
    locks: ScriptLocks,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Shared>> {
        self.shared
            .read()
            .map_err(|_| StoreError::Backend("catalog lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Shared>> {
        self.shared
            .write()
            .map_err(|_| StoreError::Backend("catalog lock poisoned".to_string()))
    }
}

impl CatalogRead for MemoryCatalog {
    fn schema(&self, id: &str) -> StoreResult<Option<SchemaRecord>> {
        Ok(self.read()?.state.schemas.get(id).cloned())
    }

    fn table(&self, id: &str) -> StoreResult<Option<TableDefinition>> {
        Ok(self.read()?.state.tables.get(id).cloned())
    }

    fn tables(&self) -> StoreResult<Vec<TableRecord>> {
        Ok(self.read()?.state.tables.values().map(|d| d.table.clone()).collect())
    }

    fn script(&self, id: &str) -> StoreResult<Option<ScriptRecord>> {
        Ok(self.read()?.state.scripts.get(id).map(|rows| rows.record.clone()))
    }

    fn scripts(&self) -> StoreResult<Vec<ScriptRecord>> {
        Ok(self.read()?.state.scripts.values().map(|rows| rows.record.clone()).collect())
    }

    fn statements(&self, script_id: &str) -> StoreResult<Vec<StatementRecord>> {
        let shared = self.read()?;
        Ok(statements_of(&shared.state, script_id))
    }

    fn detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<DetailEdge>> {
        Ok(self.read()?.state.edges(script_id, |rows| &rows.detail))
    }

    fn summary_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<SummaryEdge>> {
        Ok(self.read()?.state.edges(script_id, |rows| &rows.summary))
    }

    fn column_detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<ColumnDetailEdge>> {
        Ok(self.read()?.state.edges(script_id, |rows| &rows.column_detail))
    }

    fn column_summary_edges(
        &self,
        script_id: Option<&str>,
    ) -> StoreResult<Vec<ColumnSummaryEdge>> {
        Ok(self.read()?.state.edges(script_id, |rows| &rows.column_summary))
    }
}

fn statements_of(state: &CatalogState, script_id: &str) -> Vec<StatementRecord> {
    state
        .scripts
        .get(script_id)
        .map(|rows| rows.statements.values().cloned().collect())
        .unwrap_or_default()
}

impl CatalogStore for MemoryCatalog {
    type Transaction<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> StoreResult<MemoryTransaction<'_>> {
        let shared = self.read()?;
        Ok(MemoryTransaction {
            catalog: self,
            base: shared.clock,
            working: shared.state.clone(),
            reads: RefCell::new(BTreeSet::new()),
            writes: BTreeSet::new(),
            reset: false,
        })
    }

    fn script_locks(&self) -> &ScriptLocks {
        &self.locks
    }
}

/// An open transaction against a [`MemoryCatalog`].
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    catalog: &'a MemoryCatalog,
    base: u64,
    working: CatalogState,
    reads: RefCell<BTreeSet<RowKey>>,
    writes: BTreeSet<RowKey>,
    reset: bool,
}

impl MemoryTransaction<'_> {
    fn touch(&self, key: RowKey) {
        self.reads.borrow_mut().insert(key);
    }

    fn mark(&mut self, key: RowKey) {
        self.writes.insert(key);
    }
}

impl CatalogRead for MemoryTransaction<'_> {
    fn schema(&self, id: &str) -> StoreResult<Option<SchemaRecord>> {
        self.touch(RowKey::Schema(id.to_string()));
        Ok(self.working.schemas.get(id).cloned())
    }

    fn table(&self, id: &str) -> StoreResult<Option<TableDefinition>> {
        self.touch(RowKey::Table(id.to_string()));
        Ok(self.working.tables.get(id).cloned())
    }

    fn tables(&self) -> StoreResult<Vec<TableRecord>> {
        Ok(self.working.tables.values().map(|d| d.table.clone()).collect())
    }

    fn script(&self, id: &str) -> StoreResult<Option<ScriptRecord>> {
        self.touch(RowKey::Script(id.to_string()));
        Ok(self.working.scripts.get(id).map(|rows| rows.record.clone()))
    }

    fn scripts(&self) -> StoreResult<Vec<ScriptRecord>> {
        Ok(self.working.scripts.values().map(|rows| rows.record.clone()).collect())
    }

    fn statements(&self, script_id: &str) -> StoreResult<Vec<StatementRecord>> {
        self.touch(RowKey::Script(script_id.to_string()));
        Ok(statements_of(&self.working, script_id))
    }

    fn detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<DetailEdge>> {
        Ok(self.working.edges(script_id, |rows| &rows.detail))
    }

    fn summary_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<SummaryEdge>> {
        Ok(self.working.edges(script_id, |rows| &rows.summary))
    }

    fn column_detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<ColumnDetailEdge>> {
        Ok(self.working.edges(script_id, |rows| &rows.column_detail))
    }

    fn column_summary_edges(
        &self,
        script_id: Option<&str>,
    ) -> StoreResult<Vec<ColumnSummaryEdge>> {
        Ok(self.working.edges(script_id, |rows| &rows.column_summary))
    }
}

impl CatalogWrite for MemoryTransaction<'_> {
    fn put_schema(&mut self, schema: &SchemaRecord) -> StoreResult<()> {
        self.working.schemas.insert(schema.id.clone(), schema.clone());
        self.mark(RowKey::Schema(schema.id.clone()));
        Ok(())
    }

    fn put_table(&mut self, definition: &TableDefinition) -> StoreResult<()> {
        let mut definition = definition.clone();
        definition.columns.sort_by_key(|c| c.ordinal);
        let id = definition.table.id.clone();
        self.working.tables.insert(id.clone(), definition);
        self.mark(RowKey::Table(id));
        Ok(())
    }

    fn put_script(&mut self, script: &ScriptRecord) -> StoreResult<()> {
        self.working
            .scripts
            .entry(script.id.clone())
            .and_modify(|rows| rows.record = script.clone())
            .or_insert_with(|| ScriptRows::new(script.clone()));
        self.mark(RowKey::Script(script.id.clone()));
        Ok(())
    }

    fn put_statement(&mut self, statement: &StatementRecord) -> StoreResult<()> {
        let rows = self.working.rows_mut(&statement.script_id)?;
        rows.statements.insert(statement.index, statement.clone());
        self.mark(RowKey::Script(statement.script_id.clone()));
        Ok(())
    }

    fn put_detail_edges(&mut self, edges: &[DetailEdge]) -> StoreResult<()> {
        for edge in edges {
            let rows = self.working.rows_mut(&edge.script_id)?;
            rows.detail.insert(edge.id.clone(), edge.clone());
            self.mark(RowKey::Script(edge.script_id.clone()));
        }
        Ok(())
    }

    fn put_summary_edges(&mut self, edges: &[SummaryEdge]) -> StoreResult<()> {
        for edge in edges {
            let rows = self.working.rows_mut(&edge.script_id)?;
            rows.summary.insert(edge.id.clone(), edge.clone());
            self.mark(RowKey::Script(edge.script_id.clone()));
        }
        Ok(())
    }

    fn put_column_detail_edges(&mut self, edges: &[ColumnDetailEdge]) -> StoreResult<()> {
        for edge in edges {
            let rows = self.working.rows_mut(&edge.script_id)?;
            rows.column_detail.insert(edge.id.clone(), edge.clone());
            self.mark(RowKey::Script(edge.script_id.clone()));
        }
        Ok(())
    }

    fn put_column_summary_edges(&mut self, edges: &[ColumnSummaryEdge]) -> StoreResult<()> {
        for edge in edges {
            let rows = self.working.rows_mut(&edge.script_id)?;
            rows.column_summary.insert(edge.id.clone(), edge.clone());
            self.mark(RowKey::Script(edge.script_id.clone()));
        }
        Ok(())
    }

    fn purge_script(&mut self, script_id: &str) -> StoreResult<PurgeCounts> {
        let mut counts = PurgeCounts::default();
        if let Some(rows) = self.working.scripts.remove(script_id) {
            counts.statements = rows.statements.len();
            counts.detail_edges = rows.detail.len();
            counts.summary_edges = rows.summary.len();
            counts.column_detail_edges = rows.column_detail.len();
            counts.column_summary_edges = rows.column_summary.len();
        }
        self.mark(RowKey::Script(script_id.to_string()));

        let owned: Vec<String> = self
            .working
            .tables
            .values()
            .filter(|d| d.table.owner_script_id().as_deref() == Some(script_id))
            .map(|d| d.table.id.clone())
            .collect();
        counts.temporary_tables = owned.len();
        for id in owned {
            self.working.tables.remove(&id);
            self.mark(RowKey::Table(id));
        }
        Ok(counts)
    }

    fn reset(&mut self) -> StoreResult<()> {
        self.working = CatalogState::default();
        self.reset = true;
        Ok(())
    }

    fn commit(self) -> StoreResult<()> {
        let mut shared = self.catalog.write()?;
        let reads = self.reads.into_inner();

        let touched = !reads.is_empty() || !self.writes.is_empty() || self.reset;
        if touched && shared.reset_at > self.base {
            return Err(StoreError::Conflict("catalog was reset".to_string()));
        }
        for key in reads.iter().chain(self.writes.iter()) {
            if shared.versions.get(key).is_some_and(|v| *v > self.base) {
                return Err(StoreError::Conflict(key.to_string()));
            }
        }

        shared.clock += 1;
        let version = shared.clock;
        if self.reset {
            shared.state = self.working;
            shared.versions.clear();
            shared.reset_at = version;
            return Ok(());
        }
        for key in self.writes {
            shared.state.copy_row(&self.working, &key);
            shared.versions.insert(key, version);
        }
        Ok(())
    }

    fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
