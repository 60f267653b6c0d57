//! Catalog storage seam.
//!
//! The engine talks to storage through three traits: [`CatalogRead`] for
//! lookups, [`CatalogWrite`] for the mutations of one transaction, and
//! [`CatalogStore`] for opening transactions. A transaction sees its own
//! writes; nothing it does is visible to others until [`CatalogWrite::commit`].
//! Dropping a transaction without committing discards it.

mod locks;
mod memory;

pub use locks::{ScriptLock, ScriptLocks};
pub use memory::{MemoryCatalog, MemoryTransaction};

use serde::Serialize;

use crate::error::StoreError;
use crate::types::{
    ColumnDetailEdge, ColumnSummaryEdge, DetailEdge, SchemaRecord, ScriptRecord,
    StatementRecord, SummaryEdge, TableDefinition, TableRecord,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Rows removed by [`CatalogWrite::purge_script`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeCounts {
    pub statements: usize,
    pub detail_edges: usize,
    pub summary_edges: usize,
    pub column_detail_edges: usize,
    pub column_summary_edges: usize,
    pub temporary_tables: usize,
}

impl PurgeCounts {
    pub fn total(&self) -> usize {
        self.statements
            + self.detail_edges
            + self.summary_edges
            + self.column_detail_edges
            + self.column_summary_edges
            + self.temporary_tables
    }
}

/// Read access to the catalog.
///
/// Edge listings take an optional script id; `None` lists every script.
/// Listings are ordered by id.
pub trait CatalogRead {
    fn schema(&self, id: &str) -> StoreResult<Option<SchemaRecord>>;
    /// A table with its columns in ordinal order.
    fn table(&self, id: &str) -> StoreResult<Option<TableDefinition>>;
    fn tables(&self) -> StoreResult<Vec<TableRecord>>;
    fn script(&self, id: &str) -> StoreResult<Option<ScriptRecord>>;
    fn scripts(&self) -> StoreResult<Vec<ScriptRecord>>;
    /// Statements of a script in index order.
    fn statements(&self, script_id: &str) -> StoreResult<Vec<StatementRecord>>;
    fn detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<DetailEdge>>;
    fn summary_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<SummaryEdge>>;
    fn column_detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<ColumnDetailEdge>>;
    fn column_summary_edges(&self, script_id: Option<&str>)
        -> StoreResult<Vec<ColumnSummaryEdge>>;
}

/// Mutations of one open transaction.
pub trait CatalogWrite: CatalogRead {
    fn put_schema(&mut self, schema: &SchemaRecord) -> StoreResult<()>;
    /// Inserts or replaces a table together with its full column set.
    fn put_table(&mut self, definition: &TableDefinition) -> StoreResult<()>;
    fn put_script(&mut self, script: &ScriptRecord) -> StoreResult<()>;
    /// Fails with [`StoreError::Backend`] when the script row is missing.
    fn put_statement(&mut self, statement: &StatementRecord) -> StoreResult<()>;
    fn put_detail_edges(&mut self, edges: &[DetailEdge]) -> StoreResult<()>;
    fn put_summary_edges(&mut self, edges: &[SummaryEdge]) -> StoreResult<()>;
    fn put_column_detail_edges(&mut self, edges: &[ColumnDetailEdge]) -> StoreResult<()>;
    fn put_column_summary_edges(&mut self, edges: &[ColumnSummaryEdge]) -> StoreResult<()>;

    /// Removes a script with its statements, every lineage edge tagged with it,
    /// and the temporary tables it owns. Entity tables are left alone.
    fn purge_script(&mut self, script_id: &str) -> StoreResult<PurgeCounts>;

    /// Empties the whole catalog.
    fn reset(&mut self) -> StoreResult<()>;

    fn commit(self) -> StoreResult<()>
    where
        Self: Sized;

    fn rollback(self) -> StoreResult<()>
    where
        Self: Sized;
}

/// A catalog that can open transactions and serve committed reads.
pub trait CatalogStore: CatalogRead + Send + Sync {
    type Transaction<'a>: CatalogWrite
    where
        Self: 'a;

    fn begin(&self) -> StoreResult<Self::Transaction<'_>>;

    /// The per-script scopes every writer to this catalog shares.
    fn script_locks(&self) -> &ScriptLocks;
}
