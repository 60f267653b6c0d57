//! Warehouse catalog and lineage engine for SQL scripts.
//!
//! A script is parsed into per-statement facts, classified, merged into a
//! catalog of tables and columns, and turned into two lineage layers: Detail
//! (one edge per statement, temporary tables included) and Summary (entity
//! tables only, with temporary tables contracted away). Reprocessing a script
//! replaces everything it contributed in a single transaction.
//!
//! ```
//! use dwlineage_core::{
//!     CatalogRead, EngineConfig, MemoryCatalog, ProcessMode, ScriptSource, UpdateCoordinator,
//! };
//!
//! let catalog = MemoryCatalog::new();
//! let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
//! let sql = "CREATE TABLE vt AS SELECT id FROM src.orders;
//!            INSERT INTO dw.orders SELECT id FROM vt;";
//! let outcome = coordinator.process(&ScriptSource::new("load_orders", sql), ProcessMode::Clear);
//! assert!(outcome.is_success());
//! assert_eq!(catalog.summary_edges(Some("LOAD_ORDERS")).unwrap().len(), 1);
//! ```

pub mod batch;
pub mod classifier;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod error;
pub mod graph;
pub mod ids;
pub mod lineage;
pub mod normalizer;
pub mod parser;
pub mod store;
pub mod targets;
pub mod types;

pub use batch::{BatchProcessor, BatchReport, StopHandle};
pub use classifier::{classify, ClassifiedStatement, ScriptScope};
pub use config::EngineConfig;
pub use conflict::Resolution;
pub use coordinator::{
    ErrorReport, ProcessMode, ProcessOutcome, ProcessStatus, ScriptReport, ScriptSource,
    ScriptState, UpdateCoordinator,
};
pub use error::{LineageError, ParseError, Position, Result, StoreError};
pub use graph::{DetailGraph, GraphStats};
pub use parser::{extract_facts, parse_sql_with_dialect};
pub use store::{
    CatalogRead, CatalogStore, CatalogWrite, MemoryCatalog, MemoryTransaction, PurgeCounts,
    ScriptLock, ScriptLocks, StoreResult,
};
pub use targets::{resolve_endpoints, Endpoints, TargetRule};
pub use types::{
    ColumnDetailEdge, ColumnFacts, ColumnMapping, ColumnRecord, ColumnSummaryEdge, DetailEdge,
    Dialect, ParsedKind, Provenance, SchemaRecord, ScriptRecord, SourceColumn, StatementFacts,
    StatementKind, StatementRecord, SummaryEdge, TableDefinition, TableIdentity, TableKind,
    TableRecord, TableRef,
};
