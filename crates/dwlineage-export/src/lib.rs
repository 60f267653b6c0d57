//! Lineage export and persistent catalog storage for dwlineage.
//!
//! Exports lineage layers from any [`dwlineage_core::CatalogRead`] as
//! node-link JSON documents, and provides [`DuckDbCatalog`], a catalog store
//! backed by a DuckDB file (behind the default `duckdb` feature).

mod error;
mod node_link;
mod writer;

#[cfg(feature = "duckdb")]
mod duckdb_backend;
#[cfg(feature = "duckdb")]
mod schema;

pub use error::ExportError;
pub use node_link::{
    export_lineage, EdgeType, GraphAttributes, Layer, Link, Node, NodeLinkDocument, Scope,
};
pub use writer::{
    read_document, write_all_lineage, write_document, write_script_lineage, WrittenFiles,
};

#[cfg(feature = "duckdb")]
pub use duckdb_backend::{DuckDbCatalog, DuckDbTransaction};
