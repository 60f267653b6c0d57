//! Error types for the export crate.

use dwlineage_core::StoreError;
use thiserror::Error;

/// Errors that can occur while exporting lineage.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Catalog error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown script: {0}")]
    UnknownScript(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

#[cfg(feature = "duckdb")]
impl From<duckdb::Error> for ExportError {
    fn from(e: duckdb::Error) -> Self {
        ExportError::Database(e.to_string())
    }
}
