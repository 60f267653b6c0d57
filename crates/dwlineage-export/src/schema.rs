//! DuckDB catalog schema (DDL).
//!
//! Identifiers are the engine's deterministic ids, so every table is keyed by
//! a TEXT primary key and writes are upserts. There are no foreign keys:
//! column lineage may reference columns that a table definition does not
//! list, and rows of one script are removed independently of the tables they
//! point at.

/// Schema version for the catalog layout.
/// Increment this when making breaking changes to the table structure.
pub const SCHEMA_VERSION: &str = "2";

/// SQL to create all catalog tables.
pub fn tables_ddl() -> &'static str {
    r#"
-- Metadata about the catalog file
CREATE TABLE IF NOT EXISTS _meta (
    key TEXT PRIMARY KEY,
    value TEXT
);

-- Schemas of entity tables
CREATE TABLE IF NOT EXISTS databases (
    id TEXT PRIMARY KEY,
    database_name TEXT NOT NULL
);

-- Entity and temporary tables
CREATE TABLE IF NOT EXISTS tables (
    id TEXT PRIMARY KEY,
    schema_name TEXT NOT NULL,
    table_name TEXT NOT NULL,
    table_type TEXT NOT NULL,
    provenance TEXT NOT NULL,
    -- Owning script of a temporary table
    script_id TEXT,
    description TEXT,
    defined_by TEXT
);

CREATE TABLE IF NOT EXISTS columns (
    id TEXT PRIMARY KEY,
    table_id TEXT NOT NULL,
    column_name TEXT NOT NULL,
    data_type TEXT,
    is_nullable BOOLEAN NOT NULL DEFAULT TRUE,
    is_primary_key BOOLEAN NOT NULL DEFAULT FALSE,
    is_foreign_key BOOLEAN NOT NULL DEFAULT FALSE,
    default_value TEXT,
    ordinal INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS sql_scripts (
    id TEXT PRIMARY KEY,
    script_name TEXT NOT NULL,
    script_content TEXT NOT NULL,
    dialect TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS script_statements (
    id TEXT PRIMARY KEY,
    script_id TEXT NOT NULL,
    statement_index INTEGER NOT NULL,
    statement_type TEXT NOT NULL,
    statement_text TEXT NOT NULL,
    target_table_id TEXT
);

-- Statement-level table lineage, temporary tables included
CREATE TABLE IF NOT EXISTS data_lineage_detail (
    id TEXT PRIMARY KEY,
    source_table_id TEXT NOT NULL,
    target_table_id TEXT NOT NULL,
    script_id TEXT NOT NULL,
    statement_id TEXT NOT NULL
);

-- Script-level table lineage between entity tables
CREATE TABLE IF NOT EXISTS data_lineage_summary (
    id TEXT PRIMARY KEY,
    source_table_id TEXT NOT NULL,
    target_table_id TEXT NOT NULL,
    script_id TEXT NOT NULL,
    -- Detail paths contracted into the edge
    path_count BIGINT NOT NULL,
    min_hops INTEGER NOT NULL,
    max_hops INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS column_lineage_detail (
    id TEXT PRIMARY KEY,
    source_column_id TEXT NOT NULL,
    target_column_id TEXT NOT NULL,
    script_id TEXT NOT NULL,
    statement_id TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS column_lineage_summary (
    id TEXT PRIMARY KEY,
    source_column_id TEXT NOT NULL,
    target_column_id TEXT NOT NULL,
    script_id TEXT NOT NULL
);
"#
}

/// SQL to create the convenience views over the summary layer.
pub fn views_ddl() -> &'static str {
    r#"
-- Entity-to-entity lineage with readable names
CREATE OR REPLACE VIEW v_table_lineage AS
SELECT
    s.script_id,
    sc.script_name,
    src.schema_name AS source_schema,
    src.table_name AS source_table,
    tgt.schema_name AS target_schema,
    tgt.table_name AS target_table,
    s.path_count,
    s.min_hops,
    s.max_hops
FROM data_lineage_summary s
LEFT JOIN sql_scripts sc ON sc.id = s.script_id
LEFT JOIN tables src ON src.id = s.source_table_id
LEFT JOIN tables tgt ON tgt.id = s.target_table_id;

-- Column-to-column lineage with readable names
CREATE OR REPLACE VIEW v_column_lineage AS
SELECT
    s.script_id,
    src_t.schema_name AS source_schema,
    src_t.table_name AS source_table,
    src_c.column_name AS source_column,
    tgt_t.schema_name AS target_schema,
    tgt_t.table_name AS target_table,
    tgt_c.column_name AS target_column
FROM column_lineage_summary s
LEFT JOIN columns src_c ON src_c.id = s.source_column_id
LEFT JOIN tables src_t ON src_t.id = src_c.table_id
LEFT JOIN columns tgt_c ON tgt_c.id = s.target_column_id
LEFT JOIN tables tgt_t ON tgt_t.id = tgt_c.table_id;
"#
}

/// Tables emptied by a catalog reset, in deletion order.
pub const CATALOG_TABLES: [&str; 9] = [
    "column_lineage_summary",
    "column_lineage_detail",
    "data_lineage_summary",
    "data_lineage_detail",
    "script_statements",
    "sql_scripts",
    "columns",
    "tables",
    "databases",
];
