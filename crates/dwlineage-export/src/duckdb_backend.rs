//! DuckDB catalog backend.
//!
//! [`DuckDbCatalog`] keeps the catalog in a DuckDB file. Each transaction runs
//! on its own connection to the same database, so DuckDB's MVCC decides which
//! of two concurrent writers to the same row wins; the loser's error surfaces
//! as [`StoreError::Conflict`] and the coordinator retries the script.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::schema::{tables_ddl, views_ddl, CATALOG_TABLES, SCHEMA_VERSION};
use crate::ExportError;
use dwlineage_core::ids::parse_table_id;
use dwlineage_core::{
    CatalogRead, CatalogStore, CatalogWrite, ColumnDetailEdge, ColumnRecord, ColumnSummaryEdge,
    DetailEdge, Provenance, PurgeCounts, SchemaRecord, ScriptLocks, ScriptRecord, StatementKind,
    StatementRecord, StoreError, StoreResult, SummaryEdge, TableDefinition, TableKind,
    TableRecord,
};
use duckdb::{params, Connection};

/// A catalog stored in a DuckDB database.
pub struct DuckDbCatalog {
    conn: Mutex<Connection>,
    locks: ScriptLocks,
}

impl DuckDbCatalog {
    /// Opens (or creates) a catalog file, creating missing tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, ExportError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, ExportError> {
        conn.execute_batch(tables_ddl())?;
        conn.execute_batch(views_ddl())?;
        conn.execute(
            "INSERT OR REPLACE INTO _meta (key, value) VALUES (?, ?)",
            params!["schema_version", SCHEMA_VERSION],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO _meta (key, value) VALUES (?, ?)",
            params!["version", env!("CARGO_PKG_VERSION")],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO _meta (key, value) VALUES (?, ?)",
            params!["created_at", chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            locks: ScriptLocks::default(),
        })
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("catalog connection poisoned".to_string()))
    }

    fn with_rows<T>(&self, read: impl FnOnce(Rows<'_>) -> StoreResult<T>) -> StoreResult<T> {
        let conn = self.connection()?;
        read(Rows(&conn))
    }
}

impl std::fmt::Debug for DuckDbCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbCatalog").finish_non_exhaustive()
    }
}

/// Maps a DuckDB error onto the store taxonomy.
fn store_error(err: duckdb::Error) -> StoreError {
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("conflict") || lower.contains("duplicate key") {
        StoreError::Conflict(message)
    } else {
        StoreError::Backend(message)
    }
}

trait IntoStore<T> {
    fn store(self) -> StoreResult<T>;
}

impl<T> IntoStore<T> for duckdb::Result<T> {
    fn store(self) -> StoreResult<T> {
        self.map_err(store_error)
    }
}

fn parse_stored<T>(value: &str, what: &str, parse: impl Fn(&str) -> Option<T>) -> StoreResult<T> {
    parse(value).ok_or_else(|| StoreError::Backend(format!("unknown {what} '{value}'")))
}

fn ordinal(value: i64) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Backend(format!("ordinal {value} out of range")))
}

/// Queries shared by the catalog and its transactions.
struct Rows<'c>(&'c Connection);

type ColumnRow = (
    String,
    String,
    String,
    Option<String>,
    bool,
    bool,
    bool,
    Option<String>,
    i64,
    Option<String>,
);

type TableRow = (String, String, String, Option<String>, Option<String>);

type EdgeRow = (String, String, String, String, Option<String>);

type SummaryRow = (String, String, String, String, i64, i64, i64);

impl Rows<'_> {
    fn schema(&self, id: &str) -> StoreResult<Option<SchemaRecord>> {
        let mut stmt = self
            .0
            .prepare("SELECT id, database_name FROM databases WHERE id = ?")
            .store()?;
        let mut rows = stmt
            .query_map(params![id], |row| {
                Ok(SchemaRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .store()?;
        rows.next().transpose().store()
    }

    fn table_rows(&self, filter: Option<&str>) -> StoreResult<Vec<TableRecord>> {
        let sql = match filter {
            Some(_) => {
                "SELECT id, table_type, provenance, description, defined_by FROM tables WHERE id = ? ORDER BY id"
            }
            None => "SELECT id, table_type, provenance, description, defined_by FROM tables ORDER BY id",
        };
        let mut stmt = self.0.prepare(sql).store()?;
        let map = |row: &duckdb::Row<'_>| -> duckdb::Result<TableRow> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        };
        let raw: Vec<TableRow> = match filter {
            Some(id) => stmt.query_map(params![id], map).store()?.collect::<duckdb::Result<_>>(),
            None => stmt.query_map(params![], map).store()?.collect::<duckdb::Result<_>>(),
        }
        .store()?;

        raw.into_iter()
            .map(|(id, kind, provenance, description, defined_by)| {
                let identity = parse_table_id(&id)
                    .ok_or_else(|| StoreError::Backend(format!("malformed table id {id}")))?;
                Ok(TableRecord {
                    identity,
                    kind: parse_stored(&kind, "table type", TableKind::parse)?,
                    provenance: parse_stored(&provenance, "provenance", Provenance::parse)?,
                    description,
                    defined_by,
                    id,
                })
            })
            .collect()
    }

    fn table(&self, id: &str) -> StoreResult<Option<TableDefinition>> {
        let Some(table) = self.table_rows(Some(id))?.into_iter().next() else {
            return Ok(None);
        };
        let columns = self.columns(id)?;
        Ok(Some(TableDefinition { table, columns }))
    }

    fn columns(&self, table_id: &str) -> StoreResult<Vec<ColumnRecord>> {
        let mut stmt = self
            .0
            .prepare(
                "SELECT id, table_id, column_name, data_type, is_nullable, is_primary_key,
                        is_foreign_key, default_value, ordinal, description
                 FROM columns WHERE table_id = ? ORDER BY ordinal",
            )
            .store()?;
        let raw: Vec<ColumnRow> = stmt
            .query_map(params![table_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            })
            .store()?
            .collect::<duckdb::Result<_>>()
            .store()?;

        raw.into_iter()
            .map(
                |(id, table_id, name, data_type, nullable, primary_key, foreign_key, default_value, position, description)| {
                    Ok(ColumnRecord {
                        id,
                        table_id,
                        name,
                        data_type,
                        nullable,
                        primary_key,
                        foreign_key,
                        default_value,
                        ordinal: ordinal(position)?,
                        description,
                    })
                },
            )
            .collect()
    }

    fn column_ids(&self, table_id: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self
            .0
            .prepare("SELECT id FROM columns WHERE table_id = ?")
            .store()?;
        let ids = stmt
            .query_map(params![table_id], |row| row.get(0))
            .store()?
            .collect::<duckdb::Result<_>>()
            .store()?;
        Ok(ids)
    }

    fn scripts(&self, filter: Option<&str>) -> StoreResult<Vec<ScriptRecord>> {
        let base = "SELECT id, script_name, script_content, dialect FROM sql_scripts";
        let mut stmt = match filter {
            Some(_) => self.0.prepare(&format!("{base} WHERE id = ? ORDER BY id")),
            None => self.0.prepare(&format!("{base} ORDER BY id")),
        }
        .store()?;
        let map = |row: &duckdb::Row<'_>| -> duckdb::Result<(String, String, String, String)> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        };
        let raw: Vec<(String, String, String, String)> = match filter {
            Some(id) => stmt.query_map(params![id], map).store()?.collect::<duckdb::Result<_>>(),
            None => stmt.query_map(params![], map).store()?.collect::<duckdb::Result<_>>(),
        }
        .store()?;

        raw.into_iter()
            .map(|(id, name, content, dialect)| {
                Ok(ScriptRecord {
                    id,
                    name,
                    content,
                    dialect: dialect
                        .parse()
                        .map_err(|err: String| StoreError::Backend(err))?,
                })
            })
            .collect()
    }

    fn statements(&self, script_id: &str) -> StoreResult<Vec<StatementRecord>> {
        let mut stmt = self
            .0
            .prepare(
                "SELECT id, script_id, statement_index, statement_type, statement_text, target_table_id
                 FROM script_statements WHERE script_id = ? ORDER BY statement_index",
            )
            .store()?;
        let raw: Vec<(String, String, i64, String, String, Option<String>)> = stmt
            .query_map(params![script_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .store()?
            .collect::<duckdb::Result<_>>()
            .store()?;

        raw.into_iter()
            .map(|(id, script_id, index, kind, text, target_table_id)| {
                Ok(StatementRecord {
                    id,
                    script_id,
                    index: ordinal(index)?,
                    kind: parse_stored(&kind, "statement type", StatementKind::parse)?,
                    text,
                    target_table_id,
                })
            })
            .collect()
    }

    /// Edges of one lineage table as `(id, source, target, script, statement)`.
    fn edge_rows(
        &self,
        table: &str,
        columns: (&str, &str),
        with_statement: bool,
        script_id: Option<&str>,
    ) -> StoreResult<Vec<EdgeRow>> {
        let (source, target) = columns;
        let statement = if with_statement { "statement_id" } else { "NULL" };
        let mut sql = format!(
            "SELECT id, {source}, {target}, script_id, {statement} FROM {table}"
        );
        if script_id.is_some() {
            sql.push_str(" WHERE script_id = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.0.prepare(&sql).store()?;
        let map = |row: &duckdb::Row<'_>| -> duckdb::Result<EdgeRow> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        };
        match script_id {
            Some(id) => stmt.query_map(params![id], map).store()?.collect::<duckdb::Result<_>>(),
            None => stmt.query_map(params![], map).store()?.collect::<duckdb::Result<_>>(),
        }
        .store()
    }

    fn detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<DetailEdge>> {
        let rows = self.edge_rows(
            "data_lineage_detail",
            ("source_table_id", "target_table_id"),
            true,
            script_id,
        )?;
        Ok(rows
            .into_iter()
            .map(|(id, source, target, script_id, statement_id)| DetailEdge {
                id,
                source_table_id: source,
                target_table_id: target,
                script_id,
                statement_id: statement_id.unwrap_or_default(),
            })
            .collect())
    }

    fn summary_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<SummaryEdge>> {
        let mut sql = String::from(
            "SELECT id, source_table_id, target_table_id, script_id, path_count, min_hops, max_hops
             FROM data_lineage_summary",
        );
        if script_id.is_some() {
            sql.push_str(" WHERE script_id = ?");
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.0.prepare(&sql).store()?;
        let map = |row: &duckdb::Row<'_>| -> duckdb::Result<SummaryRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        };
        let raw: Vec<SummaryRow> = match script_id {
            Some(id) => stmt.query_map(params![id], map).store()?.collect::<duckdb::Result<_>>(),
            None => stmt.query_map(params![], map).store()?.collect::<duckdb::Result<_>>(),
        }
        .store()?;

        raw.into_iter()
            .map(|(id, source, target, script_id, paths, min_hops, max_hops)| {
                Ok(SummaryEdge {
                    id,
                    source_table_id: source,
                    target_table_id: target,
                    script_id,
                    path_count: u64::try_from(paths).map_err(|_| {
                        StoreError::Backend(format!("path count {paths} out of range"))
                    })?,
                    min_hops: ordinal(min_hops)?,
                    max_hops: ordinal(max_hops)?,
                })
            })
            .collect()
    }

    fn column_detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<ColumnDetailEdge>> {
        let rows = self.edge_rows(
            "column_lineage_detail",
            ("source_column_id", "target_column_id"),
            true,
            script_id,
        )?;
        Ok(rows
            .into_iter()
            .map(|(id, source, target, script_id, statement_id)| ColumnDetailEdge {
                id,
                source_column_id: source,
                target_column_id: target,
                script_id,
                statement_id: statement_id.unwrap_or_default(),
            })
            .collect())
    }

    fn column_summary_edges(
        &self,
        script_id: Option<&str>,
    ) -> StoreResult<Vec<ColumnSummaryEdge>> {
        let rows = self.edge_rows(
            "column_lineage_summary",
            ("source_column_id", "target_column_id"),
            false,
            script_id,
        )?;
        Ok(rows
            .into_iter()
            .map(|(id, source, target, script_id, _)| ColumnSummaryEdge {
                id,
                source_column_id: source,
                target_column_id: target,
                script_id,
            })
            .collect())
    }
}

impl CatalogRead for DuckDbCatalog {
    fn schema(&self, id: &str) -> StoreResult<Option<SchemaRecord>> {
        self.with_rows(|rows| rows.schema(id))
    }

    fn table(&self, id: &str) -> StoreResult<Option<TableDefinition>> {
        self.with_rows(|rows| rows.table(id))
    }

    fn tables(&self) -> StoreResult<Vec<TableRecord>> {
        self.with_rows(|rows| rows.table_rows(None))
    }

    fn script(&self, id: &str) -> StoreResult<Option<ScriptRecord>> {
        self.with_rows(|rows| Ok(rows.scripts(Some(id))?.into_iter().next()))
    }

    fn scripts(&self) -> StoreResult<Vec<ScriptRecord>> {
        self.with_rows(|rows| rows.scripts(None))
    }

    fn statements(&self, script_id: &str) -> StoreResult<Vec<StatementRecord>> {
        self.with_rows(|rows| rows.statements(script_id))
    }

    fn detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<DetailEdge>> {
        self.with_rows(|rows| rows.detail_edges(script_id))
    }

    fn summary_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<SummaryEdge>> {
        self.with_rows(|rows| rows.summary_edges(script_id))
    }

    fn column_detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<ColumnDetailEdge>> {
        self.with_rows(|rows| rows.column_detail_edges(script_id))
    }

    fn column_summary_edges(
        &self,
        script_id: Option<&str>,
    ) -> StoreResult<Vec<ColumnSummaryEdge>> {
        self.with_rows(|rows| rows.column_summary_edges(script_id))
    }
}

impl CatalogStore for DuckDbCatalog {
    type Transaction<'a> = DuckDbTransaction<'a>;

    fn begin(&self) -> StoreResult<DuckDbTransaction<'_>> {
        let conn = self.connection()?.try_clone().store()?;
        conn.execute_batch("BEGIN TRANSACTION").store()?;
        Ok(DuckDbTransaction {
            conn,
            open: true,
            _catalog: PhantomData,
        })
    }

    fn script_locks(&self) -> &ScriptLocks {
        &self.locks
    }
}

/// An open transaction on its own connection. Dropping it rolls back.
pub struct DuckDbTransaction<'a> {
    conn: Connection,
    open: bool,
    _catalog: PhantomData<&'a DuckDbCatalog>,
}

impl DuckDbTransaction<'_> {
    fn rows(&self) -> Rows<'_> {
        Rows(&self.conn)
    }

    fn execute(&self, sql: &str, params: impl duckdb::Params) -> StoreResult<usize> {
        self.conn.execute(sql, params).store()
    }

    fn finish(&mut self, sql: &str) -> StoreResult<()> {
        self.conn.execute_batch(sql).store()?;
        self.open = false;
        Ok(())
    }
}

impl Drop for DuckDbTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

impl CatalogRead for DuckDbTransaction<'_> {
    fn schema(&self, id: &str) -> StoreResult<Option<SchemaRecord>> {
        self.rows().schema(id)
    }

    fn table(&self, id: &str) -> StoreResult<Option<TableDefinition>> {
        self.rows().table(id)
    }

    fn tables(&self) -> StoreResult<Vec<TableRecord>> {
        self.rows().table_rows(None)
    }

    fn script(&self, id: &str) -> StoreResult<Option<ScriptRecord>> {
        Ok(self.rows().scripts(Some(id))?.into_iter().next())
    }

    fn scripts(&self) -> StoreResult<Vec<ScriptRecord>> {
        self.rows().scripts(None)
    }

    fn statements(&self, script_id: &str) -> StoreResult<Vec<StatementRecord>> {
        self.rows().statements(script_id)
    }

    fn detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<DetailEdge>> {
        self.rows().detail_edges(script_id)
    }

    fn summary_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<SummaryEdge>> {
        self.rows().summary_edges(script_id)
    }

    fn column_detail_edges(&self, script_id: Option<&str>) -> StoreResult<Vec<ColumnDetailEdge>> {
        self.rows().column_detail_edges(script_id)
    }

    fn column_summary_edges(
        &self,
        script_id: Option<&str>,
    ) -> StoreResult<Vec<ColumnSummaryEdge>> {
        self.rows().column_summary_edges(script_id)
    }
}

impl CatalogWrite for DuckDbTransaction<'_> {
    fn put_schema(&mut self, schema: &SchemaRecord) -> StoreResult<()> {
        self.execute(
            "INSERT OR REPLACE INTO databases (id, database_name) VALUES (?, ?)",
            params![&schema.id, &schema.name],
        )?;
        Ok(())
    }

    fn put_table(&mut self, definition: &TableDefinition) -> StoreResult<()> {
        let table = &definition.table;
        self.execute(
            "INSERT OR REPLACE INTO tables
                (id, schema_name, table_name, table_type, provenance, script_id, description, defined_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                &table.id,
                table.schema_name(),
                table.table_name(),
                table.kind.as_str(),
                table.provenance.as_str(),
                table.owner_script_id(),
                &table.description,
                &table.defined_by,
            ],
        )?;

        // columns no longer in the definition go; the rest are upserted
        for stale in self.rows().column_ids(&table.id)? {
            if definition.columns.iter().all(|c| c.id != stale) {
                self.execute("DELETE FROM columns WHERE id = ?", params![stale])?;
            }
        }
        for column in &definition.columns {
            self.execute(
                "INSERT OR REPLACE INTO columns
                    (id, table_id, column_name, data_type, is_nullable, is_primary_key,
                     is_foreign_key, default_value, ordinal, description)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    &column.id,
                    &column.table_id,
                    &column.name,
                    &column.data_type,
                    column.nullable,
                    column.primary_key,
                    column.foreign_key,
                    &column.default_value,
                    i64::from(column.ordinal),
                    &column.description,
                ],
            )?;
        }
        Ok(())
    }

    fn put_script(&mut self, script: &ScriptRecord) -> StoreResult<()> {
        self.execute(
            "INSERT OR REPLACE INTO sql_scripts (id, script_name, script_content, dialect)
             VALUES (?, ?, ?, ?)",
            params![&script.id, &script.name, &script.content, script.dialect.as_str()],
        )?;
        Ok(())
    }

    fn put_statement(&mut self, statement: &StatementRecord) -> StoreResult<()> {
        if self.rows().scripts(Some(&statement.script_id))?.is_empty() {
            return Err(StoreError::Backend(format!(
                "script {} does not exist",
                statement.script_id
            )));
        }
        self.execute(
            "INSERT OR REPLACE INTO script_statements
                (id, script_id, statement_index, statement_type, statement_text, target_table_id)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                &statement.id,
                &statement.script_id,
                i64::from(statement.index),
                statement.kind.as_str(),
                &statement.text,
                &statement.target_table_id,
            ],
        )?;
        Ok(())
    }

    fn put_detail_edges(&mut self, edges: &[DetailEdge]) -> StoreResult<()> {
        for edge in edges {
            self.execute(
                "INSERT OR REPLACE INTO data_lineage_detail
                    (id, source_table_id, target_table_id, script_id, statement_id)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    &edge.id,
                    &edge.source_table_id,
                    &edge.target_table_id,
                    &edge.script_id,
                    &edge.statement_id,
                ],
            )?;
        }
        Ok(())
    }

    fn put_summary_edges(&mut self, edges: &[SummaryEdge]) -> StoreResult<()> {
        for edge in edges {
            self.execute(
                "INSERT OR REPLACE INTO data_lineage_summary
                    (id, source_table_id, target_table_id, script_id, path_count, min_hops, max_hops)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    &edge.id,
                    &edge.source_table_id,
                    &edge.target_table_id,
                    &edge.script_id,
                    i64::try_from(edge.path_count).unwrap_or(i64::MAX),
                    i64::from(edge.min_hops),
                    i64::from(edge.max_hops),
                ],
            )?;
        }
        Ok(())
    }

    fn put_column_detail_edges(&mut self, edges: &[ColumnDetailEdge]) -> StoreResult<()> {
        for edge in edges {
            self.execute(
                "INSERT OR REPLACE INTO column_lineage_detail
                    (id, source_column_id, target_column_id, script_id, statement_id)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    &edge.id,
                    &edge.source_column_id,
                    &edge.target_column_id,
                    &edge.script_id,
                    &edge.statement_id,
                ],
            )?;
        }
        Ok(())
    }

    fn put_column_summary_edges(&mut self, edges: &[ColumnSummaryEdge]) -> StoreResult<()> {
        for edge in edges {
            self.execute(
                "INSERT OR REPLACE INTO column_lineage_summary
                    (id, source_column_id, target_column_id, script_id)
                 VALUES (?, ?, ?, ?)",
                params![
                    &edge.id,
                    &edge.source_column_id,
                    &edge.target_column_id,
                    &edge.script_id,
                ],
            )?;
        }
        Ok(())
    }

    fn purge_script(&mut self, script_id: &str) -> StoreResult<PurgeCounts> {
        let delete = |table: &str| {
            self.execute(
                &format!("DELETE FROM {table} WHERE script_id = ?"),
                params![script_id],
            )
        };
        let counts = PurgeCounts {
            statements: delete("script_statements")?,
            detail_edges: delete("data_lineage_detail")?,
            summary_edges: delete("data_lineage_summary")?,
            column_detail_edges: delete("column_lineage_detail")?,
            column_summary_edges: delete("column_lineage_summary")?,
            temporary_tables: 0,
        };
        self.execute("DELETE FROM sql_scripts WHERE id = ?", params![script_id])?;

        self.execute(
            "DELETE FROM columns WHERE table_id IN (SELECT id FROM tables WHERE script_id = ?)",
            params![script_id],
        )?;
        let temporary_tables = delete("tables")?;
        Ok(PurgeCounts {
            temporary_tables,
            ..counts
        })
    }

    fn reset(&mut self) -> StoreResult<()> {
        for table in CATALOG_TABLES {
            self.execute(&format!("DELETE FROM {table}"), params![])?;
        }
        Ok(())
    }

    fn commit(mut self) -> StoreResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(mut self) -> StoreResult<()> {
        self.finish("ROLLBACK")
    }
}
