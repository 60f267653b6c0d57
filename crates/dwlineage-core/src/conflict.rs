//! Merging of a candidate table definition into the catalog.
//!
//! The policy is a lookup from `(existing provenance, incoming provenance)` to
//! a merge strategy. EXTERNAL stand-ins behave as if no record existed: any
//! real definition replaces them, and an EXTERNAL candidate never touches a
//! real record.

use crate::error::{LineageError, Result};
use crate::types::{Provenance, TableDefinition};

/// Outcome of resolving a candidate against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The catalog already holds the merged definition.
    Unchanged,
    /// The merged definition to write.
    Write(TableDefinition),
}

/// A merge strategy: `(existing, incoming, script id) -> merged`.
pub type Strategy = fn(&TableDefinition, TableDefinition, &str) -> Result<TableDefinition>;

/// The resolution matrix.
pub fn strategy(existing: Provenance, incoming: Provenance) -> Strategy {
    use Provenance::{Ddl, Dml, External};
    match (existing, incoming) {
        (Ddl, Ddl) => redefine_ddl,
        (Dml, Ddl) => ddl_over_dml,
        (Ddl, Dml) => describe_ddl,
        (Dml, Dml) => union_dml,
        (External, External) => union_external,
        (External, Ddl | Dml) => supersede,
        (Ddl | Dml, External) => keep_existing,
    }
}

/// Resolves `incoming` against the current record for the same table, if any.
pub fn resolve(
    existing: Option<&TableDefinition>,
    incoming: TableDefinition,
    script_id: &str,
) -> Result<Resolution> {
    let Some(existing) = existing else {
        return Ok(Resolution::Write(incoming));
    };
    let merge = strategy(existing.table.provenance, incoming.table.provenance);
    let merged = merge(existing, incoming, script_id)?;
    if &merged == existing {
        Ok(Resolution::Unchanged)
    } else {
        Ok(Resolution::Write(merged))
    }
}

/// DDL over DDL: only the script that owns the definition may restate it.
fn redefine_ddl(
    existing: &TableDefinition,
    incoming: TableDefinition,
    script_id: &str,
) -> Result<TableDefinition> {
    match existing.table.defined_by.as_deref() {
        Some(owner) if owner == script_id => Ok(incoming),
        owner => Err(LineageError::DuplicateDefinition {
            table: existing.table.identity.to_string(),
            defined_by: owner.unwrap_or("unknown").to_string(),
        }),
    }
}

/// DDL over DML: structure comes from the DDL, existing descriptions stay.
fn ddl_over_dml(
    existing: &TableDefinition,
    mut incoming: TableDefinition,
    _script_id: &str,
) -> Result<TableDefinition> {
    for column in &mut incoming.columns {
        if let Some(previous) = existing.column(&column.name) {
            if previous.description.is_some() {
                column.description = previous.description.clone();
            }
        }
    }
    if existing.table.description.is_some() {
        incoming.table.description = existing.table.description.clone();
    }
    Ok(incoming)
}

/// DML into DDL: structure is fixed, DML may only fill missing descriptions.
fn describe_ddl(
    existing: &TableDefinition,
    incoming: TableDefinition,
    _script_id: &str,
) -> Result<TableDefinition> {
    let mut merged = existing.clone();
    for column in incoming.columns {
        let Some(target) = merged.columns.iter_mut().find(|c| c.name == column.name) else {
            return Err(LineageError::UnknownColumn {
                table: existing.table.identity.to_string(),
                column: column.name,
            });
        };
        if target.description.is_none() {
            target.description = column.description;
        }
    }
    if merged.table.description.is_none() {
        merged.table.description = incoming.table.description;
    }
    Ok(merged)
}

/// DML into DML: union of columns, descriptions must agree when both present.
fn union_dml(
    existing: &TableDefinition,
    incoming: TableDefinition,
    _script_id: &str,
) -> Result<TableDefinition> {
    let mut merged = existing.clone();
    for mut column in incoming.columns {
        match merged.columns.iter_mut().find(|c| c.name == column.name) {
            Some(current) => match (current.description.clone(), column.description) {
                (Some(present), Some(other)) if present != other => {
                    return Err(LineageError::ConflictingDescription {
                        table: existing.table.identity.to_string(),
                        column: column.name,
                        existing: present,
                        incoming: other,
                    });
                }
                (None, Some(other)) => current.description = Some(other),
                _ => {}
            },
            None => {
                column.ordinal = merged.columns.len() as u32 + 1;
                merged.columns.push(column);
            }
        }
    }
    if merged.table.description.is_none() {
        merged.table.description = incoming.table.description;
    }
    Ok(merged)
}

fn union_external(
    existing: &TableDefinition,
    incoming: TableDefinition,
    _script_id: &str,
) -> Result<TableDefinition> {
    let mut merged = existing.clone();
    for mut column in incoming.columns {
        if merged.column(&column.name).is_none() {
            column.ordinal = merged.columns.len() as u32 + 1;
            merged.columns.push(column);
        }
    }
    Ok(merged)
}

fn supersede(
    _existing: &TableDefinition,
    incoming: TableDefinition,
    _script_id: &str,
) -> Result<TableDefinition> {
    Ok(incoming)
}

fn keep_existing(
    existing: &TableDefinition,
    _incoming: TableDefinition,
    _script_id: &str,
) -> Result<TableDefinition> {
    Ok(existing.clone())
}
