//! Conversion of statement facts into candidate catalog definitions.

use crate::classifier::ClassifiedStatement;
use crate::ids::{self, normalize_name};
use crate::types::{
    ColumnFacts, ColumnMapping, ColumnRecord, Provenance, SourceColumn, StatementFacts,
    TableDefinition, TableIdentity, TableKind, TableRecord,
};

/// Builds the candidate definition of the table a statement writes.
///
/// Column names are normalized and deduplicated (first occurrence wins, a later
/// duplicate may only fill a missing description). DML statements contribute
/// names and descriptions only; structural fields keep their defaults.
pub fn normalize(
    statement: &ClassifiedStatement,
    facts: &StatementFacts,
    script_id: &str,
) -> TableDefinition {
    let provenance = statement.kind.provenance();
    let table_id = statement.target.id();
    let defined_by = (provenance == Provenance::Ddl).then(|| script_id.to_string());

    let mut columns: Vec<ColumnRecord> = Vec::with_capacity(facts.columns.len());
    for column in &facts.columns {
        let name = normalize_name(&column.name);
        if name.is_empty() {
            continue;
        }
        if let Some(existing) = columns.iter_mut().find(|c| c.name == name) {
            if existing.description.is_none() {
                existing.description = clean_description(column.description.as_deref());
            }
            continue;
        }
        let ordinal = columns.len() as u32 + 1;
        columns.push(column_record(&table_id, name, column, provenance, ordinal));
    }

    TableDefinition {
        table: TableRecord {
            id: table_id,
            identity: statement.target.clone(),
            kind: statement.target_kind,
            provenance,
            description: clean_description(facts.description.as_deref()),
            defined_by,
        },
        columns,
    }
}

fn column_record(
    table_id: &str,
    name: String,
    facts: &ColumnFacts,
    provenance: Provenance,
    ordinal: u32,
) -> ColumnRecord {
    let structural = provenance == Provenance::Ddl;
    ColumnRecord {
        id: ids::column_id(table_id, &name),
        table_id: table_id.to_string(),
        data_type: facts
            .data_type
            .clone()
            .filter(|t| structural && !t.trim().is_empty()),
        nullable: if structural { facts.nullable } else { true },
        primary_key: structural && facts.primary_key,
        foreign_key: structural && facts.foreign_key,
        default_value: facts.default_value.clone().filter(|_| structural),
        description: clean_description(facts.description.as_deref()),
        ordinal,
        name,
    }
}

/// Stand-in definition for a table that is read but never defined.
pub fn external_definition(identity: &TableIdentity, columns: &[String]) -> TableDefinition {
    let table_id = identity.id();
    let kind = if identity.is_entity() {
        TableKind::Table
    } else {
        TableKind::Temp
    };
    let mut records: Vec<ColumnRecord> = Vec::new();
    for column in columns {
        let name = normalize_name(column);
        if name.is_empty() || records.iter().any(|c| c.name == name) {
            continue;
        }
        records.push(ColumnRecord {
            id: ids::column_id(&table_id, &name),
            table_id: table_id.clone(),
            data_type: None,
            nullable: true,
            primary_key: false,
            foreign_key: false,
            default_value: None,
            description: None,
            ordinal: records.len() as u32 + 1,
            name,
        });
    }
    TableDefinition {
        table: TableRecord {
            id: table_id,
            identity: identity.clone(),
            kind,
            provenance: Provenance::External,
            description: None,
            defined_by: None,
        },
        columns: records,
    }
}

/// Column mappings of a write that names no target columns, matched by
/// position onto the columns of `target`.
///
/// Only a DDL definition fixes the column order. Any other target, or a
/// select list wider than the table, yields no mappings.
pub fn positional_mappings(
    target: Option<&TableDefinition>,
    positions: &[Vec<SourceColumn>],
) -> Vec<ColumnMapping> {
    let Some(target) = target.filter(|t| t.table.provenance == Provenance::Ddl) else {
        return Vec::new();
    };
    if positions.len() > target.columns.len() {
        return Vec::new();
    }

    let mut columns: Vec<&ColumnRecord> = target.columns.iter().collect();
    columns.sort_by_key(|c| c.ordinal);
    columns
        .into_iter()
        .zip(positions)
        .filter(|(_, sources)| !sources.is_empty())
        .map(|(column, sources)| ColumnMapping {
            target: column.name.clone(),
            sources: sources.clone(),
        })
        .collect()
}

/// Empty and whitespace-only descriptions count as absent.
pub fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParsedKind, StatementKind};

    fn statement(kind: StatementKind, target: TableIdentity, target_kind: TableKind) -> ClassifiedStatement {
        ClassifiedStatement {
            index: 1,
            kind,
            target,
            target_kind,
            sources: Vec::new(),
        }
    }

    #[test]
    fn ddl_keeps_structure_and_orders_columns() {
        let facts = StatementFacts::new(ParsedKind::CreateTable)
            .with_target("dw.customer")
            .with_columns([
                ColumnFacts::named("id").with_type("INT").primary_key(),
                ColumnFacts::named("name").with_type("VARCHAR(50)").with_description(" Name "),
            ]);
        let target = TableIdentity::entity("dw", "customer");
        let def = normalize(
            &statement(StatementKind::CreateTable, target, TableKind::Table),
            &facts,
            "JOB",
        );

        assert_eq!(def.table.provenance, Provenance::Ddl);
        assert_eq!(def.table.defined_by.as_deref(), Some("JOB"));
        assert_eq!(def.columns[0].id, "DW|CUSTOMER||ID");
        assert!(def.columns[0].primary_key);
        assert!(!def.columns[0].nullable);
        assert_eq!(def.columns[1].ordinal, 2);
        assert_eq!(def.columns[1].description.as_deref(), Some("Name"));
    }

    #[test]
    fn dml_contributes_names_and_descriptions_only() {
        let facts = StatementFacts::new(ParsedKind::Insert).with_columns([
            ColumnFacts::named("id").with_type("INT").not_null(),
            ColumnFacts::named("ID").with_description("key"),
            ColumnFacts::named("amt").with_description(""),
        ]);
        let target = TableIdentity::temporary("job", "vt");
        let def = normalize(
            &statement(StatementKind::Insert, target, TableKind::Temp),
            &facts,
            "JOB",
        );

        assert_eq!(def.table.provenance, Provenance::Dml);
        assert_eq!(def.table.defined_by, None);
        assert_eq!(def.columns.len(), 2);
        assert_eq!(def.columns[0].data_type, None);
        assert!(def.columns[0].nullable);
        assert_eq!(def.columns[0].description.as_deref(), Some("key"));
        assert_eq!(def.columns[1].description, None);
    }

    fn ddl_table(columns: &[&str]) -> TableDefinition {
        let facts = StatementFacts::new(ParsedKind::CreateTable)
            .with_columns(columns.iter().map(|c| ColumnFacts::named(*c).with_type("INT")));
        normalize(
            &statement(
                StatementKind::CreateTable,
                TableIdentity::entity("dw", "t"),
                TableKind::Table,
            ),
            &facts,
            "JOB",
        )
    }

    #[test]
    fn positional_sources_follow_ddl_column_order() {
        let target = ddl_table(&["id", "amount", "note"]);
        let facts = StatementFacts::new(ParsedKind::Insert)
            .with_positional_sources(&[&[("src.o", "order_id")], &[], &[("src.o", "amt")]]);

        let mappings = positional_mappings(Some(&target), &facts.positional_sources);
        let pairs: Vec<(&str, &str)> = mappings
            .iter()
            .map(|m| (m.target.as_str(), m.sources[0].column.as_str()))
            .collect();
        assert_eq!(pairs, vec![("ID", "order_id"), ("NOTE", "amt")]);
    }

    #[test]
    fn positional_sources_need_a_ddl_target_wide_enough() {
        let facts = StatementFacts::new(ParsedKind::Insert)
            .with_positional_sources(&[&[("src.o", "a")], &[("src.o", "b")]]);

        assert!(positional_mappings(None, &facts.positional_sources).is_empty());
        let narrow = ddl_table(&["id"]);
        assert!(positional_mappings(Some(&narrow), &facts.positional_sources).is_empty());
        let stand_in = external_definition(
            &TableIdentity::entity("dw", "t"),
            &["x".to_string(), "y".to_string()],
        );
        assert!(positional_mappings(Some(&stand_in), &facts.positional_sources).is_empty());
    }

    #[test]
    fn external_stand_in_has_external_provenance() {
        let def = external_definition(
            &TableIdentity::entity("src", "feed"),
            &["a".to_string(), "A".to_string(), "b".to_string()],
        );
        assert_eq!(def.table.provenance, Provenance::External);
        assert_eq!(def.table.kind, TableKind::Table);
        assert_eq!(def.columns.len(), 2);
    }
}
