//! Statement classification and table-reference resolution.

use std::collections::BTreeSet;

use crate::error::{LineageError, Result};
use crate::ids::normalize_name;
use crate::types::{ParsedKind, StatementFacts, StatementKind, TableIdentity, TableKind, TableRef};

/// Name resolution context for the statements of one script.
#[derive(Debug, Clone)]
pub struct ScriptScope {
    script: String,
    temporaries: BTreeSet<String>,
    default_schema: Option<String>,
}

impl ScriptScope {
    /// Collects the temporary tables `facts` write.
    ///
    /// A written table is temporary when it carries no schema prefix, or when
    /// its CREATE statement declares it temporary.
    pub fn new(script: &str, facts: &[StatementFacts], default_schema: Option<&str>) -> Self {
        let temporaries = facts
            .iter()
            .filter(|f| f.kind.is_write())
            .filter_map(|f| {
                let target = f.target.as_ref()?;
                let declared = f.temporary && f.kind == ParsedKind::CreateTable;
                (declared || !target.is_qualified()).then(|| normalize_name(&target.name))
            })
            .collect();
        Self {
            script: normalize_name(script),
            temporaries,
            default_schema: default_schema.map(normalize_name),
        }
    }

    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn is_temporary(&self, name: &str) -> bool {
        self.temporaries.contains(&normalize_name(name))
    }

    /// Resolves a table read by some statement of the script.
    ///
    /// Qualified names are entity tables. A bare name is the script's own
    /// temporary table when it writes one, else an entity table in the
    /// default schema.
    pub fn resolve_source(&self, table: &TableRef) -> TableIdentity {
        match &table.schema {
            Some(schema) => TableIdentity::entity(schema, &table.name),
            None if self.is_temporary(&table.name) => {
                TableIdentity::temporary(&self.script, &table.name)
            }
            None => TableIdentity::entity(
                self.default_schema.as_deref().unwrap_or_default(),
                &table.name,
            ),
        }
    }
}

/// A lineage-bearing statement with its tables resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedStatement {
    /// 1-based position in the script.
    pub index: u32,
    pub kind: StatementKind,
    pub target: TableIdentity,
    pub target_kind: TableKind,
    /// Distinct sources in first-seen order, never including the target.
    pub sources: Vec<TableIdentity>,
}

/// Classifies one statement.
///
/// Returns `Ok(None)` for statements that carry no lineage (queries, session
/// and housekeeping commands).
pub fn classify(
    facts: &StatementFacts,
    index: u32,
    scope: &ScriptScope,
) -> Result<Option<ClassifiedStatement>> {
    let kind_name = facts.kind.to_string();
    let Some(target) = &facts.target else {
        if facts.kind.is_write() {
            return Err(LineageError::Classification {
                index,
                reason: format!("{kind_name} statement has no target table"),
            });
        }
        return Ok(None);
    };
    if target.name.trim().is_empty() {
        return Err(LineageError::Classification {
            index,
            reason: format!("{kind_name} statement has an empty target name"),
        });
    }

    let temporary = match &facts.kind {
        ParsedKind::CreateTable => facts.temporary || !target.is_qualified(),
        ParsedKind::CreateView
        | ParsedKind::Insert
        | ParsedKind::Update
        | ParsedKind::Merge => !target.is_qualified(),
        ParsedKind::Query => return Ok(None),
        ParsedKind::Other(name) => {
            return Err(LineageError::Classification {
                index,
                reason: format!("unrecognized statement kind '{name}' writing {target}"),
            });
        }
    };

    let (kind, target_kind) = match (&facts.kind, temporary) {
        (ParsedKind::CreateTable, true) => (StatementKind::CreateTempTable, TableKind::Temp),
        (ParsedKind::CreateTable, false) => (StatementKind::CreateTable, TableKind::Table),
        (ParsedKind::CreateView, true) => (StatementKind::ViewDef, TableKind::Temp),
        (ParsedKind::CreateView, false) => (StatementKind::ViewDef, TableKind::View),
        (ParsedKind::Insert, t) => (StatementKind::Insert, write_kind(t)),
        (ParsedKind::Update, t) => (StatementKind::Update, write_kind(t)),
        (ParsedKind::Merge, t) => (StatementKind::Merge, write_kind(t)),
        (ParsedKind::Query | ParsedKind::Other(_), _) => return Ok(None),
    };

    let target = if temporary {
        TableIdentity::temporary(scope.script(), &target.name)
    } else {
        scope.resolve_source(target)
    };

    let mut sources = Vec::new();
    for source in &facts.sources {
        let identity = scope.resolve_source(source);
        if identity != target && !sources.contains(&identity) {
            sources.push(identity);
        }
    }

    Ok(Some(ClassifiedStatement {
        index,
        kind,
        target,
        target_kind,
        sources,
    }))
}

fn write_kind(temporary: bool) -> TableKind {
    if temporary {
        TableKind::Temp
    } else {
        TableKind::Table
    }
}
