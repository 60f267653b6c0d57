//! Per-statement facts handed to the engine by a SQL parser.
//!
//! The engine never looks at syntax trees directly. Anything able to produce
//! [`StatementFacts`] can drive it; [`crate::parser::extract_facts`] is the
//! bundled producer built on `sqlparser`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement kind as reported by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "name", rename_all = "camelCase")]
pub enum ParsedKind {
    CreateTable,
    CreateView,
    Insert,
    Update,
    Merge,
    /// A read-only query.
    Query,
    /// Any other statement, named by its leading keyword.
    Other(String),
}

impl ParsedKind {
    /// Whether statements of this kind write a table.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreateTable | Self::CreateView | Self::Insert | Self::Update | Self::Merge
        )
    }
}

impl fmt::Display for ParsedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable => f.write_str("CREATE TABLE"),
            Self::CreateView => f.write_str("CREATE VIEW"),
            Self::Insert => f.write_str("INSERT"),
            Self::Update => f.write_str("UPDATE"),
            Self::Merge => f.write_str("MERGE"),
            Self::Query => f.write_str("SELECT"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// A possibly schema-qualified table name, exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.filter(|s| !s.is_empty()).map(str::to_string),
            name: name.to_string(),
        }
    }

    /// Splits a dotted name; everything before the last part is the schema.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((schema, name)) => Self::new(Some(schema), name),
            None => Self::new(None, qualified),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.schema.is_some()
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// An output column of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnFacts {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnFacts {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            nullable: true,
            primary_key: false,
            foreign_key: false,
            default_value: None,
            description: None,
        }
    }

    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// A source column referenced by an output column expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceColumn {
    pub table: TableRef,
    pub column: String,
}

/// `target ← f(sources…)` for one output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub target: String,
    pub sources: Vec<SourceColumn>,
}

/// Everything the engine needs to know about one parsed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementFacts {
    pub kind: ParsedKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TableRef>,
    /// `CREATE TEMPORARY`/`VOLATILE` style declaration.
    #[serde(default)]
    pub temporary: bool,
    #[serde(default)]
    pub columns: Vec<ColumnFacts>,
    #[serde(default)]
    pub sources: Vec<TableRef>,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    /// Sources of each output position of a write that names no target
    /// columns (`INSERT INTO t SELECT …`). The engine matches them onto the
    /// target's column order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positional_sources: Vec<Vec<SourceColumn>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl StatementFacts {
    pub fn new(kind: ParsedKind) -> Self {
        Self {
            kind,
            target: None,
            temporary: false,
            columns: Vec::new(),
            sources: Vec::new(),
            column_mappings: Vec::new(),
            positional_sources: Vec::new(),
            description: None,
            text: String::new(),
        }
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(TableRef::parse(target));
        self
    }

    pub fn with_sources<'a>(mut self, sources: impl IntoIterator<Item = &'a str>) -> Self {
        self.sources.extend(sources.into_iter().map(TableRef::parse));
        self
    }

    pub fn with_columns(mut self, columns: impl IntoIterator<Item = ColumnFacts>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn with_mapping(mut self, target: &str, sources: &[(&str, &str)]) -> Self {
        self.column_mappings.push(ColumnMapping {
            target: target.to_string(),
            sources: sources
                .iter()
                .map(|(table, column)| SourceColumn {
                    table: TableRef::parse(table),
                    column: column.to_string(),
                })
                .collect(),
        });
        self
    }

    pub fn with_positional_sources(mut self, positions: &[&[(&str, &str)]]) -> Self {
        self.positional_sources.extend(positions.iter().map(|sources| {
            sources
                .iter()
                .map(|(table, column)| SourceColumn {
                    table: TableRef::parse(table),
                    column: column.to_string(),
                })
                .collect()
        }));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ref_splits_on_last_dot() {
        let three = TableRef::parse("db.sales.orders");
        assert_eq!(three.schema.as_deref(), Some("db.sales"));
        assert_eq!(three.name, "orders");
        assert!(!TableRef::parse("orders").is_qualified());
        assert_eq!(three.to_string(), "db.sales.orders");
    }

    #[test]
    fn facts_deserialize_with_defaults() {
        let json = r#"{"kind":{"type":"insert"},"target":{"name":"vt"},"sources":[{"schema":"s","name":"a"}]}"#;
        let facts: StatementFacts = serde_json::from_str(json).unwrap();
        assert_eq!(facts.kind, ParsedKind::Insert);
        assert!(facts.columns.is_empty());
        assert_eq!(facts.sources, vec![TableRef::parse("s.a")]);
    }

    #[test]
    fn only_write_kinds_write() {
        assert!(ParsedKind::Merge.is_write());
        assert!(!ParsedKind::Query.is_write());
        assert!(!ParsedKind::Other("DROP".into()).is_write());
    }
}
