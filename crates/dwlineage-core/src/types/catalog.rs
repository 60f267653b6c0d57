use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Dialect, TableIdentity};

/// Kind of a catalog table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum TableKind {
    #[serde(rename = "TABLE")]
    Table,
    #[serde(rename = "VIEW")]
    View,
    #[serde(rename = "TMP_TABLE")]
    Temp,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Temp => "TMP_TABLE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TABLE" => Some(Self::Table),
            "VIEW" => Some(Self::View),
            "TMP_TABLE" => Some(Self::Temp),
            _ => None,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a table definition came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provenance {
    /// Declared by a CREATE statement.
    Ddl,
    /// Inferred from a statement writing to the table.
    Dml,
    /// Stand-in for a table that is only ever read.
    External,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ddl => "DDL",
            Self::Dml => "DML",
            Self::External => "EXTERNAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DDL" => Some(Self::Ddl),
            "DML" => Some(Self::Dml),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified kind of a lineage-bearing statement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    CreateTable,
    CreateTempTable,
    Insert,
    Update,
    Merge,
    ViewDef,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTable => "CREATE_TABLE",
            Self::CreateTempTable => "CREATE_TEMP_TABLE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Merge => "MERGE",
            Self::ViewDef => "VIEW_DEF",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE_TABLE" => Some(Self::CreateTable),
            "CREATE_TEMP_TABLE" => Some(Self::CreateTempTable),
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "MERGE" => Some(Self::Merge),
            "VIEW_DEF" => Some(Self::ViewDef),
            _ => None,
        }
    }

    /// Provenance of the definitions this kind of statement contributes.
    pub fn provenance(&self) -> Provenance {
        match self {
            Self::CreateTable | Self::CreateTempTable | Self::ViewDef => Provenance::Ddl,
            Self::Insert | Self::Update | Self::Merge => Provenance::Dml,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub id: String,
    pub identity: TableIdentity,
    pub kind: TableKind,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Script whose DDL established the current definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defined_by: Option<String>,
}

impl TableRecord {
    pub fn schema_name(&self) -> &str {
        self.identity.schema()
    }

    pub fn table_name(&self) -> &str {
        self.identity.name()
    }

    pub fn owner_script_id(&self) -> Option<String> {
        self.identity.owner_script_id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRecord {
    pub id: String,
    pub table_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub nullable: bool,
    pub primary_key: bool,
    pub foreign_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// 1-based position within the table.
    pub ordinal: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A table together with its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub table: TableRecord,
    pub columns: Vec<ColumnRecord>,
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&ColumnRecord> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    /// Dialect the script was parsed with.
    pub dialect: Dialect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatementRecord {
    pub id: String,
    pub script_id: String,
    /// 1-based position within the script.
    pub index: u32,
    pub kind: StatementKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailEdge {
    pub id: String,
    pub source_table_id: String,
    pub target_table_id: String,
    pub script_id: String,
    pub statement_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEdge {
    pub id: String,
    pub source_table_id: String,
    pub target_table_id: String,
    pub script_id: String,
    /// Distinct detail paths the edge contracts.
    pub path_count: u64,
    /// Detail edges on the shortest of those paths.
    pub min_hops: u32,
    /// Detail edges on the longest of those paths.
    pub max_hops: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetailEdge {
    pub id: String,
    pub source_column_id: String,
    pub target_column_id: String,
    pub script_id: String,
    pub statement_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummaryEdge {
    pub id: String,
    pub source_column_id: String,
    pub target_column_id: String,
    pub script_id: String,
}
