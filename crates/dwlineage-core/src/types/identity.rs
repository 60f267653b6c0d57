use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{self, normalize_name};

/// Identity of a catalog table.
///
/// Entity tables live independently of any script. Temporary tables are scoped
/// to the script that writes them, so two scripts may each own a temporary
/// table with the same name without colliding.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(tag = "scope", rename_all = "camelCase")]
pub enum TableIdentity {
    Entity { schema: String, name: String },
    Temporary { script: String, name: String },
}

impl TableIdentity {
    /// Builds an entity identity from raw (possibly quoted, mixed-case) names.
    pub fn entity(schema: &str, name: &str) -> Self {
        Self::Entity {
            schema: normalize_name(schema),
            name: normalize_name(name),
        }
    }

    /// Builds a temporary identity owned by `script`.
    pub fn temporary(script: &str, name: &str) -> Self {
        Self::Temporary {
            script: normalize_name(script),
            name: normalize_name(name),
        }
    }

    pub fn id(&self) -> String {
        ids::table_id(self)
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity { .. })
    }

    /// Schema name; empty for temporary tables.
    pub fn schema(&self) -> &str {
        match self {
            Self::Entity { schema, .. } => schema,
            Self::Temporary { .. } => "",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Entity { name, .. } | Self::Temporary { name, .. } => name,
        }
    }

    /// Identifier of the owning script, for temporary tables.
    pub fn owner_script_id(&self) -> Option<String> {
        match self {
            Self::Entity { .. } => None,
            Self::Temporary { script, .. } => Some(ids::script_id(script)),
        }
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity { schema, name } if schema.is_empty() => write!(f, "{name}"),
            Self::Entity { schema, name } => write!(f, "{schema}.{name}"),
            Self::Temporary { script, name } => write!(f, "{name} (temporary, {script})"),
        }
    }
}
