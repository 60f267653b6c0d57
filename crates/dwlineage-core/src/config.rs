//! Engine configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::Dialect;

/// Tunables for script processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Dialect used when none is given for a script.
    #[serde(default)]
    pub dialect: Dialect,

    /// Longest path followed through temporary tables when deriving summary
    /// lineage (default: 20).
    #[serde(default = "default_max_traversal_depth")]
    pub max_traversal_depth: usize,

    /// Schema assigned to bare source tables that are not temporary tables of
    /// the script reading them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_schema: Option<String>,

    /// Record column-level lineage (default: true).
    #[serde(default = "default_true")]
    pub column_lineage: bool,

    /// Extra attempts after a transaction conflict (default: 2).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Worker threads for batch processing (default: available parallelism).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            max_traversal_depth: default_max_traversal_depth(),
            default_schema: None,
            column_lineage: true,
            max_retries: default_max_retries(),
            workers: default_workers(),
        }
    }
}

fn default_max_traversal_depth() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl EngineConfig {
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_max_traversal_depth(mut self, depth: usize) -> Self {
        self.max_traversal_depth = depth;
        self
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
