//! Settings file handling.
//!
//! The optional `--config` file is TOML holding the engine settings plus the
//! catalog path. Command-line flags take precedence over the file.

use anyhow::{Context, Result};
use dwlineage_core::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Catalog file used when neither flag nor settings file names one.
pub const DEFAULT_DB: &str = "lineage.duckdb";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub db: Option<PathBuf>,
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Catalog path: flag, then settings file, then [`DEFAULT_DB`].
    pub fn db_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.db.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwlineage_core::Dialect;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_config_uses_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.engine, EngineConfig::default());
        assert_eq!(settings.db_path(None), PathBuf::from(DEFAULT_DB));
    }

    #[test]
    fn test_reads_engine_settings_from_toml() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"
db = "warehouse.duckdb"
dialect = "snowflake"
maxTraversalDepth = 5
defaultSchema = "ods"
columnLineage = false
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.engine.dialect, Dialect::Snowflake);
        assert_eq!(settings.engine.max_traversal_depth, 5);
        assert_eq!(settings.engine.default_schema.as_deref(), Some("ods"));
        assert!(!settings.engine.column_lineage);
        assert_eq!(settings.engine.max_retries, 2);
        assert_eq!(settings.db_path(None), PathBuf::from("warehouse.duckdb"));
        assert_eq!(
            settings.db_path(Some(Path::new("flag.duckdb"))),
            PathBuf::from("flag.duckdb")
        );
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "maxTraversalDepth = \"deep\"").unwrap();
        assert!(Settings::load(Some(file.path())).is_err());
    }
}
