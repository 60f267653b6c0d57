//! Script discovery and reading.

use anyhow::{Context, Result};
use dwlineage_core::{Dialect, ScriptSource};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read one script file.
///
/// The script is named by its path; the engine derives the script id from
/// the file stem.
pub fn read_script(path: &Path, dialect: Dialect) -> Result<ScriptSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(ScriptSource::new(path.display().to_string(), content).with_dialect(dialect))
}

/// Find `.sql` files below `dir`, recursively, in path order.
pub fn discover_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() && is_sql_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_discovers_nested_sql_files_only() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("daily/facts")).unwrap();
        fs::write(dir.path().join("b.sql"), "SELECT 1").unwrap();
        fs::write(dir.path().join("daily/a.SQL"), "SELECT 1").unwrap();
        fs::write(dir.path().join("daily/facts/c.sql"), "SELECT 1").unwrap();
        fs::write(dir.path().join("notes.txt"), "not sql").unwrap();

        let files = discover_sql_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["b.sql", "daily/a.SQL", "daily/facts/c.sql"]);
    }

    #[test]
    fn test_read_script_keeps_path_and_dialect() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("load_orders.sql");
        fs::write(&path, "INSERT INTO dw.t SELECT 1").unwrap();

        let source = read_script(&path, Dialect::Postgres).unwrap();
        assert_eq!(source.script_id(), "LOAD_ORDERS");
        assert_eq!(source.dialect, Dialect::Postgres);
        assert!(source.content.contains("dw.t"));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        assert!(discover_sql_files(Path::new("/nonexistent/dir")).is_err());
        assert!(read_script(Path::new("/nonexistent/file.sql"), Dialect::Generic).is_err());
    }
}
