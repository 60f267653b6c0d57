//! Writing lineage documents to disk.

use std::fs;
use std::path::{Path, PathBuf};

use dwlineage_core::CatalogRead;

use crate::node_link::{export_lineage, Layer, NodeLinkDocument, Scope};
use crate::ExportError;

/// File name prefix of the catalog-wide export.
const ALL_SCRIPTS_PREFIX: &str = "all_lineage";

/// Paths of the two layer files of one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub detail: PathBuf,
    pub summary: PathBuf,
}

/// Writes `<script>_detail.json` and `<script>_summary.json` for one script.
///
/// The file prefix is the script's file stem as it was registered.
pub fn write_script_lineage<C>(
    catalog: &C,
    script_id: &str,
    dir: &Path,
) -> Result<WrittenFiles, ExportError>
where
    C: CatalogRead + ?Sized,
{
    let script = catalog
        .script(script_id)?
        .ok_or_else(|| ExportError::UnknownScript(script_id.to_string()))?;
    let prefix = Path::new(&script.name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&script.id)
        .to_string();
    write_layers(catalog, &Scope::Script(script.id), &prefix, dir)
}

/// Writes `all_lineage_detail.json` and `all_lineage_summary.json`.
pub fn write_all_lineage<C>(catalog: &C, dir: &Path) -> Result<WrittenFiles, ExportError>
where
    C: CatalogRead + ?Sized,
{
    write_layers(catalog, &Scope::All, ALL_SCRIPTS_PREFIX, dir)
}

fn write_layers<C>(
    catalog: &C,
    scope: &Scope,
    prefix: &str,
    dir: &Path,
) -> Result<WrittenFiles, ExportError>
where
    C: CatalogRead + ?Sized,
{
    fs::create_dir_all(dir)?;
    let detail = dir.join(format!("{prefix}_detail.json"));
    let summary = dir.join(format!("{prefix}_summary.json"));
    write_document(&export_lineage(catalog, Layer::Detail, scope)?, &detail)?;
    write_document(&export_lineage(catalog, Layer::Summary, scope)?, &summary)?;
    Ok(WrittenFiles { detail, summary })
}

pub fn write_document(document: &NodeLinkDocument, path: &Path) -> Result<(), ExportError> {
    fs::write(path, document.to_json()?)?;
    Ok(())
}

pub fn read_document(path: &Path) -> Result<NodeLinkDocument, ExportError> {
    NodeLinkDocument::from_json(&fs::read_to_string(path)?)
}
