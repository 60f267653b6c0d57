use dwlineage_core::{
    CatalogRead, EngineConfig, MemoryCatalog, ProcessMode, ScriptSource, UpdateCoordinator,
};
use dwlineage_export::{
    read_document, write_all_lineage, write_script_lineage, DuckDbCatalog, ExportError, Layer,
};

const LOAD_ORDERS: &str = "
CREATE TABLE vt_orders AS SELECT o.id, o.amount FROM src.orders o;
INSERT INTO dw.fact_orders (id, amount) SELECT id, amount FROM vt_orders;
";

const LOAD_SALES: &str = "INSERT INTO dw.sales (id) SELECT id FROM dw.fact_orders;";

fn load<S>(catalog: &S)
where
    S: dwlineage_core::CatalogStore,
{
    let coordinator = UpdateCoordinator::new(catalog, EngineConfig::default());
    for (name, sql) in [("load_orders.sql", LOAD_ORDERS), ("load_sales.sql", LOAD_SALES)] {
        let outcome = coordinator.process(&ScriptSource::new(name, sql), ProcessMode::Clear);
        assert!(outcome.is_success(), "{name}: {:?}", outcome.error);
    }
}

#[test]
fn per_script_files_are_named_after_the_script() {
    let catalog = MemoryCatalog::new();
    load(&catalog);
    let dir = tempfile::tempdir().unwrap();

    let files = write_script_lineage(&catalog, "LOAD_ORDERS", dir.path()).unwrap();
    assert_eq!(files.detail, dir.path().join("load_orders_detail.json"));
    assert_eq!(files.summary, dir.path().join("load_orders_summary.json"));

    let detail = read_document(&files.detail).unwrap();
    assert_eq!(detail.graph.layer, Layer::Detail);
    assert_eq!(
        detail.detail_edges().unwrap(),
        catalog.detail_edges(Some("LOAD_ORDERS")).unwrap()
    );
    let summary = read_document(&files.summary).unwrap();
    assert_eq!(
        summary.summary_edges().unwrap(),
        catalog.summary_edges(Some("LOAD_ORDERS")).unwrap()
    );
}

#[test]
fn global_files_cover_every_script() {
    let catalog = MemoryCatalog::new();
    load(&catalog);
    let dir = tempfile::tempdir().unwrap();

    let files = write_all_lineage(&catalog, &dir.path().join("out")).unwrap();
    assert!(files.detail.ends_with("all_lineage_detail.json"));
    let summary = read_document(&files.summary).unwrap();
    assert_eq!(summary.graph.scope, "all");
    assert_eq!(summary.links.len(), 2);
    assert_eq!(summary.nodes.len(), 3);
}

#[test]
fn exporting_an_unknown_script_fails() {
    let catalog = MemoryCatalog::new();
    let dir = tempfile::tempdir().unwrap();
    let err = write_script_lineage(&catalog, "MISSING", dir.path()).unwrap_err();
    assert!(matches!(err, ExportError::UnknownScript(_)));
}

#[test]
fn duckdb_catalog_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lineage.duckdb");
    {
        let catalog = DuckDbCatalog::open(&path).unwrap();
        load(&catalog);
    }

    let catalog = DuckDbCatalog::open(&path).unwrap();
    assert_eq!(catalog.scripts().unwrap().len(), 2);
    assert_eq!(catalog.summary_edges(None).unwrap().len(), 2);
    let script = catalog.script("LOAD_ORDERS").unwrap().unwrap();
    assert_eq!(script.name, "load_orders.sql");
    assert_eq!(catalog.statements("LOAD_ORDERS").unwrap().len(), 2);
}

#[test]
fn duckdb_and_memory_catalogs_agree() {
    let memory = MemoryCatalog::new();
    let duck = DuckDbCatalog::open_in_memory().unwrap();
    load(&memory);
    load(&duck);

    assert_eq!(memory.tables().unwrap(), duck.tables().unwrap());
    assert_eq!(memory.detail_edges(None).unwrap(), duck.detail_edges(None).unwrap());
    assert_eq!(memory.summary_edges(None).unwrap(), duck.summary_edges(None).unwrap());
    assert_eq!(
        memory.column_summary_edges(None).unwrap(),
        duck.column_summary_edges(None).unwrap()
    );
}
