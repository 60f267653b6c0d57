mod common;

use std::thread;

use common::{entity, summary_pairs};
use dwlineage_core::{
    BatchProcessor, CatalogRead, CatalogStore, EngineConfig, MemoryCatalog, ProcessMode,
    Provenance, ScriptSource, ScriptState, UpdateCoordinator,
};

fn loader(i: usize) -> ScriptSource {
    ScriptSource::new(
        format!("load_{i}"),
        format!(
            "CREATE TABLE vt AS SELECT id, v{i} FROM src.feed_{i};
             INSERT INTO dw.shared (id) SELECT id FROM vt;"
        ),
    )
}

#[test]
fn scripts_writing_the_same_entity_all_commit() {
    let catalog = MemoryCatalog::new();
    let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default().with_workers(4));
    let sources: Vec<ScriptSource> = (0..8).map(loader).collect();

    let report = BatchProcessor::new(&coordinator)
        .run(&sources, ProcessMode::Clear)
        .unwrap();

    assert!(report.is_success(), "{:?}", report.outcomes);
    assert_eq!(report.succeeded, 8);
    for i in 0..8 {
        let script_id = format!("LOAD_{i}");
        assert_eq!(
            summary_pairs(&catalog, &script_id),
            vec![(entity("src", &format!("feed_{i}")), entity("dw", "shared"))]
        );
        assert_eq!(coordinator.state(&script_id), ScriptState::Clean);
    }
    let shared = catalog.table(&entity("dw", "shared")).unwrap().unwrap();
    assert_eq!(shared.table.provenance, Provenance::Dml);
}

#[test]
fn same_script_processed_from_many_threads_ends_consistent() {
    let catalog = MemoryCatalog::new();
    let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
    let source = loader(0);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let outcome = coordinator.process(&source, ProcessMode::Clear);
                assert!(outcome.is_success(), "{:?}", outcome.error);
            });
        }
    });

    assert_eq!(catalog.statements("LOAD_0").unwrap().len(), 2);
    assert_eq!(catalog.detail_edges(Some("LOAD_0")).unwrap().len(), 2);
    assert_eq!(catalog.summary_edges(Some("LOAD_0")).unwrap().len(), 1);
}

#[test]
fn conflicting_definitions_fail_exactly_one_script() {
    let catalog = MemoryCatalog::new();
    let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default().with_workers(2));
    let sources = vec![
        ScriptSource::new("ddl_a", "CREATE TABLE dw.dim (id INT);"),
        ScriptSource::new("ddl_b", "CREATE TABLE dw.dim (id BIGINT);"),
    ];

    let report = BatchProcessor::new(&coordinator)
        .run(&sources, ProcessMode::Clear)
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let failed = report.outcomes.iter().find(|o| !o.is_success()).unwrap();
    assert_eq!(failed.error.as_ref().unwrap().code, "DUPLICATE_DEFINITION");
    assert_eq!(catalog.scripts().unwrap().len(), 1);
}

#[test]
fn coordinators_sharing_a_catalog_serialize_the_same_script() {
    let catalog = MemoryCatalog::new();
    let first = UpdateCoordinator::new(&catalog, EngineConfig::default());
    let second = UpdateCoordinator::new(&catalog, EngineConfig::default());
    let source = loader(0);

    thread::scope(|scope| {
        for coordinator in [&first, &second, &first, &second] {
            let source = &source;
            scope.spawn(move || {
                let outcome = coordinator.process(source, ProcessMode::Clear);
                assert!(outcome.is_success(), "{:?}", outcome.error);
            });
        }
    });

    assert_eq!(catalog.statements("LOAD_0").unwrap().len(), 2);
    assert_eq!(catalog.detail_edges(Some("LOAD_0")).unwrap().len(), 2);
    assert_eq!(
        summary_pairs(&catalog, "LOAD_0"),
        vec![(entity("src", "feed_0"), entity("dw", "shared"))]
    );
    assert_eq!(first.state("LOAD_0"), ScriptState::Clean);
    assert_eq!(second.state("LOAD_0"), ScriptState::Clean);
}

#[test]
fn a_script_in_flight_is_visible_to_every_coordinator() {
    let catalog = MemoryCatalog::new();
    let first = UpdateCoordinator::new(&catalog, EngineConfig::default());
    let second = UpdateCoordinator::new(&catalog, EngineConfig::default());

    let scope = catalog.script_locks().acquire("LOAD_0").unwrap();
    assert_eq!(first.state("LOAD_0"), ScriptState::InTransaction);
    assert_eq!(second.state("LOAD_0"), ScriptState::InTransaction);
    drop(scope);
    assert_eq!(second.state("LOAD_0"), ScriptState::Clean);
}
