use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn dwlineage(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dwlineage"))
        .arg("--db")
        .arg(db)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run CLI")
}

fn write_scripts(dir: &Path) {
    fs::create_dir_all(dir.join("facts")).expect("create dirs");
    fs::write(
        dir.join("facts/load_orders.sql"),
        "CREATE TABLE vt_orders AS SELECT id, amount FROM src.orders;
         INSERT INTO dw.fact_orders (id, amount) SELECT id, amount FROM vt_orders;",
    )
    .expect("write sql");
    fs::write(
        dir.join("load_sales.sql"),
        "INSERT INTO dw.sales (id) SELECT id FROM dw.fact_orders;",
    )
    .expect("write sql");
}

#[test]
fn process_reports_json_outcome() {
    let dir = tempdir().expect("temp dir");
    let db = dir.path().join("lineage.duckdb");
    let sql = dir.path().join("load_orders.sql");
    fs::write(&sql, "INSERT INTO dw.t (id) SELECT id FROM src.s;").expect("write sql");

    let output = dwlineage(&db, &["process", sql.to_str().unwrap(), "-f", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["status"], "success");
    assert_eq!(json["scriptId"], "LOAD_ORDERS");
    assert_eq!(json["report"]["externalTables"], 1);
}

#[test]
fn batch_failure_sets_exit_code_and_keeps_other_scripts() {
    let dir = tempdir().expect("temp dir");
    let scripts = dir.path().join("scripts");
    write_scripts(&scripts);
    fs::write(scripts.join("broken.sql"), "INSERT INTO").expect("write sql");
    let db = dir.path().join("lineage.duckdb");

    let output = dwlineage(&db, &["batch", scripts.to_str().unwrap(), "-f", "json"]);
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 1);
    let broken = json["outcomes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|o| o["scriptId"] == "BROKEN")
        .expect("broken outcome");
    assert_eq!(broken["error"]["code"], "PARSE_ERROR");
}

#[test]
fn export_writes_layer_files() {
    let dir = tempdir().expect("temp dir");
    let scripts = dir.path().join("scripts");
    write_scripts(&scripts);
    let db = dir.path().join("lineage.duckdb");
    let out = dir.path().join("out");

    assert!(dwlineage(&db, &["batch", scripts.to_str().unwrap()]).status.success());

    let output = dwlineage(&db, &["export", "-o", out.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(out.join("all_lineage_detail.json").exists());
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("all_lineage_summary.json")).unwrap())
            .unwrap();
    assert_eq!(summary["links"].as_array().unwrap().len(), 2);

    let output = dwlineage(
        &db,
        &["export", "-s", "load_orders", "-o", out.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert!(out.join("load_orders_detail.json").exists());
    assert!(out.join("load_orders_summary.json").exists());
}

#[test]
fn export_single_layer_to_stdout() {
    let dir = tempdir().expect("temp dir");
    let scripts = dir.path().join("scripts");
    write_scripts(&scripts);
    let db = dir.path().join("lineage.duckdb");
    assert!(dwlineage(&db, &["batch", scripts.to_str().unwrap()]).status.success());

    let output = dwlineage(&db, &["export", "-s", "LOAD_ORDERS", "-l", "detail"]);
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(doc["graph"]["layer"], "detail");
    assert_eq!(doc["links"].as_array().unwrap().len(), 2);
}

#[test]
fn insert_mode_rejects_reprocessing() {
    let dir = tempdir().expect("temp dir");
    let db = dir.path().join("lineage.duckdb");
    let sql = dir.path().join("load.sql");
    fs::write(&sql, "INSERT INTO dw.t (id) SELECT id FROM src.s;").expect("write sql");

    assert!(dwlineage(&db, &["process", sql.to_str().unwrap()]).status.success());
    let output = dwlineage(&db, &["process", sql.to_str().unwrap(), "-m", "insert", "-f", "json"]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(json["error"]["code"], "SCRIPT_ALREADY_PROCESSED");
}

#[test]
fn missing_input_is_a_config_error() {
    let dir = tempdir().expect("temp dir");
    let db = dir.path().join("lineage.duckdb");
    let output = dwlineage(&db, &["process", "/nonexistent/file.sql"]);
    assert_eq!(output.status.code(), Some(66));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read file"));
}

#[test]
fn init_creates_the_catalog_file() {
    let dir = tempdir().expect("temp dir");
    let db = dir.path().join("catalog.duckdb");
    let output = dwlineage(&db, &["init"]);
    assert!(output.status.success());
    assert!(db.exists());
}
