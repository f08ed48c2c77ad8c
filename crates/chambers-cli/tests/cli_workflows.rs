// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use chambers_store::Store;
use serde_json::Value;
use std::path::Path;

const PNG: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R',
];

fn chambers() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chambers"));
    cmd.env_remove("CHAMBERS_DB_PATH")
        .env_remove("CHAMBERS_LOG_LEVEL");
    cmd
}

fn run_json(db: &Path, args: &[&str]) -> Value {
    let output = chambers()
        .arg("--json")
        .arg("--db")
        .arg(db)
        .args(args)
        .output()
        .expect("run chambers");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json stdout")
}

#[test]
fn init_db_creates_schema_and_is_repeatable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("nested").join("site.sqlite");

    let first = run_json(&db, &["init-db"]);
    assert_eq!(first["status"], "ok");
    assert_eq!(first["created"], true);
    assert_eq!(first["schema_version"], 1);

    let second = run_json(&db, &["init-db"]);
    assert_eq!(second["created"], false);
    assert_eq!(second["created_at"], first["created_at"]);
}

#[test]
fn inspect_db_reports_counts_without_migrating() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("site.sqlite");

    let missing = chambers()
        .args(["--json", "--db"])
        .arg(&db)
        .arg("inspect-db")
        .output()
        .expect("run inspect");
    assert_eq!(missing.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("dependency_failure"));
    assert!(!db.exists());

    let store = Store::open(&db).expect("open store");
    store.subscribe("reader@example.com").expect("subscribe");
    drop(store);

    let report = run_json(&db, &["inspect-db"]);
    assert_eq!(report["schema_current"], true);
    assert_eq!(report["counts"]["newsletter_subscriptions"], 1);
    assert_eq!(report["counts"]["news"], 0);
    assert_eq!(report["meta"]["schema_version"], "1");
    assert!(report["indexes"]
        .as_array()
        .expect("indexes")
        .iter()
        .any(|v| v == "idx_news_listing"));
}

#[test]
fn import_image_to_database_and_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("site.sqlite");
    let image = dir.path().join("portrait.png");
    std::fs::write(&image, PNG).expect("write image");
    let image_arg = image.to_str().expect("utf8 path");

    let stored = run_json(&db, &["import-image", image_arg]);
    assert_eq!(stored["storage"], "database");
    assert_eq!(stored["mime_type"], "image/png");
    let id = stored["id"].as_str().expect("id");
    assert_eq!(stored["url"], format!("/api/images/{id}"));
    let store = Store::open(&db).expect("open store");
    let blob = store.get_image(id).expect("get image").expect("present");
    assert_eq!(blob.bytes, PNG);

    let uploads = dir.path().join("uploads");
    let on_disk = run_json(
        &db,
        &[
            "import-image",
            image_arg,
            "--storage",
            "disk",
            "--upload-dir",
            uploads.to_str().expect("utf8 path"),
        ],
    );
    let name = on_disk["id"].as_str().expect("name");
    assert!(name.ends_with(".png"));
    assert_eq!(std::fs::read(uploads.join(name)).expect("read upload"), PNG);
}

#[test]
fn import_image_rejects_mismatched_and_oversized_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("site.sqlite");
    let image = dir.path().join("portrait.png");
    std::fs::write(&image, PNG).expect("write image");

    let mismatched = chambers()
        .args(["--json", "--db"])
        .arg(&db)
        .arg("import-image")
        .arg(&image)
        .args(["--mime", "image/jpeg"])
        .output()
        .expect("run import");
    assert_eq!(mismatched.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&mismatched.stderr).contains("validation_error"));

    let oversized = chambers()
        .arg("--db")
        .arg(&db)
        .arg("import-image")
        .arg(&image)
        .args(["--max-bytes", "8"])
        .output()
        .expect("run import");
    assert_eq!(oversized.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&oversized.stderr).contains("the limit is 8"));
}

#[test]
fn export_subscribers_as_csv_and_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("site.sqlite");
    let store = Store::open(&db).expect("open store");
    store.subscribe("active@example.com").expect("subscribe");
    store.subscribe("gone@example.com").expect("subscribe");
    store.unsubscribe("gone@example.com").expect("unsubscribe");
    drop(store);

    let csv = chambers()
        .arg("--db")
        .arg(&db)
        .arg("export-subscribers")
        .output()
        .expect("run export");
    assert!(csv.status.success());
    let text = String::from_utf8(csv.stdout).expect("utf8 csv");
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines[0], "email,active,subscribed_at,unsubscribed_at");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("active@example.com,true,"));

    let out = dir.path().join("subscribers.json");
    let summary = run_json(
        &db,
        &[
            "export-subscribers",
            "--format",
            "json",
            "--all",
            "--out",
            out.to_str().expect("utf8 path"),
        ],
    );
    assert_eq!(summary["count"], 2);
    let exported: Value =
        serde_json::from_slice(&std::fs::read(&out).expect("read export")).expect("json export");
    assert_eq!(exported.as_array().map(Vec::len), Some(2));
}

#[test]
fn unknown_flag_returns_usage_exit_code_with_machine_error() {
    let output = chambers()
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    let parsed: Value = serde_json::from_str(stderr.trim()).expect("machine error");
    assert_eq!(parsed["code"], "usage_error");
}

#[test]
fn openapi_document_lists_image_route() {
    let output = chambers().arg("openapi").output().expect("run openapi");
    assert!(output.status.success());
    let doc: Value = serde_json::from_slice(&output.stdout).expect("openapi json");
    assert!(doc["paths"].get("/api/images/{id}").is_some());
}
