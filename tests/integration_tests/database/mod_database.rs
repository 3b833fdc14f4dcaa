use mongolite::document::from_value;
use mongolite::{Database, DbConfig, DbError};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn open_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("app.db");
    let db = Database::open(&path).unwrap();
    db.collection("x").unwrap();
    assert!(path.exists());
}

#[test]
fn documents_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.db");
    {
        let db = Database::open(&path).unwrap();
        let col = db.collection("events").unwrap();
        col.insert(from_value(json!({"_id": "e1", "kind": "boot"})).unwrap()).unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.list_collection_names().unwrap(), vec!["events"]);
    let col = db.get_collection("events").unwrap().unwrap();
    let doc = col.find_one(Some(r#"{"kind": "boot"}"#), None).unwrap().unwrap();
    assert_eq!(doc["_id"], json!("e1"));
}

#[test]
fn two_handles_share_one_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let a = Database::open(&path).unwrap();
    let b = Database::open(&path).unwrap();
    a.collection("c").unwrap().insert(from_value(json!({"n": 1})).unwrap()).unwrap();
    assert_eq!(b.collection("c").unwrap().count(None).unwrap(), 1);
}

#[test]
fn drop_unknown_collection_fails() {
    let db = Database::open_in_memory().unwrap();
    assert!(matches!(db.drop_collection("ghost"), Err(DbError::NoSuchCollection(n)) if n == "ghost"));
}

#[test]
fn configured_journal_mode_is_applied() {
    let dir = tempdir().unwrap();
    let cfg = DbConfig {
        db_path: Some(dir.path().join("j.db")),
        journal_mode: "DELETE".into(),
        ..DbConfig::default()
    };
    let db = Database::open_with_config(&cfg).unwrap();
    let row = db.connection().fetch_one("PRAGMA journal_mode", &[]).unwrap().unwrap();
    assert_eq!(row.get("journal_mode"), Some(&rusqlite::types::Value::Text("delete".into())));
}

#[test]
fn collection_lookup_recreates_a_dropped_table() {
    let db = Database::open_in_memory().unwrap();
    let stale = db.collection("logs").unwrap();
    db.connection().execute_batch("DROP TABLE \"logs\"").unwrap();
    let col = db.collection("logs").unwrap();
    col.insert(from_value(json!({"line": 1})).unwrap()).unwrap();
    assert_eq!(stale.count(None).unwrap(), 1);

    db.drop_collection("logs").unwrap();
    let fresh = db.collection("logs").unwrap();
    assert_eq!(fresh.count(None).unwrap(), 0);
    fresh.insert(from_value(json!({"line": 2})).unwrap()).unwrap();
    assert_eq!(db.list_collection_names().unwrap(), vec!["logs"]);
}
