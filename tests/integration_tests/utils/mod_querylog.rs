use mongolite::query::SortSpec;
use mongolite::utils::querylog::{self, QueryOp};
use mongolite::{Database, document::from_value};
use serde_json::json;

#[test]
fn fetch_and_count_are_recorded() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("logged").unwrap();
    col.insert(from_value(json!({"n": 1})).unwrap()).unwrap();
    let cap = querylog::capture();
    let mut cursor = col.find(Some(r#"{"n": 1}"#), None).sort(vec![SortSpec::desc("n")]).limit(5);
    cursor.to_array().unwrap();
    cursor.count().unwrap();
    let recs = cap.take();
    assert_eq!(recs.iter().map(|r| r.op).collect::<Vec<_>>(), vec![QueryOp::Fetch, QueryOp::Count]);

    let fetch = &recs[0];
    assert_eq!(fetch.collection, "logged");
    assert_eq!(fetch.rows, Some(1));
    assert_eq!(fetch.params, 2);
    assert!(fetch.sql.contains("ORDER BY document_key(?2, document) DESC"));
    assert!(fetch.sql.ends_with("LIMIT 5"));

    let count = &recs[1];
    assert!(count.sql.starts_with("SELECT COUNT(*)"));
    assert_eq!(count.rows, None);
    assert_eq!(serde_json::to_value(count).unwrap()["op"], json!("count"));
    assert!(cap.take().is_empty());
}

#[test]
fn writes_are_not_recorded() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("quiet").unwrap();
    let cap = querylog::capture();
    col.insert(from_value(json!({"n": 1})).unwrap()).unwrap();
    col.update(None, &from_value(json!({"n": 2})).unwrap()).unwrap();
    assert!(cap.take().is_empty());
}
