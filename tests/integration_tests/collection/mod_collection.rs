use crate::integration_tests::support::{numbers, seed_numbers};
use mongolite::document::from_value;
use mongolite::query::{FindOptions, SortSpec};
use mongolite::{Database, DbError};
use serde_json::json;

#[test]
fn insert_then_find_one_by_id() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("users").unwrap();
    let id = col.insert(from_value(json!({"name": "ann"})).unwrap()).unwrap();
    assert_eq!(id.len(), 32);
    let doc = col.find_one(Some(&json!({"_id": id}).to_string()), None).unwrap().unwrap();
    assert_eq!(doc["name"], json!("ann"));
    assert!(col.find_one(Some(r#"{"_id": "nope"}"#), None).unwrap().is_none());
}

#[test]
fn insert_rejects_non_objects() {
    assert!(matches!(from_value(json!([1, 2])), Err(DbError::InvalidDocument(_))));
}

#[test]
fn find_with_options_and_paginate() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("nums").unwrap();
    seed_numbers(&col, &[6, 2, 9, 4, 1, 8]);
    let opts = FindOptions {
        filter: Some(r#"{"n": {"$gt": 1}}"#.into()),
        sort: Some(vec![SortSpec::asc("n")]),
        limit: Some(3),
        skip: Some(1),
        ..FindOptions::default()
    };
    assert_eq!(numbers(&col.find_with(&opts).unwrap()), vec![4, 6, 8]);
    let page = col.paginate(&opts).unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.data.len(), 3);
}

#[test]
fn update_touches_modified_only_on_matches() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("nums").unwrap();
    seed_numbers(&col, &[1, 2, 3]);
    let n = col.update(Some(r#"{"n": {"$gte": 2}}"#), &from_value(json!({"flag": true})).unwrap()).unwrap();
    assert_eq!(n, 2);
    assert_eq!(col.count(Some(r#"{"flag": true}"#)).unwrap(), 2);
    assert_eq!(col.count(Some(r#"{"flag": {"$exists": false}}"#)).unwrap(), 1);
}

#[test]
fn save_round_trips_through_find() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("cfg").unwrap();
    let id = col.save(from_value(json!({"k": "v1"})).unwrap()).unwrap();
    col.save(from_value(json!({"_id": id.clone(), "k": "v2"})).unwrap()).unwrap();
    let all = col.find(None, None).to_array().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["k"], json!("v2"));
}

#[test]
fn collections_are_isolated() {
    let db = Database::open_in_memory().unwrap();
    let a = db.collection("a").unwrap();
    let b = db.collection("b").unwrap();
    seed_numbers(&a, &[1, 2]);
    seed_numbers(&b, &[3]);
    assert_eq!(a.count(None).unwrap(), 2);
    assert_eq!(b.count(None).unwrap(), 1);
    a.remove(None).unwrap();
    assert_eq!(b.count(None).unwrap(), 1);
}

#[test]
fn names_with_quotes_are_safe_in_sql() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("we\"ird; DROP TABLE x").unwrap();
    seed_numbers(&col, &[1]);
    assert_eq!(col.find(None, None).to_array().unwrap().len(), 1);
    assert_eq!(db.list_collection_names().unwrap(), vec!["we\"ird; DROP TABLE x".to_string()]);
}

#[test]
fn concurrent_batches_on_one_database_all_commit() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("jobs").unwrap();
    std::thread::scope(|s| {
        for t in 0..4 {
            let col = &col;
            s.spawn(move || {
                for round in 0..10 {
                    let batch = (0..5).map(|i| from_value(json!({"t": t, "round": round, "i": i})).unwrap()).collect();
                    col.insert_many(batch).unwrap();
                    col.update(Some(&json!({"t": t}).to_string()), &from_value(json!({"seen": true})).unwrap())
                        .unwrap();
                }
            });
        }
    });
    assert_eq!(col.count(None).unwrap(), 200);
    assert_eq!(col.count(Some(r#"{"seen": true}"#)).unwrap(), 200);
}
