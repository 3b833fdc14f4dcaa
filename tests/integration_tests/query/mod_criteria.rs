use mongolite::document::from_value;
use mongolite::query::{compiled_criteria, eval_filter, parse_filter_json};
use mongolite::{Database, DbError};
use serde_json::json;

fn matches(criteria: &str, doc: serde_json::Value) -> bool {
    eval_filter(&from_value(doc).unwrap(), &parse_filter_json(criteria).unwrap())
}

#[test]
fn comparison_operators() {
    let d = json!({"age": 30, "name": "ann", "tags": ["a", "b"], "meta": {"score": 4.5}});
    assert!(matches(r#"{"age": 30}"#, d.clone()));
    assert!(matches(r#"{"age": {"$gte": 30, "$lt": 31}}"#, d.clone()));
    assert!(!matches(r#"{"age": {"$gt": 30}}"#, d.clone()));
    assert!(matches(r#"{"meta.score": {"$lte": 4.5}}"#, d.clone()));
    assert!(matches(r#"{"name": {"$ne": "bob"}}"#, d.clone()));
    assert!(matches(r#"{"missing": {"$ne": 1}}"#, d.clone()));
    assert!(matches(r#"{"tags": "b"}"#, d.clone()));
    assert!(matches(r#"{"tags": {"$all": ["b", "a"]}, "tags.0": "a"}"#, d.clone()));
    assert!(matches(r#"{"tags": {"$size": 2}}"#, d));
}

#[test]
fn set_and_logical_operators() {
    let d = json!({"n": 7, "kind": "x"});
    assert!(matches(r#"{"n": {"$in": [1, 7]}}"#, d.clone()));
    assert!(matches(r#"{"n": {"$nin": [1, 2]}}"#, d.clone()));
    assert!(matches(r#"{"$or": [{"n": 1}, {"kind": "x"}]}"#, d.clone()));
    assert!(!matches(r#"{"$nor": [{"n": 7}]}"#, d.clone()));
    assert!(matches(r#"{"$and": [{"n": {"$mod": [4, 3]}}, {"kind": {"$exists": true}}]}"#, d.clone()));
    assert!(matches(r#"{"n": {"$not": {"$gt": 10}}}"#, d.clone()));
    assert!(matches(r#"{"other": {"$exists": false}}"#, d));
}

#[test]
fn numbers_compare_across_integer_and_float() {
    assert!(matches(r#"{"n": 2.0}"#, json!({"n": 2})));
    assert!(matches(r#"{"n": {"$lt": 2.5}}"#, json!({"n": 2})));
}

#[test]
fn ordering_comparisons_do_not_cross_types() {
    assert!(!matches(r#"{"n": {"$gt": 1}}"#, json!({"n": "5"})));
    assert!(!matches(r#"{"n": {"$lt": "a"}}"#, json!({"n": 1})));
}

#[test]
fn unknown_operator_is_rejected() {
    assert!(matches!(parse_filter_json(r#"{"n": {"$near": 1}}"#), Err(DbError::Criteria(_))));
    assert!(matches!(parse_filter_json("[1, 2]"), Err(DbError::Criteria(_))));
}

#[test]
fn compiled_criteria_are_shared() {
    let a = compiled_criteria(r#"{"shared_cache_key": 1}"#).unwrap();
    let b = compiled_criteria(r#"{"shared_cache_key": 1}"#).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
}

#[test]
fn criteria_run_inside_sql() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("items").unwrap();
    for n in 0..10 {
        col.insert(from_value(json!({"n": n, "even": n % 2 == 0})).unwrap()).unwrap();
    }
    assert_eq!(col.count(Some(r#"{"even": true, "n": {"$gte": 4}}"#)).unwrap(), 3);
    assert_eq!(col.count(Some("")).unwrap(), 10);
}

#[test]
fn malformed_criteria_fail_at_execution() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("items").unwrap();
    col.insert(from_value(json!({"n": 1})).unwrap()).unwrap();
    let mut cursor = col.find(Some("{not json"), None);
    assert!(matches!(cursor.to_array(), Err(DbError::Sql(_))));
    assert!(cursor.count().is_err());
}

#[test]
fn oversized_in_set_is_an_error_not_a_miss() {
    let db = Database::open_in_memory().unwrap();
    let col = db.collection("items").unwrap();
    col.insert(from_value(json!({"x": 1500})).unwrap()).unwrap();
    let set: Vec<i64> = (0..2000).collect();
    assert!(matches!(parse_filter_json(&json!({"x": {"$in": set.clone()}}).to_string()), Err(DbError::Criteria(_))));
    assert!(col.count(Some(&json!({"x": {"$in": set.clone()}}).to_string())).is_err());
    assert!(col.count(Some(&json!({"x": {"$nin": set}}).to_string())).is_err());
    let near_limit: Vec<i64> = (1000..2000).collect();
    assert_eq!(col.count(Some(&json!({"x": {"$in": near_limit}}).to_string())).unwrap(), 1);
}
