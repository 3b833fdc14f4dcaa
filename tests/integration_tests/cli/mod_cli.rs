use mongolite::Database;
use mongolite::cli::{Command, run};

fn exec(db: &Database, cmd: Command) -> String {
    let mut out = Vec::new();
    run(db, cmd, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn find(filter: Option<&str>, sort: Option<&str>, limit: Option<usize>, skip: Option<usize>) -> Command {
    Command::Find {
        collection: Some("t".into()),
        filter: filter.map(str::to_string),
        fields: Some(r#"{"v": 1, "_id": 0}"#.into()),
        sort: sort.map(str::to_string),
        limit,
        skip,
    }
}

#[test]
fn find_streams_ndjson_pages() {
    let db = Database::open_in_memory().unwrap();
    exec(&db, Command::Insert { collection: Some("t".into()), json: r#"[{"v":3},{"v":1},{"v":2},{"v":4}]"#.into() });
    let out = exec(&db, find(None, Some(r#"{"v": 1}"#), Some(2), Some(1)));
    assert_eq!(out.lines().collect::<Vec<_>>(), vec![r#"{"v":2}"#, r#"{"v":3}"#]);
    let out = exec(&db, find(Some(r#"{"v": {"$gt": 2}}"#), Some(r#"{"v": -1}"#), None, None));
    assert_eq!(out.lines().collect::<Vec<_>>(), vec![r#"{"v":4}"#, r#"{"v":3}"#]);
}

#[test]
fn update_and_drop() {
    let db = Database::open_in_memory().unwrap();
    exec(&db, Command::CreateCollection { name: "t".into() });
    exec(&db, Command::Insert { collection: Some("t".into()), json: r#"{"v":1}"#.into() });
    let out = exec(&db, Command::Update { collection: Some("t".into()), filter: None, json: r#"{"w":2}"#.into() });
    assert_eq!(out.trim(), r#"{"updated":1}"#);
    assert_eq!(exec(&db, Command::Count { collection: Some("t".into()), filter: Some(r#"{"w":2}"#.into()) }).trim(), "1");
    exec(&db, Command::DropCollection { name: "t".into() });
    assert_eq!(exec(&db, Command::Collections), "");
}

#[test]
fn bad_sort_is_reported() {
    let db = Database::open_in_memory().unwrap();
    let mut out = Vec::new();
    let err = run(&db, find(None, Some("[1]"), None, None), &mut out).unwrap_err();
    assert!(matches!(err, mongolite::DbError::InvalidQuery(_)));
}
