use mongolite::connection::{Connection, Row, SqliteConnection, Tx};
use mongolite::document::from_value;
use mongolite::{Collection, Database, DbConfig, DbError};
use rusqlite::types::Value as SqlValue;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wraps a SQLite connection and counts the statements sent through it.
pub struct CountingConnection {
    inner: SqliteConnection,
    pub fetches: AtomicUsize,
    pub counts: AtomicUsize,
}

impl CountingConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteConnection::open_in_memory(&DbConfig::default()).unwrap(),
            fetches: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn counts(&self) -> usize {
        self.counts.load(Ordering::SeqCst)
    }
}

impl Connection for CountingConnection {
    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DbError> {
        if sql.starts_with("SELECT COUNT(*)") {
            self.counts.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.fetch_one(sql, params)
    }

    fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        if sql.starts_with("SELECT document FROM") {
            self.fetches.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.fetch_all(sql, params)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, DbError> {
        self.inner.execute(sql, params)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.inner.execute_batch(sql)
    }

    fn transaction(&self, work: &mut dyn FnMut(&Tx<'_>) -> Result<(), DbError>) -> Result<(), DbError> {
        self.inner.transaction(work)
    }
}

/// Opens an in-memory database on a counting connection.
pub fn counting_db() -> (Database, Arc<CountingConnection>) {
    let conn = CountingConnection::new();
    let db = Database::with_connection(conn.clone(), DbConfig::default());
    (db, conn)
}

/// Inserts `{"_id": "<i>", "n": i}` for every value.
pub fn seed_numbers(col: &Collection, values: &[i64]) {
    for (i, n) in values.iter().enumerate() {
        col.insert(from_value(serde_json::json!({"_id": i.to_string(), "n": n})).unwrap()).unwrap();
    }
}

pub fn numbers(docs: &[mongolite::Document]) -> Vec<i64> {
    docs.iter().map(|d| d["n"].as_i64().unwrap()).collect()
}
