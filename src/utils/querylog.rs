//! Structured records of the statements cursors send to the engine.
//!
//! Each record is logged as one JSON line under [`TARGET`]. A thread can also keep its own
//! records with [`capture`] and inspect them afterwards.

use serde::Serialize;
use std::cell::RefCell;
use std::time::Duration;

/// Log target for generated statements.
pub const TARGET: &str = "mongolite::query";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOp {
    Fetch,
    Count,
}

/// One statement as it was sent, with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRecord {
    pub op: QueryOp,
    pub collection: String,
    pub sql: String,
    /// Number of bound parameters.
    pub params: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,
    pub duration_ms: u64,
}

impl QueryRecord {
    #[must_use]
    pub fn new(op: QueryOp, collection: &str, sql: &str, params: usize) -> Self {
        Self { op, collection: collection.to_string(), sql: sql.to_string(), params, rows: None, duration_ms: 0 }
    }

    #[must_use]
    pub const fn rows(mut self, rows: usize) -> Self {
        self.rows = Some(rows);
        self
    }

    #[must_use]
    pub fn elapsed(mut self, took: Duration) -> Self {
        self.duration_ms = u64::try_from(took.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<QueryRecord>>> = const { RefCell::new(None) };
}

/// Keeps this thread's records until dropped.
pub struct Capture(());

impl Capture {
    /// Returns the records kept so far and clears them.
    #[must_use]
    pub fn take(&self) -> Vec<QueryRecord> {
        CAPTURED.with(|c| c.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        CAPTURED.with(|c| *c.borrow_mut() = None);
    }
}

/// Starts keeping records emitted on the current thread.
#[must_use]
pub fn capture() -> Capture {
    CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
    Capture(())
}

/// Logs `rec` at TRACE and hands it to an active [`Capture`] on this thread.
pub fn record(rec: QueryRecord) {
    if log::log_enabled!(target: TARGET, log::Level::Trace) {
        match serde_json::to_string(&rec) {
            Ok(line) => log::trace!(target: TARGET, "{line}"),
            Err(e) => log::warn!("query record for {} not serialized: {e}", rec.collection),
        }
    }
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(rec);
        }
    });
}
