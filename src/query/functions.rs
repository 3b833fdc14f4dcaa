//! SQL functions that let the relational engine look inside stored JSON documents.
//!
//! * `document_criteria(criteria, document)` evaluates a criteria string against a document.
//! * `document_key(key, document)` extracts the value at a dotted key for `ORDER BY`.

use lru::LruCache;
use parking_lot::Mutex;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::eval::{eval_filter, get_path};
use super::parse::parse_filter_json;
use super::types::Filter;
use crate::document;
use crate::errors::DbError;
use crate::types::Document;

pub const CRITERIA_FN: &str = "document_criteria";
pub const KEY_FN: &str = "document_key";
pub const DEFAULT_CRITERIA_CACHE_SIZE: usize = 256;

static CACHE_CAPACITY: AtomicUsize = AtomicUsize::new(DEFAULT_CRITERIA_CACHE_SIZE);
static CRITERIA_CACHE: Mutex<Option<LruCache<String, Arc<Filter>>>> = parking_lot::const_mutex(None);

/// Resizes the compiled-criteria cache. Entries are dropped when the capacity changes.
pub fn set_criteria_cache_capacity(capacity: usize) {
    let capacity = capacity.max(1);
    if CACHE_CAPACITY.swap(capacity, Ordering::Relaxed) != capacity {
        *CRITERIA_CACHE.lock() = None;
    }
}

/// Returns the parsed filter for `criteria`, compiling it at most once per cache lifetime.
///
/// # Errors
/// Returns `DbError::Criteria` if the criteria cannot be parsed.
pub fn compiled_criteria(criteria: &str) -> Result<Arc<Filter>, DbError> {
    let mut guard = CRITERIA_CACHE.lock();
    let cache = guard.get_or_insert_with(|| {
        let cap = NonZeroUsize::new(CACHE_CAPACITY.load(Ordering::Relaxed)).unwrap_or(NonZeroUsize::MIN);
        LruCache::new(cap)
    });
    if let Some(f) = cache.get(criteria) {
        return Ok(Arc::clone(f));
    }
    let filter = Arc::new(parse_filter_json(criteria)?);
    cache.put(criteria.to_string(), Arc::clone(&filter));
    Ok(filter)
}

/// Registers `document_criteria` and `document_key` on a connection.
///
/// # Errors
/// Returns the engine error if registration fails.
pub fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function(CRITERIA_FN, 2, flags, document_criteria)?;
    conn.create_scalar_function(KEY_FN, 2, flags, document_key)?;
    log::debug!("registered SQL functions {CRITERIA_FN}, {KEY_FN}");
    Ok(())
}

fn user_err(e: DbError) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(e))
}

fn document_arg(ctx: &Context<'_>, idx: usize) -> rusqlite::Result<Option<Document>> {
    match ctx.get_raw(idx) {
        ValueRef::Null => Ok(None),
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| user_err(DbError::InvalidDocument(e.to_string())))?;
            document::decode(text).map(Some).map_err(user_err)
        }
        _ => Err(user_err(DbError::InvalidDocument("document column must be TEXT".into()))),
    }
}

fn document_criteria(ctx: &Context<'_>) -> rusqlite::Result<bool> {
    let criteria: Option<String> = ctx.get(0)?;
    let Some(criteria) = criteria.filter(|c| !c.trim().is_empty()) else {
        return Ok(true);
    };
    let filter = compiled_criteria(&criteria).map_err(user_err)?;
    Ok(document_arg(ctx, 1)?.is_some_and(|doc| eval_filter(&doc, &filter)))
}

fn document_key(ctx: &Context<'_>) -> rusqlite::Result<SqlValue> {
    let key: String = ctx.get(0)?;
    Ok(document_arg(ctx, 1)?.map_or(SqlValue::Null, |doc| key_value(&doc, &key)))
}

/// Maps the value at `key` onto a SQL value so the engine can order by it.
#[must_use]
pub fn key_value(doc: &Document, key: &str) -> SqlValue {
    match get_path(doc, key) {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}
