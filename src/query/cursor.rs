use rusqlite::types::Value as SqlValue;

use super::builder::{SqlQuery, count_query, fetch_query};
use super::projection::CompiledProjection;
use super::types::{Projection, SortSpec};
use crate::collection::Collection;
use crate::connection::Row;
use crate::document;
use crate::errors::DbError;
use crate::types::Document;
use crate::utils::querylog::{self, QueryOp, QueryRecord};

/// Where the cursor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No query has run yet.
    Unfetched,
    /// Results are in memory; the value is the current position.
    Materialized(usize),
}

/// Lazy cursor over the documents of one collection.
///
/// The fetch query runs at most once, on the first `valid()`/`to_array()`/`each()`.
/// After that `rewind()` replays the same in-memory results, and changes to limit, skip,
/// sort or projection have no effect until a new cursor is created.
pub struct Cursor<'a> {
    collection: &'a Collection,
    criteria: Option<String>,
    projection: Option<Projection>,
    limit: Option<usize>,
    skip: Option<usize>,
    sort: Option<Vec<SortSpec>>,
    state: CursorState,
    data: Vec<Document>,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(collection: &'a Collection, criteria: Option<String>, projection: Option<Projection>) -> Self {
        Self {
            collection,
            criteria,
            projection,
            limit: None,
            skip: None,
            sort: None,
            state: CursorState::Unfetched,
            data: Vec::new(),
        }
    }

    /// Number of documents matching the criteria. Runs its own `COUNT` query every call.
    ///
    /// # Errors
    /// Returns the engine error if the count statement fails.
    pub fn count(&self) -> Result<u64, DbError> {
        let q = count_query(&self.collection.table(), self.criteria.as_deref(), self.limit);
        let row = self.run_one(&q)?;
        Ok(row.and_then(|r| r.get("C").cloned()).map_or(0, |v| match v {
            SqlValue::Integer(n) => u64::try_from(n).unwrap_or(0),
            _ => 0,
        }))
    }

    /// Caps the result size. `0` clears the limit.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.note_late_change("limit");
        self.limit = (n > 0).then_some(n);
        self
    }

    /// Skips the first `n` results. Only applied when a limit is also set.
    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.note_late_change("skip");
        self.skip = (n > 0).then_some(n);
        self
    }

    #[must_use]
    pub fn sort(mut self, spec: Vec<SortSpec>) -> Self {
        self.note_late_change("sort");
        self.sort = (!spec.is_empty()).then_some(spec);
        self
    }

    #[must_use]
    pub fn projection(mut self, projection: Projection) -> Self {
        self.note_late_change("projection");
        self.projection = (!projection.is_empty()).then_some(projection);
        self
    }

    fn note_late_change(&self, what: &str) {
        if self.is_materialized() {
            log::debug!("cursor {what} changed after materialization on {}; ignored", self.collection.name());
        }
    }

    #[must_use]
    pub fn criteria(&self) -> Option<&str> {
        self.criteria.as_deref()
    }

    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        matches!(self.state, CursorState::Materialized(_))
    }

    /// Calls `f` once per document in result order. Does not move the iterator position.
    ///
    /// # Errors
    /// Returns the engine error if materialization fails.
    pub fn each<F: FnMut(&Document)>(&mut self, mut f: F) -> Result<&mut Self, DbError> {
        self.ensure_materialized()?;
        for doc in &self.data {
            f(doc);
        }
        Ok(self)
    }

    /// All results, decoded and projected. Does not move the iterator position.
    ///
    /// # Errors
    /// Returns the engine error if materialization fails.
    pub fn to_array(&mut self) -> Result<Vec<Document>, DbError> {
        self.ensure_materialized()?;
        Ok(self.data.clone())
    }

    /// Back to the first result. Before materialization this does nothing.
    pub fn rewind(&mut self) {
        if let CursorState::Materialized(_) = self.state {
            self.state = CursorState::Materialized(0);
        }
    }

    /// Whether `current()` has a document. The first call runs the fetch query.
    ///
    /// # Errors
    /// Returns the engine error if materialization fails.
    pub fn valid(&mut self) -> Result<bool, DbError> {
        self.ensure_materialized()?;
        Ok(matches!(self.state, CursorState::Materialized(i) if i < self.data.len()))
    }

    /// # Errors
    /// `CursorNotMaterialized` before the first `valid()`, `IndexOutOfBounds` past the end.
    pub fn current(&self) -> Result<&Document, DbError> {
        match self.state {
            CursorState::Unfetched => Err(DbError::CursorNotMaterialized),
            CursorState::Materialized(index) => self
                .data
                .get(index)
                .ok_or(DbError::IndexOutOfBounds { index, len: self.data.len() }),
        }
    }

    /// Zero-based position, or `None` before materialization.
    #[must_use]
    pub const fn key(&self) -> Option<usize> {
        match self.state {
            CursorState::Unfetched => None,
            CursorState::Materialized(i) => Some(i),
        }
    }

    /// Moves to the next position. Before materialization this does nothing.
    pub fn next(&mut self) {
        if let CursorState::Materialized(i) = self.state {
            self.state = CursorState::Materialized(i.saturating_add(1));
        }
    }

    fn ensure_materialized(&mut self) -> Result<(), DbError> {
        if self.state == CursorState::Unfetched {
            self.data = self.fetch()?;
            self.state = CursorState::Materialized(0);
        }
        Ok(())
    }

    fn fetch(&self) -> Result<Vec<Document>, DbError> {
        let q = fetch_query(
            &self.collection.table(),
            self.criteria.as_deref(),
            self.sort.as_deref(),
            self.limit,
            self.skip,
        );
        let started = std::time::Instant::now();
        let rows = self.collection.connection().fetch_all(&q.sql, &q.params)?;
        let projection = self.projection.as_ref().map(CompiledProjection::new);
        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            let doc = decode_row(row)?;
            docs.push(match &projection {
                Some(p) => p.apply(doc),
                None => doc,
            });
        }
        querylog::record(
            QueryRecord::new(QueryOp::Fetch, self.collection.name(), &q.sql, q.params.len())
                .rows(docs.len())
                .elapsed(started.elapsed()),
        );
        Ok(docs)
    }

    fn run_one(&self, q: &SqlQuery) -> Result<Option<Row>, DbError> {
        let started = std::time::Instant::now();
        let row = self.collection.connection().fetch_one(&q.sql, &q.params)?;
        querylog::record(
            QueryRecord::new(QueryOp::Count, self.collection.name(), &q.sql, q.params.len())
                .elapsed(started.elapsed()),
        );
        Ok(row)
    }
}

fn decode_row(mut row: Row) -> Result<Document, DbError> {
    match row.remove("document") {
        Some(SqlValue::Text(text)) => document::decode(&text),
        other => Err(DbError::InvalidDocument(format!("unexpected document column: {other:?}"))),
    }
}

/// Borrowing iterator over a cursor. Starts from the first result, like a fresh `foreach`.
pub struct Iter<'c, 'a> {
    cursor: &'c mut Cursor<'a>,
    failed: bool,
}

impl Iterator for Iter<'_, '_> {
    type Item = Result<Document, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.cursor.valid() {
            Ok(true) => {
                let doc = self.cursor.current().cloned();
                self.cursor.next();
                Some(doc)
            }
            Ok(false) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<'c, 'a> IntoIterator for &'c mut Cursor<'a> {
    type Item = Result<Document, DbError>;
    type IntoIter = Iter<'c, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.rewind();
        Iter { cursor: self, failed: false }
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &self.collection.name())
            .field("criteria", &self.criteria)
            .field("limit", &self.limit)
            .field("skip", &self.skip)
            .field("sort", &self.sort)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
