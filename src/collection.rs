use crate::connection::{Connection, Row, Tx};
use crate::document;
use crate::errors::DbError;
use crate::query::{Cursor, FindOptions, Page, Projection};
use crate::types::{CREATED_FIELD, Document, DocumentId, ID_FIELD};
use rusqlite::types::Value as SqlValue;
use std::sync::Arc;

/// A named table of JSON documents.
pub struct Collection {
    name: String,
    conn: Arc<dyn Connection>,
}

impl Collection {
    pub fn new(name: impl Into<String>, conn: Arc<dyn Connection>) -> Self {
        Self { name: name.into(), conn }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoted table name for generated SQL.
    #[must_use]
    pub fn table(&self) -> String {
        self.conn.quote(&self.name)
    }

    #[must_use]
    pub fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    pub(crate) fn ensure_table(&self) -> Result<(), DbError> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, document TEXT)",
            self.table()
        ))
    }

    /// Inserts a document, assigning `_id` and timestamps where missing.
    ///
    /// # Errors
    /// Returns an error if the document cannot be encoded or the insert fails.
    pub fn insert(&self, doc: Document) -> Result<DocumentId, DbError> {
        Ok(self.insert_many(vec![doc])?.into_iter().next().unwrap_or_default())
    }

    /// Inserts several documents in one transaction. Nothing is kept if any insert fails.
    ///
    /// # Errors
    /// Returns the first failure after rolling back.
    pub fn insert_many(&self, docs: Vec<Document>) -> Result<Vec<DocumentId>, DbError> {
        let mut stamped = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = document::stamp_new(&mut doc);
            stamped.push((id, document::encode(&doc)?));
        }
        let sql = self.insert_sql();
        self.conn.transaction(&mut |tx| {
            for (_, text) in &stamped {
                tx.execute(&sql, &[SqlValue::Text(text.clone())])?;
            }
            Ok(())
        })?;
        log::debug!("insert {} count={}", self.name, stamped.len());
        Ok(stamped.into_iter().map(|(id, _)| id).collect())
    }

    /// Replaces the document with the same `_id`, or inserts it if there is none.
    ///
    /// # Errors
    /// Returns an error if the lookup, update or insert fails.
    pub fn save(&self, doc: Document) -> Result<DocumentId, DbError> {
        let Some(id) = document::id_of(&doc) else {
            return self.insert(doc);
        };
        let criteria = serde_json::json!({ ID_FIELD: doc[ID_FIELD].clone() }).to_string();
        self.conn.transaction(&mut |tx| {
            let mut doc = doc.clone();
            match self.matching_rows(tx, Some(&criteria), Some(1))?.into_iter().next() {
                Some((rowid, existing)) => {
                    if let Some(created) = existing.get(CREATED_FIELD) {
                        doc.entry(CREATED_FIELD).or_insert_with(|| created.clone());
                    }
                    document::touch(&mut doc);
                    self.write_row(tx, rowid, &doc)?;
                }
                None => {
                    document::stamp_new(&mut doc);
                    tx.execute(&self.insert_sql(), &[SqlValue::Text(document::encode(&doc)?)])?;
                }
            }
            Ok(())
        })?;
        log::debug!("save {} _id={id}", self.name);
        Ok(id)
    }

    /// Lazy cursor over documents matching `criteria`.
    #[must_use]
    pub fn find(&self, criteria: Option<&str>, projection: Option<Projection>) -> Cursor<'_> {
        Cursor::new(self, criteria.map(str::to_string), projection.filter(|p| !p.is_empty()))
    }

    /// # Errors
    /// Returns the engine error if the query fails.
    pub fn find_one(&self, criteria: Option<&str>, projection: Option<Projection>) -> Result<Option<Document>, DbError> {
        Ok(self.find(criteria, projection).limit(1).to_array()?.into_iter().next())
    }

    /// # Errors
    /// Returns the engine error if the query fails.
    pub fn find_with(&self, opts: &FindOptions) -> Result<Vec<Document>, DbError> {
        let mut cursor = self.find(opts.filter.as_deref(), opts.projection.clone());
        if let Some(sort) = &opts.sort {
            cursor = cursor.sort(sort.clone());
        }
        if let Some(n) = opts.limit {
            cursor = cursor.limit(n);
        }
        if let Some(n) = opts.skip {
            cursor = cursor.skip(n);
        }
        cursor.to_array()
    }

    /// One page of results plus the total number of matches for the filter.
    ///
    /// # Errors
    /// Returns the engine error if either query fails.
    pub fn paginate(&self, opts: &FindOptions) -> Result<Page, DbError> {
        let data = self.find_with(opts)?;
        let total = self.count(opts.filter.as_deref())?;
        Ok(Page { data, total })
    }

    /// # Errors
    /// Returns the engine error if the count fails.
    pub fn count(&self, criteria: Option<&str>) -> Result<u64, DbError> {
        self.find(criteria, None).count()
    }

    /// Shallow-merges `data` into every matching document. `_id` is never changed.
    ///
    /// Matching and rewriting happen in one transaction.
    ///
    /// # Errors
    /// Returns the engine error if reading or writing fails.
    pub fn update(&self, criteria: Option<&str>, data: &Document) -> Result<u64, DbError> {
        let mut updated = 0u64;
        self.conn.transaction(&mut |tx| {
            updated = 0;
            for (rowid, mut doc) in self.matching_rows(tx, criteria, None)? {
                for (k, v) in data {
                    if k != ID_FIELD {
                        doc.insert(k.clone(), v.clone());
                    }
                }
                document::touch(&mut doc);
                updated += u64::try_from(self.write_row(tx, rowid, &doc)?).unwrap_or(0);
            }
            Ok(())
        })?;
        log::debug!("update {} matched={updated}", self.name);
        Ok(updated)
    }

    /// Removes every matching document. No criteria removes everything.
    ///
    /// # Errors
    /// Returns the engine error if the delete fails.
    pub fn remove(&self, criteria: Option<&str>) -> Result<u64, DbError> {
        let removed = match criteria.filter(|c| !c.trim().is_empty()) {
            Some(c) => self.conn.execute(
                &format!("DELETE FROM {} WHERE document_criteria(?1, document)", self.table()),
                &[SqlValue::Text(c.to_string())],
            )?,
            None => self.conn.execute(&format!("DELETE FROM {}", self.table()), &[])?,
        };
        log::debug!("remove {} deleted={removed}", self.name);
        Ok(u64::try_from(removed).unwrap_or(0))
    }

    /// Drops the backing table.
    ///
    /// # Errors
    /// Returns the engine error if the drop fails.
    pub(crate) fn drop_table(&self) -> Result<(), DbError> {
        self.conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.table()))
    }

    fn insert_sql(&self) -> String {
        format!("INSERT INTO {} (document) VALUES (?1)", self.table())
    }

    fn matching_rows(
        &self,
        tx: &Tx<'_>,
        criteria: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<(i64, Document)>, DbError> {
        let mut sql = format!("SELECT id, document FROM {}", self.table());
        let mut params = Vec::new();
        if let Some(c) = criteria.filter(|c| !c.trim().is_empty()) {
            sql.push_str(" WHERE document_criteria(?1, document)");
            params.push(SqlValue::Text(c.to_string()));
        }
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        tx.fetch_all(&sql, &params)?.into_iter().map(row_with_id).collect()
    }

    fn write_row(&self, tx: &Tx<'_>, rowid: i64, doc: &Document) -> Result<usize, DbError> {
        tx.execute(
            &format!("UPDATE {} SET document = ?1 WHERE id = ?2", self.table()),
            &[SqlValue::Text(document::encode(doc)?), SqlValue::Integer(rowid)],
        )
    }
}

fn row_with_id(mut row: Row) -> Result<(i64, Document), DbError> {
    let rowid = match row.remove("id") {
        Some(SqlValue::Integer(i)) => i,
        other => return Err(DbError::InvalidDocument(format!("unexpected id column: {other:?}"))),
    };
    match row.remove("document") {
        Some(SqlValue::Text(text)) => Ok((rowid, document::decode(&text)?)),
        other => Err(DbError::InvalidDocument(format!("unexpected document column: {other:?}"))),
    }
}
