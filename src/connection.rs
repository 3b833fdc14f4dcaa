use crate::config::DbConfig;
use crate::errors::DbError;
use crate::query::register_functions;
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One result row keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;

/// The relational backend a collection talks to.
///
/// Each call is one blocking round-trip. Errors from the engine are returned as-is.
pub trait Connection: Send + Sync {
    /// Quotes a table or column name for embedding in generated SQL.
    fn quote(&self, identifier: &str) -> String {
        quote_identifier(identifier)
    }

    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DbError>;

    fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError>;

    /// Runs a statement that returns no rows and reports the number of affected rows.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, DbError>;

    fn execute_batch(&self, sql: &str) -> Result<(), DbError>;

    /// Runs `work` as one unit while holding the connection.
    ///
    /// Changes made through the [`Tx`] are kept only if `work` returns `Ok`. Nested inside an
    /// open transaction this becomes a savepoint of it.
    ///
    /// # Errors
    /// Returns the error from `work` after rolling back, or the engine error from commit.
    fn transaction(&self, work: &mut dyn FnMut(&Tx<'_>) -> Result<(), DbError>) -> Result<(), DbError>;
}

/// Statement access inside [`Connection::transaction`].
pub struct Tx<'c> {
    conn: &'c rusqlite::Connection,
}

impl Tx<'_> {
    /// # Errors
    /// Returns the engine error if the statement fails.
    pub fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        query_rows(self.conn, sql, params, None)
    }

    /// # Errors
    /// Returns the engine error if the statement fails.
    pub fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, DbError> {
        Ok(self.conn.execute(sql, rusqlite::params_from_iter(params.iter()))?)
    }
}

#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// `Connection` backed by an embedded SQLite database.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
    path: Option<PathBuf>,
}

impl SqliteConnection {
    /// Opens (or creates) a database file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or configured.
    pub fn open<P: AsRef<Path>>(path: P, config: &DbConfig) -> Result<Self, DbError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = rusqlite::Connection::open(path)?;
        Self::configure(&conn, config)?;
        log::info!("opened database {}", path.display());
        Ok(Self { conn: Mutex::new(conn), path: Some(path.to_path_buf()) })
    }

    /// # Errors
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(config: &DbConfig) -> Result<Self, DbError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::configure(&conn, config)?;
        log::info!("opened in-memory database");
        Ok(Self { conn: Mutex::new(conn), path: None })
    }

    fn configure(conn: &rusqlite::Connection, config: &DbConfig) -> Result<(), DbError> {
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
        let mode: String = conn.pragma_update_and_check(
            None,
            "journal_mode",
            config.journal_mode.as_str(),
            |row| row.get(0),
        )?;
        log::debug!("journal_mode={mode}");
        register_functions(conn)?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn read_rows(rows: &mut rusqlite::Rows<'_>, columns: &[String], limit: Option<usize>) -> Result<Vec<Row>, DbError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::new();
        for (i, name) in columns.iter().enumerate() {
            map.insert(name.clone(), row.get::<_, SqlValue>(i)?);
        }
        out.push(map);
        if limit.is_some_and(|n| out.len() >= n) {
            break;
        }
    }
    Ok(out)
}

fn query_rows(
    conn: &rusqlite::Connection,
    sql: &str,
    params: &[SqlValue],
    limit: Option<usize>,
) -> Result<Vec<Row>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| (*c).to_string()).collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    read_rows(&mut rows, &columns, limit)
}

impl SqliteConnection {
    fn query(&self, sql: &str, params: &[SqlValue], limit: Option<usize>) -> Result<Vec<Row>, DbError> {
        query_rows(&self.conn.lock(), sql, params, limit)
    }
}

impl Connection for SqliteConnection {
    fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DbError> {
        Ok(self.query(sql, params, Some(1))?.into_iter().next())
    }

    fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DbError> {
        self.query(sql, params, None)
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, DbError> {
        let conn = self.conn.lock();
        Ok(conn.execute(sql, rusqlite::params_from_iter(params.iter()))?)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), DbError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    fn transaction(&self, work: &mut dyn FnMut(&Tx<'_>) -> Result<(), DbError>) -> Result<(), DbError> {
        let mut conn = self.conn.lock();
        // Dropping the savepoint on the error path rolls it back.
        let sp = conn.savepoint()?;
        work(&Tx { conn: &sp })?;
        sp.commit()?;
        Ok(())
    }
}
