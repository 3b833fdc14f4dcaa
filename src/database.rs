use crate::collection::Collection;
use crate::config::DbConfig;
use crate::connection::{Connection, SqliteConnection};
use crate::errors::DbError;
use crate::query::set_criteria_cache_capacity;
use crate::types::CollectionName;
use parking_lot::RwLock;
use rusqlite::types::Value as SqlValue;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A database: one connection plus the collections stored in it.
pub struct Database {
    conn: Arc<dyn Connection>,
    config: DbConfig,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
}

impl Database {
    /// Opens or creates a database file with default settings.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let config = DbConfig { db_path: Some(path.as_ref().to_path_buf()), ..DbConfig::default() };
        Self::open_with_config(&config)
    }

    /// # Errors
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::open_with_config(&DbConfig::default())
    }

    /// Opens the database described by `config`; no `db_path` means in-memory.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the database cannot be opened.
    pub fn open_with_config(config: &DbConfig) -> Result<Self, DbError> {
        config.validate()?;
        set_criteria_cache_capacity(config.criteria_cache_size);
        let conn = match &config.db_path {
            Some(path) => SqliteConnection::open(path, config)?,
            None => SqliteConnection::open_in_memory(config)?,
        };
        Ok(Self::with_connection(Arc::new(conn), config.clone()))
    }

    /// Wraps an already configured connection. The SQL functions must be registered on it.
    pub fn with_connection(conn: Arc<dyn Connection>, config: DbConfig) -> Self {
        Self { conn, config, collections: RwLock::new(HashMap::new()) }
    }

    #[must_use]
    pub fn connection(&self) -> Arc<dyn Connection> {
        Arc::clone(&self.conn)
    }

    #[must_use]
    pub const fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Returns the named collection, creating its table if needed.
    ///
    /// A cached handle is checked against the catalog, so a table dropped behind the
    /// cache's back is created again.
    ///
    /// # Errors
    /// Returns an error for invalid names or if the table cannot be created.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        let cached = self.collections.read().get(name).cloned();
        match cached {
            Some(col) => {
                col.ensure_table()?;
                Ok(col)
            }
            None => self.create_collection(name),
        }
    }

    /// # Errors
    /// Returns an error for invalid names or if the table cannot be created.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        validate_name(name)?;
        let mut map = self.collections.write();
        if let Some(col) = map.get(name) {
            return Ok(Arc::clone(col));
        }
        let col = Arc::new(Collection::new(name, Arc::clone(&self.conn)));
        col.ensure_table()?;
        log::info!("collection ready: {name}");
        map.insert(name.to_string(), Arc::clone(&col));
        Ok(col)
    }

    /// Returns the collection only if its table already exists.
    ///
    /// # Errors
    /// Returns the engine error if the catalog lookup fails.
    pub fn get_collection(&self, name: &str) -> Result<Option<Arc<Collection>>, DbError> {
        if self.list_collection_names()?.iter().any(|n| n == name) {
            self.collection(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// # Errors
    /// Returns `NoSuchCollection` if the table does not exist.
    pub fn drop_collection(&self, name: &str) -> Result<(), DbError> {
        let col = self.get_collection(name)?.ok_or_else(|| DbError::NoSuchCollection(name.to_string()))?;
        col.drop_table()?;
        self.collections.write().remove(name);
        log::info!("collection dropped: {name}");
        Ok(())
    }

    /// # Errors
    /// Returns the engine error if the catalog lookup fails.
    pub fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        let rows = self.conn.fetch_all(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
            &[],
        )?;
        Ok(rows
            .into_iter()
            .filter_map(|mut r| match r.remove("name") {
                Some(SqlValue::Text(s)) => Some(s),
                _ => None,
            })
            .collect())
    }
}

fn validate_name(name: &str) -> Result<(), DbError> {
    if name.is_empty() || name.len() > 128 || name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(DbError::InvalidCollectionName(name.to_string()));
    }
    if name.chars().any(char::is_control) {
        return Err(DbError::InvalidCollectionName(name.to_string()));
    }
    Ok(())
}
