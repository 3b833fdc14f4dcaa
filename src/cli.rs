use crate::config::DbConfig;
use crate::database::Database;
use crate::document;
use crate::errors::DbError;
use crate::query::{parse_projection_json, parse_sort_json};
use std::io::Write;

/// Programmatic commands. The binary maps its subcommands onto these; tests drive them directly.
#[derive(Debug, Clone)]
pub enum Command {
    Collections,
    CreateCollection { name: String },
    DropCollection { name: String },
    Insert { collection: Option<String>, json: String },
    Find {
        collection: Option<String>,
        filter: Option<String>,
        fields: Option<String>,
        sort: Option<String>,
        limit: Option<usize>,
        skip: Option<usize>,
    },
    FindOne { collection: Option<String>, filter: Option<String>, fields: Option<String> },
    Count { collection: Option<String>, filter: Option<String> },
    Update { collection: Option<String>, filter: Option<String>, json: String },
    Remove { collection: Option<String>, filter: Option<String> },
    Info,
}

impl Command {
    /// True for commands that change stored data or the set of collections.
    #[must_use]
    pub const fn writes(&self) -> bool {
        matches!(
            self,
            Self::CreateCollection { .. }
                | Self::DropCollection { .. }
                | Self::Insert { .. }
                | Self::Update { .. }
                | Self::Remove { .. }
        )
    }
}

/// Rejects writing commands when no database file is configured, since an in-memory
/// database is discarded when the process exits.
///
/// # Errors
/// Returns `DbError::Config` naming the command.
pub fn require_persistent(config: &DbConfig, cmd: &Command) -> Result<(), DbError> {
    if cmd.writes() && config.db_path.is_none() {
        return Err(DbError::Config(
            "writes to an in-memory database would be lost; pass --db or set db_path".into(),
        ));
    }
    Ok(())
}

fn target(db: &Database, collection: Option<String>) -> Result<String, DbError> {
    collection
        .or_else(|| db.config().default_collection.clone())
        .ok_or_else(|| DbError::InvalidQuery("no collection given and no default_collection configured".into()))
}

/// Runs one command, writing results to `out` as newline-delimited JSON or plain lines.
///
/// # Errors
/// Returns the underlying database error, or an I/O error from `out`.
pub fn run(db: &Database, cmd: Command, out: &mut dyn Write) -> Result<(), DbError> {
    match cmd {
        Command::Collections => {
            for name in db.list_collection_names()? {
                writeln!(out, "{name}")?;
            }
        }
        Command::CreateCollection { name } => {
            db.create_collection(&name)?;
        }
        Command::DropCollection { name } => db.drop_collection(&name)?,
        Command::Insert { collection, json } => {
            let col = db.collection(&target(db, collection)?)?;
            let value: serde_json::Value = serde_json::from_str(&json)?;
            let ids = match value {
                serde_json::Value::Array(items) => {
                    col.insert_many(items.into_iter().map(document::from_value).collect::<Result<_, _>>()?)?
                }
                other => vec![col.insert(document::from_value(other)?)?],
            };
            for id in ids {
                writeln!(out, "{id}")?;
            }
        }
        Command::Find { collection, filter, fields, sort, limit, skip } => {
            let col = db.collection(&target(db, collection)?)?;
            let projection = fields.as_deref().map(parse_projection_json).transpose()?;
            let mut cursor = col.find(filter.as_deref(), projection);
            if let Some(s) = sort.as_deref() {
                cursor = cursor.sort(parse_sort_json(s)?);
            }
            if let Some(n) = limit {
                cursor = cursor.limit(n);
            }
            if let Some(n) = skip {
                cursor = cursor.skip(n);
            }
            for doc in &mut cursor {
                writeln!(out, "{}", document::encode(&doc?)?)?;
            }
        }
        Command::FindOne { collection, filter, fields } => {
            let col = db.collection(&target(db, collection)?)?;
            let projection = fields.as_deref().map(parse_projection_json).transpose()?;
            match col.find_one(filter.as_deref(), projection)? {
                Some(doc) => writeln!(out, "{}", document::encode(&doc)?)?,
                None => writeln!(out, "null")?,
            }
        }
        Command::Count { collection, filter } => {
            let col = db.collection(&target(db, collection)?)?;
            writeln!(out, "{}", col.count(filter.as_deref())?)?;
        }
        Command::Update { collection, filter, json } => {
            let col = db.collection(&target(db, collection)?)?;
            let data = document::decode(&json)?;
            let n = col.update(filter.as_deref(), &data)?;
            writeln!(out, "{{\"updated\":{n}}}")?;
        }
        Command::Remove { collection, filter } => {
            let col = db.collection(&target(db, collection)?)?;
            let n = col.remove(filter.as_deref())?;
            writeln!(out, "{{\"removed\":{n}}}")?;
        }
        Command::Info => {
            let cfg = db.config();
            let info = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "features": crate::compiled_features(),
                "db_path": cfg.db_path.as_ref().map(|p| p.display().to_string()),
                "journal_mode": cfg.journal_mode,
                "criteria_cache_size": cfg.criteria_cache_size,
                "collections": db.list_collection_names()?,
            });
            writeln!(out, "{info}")?;
        }
    }
    Ok(())
}
