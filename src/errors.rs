use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine rejected or failed to run a generated statement. Criteria errors raised
    /// from inside `document_criteria` arrive here as well.
    #[error("Query execution error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Criteria error: {0}")]
    Criteria(String),

    #[error("Invalid query option: {0}")]
    InvalidQuery(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("Cursor index out of bounds: index {index}, len {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cursor has not been materialized")]
    CursorNotMaterialized,

    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
