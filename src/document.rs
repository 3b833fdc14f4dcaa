use crate::errors::DbError;
use crate::types::{CREATED_FIELD, Document, DocumentId, ID_FIELD, MODIFIED_FIELD};
use chrono::Utc;
use serde_json::Value;

/// Decodes a stored payload. Top-level must be a JSON object.
///
/// # Errors
/// Returns `DbError::Json` for malformed JSON and `DbError::InvalidDocument` for non-objects.
pub fn decode(text: &str) -> Result<Document, DbError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(DbError::InvalidDocument(format!("expected object, found {}", kind(&other)))),
    }
}

/// # Errors
/// Returns `DbError::Json` if serialization fails.
pub fn encode(doc: &Document) -> Result<String, DbError> {
    Ok(serde_json::to_string(doc)?)
}

/// Converts a JSON value into a document.
///
/// # Errors
/// Returns `DbError::InvalidDocument` unless the value is an object.
pub fn from_value(value: Value) -> Result<Document, DbError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DbError::InvalidDocument(format!("expected object, found {}", kind(&other)))),
    }
}

#[must_use]
pub fn new_id() -> DocumentId {
    uuid::Uuid::new_v4().simple().to_string()
}

/// String form of a document's `_id`, if it has one.
#[must_use]
pub fn id_of(doc: &Document) -> Option<DocumentId> {
    match doc.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Fills in `_id`, `_created` and `_modified` where missing and returns the id.
pub fn stamp_new(doc: &mut Document) -> DocumentId {
    let id = id_of(doc).unwrap_or_else(|| {
        let id = new_id();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        id
    });
    let now = Value::from(Utc::now().timestamp());
    doc.entry(CREATED_FIELD).or_insert_with(|| now.clone());
    doc.entry(MODIFIED_FIELD).or_insert(now);
    id
}

pub fn touch(doc: &mut Document) {
    doc.insert(MODIFIED_FIELD.to_string(), Value::from(Utc::now().timestamp()));
}

const fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
