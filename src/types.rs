use serde_json::{Map, Value};

pub type CollectionName = String;
pub type DocumentId = String;

/// A stored document: a JSON object. System fields are `_id`, `_created` and `_modified`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_FIELD: &str = "_created";
pub const MODIFIED_FIELD: &str = "_modified";
