use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Document;

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// `-1` sorts descending; any other direction sorts ascending.
    #[must_use]
    pub const fn from_direction(direction: i64) -> Self {
        if direction == -1 { Self::Desc } else { Self::Asc }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Field mask applied to documents after they are decoded.
///
/// Entries keep their declaration order. A `true` flag includes the field, `false` excludes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub fields: Vec<(String, bool)>,
}

impl Projection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), true));
        self
    }

    #[must_use]
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.fields.push((field.into(), false));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Options for `Collection::find_with` and `Collection::paginate`.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Option<String>,
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

/// A page of results plus the number of documents matching the filter alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub data: Vec<Document>,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Value> },
    Nin { path: String, values: Vec<Value> },
    All { path: String, values: Vec<Value> },
    Size { path: String, size: usize },
    Mod { path: String, divisor: f64, remainder: f64 },
    Cmp { path: String, op: CmpOp, value: Value },
    #[cfg(feature = "regex")]
    Regex { path: String, regex: regex::Regex },
}
