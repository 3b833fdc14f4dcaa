use rusqlite::types::Value as SqlValue;

use super::functions::{CRITERIA_FN, KEY_FN};
use super::types::SortSpec;

/// Generated SQL plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Criteria that matches everything.
fn has_criteria(criteria: Option<&str>) -> Option<&str> {
    criteria.filter(|c| !c.trim().is_empty())
}

struct Parts {
    sql: Vec<String>,
    params: Vec<SqlValue>,
}

impl Parts {
    fn new(head: String) -> Self {
        Self { sql: vec![head], params: Vec::new() }
    }

    fn bind(&mut self, value: &str) -> String {
        self.params.push(SqlValue::Text(value.to_string()));
        format!("?{}", self.params.len())
    }

    fn criteria(&mut self, criteria: Option<&str>) {
        if let Some(c) = has_criteria(criteria) {
            let p = self.bind(c);
            self.sql.push(format!("WHERE {CRITERIA_FN}({p}, document)"));
        }
    }

    fn finish(self) -> SqlQuery {
        SqlQuery { sql: self.sql.join(" "), params: self.params }
    }
}

/// `SELECT COUNT(*)` for the criteria. Sort and skip do not apply to counts.
#[must_use]
pub fn count_query(table: &str, criteria: Option<&str>, limit: Option<usize>) -> SqlQuery {
    let mut parts = Parts::new(format!("SELECT COUNT(*) AS C FROM {table}"));
    parts.criteria(criteria);
    if let Some(n) = limit.filter(|n| *n > 0) {
        parts.sql.push(format!("LIMIT {n}"));
    }
    parts.finish()
}

/// `SELECT document` with filtering, ordering and paging.
///
/// `OFFSET` is only emitted together with `LIMIT`; a skip without a limit is ignored.
#[must_use]
pub fn fetch_query(
    table: &str,
    criteria: Option<&str>,
    sort: Option<&[SortSpec]>,
    limit: Option<usize>,
    skip: Option<usize>,
) -> SqlQuery {
    let mut parts = Parts::new(format!("SELECT document FROM {table}"));
    parts.criteria(criteria);
    if let Some(sort) = sort.filter(|s| !s.is_empty()) {
        let orders: Vec<String> = sort
            .iter()
            .map(|s| {
                let p = parts.bind(&s.field);
                format!("{KEY_FN}({p}, document) {}", s.order.as_sql())
            })
            .collect();
        parts.sql.push(format!("ORDER BY {}", orders.join(",")));
    }
    if let Some(n) = limit.filter(|n| *n > 0) {
        parts.sql.push(format!("LIMIT {n}"));
        if let Some(s) = skip.filter(|s| *s > 0) {
            parts.sql.push(format!("OFFSET {s}"));
        }
    }
    parts.finish()
}
