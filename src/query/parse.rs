use crate::errors::DbError;
use serde_json::{Map, Value};

use super::types::{CmpOp, Filter, MAX_IN_SET, MAX_NESTING, MAX_PATH_DEPTH, Order, Projection, SortSpec};

fn criteria_err(msg: impl Into<String>) -> DbError {
    DbError::Criteria(msg.into())
}

/// Parses a criteria string into a filter. Empty or whitespace-only criteria match everything.
///
/// # Errors
/// Returns `DbError::Criteria` if the text is not a JSON object or uses an unsupported operator.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Filter::True);
    }
    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| criteria_err(format!("criteria is not valid JSON: {e}")))?;
    filter_from_value(&value)
}

/// # Errors
/// Returns `DbError::Criteria` if the value is not a valid criteria document.
pub fn filter_from_value(value: &Value) -> Result<Filter, DbError> {
    parse_document(value, 0)
}

fn parse_document(value: &Value, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_NESTING {
        return Err(criteria_err("criteria nested too deeply"));
    }
    let Value::Object(map) = value else {
        return Err(criteria_err("criteria must be a JSON object"));
    };
    let mut clauses = Vec::with_capacity(map.len());
    for (key, operand) in map {
        let clause = match key.as_str() {
            "$and" => Filter::And(parse_list(key, operand, depth)?),
            "$or" => Filter::Or(parse_list(key, operand, depth)?),
            "$nor" => Filter::Nor(parse_list(key, operand, depth)?),
            "$not" => Filter::Not(Box::new(parse_document(operand, depth + 1)?)),
            op if op.starts_with('$') => {
                return Err(criteria_err(format!("unknown operator {op}")));
            }
            path => parse_field(path, operand, depth)?,
        };
        clauses.push(clause);
    }
    Ok(collapse(clauses))
}

fn collapse(mut clauses: Vec<Filter>) -> Filter {
    match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    }
}

fn parse_list(op: &str, operand: &Value, depth: usize) -> Result<Vec<Filter>, DbError> {
    let Value::Array(items) = operand else {
        return Err(criteria_err(format!("{op} expects an array")));
    };
    items.iter().map(|v| parse_document(v, depth + 1)).collect()
}

fn check_path(path: &str) -> Result<(), DbError> {
    if path.is_empty() || path.len() > 1024 {
        return Err(criteria_err("field path must be 1..=1024 bytes"));
    }
    if path.split('.').count() > MAX_PATH_DEPTH {
        return Err(criteria_err(format!("field path too deep: {path}")));
    }
    Ok(())
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

fn parse_field(path: &str, operand: &Value, depth: usize) -> Result<Filter, DbError> {
    check_path(path)?;
    match operand {
        Value::Object(ops) if is_operator_object(ops) => parse_operators(path, ops, depth),
        other => Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: other.clone() }),
    }
}

fn parse_operators(path: &str, ops: &Map<String, Value>, depth: usize) -> Result<Filter, DbError> {
    if depth > MAX_NESTING {
        return Err(criteria_err("criteria nested too deeply"));
    }
    let p = || path.to_string();
    let mut clauses = Vec::with_capacity(ops.len());
    for (op, operand) in ops {
        let clause = match op.as_str() {
            "$eq" => Filter::Cmp { path: p(), op: CmpOp::Eq, value: operand.clone() },
            "$ne" => Filter::Cmp { path: p(), op: CmpOp::Ne, value: operand.clone() },
            "$gt" => Filter::Cmp { path: p(), op: CmpOp::Gt, value: operand.clone() },
            "$gte" => Filter::Cmp { path: p(), op: CmpOp::Gte, value: operand.clone() },
            "$lt" => Filter::Cmp { path: p(), op: CmpOp::Lt, value: operand.clone() },
            "$lte" => Filter::Cmp { path: p(), op: CmpOp::Lte, value: operand.clone() },
            "$in" => Filter::In { path: p(), values: value_set(op, operand)? },
            "$nin" => Filter::Nin { path: p(), values: value_set(op, operand)? },
            "$all" => Filter::All { path: p(), values: value_set(op, operand)? },
            "$exists" => Filter::Exists { path: p(), exists: is_truthy(operand) },
            "$size" => {
                let size = operand
                    .as_u64()
                    .ok_or_else(|| criteria_err("$size expects a non-negative integer"))?;
                Filter::Size { path: p(), size: usize::try_from(size).unwrap_or(usize::MAX) }
            }
            "$mod" => parse_mod(path, operand)?,
            "$regex" => parse_regex(path, operand, ops.get("$options"))?,
            "$options" => {
                if ops.contains_key("$regex") {
                    continue;
                }
                return Err(criteria_err("$options requires $regex"));
            }
            "$not" => match operand {
                Value::Object(inner) if is_operator_object(inner) => {
                    Filter::Not(Box::new(parse_operators(path, inner, depth + 1)?))
                }
                _ => return Err(criteria_err("$not expects an operator object")),
            },
            other => return Err(criteria_err(format!("unknown operator {other}"))),
        };
        clauses.push(clause);
    }
    Ok(collapse(clauses))
}

fn value_set(op: &str, operand: &Value) -> Result<Vec<Value>, DbError> {
    match operand {
        Value::Array(items) if items.len() > MAX_IN_SET => {
            Err(criteria_err(format!("{op} set exceeds {MAX_IN_SET} values")))
        }
        Value::Array(items) => Ok(items.clone()),
        _ => Err(criteria_err(format!("{op} expects an array"))),
    }
}

fn parse_mod(path: &str, operand: &Value) -> Result<Filter, DbError> {
    let pair = operand.as_array().filter(|a| a.len() == 2);
    let nums = pair.and_then(|a| Some((a[0].as_f64()?, a[1].as_f64()?)));
    match nums {
        Some((divisor, remainder)) if divisor != 0.0 => {
            Ok(Filter::Mod { path: path.to_string(), divisor, remainder })
        }
        _ => Err(criteria_err("$mod expects [divisor, remainder] with a non-zero divisor")),
    }
}

#[cfg(feature = "regex")]
fn parse_regex(path: &str, operand: &Value, options: Option<&Value>) -> Result<Filter, DbError> {
    let pattern = operand.as_str().ok_or_else(|| criteria_err("$regex expects a string"))?;
    let case_insensitive = options.and_then(Value::as_str).is_some_and(|o| o.contains('i'));
    let regex = regex::RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .size_limit(1 << 20)
        .build()
        .map_err(|e| criteria_err(format!("invalid $regex: {e}")))?;
    Ok(Filter::Regex { path: path.to_string(), regex })
}

#[cfg(not(feature = "regex"))]
fn parse_regex(_path: &str, _operand: &Value, _options: Option<&Value>) -> Result<Filter, DbError> {
    Err(criteria_err("$regex requires the `regex` feature"))
}

/// Loose truthiness used for `$exists` and projection flags: `false`, `0`, `""`, `"0"`,
/// `null` and empty arrays/objects are falsy.
#[must_use]
pub fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Parses a sort document such as `{"age": -1, "name": 1}`, keeping key order.
///
/// # Errors
/// Returns `DbError::InvalidQuery` if the text is not an object of numeric directions.
pub fn parse_sort_json(json: &str) -> Result<Vec<SortSpec>, DbError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| DbError::InvalidQuery(format!("sort is not valid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(DbError::InvalidQuery("sort must be a JSON object".into()));
    };
    map.into_iter()
        .map(|(field, dir)| {
            let direction = dir
                .as_i64()
                .or_else(|| dir.as_f64().map(|f| f as i64))
                .ok_or_else(|| DbError::InvalidQuery(format!("sort direction for {field} must be 1 or -1")))?;
            Ok(SortSpec { field, order: Order::from_direction(direction) })
        })
        .collect()
}

/// Parses a projection document such as `{"title": 1, "body": 0}`.
///
/// # Errors
/// Returns `DbError::InvalidQuery` if the text is not a JSON object.
pub fn parse_projection_json(json: &str) -> Result<Projection, DbError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| DbError::InvalidQuery(format!("projection is not valid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(DbError::InvalidQuery("projection must be a JSON object".into()));
    };
    Ok(Projection { fields: map.into_iter().map(|(k, v)| (k, is_truthy(&v))).collect() })
}
