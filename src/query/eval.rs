use serde_json::Value;
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_PATH_DEPTH};
use crate::types::Document;

pub fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| in_set(v, values)),
        Filter::All { path, values } => match get_path(doc, path) {
            Some(Value::Array(items)) => {
                values.iter().all(|want| items.iter().any(|have| values_equal(have, want)))
            }
            Some(v) => values.iter().all(|want| values_equal(v, want)),
            None => false,
        },
        Filter::Size { path, size } => {
            matches!(get_path(doc, path), Some(Value::Array(items)) if items.len() == *size)
        }
        Filter::Mod { path, divisor, remainder } => get_path(doc, path)
            .and_then(Value::as_f64)
            .is_some_and(|n| (n % divisor - remainder).abs() < f64::EPSILON),
        Filter::Cmp { path, op: CmpOp::Ne, value } => {
            !get_path(doc, path).is_some_and(|v| any_element(v, |x| values_equal(x, value)))
        }
        Filter::Cmp { path, op, value } => get_path(doc, path)
            .is_some_and(|v| any_element(v, |x| compare_op(x, *op, value))),
        #[cfg(feature = "regex")]
        Filter::Regex { path, regex } => get_path(doc, path).is_some_and(|v| {
            any_element(v, |x| matches!(x, Value::String(s) if regex.is_match(s)))
        }),
    }
}

/// Applies `pred` to the value itself and, for arrays, to each element.
fn any_element(v: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    if pred(v) {
        return true;
    }
    match v {
        Value::Array(items) => items.iter().any(pred),
        _ => false,
    }
}

fn compare_op(v: &Value, op: CmpOp, operand: &Value) -> bool {
    if op == CmpOp::Eq {
        return values_equal(v, operand);
    }
    // Ordering comparisons only apply within the same type bracket.
    if type_rank(v) != type_rank(operand) {
        return false;
    }
    let c = compare_json(v, operand);
    match op {
        CmpOp::Gt => c == Ordering::Greater,
        CmpOp::Gte => c != Ordering::Less,
        CmpOp::Lt => c == Ordering::Less,
        CmpOp::Lte => c != Ordering::Greater,
        CmpOp::Eq | CmpOp::Ne => unreachable!("equality handled by caller"),
    }
}

fn in_set(v: &Value, set: &[Value]) -> bool {
    set.iter().any(|x| any_element(v, |e| values_equal(e, x)))
}

/// Equality that treats `5` and `5.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Resolves a dotted path. Numeric segments index into arrays.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut cur = doc.get(first)?;
    for (depth, part) in parts.enumerate() {
        if depth + 1 >= MAX_PATH_DEPTH {
            return None;
        }
        cur = match cur {
            Value::Object(m) => m.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Total order over JSON values: null < bool < number < string < array < object.
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().unwrap_or(f64::NAN).total_cmp(&y.as_f64().unwrap_or(f64::NAN))
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (ex, ey) in x.iter().zip(y) {
                let c = compare_json(ex, ey);
                if c != Ordering::Equal {
                    return c;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
