//! Comparison utilities for sorting and ordering JSON values.

use std::cmp::Ordering;

use serde_json::Value;

/// Compares two JSON values for sorting purposes.
///
/// Values of different types order by a fixed type rank
/// (null < bool < number < string < array < object); within a type, numbers
/// compare by value, strings by codepoint, arrays and objects by length.
pub fn compare_json_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (&Value::Null, &Value::Null) => Ordering::Equal,
        (&Value::Null, _) => Ordering::Less,
        (_, &Value::Null) => Ordering::Greater,
        (&Value::Bool(ba), &Value::Bool(bb)) => ba.cmp(&bb),
        (&Value::Bool(_), _) => Ordering::Less,
        (_, &Value::Bool(_)) => Ordering::Greater,
        (&Value::Number(ref na), &Value::Number(ref nb)) => {
            let fa = na.as_f64().unwrap_or(0.0);
            let fb = nb.as_f64().unwrap_or(0.0);
            fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
        },
        (&Value::Number(_), _) => Ordering::Less,
        (_, &Value::Number(_)) => Ordering::Greater,
        (&Value::String(ref sa), &Value::String(ref sb)) => sa.cmp(sb),
        (&Value::String(_), _) => Ordering::Less,
        (_, &Value::String(_)) => Ordering::Greater,
        (&Value::Array(ref aa), &Value::Array(ref ab)) => aa.len().cmp(&ab.len()),
        (&Value::Array(_), _) => Ordering::Less,
        (_, &Value::Array(_)) => Ordering::Greater,
        (&Value::Object(ref oa), &Value::Object(ref ob)) => oa.len().cmp(&ob.len()),
    }
}

/// Compares two optional values: undefined sorts before any defined value.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(va), Some(vb)) => compare_json_values(va, vb),
    }
}

/// Strict equality as used by `$eq` and implicit equality predicates:
/// numbers compare by value, everything else by structural equality.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            na.as_f64().is_some() && na.as_f64() == nb.as_f64()
        },
        _ => a == b,
    }
}

/// Ordered comparison for `$gt`/`$gte`/`$lt`/`$lte`.
///
/// Only meaningful within one type: numbers by value, strings by codepoint.
/// Mixed-type comparisons return `None` and therefore never match.
pub fn ordered_compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => na.as_f64()?.partial_cmp(&nb.as_f64()?),
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        _ => None,
    }
}
