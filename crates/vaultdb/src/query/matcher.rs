//! Predicate matching for find/update/delete filters.
//!
//! A query is a JSON object mapping field paths to either a literal value
//! (implicit equality) or an operator object (`$eq`, `$ne`, `$gt`, `$gte`,
//! `$lt`, `$lte`, `$in`, `$nin`, `$regex` with optional `$options`). The
//! top-level operators `$and` and `$or` combine arrays of sub-queries.

use std::cmp::Ordering;

use regex::RegexBuilder;
use serde_json::Value;

use super::{
    compare::{ordered_compare, values_equal},
    path::resolve_path,
};
use crate::error::{Result, VaultError};

/// Checks whether a document matches a query.
///
/// An empty query matches every document. Fails with
/// [`VaultError::Validation`] on malformed queries (unknown operators,
/// non-array `$and`/`$or`, invalid regex patterns).
pub fn matches_query(doc: &Value, query: &Value) -> Result<bool> {
    let conditions = query
        .as_object()
        .ok_or_else(|| VaultError::validation("Query must be an object"))?;

    for (key, condition) in conditions {
        let matched = match key.as_str() {
            "$and" => {
                let subs = sub_queries(key, condition)?;
                let mut all = true;
                for sub in subs {
                    if !matches_query(doc, sub)? {
                        all = false;
                        break;
                    }
                }
                all
            },
            "$or" => {
                let subs = sub_queries(key, condition)?;
                let mut any = false;
                for sub in subs {
                    if matches_query(doc, sub)? {
                        any = true;
                        break;
                    }
                }
                any
            },
            path => {
                let field = resolve_path(doc, path);
                match condition {
                    Value::Object(ops) if is_operator_object(ops) => matches_operators(field, ops)?,
                    literal => field.is_some_and(|v| values_equal(v, literal)),
                }
            },
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_queries<'a>(op: &str, condition: &'a Value) -> Result<&'a Vec<Value>> {
    condition
        .as_array()
        .ok_or_else(|| VaultError::validation(format!("{op} requires an array of sub-queries")))
}

fn is_operator_object(ops: &serde_json::Map<String, Value>) -> bool {
    !ops.is_empty() && ops.keys().all(|k| k.starts_with('$'))
}

/// Applies every operator in an operator object to the (possibly missing)
/// field value; all must hold.
fn matches_operators(field: Option<&Value>, ops: &serde_json::Map<String, Value>) -> Result<bool> {
    for (op, operand) in ops {
        let matched = match op.as_str() {
            "$eq" => field.is_some_and(|v| values_equal(v, operand)),
            // The only operator that is true for a missing field
            "$ne" => !field.is_some_and(|v| values_equal(v, operand)),
            "$gt" => ordered_matches(field, operand, Ordering::is_gt),
            "$gte" => ordered_matches(field, operand, Ordering::is_ge),
            "$lt" => ordered_matches(field, operand, Ordering::is_lt),
            "$lte" => ordered_matches(field, operand, Ordering::is_le),
            "$in" => {
                let candidates = operand
                    .as_array()
                    .ok_or_else(|| VaultError::validation("$in requires an array"))?;
                field.is_some_and(|v| candidates.iter().any(|c| values_equal(v, c)))
            },
            "$nin" => {
                let candidates = operand
                    .as_array()
                    .ok_or_else(|| VaultError::validation("$nin requires an array"))?;
                field.is_some_and(|v| !candidates.iter().any(|c| values_equal(v, c)))
            },
            "$regex" => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| VaultError::validation("$regex requires a string pattern"))?;
                let case_insensitive = ops
                    .get("$options")
                    .and_then(Value::as_str)
                    .is_some_and(|o| o.contains('i'));
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(case_insensitive)
                    .build()
                    .map_err(|e| VaultError::validation(format!("Invalid $regex pattern: {e}")))?;
                field.is_some_and(|v| re.is_match(&stringify(v)))
            },
            // Consumed together with $regex
            "$options" => true,
            other => {
                return Err(VaultError::validation(format!(
                    "Unknown query operator {other}"
                )));
            },
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn ordered_matches(field: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    field
        .and_then(|v| ordered_compare(v, operand))
        .is_some_and(accept)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({
            "name": "Alice",
            "age": 30,
            "address": {"city": "Oslo"},
            "tags": ["a", "b"],
        })
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(matches_query(&doc(), &json!({})).unwrap());
    }

    #[test]
    fn test_implicit_equality() {
        assert!(matches_query(&doc(), &json!({"name": "Alice"})).unwrap());
        assert!(!matches_query(&doc(), &json!({"name": "Bob"})).unwrap());
        assert!(matches_query(&doc(), &json!({"age": 30.0})).unwrap());
        // Missing field never equals a concrete value
        assert!(!matches_query(&doc(), &json!({"missing": "x"})).unwrap());
    }

    #[test]
    fn test_dotted_path_equality() {
        assert!(matches_query(&doc(), &json!({"address.city": "Oslo"})).unwrap());
        assert!(!matches_query(&doc(), &json!({"address.city": "Bergen"})).unwrap());
        // Non-object intermediate yields undefined, which never matches
        assert!(!matches_query(&doc(), &json!({"name.city": "Oslo"})).unwrap());
    }

    #[test]
    fn test_eq_ne() {
        assert!(matches_query(&doc(), &json!({"age": {"$eq": 30}})).unwrap());
        assert!(matches_query(&doc(), &json!({"age": {"$ne": 31}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"age": {"$ne": 30}})).unwrap());
        // $ne is true for missing fields
        assert!(matches_query(&doc(), &json!({"missing": {"$ne": 1}})).unwrap());
        // every other operator is false for missing fields
        assert!(!matches_query(&doc(), &json!({"missing": {"$eq": 1}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"missing": {"$gt": 0}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"missing": {"$in": [1]}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"missing": {"$nin": [1]}})).unwrap());
    }

    #[test]
    fn test_ordered_operators() {
        assert!(matches_query(&doc(), &json!({"age": {"$gt": 20, "$lt": 40}})).unwrap());
        assert!(matches_query(&doc(), &json!({"age": {"$gte": 30}})).unwrap());
        assert!(matches_query(&doc(), &json!({"age": {"$lte": 30}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"age": {"$gt": 30}})).unwrap());
        // Strings compare by codepoint
        assert!(matches_query(&doc(), &json!({"name": {"$gt": "Alfred"}})).unwrap());
        // Mixed-type comparisons never match
        assert!(!matches_query(&doc(), &json!({"age": {"$gt": "20"}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"name": {"$lt": 99}})).unwrap());
    }

    #[test]
    fn test_in_nin() {
        assert!(matches_query(&doc(), &json!({"age": {"$in": [29, 30, 31]}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"age": {"$in": [1, 2]}})).unwrap());
        assert!(matches_query(&doc(), &json!({"age": {"$nin": [1, 2]}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"age": {"$nin": [30]}})).unwrap());
        assert!(matches_query(&doc(), &json!({"age": {"$in": [30.0]}})).unwrap());
    }

    #[test]
    fn test_regex() {
        assert!(matches_query(&doc(), &json!({"name": {"$regex": "^Ali"}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"name": {"$regex": "^ali"}})).unwrap());
        assert!(
            matches_query(&doc(), &json!({"name": {"$regex": "^ali", "$options": "i"}})).unwrap()
        );
        // Non-string values match against their JSON rendering
        assert!(matches_query(&doc(), &json!({"age": {"$regex": "^30$"}})).unwrap());
        assert!(matches_query(&doc(), &json!({"missing": {"$regex": ".*"}})).is_ok());
        assert!(!matches_query(&doc(), &json!({"missing": {"$regex": ".*"}})).unwrap());
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        assert!(matches_query(&doc(), &json!({"name": {"$regex": "("}})).is_err());
    }

    #[test]
    fn test_and_or() {
        assert!(matches_query(
            &doc(),
            &json!({"$and": [{"name": "Alice"}, {"age": {"$gte": 30}}]})
        )
        .unwrap());
        assert!(!matches_query(
            &doc(),
            &json!({"$and": [{"name": "Alice"}, {"age": {"$gt": 30}}]})
        )
        .unwrap());
        assert!(matches_query(
            &doc(),
            &json!({"$or": [{"name": "Bob"}, {"age": 30}]})
        )
        .unwrap());
        assert!(!matches_query(
            &doc(),
            &json!({"$or": [{"name": "Bob"}, {"age": 31}]})
        )
        .unwrap());
    }

    #[test]
    fn test_malformed_queries() {
        assert!(matches_query(&doc(), &json!("nope")).is_err());
        assert!(matches_query(&doc(), &json!({"$and": "nope"})).is_err());
        assert!(matches_query(&doc(), &json!({"age": {"$between": [1, 2]}})).is_err());
        assert!(matches_query(&doc(), &json!({"age": {"$in": 3}})).is_err());
    }

    #[test]
    fn test_literal_object_equality() {
        // An object without $-keys is a literal, not an operator map
        assert!(matches_query(&doc(), &json!({"address": {"city": "Oslo"}})).unwrap());
        assert!(!matches_query(&doc(), &json!({"address": {"city": "Bergen"}})).unwrap());
    }
}
