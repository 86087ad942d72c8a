//! Update-operator application.
//!
//! An update is a JSON object mapping operators to `{path: value}` objects:
//! `$set`, `$unset`, `$inc`, `$push`, `$pull`. Operators apply to a decrypted
//! copy of the stored document; the caller re-validates and re-encrypts the
//! result before it replaces the stored one.

use serde_json::{json, Value};

use super::{
    compare::values_equal,
    path::{remove_path, resolve_path, set_path},
};
use crate::{
    document,
    error::{Result, VaultError},
};

/// Applies update operators to a document in place and refreshes `updatedAt`.
///
/// Reserved system fields cannot be targeted by any operator; `_id` is stable
/// and `createdAt` never changes after insert.
pub fn apply_update(doc: &mut Value, update: &Value) -> Result<()> {
    let operators = update
        .as_object()
        .ok_or_else(|| VaultError::validation("Update must be an object"))?;

    for (op, fields) in operators {
        let fields = fields
            .as_object()
            .ok_or_else(|| VaultError::validation(format!("{op} requires an object of fields")))?;
        for (path, operand) in fields {
            check_not_reserved(path)?;
            match op.as_str() {
                "$set" => {
                    if !set_path(doc, path, operand.clone()) {
                        return Err(VaultError::validation(format!(
                            "Cannot set field {path} through a non-object value"
                        )));
                    }
                },
                "$unset" => {
                    remove_path(doc, path);
                },
                "$inc" => apply_inc(doc, path, operand)?,
                "$push" => apply_push(doc, path, operand)?,
                "$pull" => apply_pull(doc, path, operand)?,
                other => {
                    return Err(VaultError::validation(format!(
                        "Unknown update operator {other}"
                    )));
                },
            }
        }
    }

    set_path(
        doc,
        document::FIELD_UPDATED_AT,
        json!(document::now_string()),
    );
    Ok(())
}

fn check_not_reserved(path: &str) -> Result<()> {
    let head = path.split('.').next().unwrap_or(path);
    if document::is_reserved_field(head) {
        return Err(VaultError::validation(format!(
            "Field {head} cannot be modified by update operators"
        )));
    }
    Ok(())
}

/// Adds a numeric delta to a field, treating an absent field as 0.
fn apply_inc(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    if !operand.is_number() {
        return Err(VaultError::validation(format!(
            "$inc value for field {path} must be a number"
        )));
    }
    let current = match resolve_path(doc, path) {
        None => json!(0),
        Some(v) if v.is_number() => v.clone(),
        Some(_) => {
            return Err(VaultError::validation(format!(
                "Cannot apply $inc to non-numeric field {path}"
            )));
        },
    };

    // Keep integer representation when both sides are integers
    let sum = match (current.as_i64(), operand.as_i64()) {
        (Some(a), Some(b)) => json!(a + b),
        _ => {
            let a = current.as_f64().unwrap_or(0.0);
            let b = operand.as_f64().unwrap_or(0.0);
            serde_json::Number::from_f64(a + b)
                .map(Value::Number)
                .ok_or_else(|| VaultError::validation(format!("$inc on field {path} produced a non-finite number")))?
        },
    };
    set_path(doc, path, sum);
    Ok(())
}

/// Appends to an array field, creating the array if absent.
fn apply_push(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    match resolve_path(doc, path) {
        None => {
            if !set_path(doc, path, json!([operand.clone()])) {
                return Err(VaultError::validation(format!(
                    "Cannot create array field {path} through a non-object value"
                )));
            }
            Ok(())
        },
        Some(Value::Array(existing)) => {
            let mut items = existing.clone();
            items.push(operand.clone());
            set_path(doc, path, Value::Array(items));
            Ok(())
        },
        Some(_) => Err(VaultError::validation(format!(
            "Cannot apply $push to non-array field {path}"
        ))),
    }
}

/// Removes all strictly-equal matches from an array field.
fn apply_pull(doc: &mut Value, path: &str, operand: &Value) -> Result<()> {
    match resolve_path(doc, path) {
        None => Ok(()),
        Some(Value::Array(existing)) => {
            let items: Vec<Value> = existing
                .iter()
                .filter(|v| !values_equal(v, operand))
                .cloned()
                .collect();
            set_path(doc, path, Value::Array(items));
            Ok(())
        },
        Some(_) => Err(VaultError::validation(format!(
            "Cannot apply $pull to non-array field {path}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc() -> Value {
        json!({
            "_id": "d1",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "name": "x",
            "count": 3,
            "tags": ["a", "b", "a"],
            "meta": {"depth": 1},
        })
    }

    #[test]
    fn test_set() {
        let mut d = doc();
        apply_update(&mut d, &json!({"$set": {"name": "y", "meta.depth": 2}})).unwrap();
        assert_eq!(d["name"], json!("y"));
        assert_eq!(d["meta"]["depth"], json!(2));
    }

    #[test]
    fn test_unset() {
        let mut d = doc();
        apply_update(&mut d, &json!({"$unset": {"name": ""}})).unwrap();
        assert!(d.get("name").is_none());
        // Unsetting a missing field is a no-op
        apply_update(&mut d, &json!({"$unset": {"ghost": ""}})).unwrap();
    }

    #[test]
    fn test_inc() {
        let mut d = doc();
        apply_update(&mut d, &json!({"$inc": {"count": 2}})).unwrap();
        assert_eq!(d["count"], json!(5));
        // Absent field starts from zero
        apply_update(&mut d, &json!({"$inc": {"visits": 1}})).unwrap();
        assert_eq!(d["visits"], json!(1));
        // Float deltas switch to float representation
        apply_update(&mut d, &json!({"$inc": {"count": 0.5}})).unwrap();
        assert_eq!(d["count"], json!(5.5));
        // Non-numeric target is rejected
        assert!(apply_update(&mut d, &json!({"$inc": {"name": 1}})).is_err());
        assert!(apply_update(&mut d, &json!({"$inc": {"count": "1"}})).is_err());
    }

    #[test]
    fn test_push() {
        let mut d = doc();
        apply_update(&mut d, &json!({"$push": {"tags": "c"}})).unwrap();
        assert_eq!(d["tags"], json!(["a", "b", "a", "c"]));
        // Creates the array when absent
        apply_update(&mut d, &json!({"$push": {"history": 1}})).unwrap();
        assert_eq!(d["history"], json!([1]));
        assert!(apply_update(&mut d, &json!({"$push": {"count": 1}})).is_err());
    }

    #[test]
    fn test_pull() {
        let mut d = doc();
        apply_update(&mut d, &json!({"$pull": {"tags": "a"}})).unwrap();
        assert_eq!(d["tags"], json!(["b"]));
        // Pulling from a missing field is a no-op
        apply_update(&mut d, &json!({"$pull": {"ghost": 1}})).unwrap();
        assert!(apply_update(&mut d, &json!({"$pull": {"count": 1}})).is_err());
    }

    #[test]
    fn test_updated_at_refreshed() {
        let mut d = doc();
        apply_update(&mut d, &json!({"$set": {"name": "y"}})).unwrap();
        assert_ne!(d["updatedAt"], json!("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_reserved_fields_protected() {
        let mut d = doc();
        assert!(apply_update(&mut d, &json!({"$set": {"_id": "other"}})).is_err());
        assert!(apply_update(&mut d, &json!({"$unset": {"createdAt": ""}})).is_err());
        assert!(apply_update(&mut d, &json!({"$inc": {"updatedAt": 1}})).is_err());
    }

    #[test]
    fn test_unknown_operator() {
        let mut d = doc();
        assert!(apply_update(&mut d, &json!({"$rename": {"name": "label"}})).is_err());
        assert!(apply_update(&mut d, &json!({"$set": "nope"})).is_err());
        assert!(apply_update(&mut d, &json!([1])).is_err());
    }

    #[test]
    fn test_idempotent_set_unset() {
        let mut a = doc();
        let mut b = doc();
        let update = json!({"$set": {"name": "z"}, "$unset": {"count": ""}});
        apply_update(&mut a, &update).unwrap();
        apply_update(&mut b, &update).unwrap();
        apply_update(&mut b, &update).unwrap();
        a.as_object_mut().unwrap().remove("updatedAt");
        b.as_object_mut().unwrap().remove("updatedAt");
        assert_eq!(a, b);
    }
}
