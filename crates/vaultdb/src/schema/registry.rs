//! Static registry of named default generators and validators.
//!
//! The persisted schema carries identifiers, never code; rehydrating a schema
//! resolves those identifiers against this registry. Unknown identifiers are
//! rejected when a schema is parsed, so a stored file can always be reopened
//! without executing arbitrary logic.

use serde_json::{json, Value};

use crate::document;

/// Returns true if `name` identifies a registered default generator.
pub fn is_generator(name: &str) -> bool { matches!(name, "now" | "uuid") }

/// Runs a registered default generator, producing a fresh value.
pub fn generate_default(name: &str) -> Option<Value> {
    match name {
        "now" => Some(json!(document::now_string())),
        "uuid" => Some(json!(document::generate_id())),
        _ => None,
    }
}

/// Returns true if `name` identifies a registered validator.
pub fn has_validator(name: &str) -> bool { matches!(name, "email" | "nonEmpty" | "positive") }

/// Runs a registered validator against a value.
///
/// Returns `None` for an unknown validator, `Some(Ok(()))` on success, and
/// `Some(Err(reason))` when the value is rejected.
pub fn run_validator(name: &str, value: &Value) -> Option<Result<(), String>> {
    let result = match name {
        "email" => {
            match value.as_str() {
                Some(s) if s.contains('@') && s.rsplit('@').next().is_some_and(|host| host.contains('.')) => Ok(()),
                _ => Err("is not a valid email address".to_owned()),
            }
        },
        "nonEmpty" => {
            let ok = match value {
                Value::String(s) => !s.is_empty(),
                Value::Array(a) => !a.is_empty(),
                _ => false,
            };
            if ok {
                Ok(())
            }
            else {
                Err("must not be empty".to_owned())
            }
        },
        "positive" => {
            match value.as_f64() {
                Some(n) if n > 0.0 => Ok(()),
                _ => Err("must be a positive number".to_owned()),
            }
        },
        _ => return None,
    };
    Some(result)
}
