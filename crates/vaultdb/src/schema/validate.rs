//! Document validation against a schema.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Value};
use tracing::trace;

use super::{registry, FieldDefinition, FieldKind, Schema};
use crate::{
    document,
    error::{Result, VaultError},
};

impl Schema {
    /// Validates a document against this schema and returns the stored form.
    ///
    /// The returned document has defaults materialized, `date` values
    /// normalized to canonical RFC 3339 UTC, and the reserved system fields
    /// populated: `_id` and `createdAt` are carried through from the input
    /// when present, generated otherwise; `updatedAt` is always set to now.
    ///
    /// Fails with [`VaultError::Validation`] when a required field is
    /// missing, a value violates its definition, or the input contains a
    /// field that is neither declared nor reserved.
    pub fn validate_document(&self, input: &Value) -> Result<Value> {
        trace!("Validating document against schema");
        let input_map = input
            .as_object()
            .ok_or_else(|| VaultError::validation("Document must be an object"))?;

        let mut out = Map::new();

        for (name, def) in self.fields() {
            let value = match input_map.get(name) {
                Some(v) => Some(v.clone()),
                None => def.materialize_default(),
            };
            match value {
                Some(v) => {
                    let normalized = normalize_and_validate(name, &v, def)?;
                    out.insert(name.clone(), normalized);
                },
                None if def.required => {
                    return Err(VaultError::validation(format!(
                        "Required field {name} is missing"
                    )));
                },
                None => {},
            }
        }

        for name in input_map.keys() {
            if self.field(name).is_none() && !document::is_reserved_field(name) {
                return Err(VaultError::validation(format!(
                    "Field {name} is not defined in schema"
                )));
            }
        }

        // Reserved system fields: carried through when present, materialized
        // otherwise. Caller-supplied timestamps must be real dates.
        let id = match input_map.get(document::FIELD_ID) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(_) => return Err(VaultError::validation("Field _id must be a non-empty string")),
            None => document::generate_id(),
        };
        out.insert(document::FIELD_ID.to_owned(), Value::String(id));

        // One shared instant so a fresh document gets createdAt == updatedAt.
        let now = document::now_string();
        let created_at = match input_map.get(document::FIELD_CREATED_AT) {
            Some(v) => normalize_instant(document::FIELD_CREATED_AT, v)?,
            None => now.clone(),
        };
        out.insert(
            document::FIELD_CREATED_AT.to_owned(),
            Value::String(created_at),
        );
        out.insert(document::FIELD_UPDATED_AT.to_owned(), Value::String(now));

        Ok(Value::Object(out))
    }
}

fn normalize_instant(name: &str, value: &Value) -> Result<String> {
    let parsed = value.as_str().and_then(document::parse_instant).ok_or_else(|| {
        VaultError::validation(format!("Field {name} must be a valid date"))
    })?;
    Ok(document::format_instant(parsed))
}

/// Validates a value against a single field definition, returning the value
/// in stored form (dates normalized to canonical RFC 3339 UTC).
fn normalize_and_validate(name: &str, value: &Value, def: &FieldDefinition) -> Result<Value> {
    validate_field_value(name, value, def)?;
    if def.kind == FieldKind::Date {
        return Ok(Value::String(normalize_instant(name, value)?));
    }
    Ok(value.clone())
}

/// Checks one value against one field definition.
///
/// Enforces, in order: the type, `enum` membership, numeric bounds, length
/// bounds, and the named validator.
pub fn validate_field_value(name: &str, value: &Value, def: &FieldDefinition) -> Result<()> {
    let type_ok = match def.kind {
        FieldKind::String => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Date => value.as_str().and_then(document::parse_instant).is_some(),
        FieldKind::Object => value.is_object(),
        FieldKind::Array => value.is_array(),
        FieldKind::Bytes => value.as_str().is_some_and(|s| BASE64.decode(s).is_ok()),
    };
    if !type_ok {
        return Err(VaultError::validation(format!(
            "Field {name} must be of type {}",
            def.kind.name()
        )));
    }

    if let Some(allowed) = &def.enum_values {
        if !allowed.contains(value) {
            return Err(VaultError::validation(format!(
                "Field {name} must be one of the allowed values"
            )));
        }
    }

    if def.kind == FieldKind::Number {
        // serde_json numbers are always finite
        let n = value.as_f64().unwrap_or_default();
        if let Some(min) = def.min {
            if n < min {
                return Err(VaultError::validation(format!(
                    "Field {name} must be at least {min}"
                )));
            }
        }
        if let Some(max) = def.max {
            if n > max {
                return Err(VaultError::validation(format!(
                    "Field {name} must be at most {max}"
                )));
            }
        }
    }

    if matches!(def.kind, FieldKind::String | FieldKind::Array) {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(a) => a.len(),
            _ => 0,
        };
        if let Some(min) = def.min_length {
            if len < min {
                return Err(VaultError::validation(format!(
                    "Field {name} must have length at least {min}"
                )));
            }
        }
        if let Some(max) = def.max_length {
            if len > max {
                return Err(VaultError::validation(format!(
                    "Field {name} must have length at most {max}"
                )));
            }
        }
    }

    if let Some(validator) = &def.validate {
        match registry::run_validator(validator, value) {
            Some(Ok(())) => {},
            Some(Err(reason)) => {
                return Err(VaultError::validation(format!("Field {name} {reason}")));
            },
            None => {
                return Err(VaultError::validation(format!(
                    "Field {name} references unknown validator {validator}"
                )));
            },
        }
    }

    Ok(())
}
