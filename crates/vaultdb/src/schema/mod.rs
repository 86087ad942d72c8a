//! Schema definition grammar and document validation.
//!
//! A schema maps field names to [`FieldDefinition`]s. Schemas are plain data:
//! the persisted form carries type names, flags, bounds, and the identifiers
//! of registered default generators and validators, so a database file never
//! contains executable code.

mod registry;
mod validate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{Result, VaultError};

pub use registry::{generate_default, has_validator, is_generator, run_validator};
pub use validate::validate_field_value;

/// The supported field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// UTF-8 string
    String,
    /// Finite integer or double
    Number,
    /// Boolean
    Boolean,
    /// Instant, stored as an RFC 3339 string
    Date,
    /// Nested JSON object
    Object,
    /// JSON array
    Array,
    /// Raw bytes, stored as a base64 string
    Bytes,
}

impl FieldKind {
    /// The name used in schema definitions and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Object => "object",
            Self::Array => "array",
            Self::Bytes => "bytes",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "bytes" => Some(Self::Bytes),
            _ => None,
        }
    }
}

/// Declarative constraints for one document field.
///
/// `default` is either a literal value or a string naming a registered
/// generator (`"now"`, `"uuid"`); `validate` names a registered validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// The field's type.
    #[serde(rename = "type")]
    pub kind:        FieldKind,
    /// The field must be present after default materialization.
    #[serde(default, skip_serializing_if = "is_false")]
    pub required:    bool,
    /// No two live documents may share this field's value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique:      bool,
    /// The stored value is ciphertext of the JSON-encoded plaintext.
    #[serde(default, skip_serializing_if = "is_false")]
    pub encrypted:   bool,
    /// Request a secondary index on this field.
    #[serde(default, skip_serializing_if = "is_false")]
    pub index:       bool,
    /// Literal default, or the name of a registered generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default:     Option<Value>,
    /// Lower numeric bound (type = number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min:         Option<f64>,
    /// Upper numeric bound (type = number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max:         Option<f64>,
    /// Lower length bound (type = string or array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length:  Option<usize>,
    /// Upper length bound (type = string or array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length:  Option<usize>,
    /// Finite set of allowed values.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Name of a registered validator predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate:    Option<String>,
}

fn is_false(value: &bool) -> bool { !*value }

impl FieldDefinition {
    /// A bare definition of the given kind with no constraints.
    pub fn of_kind(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            unique: false,
            encrypted: false,
            index: false,
            default: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            enum_values: None,
            validate: None,
        }
    }

    /// Returns true if `default` names a registered generator rather than a
    /// literal value.
    pub fn default_is_generator(&self) -> bool {
        matches!(&self.default, Some(Value::String(s)) if registry::is_generator(s))
    }

    /// Materializes the default for an absent field, if one is declared.
    pub fn materialize_default(&self) -> Option<Value> {
        match &self.default {
            Some(Value::String(s)) if registry::is_generator(s) => registry::generate_default(s),
            Some(literal) => Some(literal.clone()),
            None => None,
        }
    }
}

/// A validated mapping from field name to definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: BTreeMap<String, FieldDefinition>,
}

impl Schema {
    /// An empty schema: only reserved fields are accepted on documents.
    pub fn empty() -> Self { Self::default() }

    /// Parses and validates a user-supplied schema definition.
    ///
    /// Accepts the shorthand `{"age": "number"}` as well as the full form
    /// `{"age": {"type": "number", "min": 0}}`. Unknown keys inside a field
    /// definition are ignored for forward compatibility; unknown types,
    /// unknown validator names, and literal defaults that violate the
    /// field's own constraints are rejected with [`VaultError::Schema`].
    pub fn parse(input: &Value) -> Result<Self> {
        trace!("Parsing schema definition");
        let map = input
            .as_object()
            .ok_or_else(|| VaultError::schema("Schema definition must be an object"))?;

        let mut fields = BTreeMap::new();
        for (name, def) in map {
            let definition = match def {
                // Bare type string canonicalizes to {type: ...}
                Value::String(type_name) => {
                    let kind = FieldKind::parse(type_name)
                        .ok_or_else(|| VaultError::schema(format!("Unsupported type '{type_name}' for field '{name}'")))?;
                    FieldDefinition::of_kind(kind)
                },
                Value::Object(_) => {
                    let type_name = def
                        .get("type")
                        .and_then(Value::as_str)
                        .ok_or_else(|| VaultError::schema(format!("Field '{name}' is missing a type")))?;
                    if FieldKind::parse(type_name).is_none() {
                        return Err(VaultError::schema(format!(
                            "Unsupported type '{type_name}' for field '{name}'"
                        )));
                    }
                    serde_json::from_value::<FieldDefinition>(def.clone())
                        .map_err(|e| VaultError::schema(format!("Invalid definition for field '{name}': {e}")))?
                },
                _ => {
                    return Err(VaultError::schema(format!(
                        "Definition for field '{name}' must be a type name or an object"
                    )));
                },
            };

            Self::check_definition(name, &definition)?;
            fields.insert(name.clone(), definition);
        }

        Ok(Self {
            fields,
        })
    }

    fn check_definition(name: &str, def: &FieldDefinition) -> Result<()> {
        if crate::document::is_reserved_field(name) {
            return Err(VaultError::schema(format!(
                "Field name '{name}' is reserved"
            )));
        }
        // An index stores stringified plaintext keys, which would defeat
        // field encryption.
        if def.encrypted && def.index {
            return Err(VaultError::schema(format!(
                "Field '{name}' cannot be both encrypted and indexed"
            )));
        }
        if let Some(validator) = &def.validate {
            if !registry::has_validator(validator) {
                return Err(VaultError::schema(format!(
                    "Unknown validator '{validator}' for field '{name}'"
                )));
            }
        }
        if let (Some(min), Some(max)) = (def.min, def.max) {
            if min > max {
                return Err(VaultError::schema(format!(
                    "Field '{name}' has min greater than max"
                )));
            }
        }
        if let (Some(min), Some(max)) = (def.min_length, def.max_length) {
            if min > max {
                return Err(VaultError::schema(format!(
                    "Field '{name}' has minLength greater than maxLength"
                )));
            }
        }
        // A literal default must satisfy the field's own constraints.
        if !def.default_is_generator() {
            if let Some(literal) = &def.default {
                validate::validate_field_value(name, literal, def)
                    .map_err(|e| VaultError::schema(format!("Invalid default for field '{name}': {e}")))?;
            }
        }
        Ok(())
    }

    /// Returns the definition for a field, if declared.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> { self.fields.get(name) }

    /// Iterates over `(name, definition)` pairs.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldDefinition)> { self.fields.iter() }

    /// Names of fields flagged `unique`.
    pub fn unique_fields(&self) -> impl Iterator<Item = &String> {
        self.fields.iter().filter(|(_, d)| d.unique).map(|(n, _)| n)
    }

    /// Names of fields flagged `encrypted`.
    pub fn encrypted_fields(&self) -> impl Iterator<Item = &String> {
        self.fields
            .iter()
            .filter(|(_, d)| d.encrypted)
            .map(|(n, _)| n)
    }

    /// Names of fields requesting a secondary index.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &String> {
        self.fields.iter().filter(|(_, d)| d.index).map(|(n, _)| n)
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize { self.fields.len() }

    /// Returns true if no fields are declared.
    pub fn is_empty(&self) -> bool { self.fields.is_empty() }
}
