//! Secondary indexes: derived mappings from stringified field values to
//! document id sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::{document, query::resolve_path};

/// Reserved index key for explicit `null` values.
pub const NULL_KEY: &str = "\u{0}null";
/// Reserved index key for missing values (only used by non-sparse indexes).
pub const UNDEFINED_KEY: &str = "\u{0}undefined";

/// Canonical index key for a field value.
///
/// Strings index under their own content; numbers under a canonical decimal
/// rendering (so `2` and `2.0` share a key); everything else under its JSON
/// text. Null maps to a reserved key distinct from the missing-value key.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::Null => NULL_KEY.to_owned(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => i.to_string(),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
                    format!("{}", f as i64)
                },
                _ => n.to_string(),
            }
        },
        other => other.to_string(),
    }
}

/// A secondary index over one field of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// The indexed field path.
    pub field:   String,
    /// Reject two documents sharing a key.
    #[serde(default)]
    pub unique:  bool,
    /// Skip documents where the field is undefined.
    #[serde(default)]
    pub sparse:  bool,
    /// Stringified field value to the set of document ids holding it.
    pub entries: BTreeMap<String, BTreeSet<String>>,
}

impl Index {
    /// Creates an empty index over `field`.
    pub fn new(field: impl Into<String>, unique: bool, sparse: bool) -> Self {
        Self {
            field: field.into(),
            unique,
            sparse,
            entries: BTreeMap::new(),
        }
    }

    /// The index map key for a `(collection, field)` pair.
    pub fn map_key(collection: &str, field: &str) -> String { format!("{collection}.{field}") }

    /// The entry key this index assigns to a document, or `None` when the
    /// index is sparse and the field is undefined.
    pub fn key_for(&self, doc: &Value) -> Option<String> {
        match resolve_path(doc, &self.field) {
            Some(value) => Some(value_key(value)),
            None if self.sparse => None,
            None => Some(UNDEFINED_KEY.to_owned()),
        }
    }

    /// Returns true if adding `key` would collide under the unique flag,
    /// ignoring `excluding` (the document being rewritten).
    ///
    /// The reserved undefined key never collides: absent values do not
    /// participate in uniqueness. Explicit null is a concrete value and
    /// collides like any other.
    pub fn would_conflict(&self, key: &str, excluding: Option<&str>) -> bool {
        if !self.unique || key == UNDEFINED_KEY {
            return false;
        }
        self.entries
            .get(key)
            .is_some_and(|ids| ids.iter().any(|id| Some(id.as_str()) != excluding))
    }

    /// Adds a document id under a key.
    pub fn insert_entry(&mut self, key: String, id: String) {
        trace!("Index {}: adding id {} under key", self.field, id);
        self.entries.entry(key).or_default().insert(id);
    }

    /// Removes a document id from a key, dropping the key when it empties.
    pub fn remove_entry(&mut self, key: &str, id: &str) {
        if let Some(ids) = self.entries.get_mut(key) {
            ids.remove(id);
            if ids.is_empty() {
                self.entries.remove(key);
            }
        }
    }

    /// The ids currently stored under a key.
    pub fn ids_for(&self, key: &str) -> Option<&BTreeSet<String>> { self.entries.get(key) }

    /// Rebuilds the index contents from a document set.
    ///
    /// Returns the first conflicting key when `unique` is set and two
    /// documents share a value.
    pub fn build<'a>(&mut self, documents: impl Iterator<Item = &'a Value>) -> Result<(), String> {
        self.entries.clear();
        for doc in documents {
            let Some(id) = document::document_id(doc) else {
                continue;
            };
            if let Some(key) = self.key_for(doc) {
                if self.would_conflict(&key, None) {
                    return Err(key);
                }
                self.insert_entry(key, id.to_owned());
            }
        }
        Ok(())
    }
}
