//! A collection: one schema, a document map, and per-collection index
//! metadata. This is both the in-memory shape and the persisted shape inside
//! the JSON image.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// Flags for one secondary index, kept next to the collection so dropping a
/// collection can account for its indexes without consulting the index map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Reject duplicate values.
    #[serde(default)]
    pub unique: bool,
    /// Skip documents where the field is undefined.
    #[serde(default)]
    pub sparse: bool,
}

/// A named set of documents sharing one schema.
///
/// Documents are held in stored form: fields flagged `encrypted` contain
/// ciphertext strings. The engine decrypts copies on the way out and never
/// hands internal references to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// The collection's schema.
    pub schema:    Schema,
    /// Document id to stored document.
    pub documents: BTreeMap<String, Value>,
    /// Indexed field path to its flags.
    #[serde(default)]
    pub indexes:   BTreeMap<String, IndexMeta>,
}

impl Collection {
    /// An empty collection with the given schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            documents: BTreeMap::new(),
            indexes: BTreeMap::new(),
        }
    }

    /// Number of live documents.
    pub fn len(&self) -> usize { self.documents.len() }

    /// Returns true if the collection holds no documents.
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    /// The stored document with the given id, if any.
    pub fn get(&self, id: &str) -> Option<&Value> { self.documents.get(id) }
}
