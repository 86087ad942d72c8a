//! The JSON image: the plaintext shape of the whole database, as it exists
//! inside the encrypted container.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{collection::Collection, document, index::Index, oplog::OperationLog};

/// Database header timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageHeader {
    /// When the database was first created, RFC 3339.
    pub created:  String,
    /// When the image was last written, RFC 3339.
    pub modified: String,
}

impl ImageHeader {
    /// A header for a database created now.
    pub fn new() -> Self {
        let now = document::now_string();
        Self {
            created:  now.clone(),
            modified: now,
        }
    }
}

impl Default for ImageHeader {
    fn default() -> Self { Self::new() }
}

/// The complete plaintext database image.
///
/// This is simultaneously the engine's in-memory state and what gets
/// gzipped, encrypted, and written on every save, so the file always decodes
/// to exactly the state that produced the last save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbImage {
    /// Created/modified timestamps.
    pub header:        ImageHeader,
    /// Collection name to collection contents.
    pub collections:   BTreeMap<String, Collection>,
    /// Index map key (`collection.field`) to index contents.
    pub indexes:       BTreeMap<String, Index>,
    /// Bounded audit log.
    #[serde(rename = "operationLog", default)]
    pub operation_log: OperationLog,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{collection::IndexMeta, schema::Schema};

    #[test]
    fn test_image_roundtrip() {
        let mut image = DbImage::default();
        let mut collection = Collection::new(
            Schema::parse(&json!({"email": {"type": "string", "unique": true}})).unwrap(),
        );
        collection
            .documents
            .insert("d1".to_owned(), json!({"_id": "d1", "email": "a@x.io"}));
        collection.indexes.insert(
            "email".to_owned(),
            IndexMeta {
                unique: true,
                sparse: false,
            },
        );
        image.collections.insert("users".to_owned(), collection);

        let mut index = Index::new("email", true, false);
        index.insert_entry("a@x.io".to_owned(), "d1".to_owned());
        image.indexes.insert(Index::map_key("users", "email"), index);
        image.operation_log.record("insert", json!({"collection": "users"}));

        let serialized = serde_json::to_string(&image).unwrap();
        let restored: DbImage = serde_json::from_str(&serialized).unwrap();
        assert_eq!(image, restored);
    }

    #[test]
    fn test_image_json_shape() {
        let image = DbImage::default();
        let value = serde_json::to_value(&image).unwrap();
        assert!(value.get("header").is_some());
        assert!(value.get("collections").is_some());
        assert!(value.get("indexes").is_some());
        // The log serializes under its wire name
        assert!(value.get("operationLog").is_some());
        assert!(value["header"].get("created").is_some());
    }
}
