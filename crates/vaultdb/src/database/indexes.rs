use serde_json::json;
use tracing::{debug, trace};

use super::{Database, IndexOptions};
use crate::{
    collection::IndexMeta,
    error::{Result, VaultError},
    index::Index,
};

impl Database {
    /// Builds a secondary index over a field from the current documents.
    ///
    /// # Errors
    ///
    /// * [`VaultError::Collection`]: unknown collection.
    /// * [`VaultError::Index`]: the index already exists, the field is
    ///   encrypted, or `unique` was requested and duplicate values exist.
    pub async fn create_index(&self, collection_name: &str, field: &str, options: IndexOptions) -> Result<()> {
        trace!("Creating index on '{}.{}'", collection_name, field);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;

        if collection.schema.field(field).is_some_and(|def| def.encrypted) {
            return Err(VaultError::index(format!(
                "Cannot index encrypted field '{field}'"
            )));
        }

        let map_key = Index::map_key(collection_name, field);
        if state.indexes.contains_key(&map_key) {
            return Err(VaultError::index(format!(
                "Index '{map_key}' already exists"
            )));
        }

        let mut index = Index::new(field, options.unique, options.sparse);
        if index.build(collection.documents.values()).is_err() {
            return Err(VaultError::index(format!(
                "Cannot build unique index '{map_key}': duplicate values exist"
            )));
        }

        if let Some(collection) = state.collections.get_mut(collection_name) {
            collection.indexes.insert(
                field.to_owned(),
                IndexMeta {
                    unique: options.unique,
                    sparse: options.sparse,
                },
            );
        }
        state.indexes.insert(map_key.clone(), index);
        state
            .operation_log
            .record("createIndex", json!({"key": map_key}));

        debug!("Index '{}' created", map_key);
        self.persist(&mut guard).await
    }

    /// A snapshot of an index's contents, or `None` when it does not exist.
    ///
    /// Useful for diagnostics; the returned value is a clone, detached from
    /// engine state.
    pub async fn get_index(&self, collection_name: &str, field: &str) -> Option<Index> {
        let state = self.state.read().await;
        state
            .indexes
            .get(&Index::map_key(collection_name, field))
            .cloned()
    }

    /// Drops a secondary index.
    ///
    /// # Errors
    ///
    /// [`VaultError::Index`] when no such index exists.
    pub async fn drop_index(&self, collection_name: &str, field: &str) -> Result<()> {
        trace!("Dropping index on '{}.{}'", collection_name, field);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let map_key = Index::map_key(collection_name, field);
        if state.indexes.remove(&map_key).is_none() {
            return Err(VaultError::index(format!(
                "Index '{map_key}' does not exist"
            )));
        }
        if let Some(collection) = state.collections.get_mut(collection_name) {
            collection.indexes.remove(field);
        }
        state
            .operation_log
            .record("dropIndex", json!({"key": map_key}));

        debug!("Index '{}' dropped", map_key);
        self.persist(&mut guard).await
    }
}
