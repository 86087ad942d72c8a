use serde_json::json;
use tracing::{debug, trace};

use super::{CollectionOptions, CollectionStats, Database, DatabaseStats};
use crate::{
    collection::{Collection, IndexMeta},
    error::{Result, VaultError},
    index::Index,
    schema::Schema,
};

impl Database {
    /// Creates a collection, its schema, and any requested indexes.
    ///
    /// Indexes come from two places: schema fields flagged `index` (with
    /// `unique` carried over from the field definition) and the explicit
    /// `indexes` list in the options.
    ///
    /// # Errors
    ///
    /// * [`VaultError::Collection`]: empty name, or the name already exists.
    /// * [`VaultError::Schema`]: the schema definition is malformed.
    pub async fn create_collection(&self, name: &str, options: CollectionOptions) -> Result<()> {
        trace!("Creating collection '{}'", name);
        if name.is_empty() {
            return Err(VaultError::collection("Collection name must not be empty"));
        }

        let schema = match &options.schema {
            Some(definition) => Schema::parse(definition)?,
            None => Schema::empty(),
        };

        let mut state = self.state.write().await;
        if state.collections.contains_key(name) {
            return Err(VaultError::collection(format!(
                "Collection '{name}' already exists"
            )));
        }

        let mut collection = Collection::new(schema);

        // Schema-requested indexes carry the field's unique flag; explicitly
        // listed fields get plain indexes.
        let mut requested: Vec<(String, IndexMeta)> = collection
            .schema
            .fields()
            .filter(|(_, def)| def.index)
            .map(|(field, def)| {
                (field.clone(), IndexMeta {
                    unique: def.unique,
                    sparse: false,
                })
            })
            .collect();
        for field in &options.indexes {
            if !requested.iter().any(|(f, _)| f == field) {
                requested.push((field.clone(), IndexMeta::default()));
            }
        }

        for (field, meta) in requested {
            state.indexes.insert(
                Index::map_key(name, &field),
                Index::new(field.clone(), meta.unique, meta.sparse),
            );
            collection.indexes.insert(field, meta);
        }

        state.collections.insert(name.to_owned(), collection);
        state
            .operation_log
            .record("createCollection", json!({"name": name}));
        debug!("Collection '{}' created", name);
        self.persist(&mut state).await
    }

    /// Drops a collection, its documents, and every index under it.
    ///
    /// # Errors
    ///
    /// [`VaultError::Collection`] when the collection does not exist.
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        trace!("Dropping collection '{}'", name);
        let mut state = self.state.write().await;
        if state.collections.remove(name).is_none() {
            return Err(VaultError::collection(format!(
                "Collection '{name}' does not exist"
            )));
        }

        let prefix = format!("{name}.");
        state.indexes.retain(|key, _| !key.starts_with(&prefix));
        state
            .operation_log
            .record("dropCollection", json!({"name": name}));
        debug!("Collection '{}' dropped", name);
        self.persist(&mut state).await
    }

    /// Names of all collections, sorted.
    pub async fn list_collections(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.collections.keys().cloned().collect()
    }

    /// Returns true if a collection with this name exists.
    pub async fn has_collection(&self, name: &str) -> bool {
        let state = self.state.read().await;
        state.collections.contains_key(name)
    }

    /// Document count, index count, and schema snapshot for one collection.
    pub async fn get_stats(&self, name: &str) -> Result<CollectionStats> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{name}' does not exist")))?;
        Ok(CollectionStats {
            document_count: collection.len(),
            index_count:    collection.indexes.len(),
            schema:         collection.schema.clone(),
        })
    }

    /// Whole-database statistics.
    pub async fn stats(&self) -> DatabaseStats {
        let state = self.state.read().await;
        DatabaseStats {
            collection_count: state.collections.len(),
            document_count:   state.collections.values().map(Collection::len).sum(),
            index_count:      state.indexes.len(),
            operation_count:  state.operation_log.len(),
        }
    }
}
