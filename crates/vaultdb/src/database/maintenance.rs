use std::path::Path;

use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use super::{documents::decrypt_document, CollectionOptions, Database};
use crate::error::{Result, VaultError};

/// Version number of the export tree shape.
const EXPORT_VERSION: u64 = 1;

impl Database {
    /// Exports the whole database as a portable JSON tree.
    ///
    /// Shape: `{version, created, collections: {name: {schema, documents}}}`
    /// with every encrypted field decrypted. This is the canonical backup
    /// form accepted by [`Database::import`].
    pub async fn export(&self) -> Result<Value> {
        trace!("Exporting database");
        let state = self.state.read().await;

        let mut collections = Map::new();
        for (name, collection) in &state.collections {
            let mut documents = Vec::with_capacity(collection.len());
            for stored in collection.documents.values() {
                documents.push(decrypt_document(&self.codec, collection, stored)?);
            }
            collections.insert(
                name.clone(),
                json!({
                    "schema": serde_json::to_value(&collection.schema)?,
                    "documents": documents,
                }),
            );
        }

        Ok(json!({
            "version": EXPORT_VERSION,
            "created": state.header.created,
            "collections": collections,
        }))
    }

    /// Imports an export tree produced by [`Database::export`].
    ///
    /// Missing collections are created with the embedded schemas; every
    /// document goes through the normal insert path, so it is re-validated
    /// and re-encrypted, and keeps its `_id` when one is present.
    pub async fn import(&self, tree: &Value) -> Result<()> {
        trace!("Importing database tree");
        let version = tree.get("version").and_then(Value::as_u64);
        if version != Some(EXPORT_VERSION) {
            return Err(VaultError::validation(format!(
                "Unsupported export tree version {version:?}"
            )));
        }
        let collections = tree
            .get("collections")
            .and_then(Value::as_object)
            .ok_or_else(|| VaultError::validation("Export tree is missing collections"))?;

        for (name, entry) in collections {
            if !self.has_collection(name).await {
                self.create_collection(
                    name,
                    CollectionOptions {
                        schema:  entry.get("schema").cloned(),
                        indexes: Vec::new(),
                    },
                )
                .await?;
            }
            let documents = entry
                .get("documents")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    VaultError::validation(format!("Collection '{name}' in export tree has no documents array"))
                })?;
            for document in documents {
                self.insert(name, document.clone()).await?;
            }
        }
        debug!("Imported {} collections", collections.len());
        Ok(())
    }

    /// Copies the current database file byte-for-byte to `dest`.
    ///
    /// Taking the read lock excludes writers, so the copy can never observe
    /// a half-written save.
    pub async fn backup(&self, dest: impl AsRef<Path>) -> Result<()> {
        let _state = self.state.read().await;
        self.codec.backup(dest.as_ref()).await
    }

    /// Clears the operation log and saves.
    pub async fn compact(&self) -> Result<()> {
        trace!("Compacting operation log");
        let mut state = self.state.write().await;
        state.operation_log.clear();
        self.persist(&mut state).await
    }
}
