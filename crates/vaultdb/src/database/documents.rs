use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{Database, DeleteOptions, DeleteResult, UpdateOptions, UpdateResult};
use crate::{
    codec::FileCodec,
    collection::Collection,
    document,
    error::{Result, VaultError},
    index::Index,
    query::{
        apply_update, matches_query, project_document, sort_documents, values_equal, FindOptions,
    },
};

impl Database {
    /// Validates and inserts a document, returning the stored document with
    /// `_id`, `createdAt`, and `updatedAt` populated (and encrypted fields
    /// in plaintext).
    ///
    /// Constraints are checked before anything mutates: schema validation,
    /// unique fields, then unique indexes. Either the document lands in the
    /// collection and every index, or nothing changes.
    ///
    /// # Errors
    ///
    /// * [`VaultError::Collection`]: unknown collection.
    /// * [`VaultError::Validation`]: schema violation.
    /// * [`VaultError::UniqueConstraint`]: a unique field or index already
    ///   holds the value.
    pub async fn insert(&self, collection_name: &str, document: Value) -> Result<Value> {
        trace!("Inserting into collection '{}'", collection_name);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;

        let validated = collection.schema.validate_document(&document)?;
        let id = document::document_id(&validated)
            .ok_or_else(|| VaultError::validation("Document is missing a string _id"))?
            .to_owned();

        if collection.documents.contains_key(&id) {
            return Err(VaultError::UniqueConstraint {
                collection: collection_name.to_owned(),
                field:      document::FIELD_ID.to_owned(),
            });
        }
        check_unique(
            &self.codec,
            collection_name,
            collection,
            &validated,
            None,
            &collection.documents,
        )?;

        // Stage index insertions; apply only after every check passes.
        let prefix = format!("{collection_name}.");
        let mut staged: Vec<(String, String)> = Vec::new();
        for (map_key, index) in state.indexes.iter() {
            if !map_key.starts_with(&prefix) {
                continue;
            }
            if let Some(entry_key) = index.key_for(&validated) {
                if index.would_conflict(&entry_key, None) {
                    return Err(VaultError::UniqueConstraint {
                        collection: collection_name.to_owned(),
                        field:      index.field.clone(),
                    });
                }
                staged.push((map_key.clone(), entry_key));
            }
        }

        let stored = encrypt_document(&self.codec, collection, &validated)?;

        if let Some(collection) = state.collections.get_mut(collection_name) {
            collection.documents.insert(id.clone(), stored);
        }
        for (map_key, entry_key) in staged {
            if let Some(index) = state.indexes.get_mut(&map_key) {
                index.insert_entry(entry_key, id.clone());
            }
        }
        state
            .operation_log
            .record("insert", json!({"collection": collection_name, "id": id}));

        debug!("Inserted document {} into '{}'", id, collection_name);
        self.persist(&mut guard).await?;
        Ok(validated)
    }

    /// The document with the given id, decrypted, or `None`.
    pub async fn get(&self, collection_name: &str, id: &str) -> Result<Option<Value>> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;
        collection
            .get(id)
            .map(|stored| decrypt_document(&self.codec, collection, stored))
            .transpose()
    }

    /// Finds documents matching a query.
    ///
    /// Matching runs over decrypted copies, results sort by the options'
    /// `(path, direction)` keys with undefined values first, then skip and
    /// limit apply, then projection. Returned documents are deep clones;
    /// mutating them cannot touch engine state.
    pub async fn find(
        &self,
        collection_name: &str,
        query: &Value,
        options: FindOptions,
    ) -> Result<Vec<Value>> {
        trace!("Finding in collection '{}'", collection_name);
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;

        let mut results = Vec::new();
        for stored in collection.documents.values() {
            let doc = decrypt_document(&self.codec, collection, stored)?;
            if matches_query(&doc, query)? {
                results.push(doc);
            }
        }

        sort_documents(&mut results, &options.sort);
        let skip = options.skip.unwrap_or(0);
        let mut results: Vec<Value> = results.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            results.truncate(limit);
        }
        if let Some(fields) = &options.projection {
            results = results
                .iter()
                .map(|doc| project_document(doc, fields))
                .collect();
        }
        Ok(results)
    }

    /// The first document matching a query, or `None`.
    pub async fn find_one(&self, collection_name: &str, query: &Value) -> Result<Option<Value>> {
        let mut results = self
            .find(collection_name, query, FindOptions::new().limit(1))
            .await?;
        Ok(results.pop())
    }

    /// Number of documents matching a query.
    pub async fn count(&self, collection_name: &str, query: &Value) -> Result<usize> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;
        let mut count = 0;
        for stored in collection.documents.values() {
            let doc = decrypt_document(&self.codec, collection, stored)?;
            if matches_query(&doc, query)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Applies update operators to every document matching the filter.
    ///
    /// Each match is updated on a decrypted copy, re-validated, re-encrypted,
    /// and re-checked against unique constraints (excluding its own prior
    /// value). Index entries adjust only where the indexed value changed.
    /// The whole batch applies or none of it does, and a single save
    /// persists the result.
    pub async fn update(
        &self,
        collection_name: &str,
        filter: &Value,
        update: &Value,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        trace!("Updating collection '{}'", collection_name);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;

        let mut matches: Vec<(String, Value)> = Vec::new();
        for (id, stored) in &collection.documents {
            let doc = decrypt_document(&self.codec, collection, stored)?;
            if matches_query(&doc, filter)? {
                matches.push((id.clone(), doc));
            }
        }
        if !options.multi {
            matches.truncate(1);
        }
        let matched_count = matches.len();
        if matched_count == 0 {
            return Ok(UpdateResult {
                matched_count:  0,
                modified_count: 0,
            });
        }

        // Work on clones of the document map and this collection's indexes;
        // swap in only when the whole batch validated.
        let prefix = format!("{collection_name}.");
        let mut new_documents = collection.documents.clone();
        let mut new_indexes: BTreeMap<String, Index> = state
            .indexes
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, index)| (key.clone(), index.clone()))
            .collect();

        let mut modified_count = 0;
        for (id, old_plain) in matches {
            let mut updated = old_plain.clone();
            apply_update(&mut updated, update)?;
            let validated = collection.schema.validate_document(&updated)?;

            check_unique(
                &self.codec,
                collection_name,
                collection,
                &validated,
                Some(&id),
                &new_documents,
            )?;

            let old_stored = new_documents.get(&id).cloned().unwrap_or(Value::Null);
            for index in new_indexes.values_mut() {
                let old_key = index.key_for(&old_stored);
                let new_key = index.key_for(&validated);
                if old_key == new_key {
                    continue;
                }
                if let Some(key) = &new_key {
                    if index.would_conflict(key, Some(&id)) {
                        return Err(VaultError::UniqueConstraint {
                            collection: collection_name.to_owned(),
                            field:      index.field.clone(),
                        });
                    }
                }
                if let Some(key) = old_key {
                    index.remove_entry(&key, &id);
                }
                if let Some(key) = new_key {
                    index.insert_entry(key, id.clone());
                }
            }

            if without_updated_at(&old_plain) != without_updated_at(&validated) {
                modified_count += 1;
            }
            let stored = encrypt_document(&self.codec, collection, &validated)?;
            new_documents.insert(id, stored);
        }

        if let Some(collection) = state.collections.get_mut(collection_name) {
            collection.documents = new_documents;
        }
        for (map_key, index) in new_indexes {
            state.indexes.insert(map_key, index);
        }
        state.operation_log.record(
            "update",
            json!({"collection": collection_name, "matched": matched_count}),
        );

        debug!(
            "Updated {} of {} matched documents in '{}'",
            modified_count, matched_count, collection_name
        );
        self.persist(&mut guard).await?;
        Ok(UpdateResult {
            matched_count,
            modified_count,
        })
    }

    /// Removes every document matching the filter and purges their index
    /// entries.
    pub async fn delete(
        &self,
        collection_name: &str,
        filter: &Value,
        options: DeleteOptions,
    ) -> Result<DeleteResult> {
        trace!("Deleting from collection '{}'", collection_name);
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let collection = state
            .collections
            .get(collection_name)
            .ok_or_else(|| VaultError::collection(format!("Collection '{collection_name}' does not exist")))?;

        let mut matches: Vec<String> = Vec::new();
        for (id, stored) in &collection.documents {
            let doc = decrypt_document(&self.codec, collection, stored)?;
            if matches_query(&doc, filter)? {
                matches.push(id.clone());
            }
        }
        if !options.multi {
            matches.truncate(1);
        }
        if matches.is_empty() {
            return Ok(DeleteResult {
                deleted_count: 0,
            });
        }

        // Compute index removals before touching anything.
        let prefix = format!("{collection_name}.");
        let mut removals: Vec<(String, String, String)> = Vec::new();
        for id in &matches {
            if let Some(stored) = collection.documents.get(id) {
                for (map_key, index) in state.indexes.iter() {
                    if !map_key.starts_with(&prefix) {
                        continue;
                    }
                    if let Some(key) = index.key_for(stored) {
                        removals.push((map_key.clone(), key, id.clone()));
                    }
                }
            }
        }

        if let Some(collection) = state.collections.get_mut(collection_name) {
            for id in &matches {
                collection.documents.remove(id);
            }
        }
        for (map_key, key, id) in removals {
            if let Some(index) = state.indexes.get_mut(&map_key) {
                index.remove_entry(&key, &id);
            }
        }
        let deleted_count = matches.len();
        state.operation_log.record(
            "delete",
            json!({"collection": collection_name, "deleted": deleted_count}),
        );

        debug!("Deleted {} documents from '{}'", deleted_count, collection_name);
        self.persist(&mut guard).await?;
        Ok(DeleteResult {
            deleted_count,
        })
    }
}

/// Decrypts the `encrypted` schema fields of a stored document into a fresh
/// plaintext clone.
pub(super) fn decrypt_document(codec: &FileCodec, collection: &Collection, stored: &Value) -> Result<Value> {
    let mut doc = stored.clone();
    for field in collection.schema.encrypted_fields() {
        let Some(value) = doc.get(field) else {
            continue;
        };
        let encoded = value.as_str().ok_or(VaultError::Crypto {
            source: vaultdb_crypto::CryptoError::MalformedField,
        })?;
        let plain = codec.decrypt_field(encoded)?;
        if let Some(map) = doc.as_object_mut() {
            map.insert(field.clone(), plain);
        }
    }
    Ok(doc)
}

/// Replaces the `encrypted` schema fields of a plaintext document with their
/// ciphertext form for storage.
fn encrypt_document(codec: &FileCodec, collection: &Collection, plain: &Value) -> Result<Value> {
    let mut doc = plain.clone();
    for field in collection.schema.encrypted_fields() {
        let Some(value) = doc.get(field) else {
            continue;
        };
        let encoded = codec.encrypt_field(value)?;
        if let Some(map) = doc.as_object_mut() {
            map.insert(field.clone(), Value::String(encoded));
        }
    }
    Ok(doc)
}

/// Scans for unique-field collisions against a document map.
///
/// Missing values never collide; explicit null is a concrete value and does.
/// Encrypted unique fields are compared by decrypting the stored side on the
/// fly.
fn check_unique(
    codec: &FileCodec,
    collection_name: &str,
    collection: &Collection,
    candidate: &Value,
    exclude_id: Option<&str>,
    documents: &BTreeMap<String, Value>,
) -> Result<()> {
    for field in collection.schema.unique_fields() {
        let Some(candidate_value) = candidate.get(field) else {
            continue;
        };
        let encrypted = collection.schema.field(field).is_some_and(|d| d.encrypted);

        for (id, stored) in documents {
            if Some(id.as_str()) == exclude_id {
                continue;
            }
            let Some(other) = stored.get(field) else {
                continue;
            };
            let collides = if encrypted {
                match other.as_str() {
                    Some(encoded) => values_equal(candidate_value, &codec.decrypt_field(encoded)?),
                    None => false,
                }
            }
            else {
                values_equal(candidate_value, other)
            };
            if collides {
                return Err(VaultError::UniqueConstraint {
                    collection: collection_name.to_owned(),
                    field:      field.clone(),
                });
            }
        }
    }
    Ok(())
}

/// A document with `updatedAt` masked out, for modified-count comparisons.
fn without_updated_at(doc: &Value) -> Value {
    let mut clone = doc.clone();
    if let Some(map) = clone.as_object_mut() {
        map.remove(document::FIELD_UPDATED_AT);
    }
    clone
}
