//! # VaultDB
//!
//! An embedded document database whose entire persistent state lives in a
//! single encrypted file. Open a path with a passphrase, create collections
//! with schemas, and run validated CRUD and query operations with secondary
//! indexes; every mutation is written back as one atomically-replaced,
//! AES-256-CBC-encrypted, integrity-checked image.

/// File codec: the encrypted container and the atomic save protocol.
mod codec;
/// Collection data model.
mod collection;
/// Database engine and public operation surface.
mod database;
/// Document helpers: reserved fields, ids, timestamps.
mod document;
/// Error types.
mod error;
/// Secondary indexes.
mod index;
/// Bounded operation log.
mod oplog;
/// Query and update evaluation.
mod query;
/// Schema definition and document validation.
mod schema;

pub use codec::{CodecConfig, DbImage, ImageHeader, DIGEST_LEN, FORMAT_VERSION, MAGIC};
pub use collection::{Collection, IndexMeta};
pub use database::{
    CollectionOptions, CollectionStats, Database, DatabaseStats, DeleteOptions, DeleteResult,
    IndexOptions, UpdateOptions, UpdateResult,
};
pub use document::{FIELD_CREATED_AT, FIELD_ID, FIELD_UPDATED_AT, RESERVED_FIELDS};
pub use error::{Result, VaultError};
pub use index::Index;
pub use oplog::{LogEntry, OperationLog, MAX_LOG_ENTRIES};
pub use query::{FindOptions, SortDirection};
pub use schema::{FieldDefinition, FieldKind, Schema};
// Re-export the crypto crate for embedding collaborators (passphrase
// hashing for admin surfaces lives there).
pub use vaultdb_crypto;
