//! The database engine: the public operation surface over collections,
//! documents, and indexes.

mod collections;
mod documents;
mod indexes;
mod maintenance;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{
    codec::{CodecConfig, DbImage, FileCodec, OpenOutcome, SaveQueue},
    document,
    error::{Result, VaultError},
    schema::Schema,
};

/// Options for [`Database::create_collection`].
#[derive(Debug, Clone, Default)]
pub struct CollectionOptions {
    /// Schema definition; `None` means an empty schema.
    pub schema:  Option<Value>,
    /// Extra fields to index beyond those the schema flags with `index`.
    pub indexes: Vec<String>,
}

/// Options for [`Database::create_index`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOptions {
    /// Reject two documents sharing a value for the indexed field.
    pub unique: bool,
    /// Skip documents where the field is undefined.
    pub sparse: bool,
}

/// Options for [`Database::update`].
#[derive(Debug, Clone, Copy)]
pub struct UpdateOptions {
    /// Update every match (`true`, the default) or only the first.
    pub multi: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            multi: true,
        }
    }
}

/// Options for [`Database::delete`].
#[derive(Debug, Clone, Copy)]
pub struct DeleteOptions {
    /// Delete every match (`true`, the default) or only the first.
    pub multi: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            multi: true,
        }
    }
}

/// Counts returned by [`Database::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents matched by the filter.
    pub matched_count:  usize,
    /// Documents whose stored content actually changed.
    pub modified_count: usize,
}

/// Count returned by [`Database::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    /// Documents removed.
    pub deleted_count: usize,
}

/// Per-collection statistics from [`Database::get_stats`].
#[derive(Debug, Clone)]
pub struct CollectionStats {
    /// Live document count.
    pub document_count: usize,
    /// Number of secondary indexes.
    pub index_count:    usize,
    /// Snapshot of the collection's schema.
    pub schema:         Schema,
}

/// Whole-database statistics from [`Database::stats`].
#[derive(Debug, Clone, Copy)]
pub struct DatabaseStats {
    /// Number of collections.
    pub collection_count: usize,
    /// Total documents across collections.
    pub document_count:   usize,
    /// Total secondary indexes.
    pub index_count:      usize,
    /// Retained operation-log entries.
    pub operation_count:  usize,
}

/// An embedded document database stored in a single encrypted file.
///
/// All state lives in memory and is written as one encrypted image on every
/// mutation; opening the same path with the same passphrase reproduces the
/// state exactly. Mutating operations serialize on an internal write lock
/// and resolve only after their save has been durably written, so a
/// successful result means the file reflects it.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use vaultdb::{CollectionOptions, Database, FindOptions};
///
/// # async fn example() -> vaultdb::Result<()> {
/// let db = Database::open("/var/lib/app/data.vdb", "passphrase").await?;
/// db.create_collection(
///     "users",
///     CollectionOptions {
///         schema: Some(json!({"email": {"type": "string", "required": true, "unique": true}})),
///         ..Default::default()
///     },
/// )
/// .await?;
///
/// let stored = db.insert("users", json!({"email": "a@x.io"})).await?;
/// let found = db
///     .find("users", &json!({"email": "a@x.io"}), FindOptions::new())
///     .await?;
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0]["_id"], stored["_id"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Database {
    pub(crate) state: RwLock<DbImage>,
    pub(crate) codec: Arc<FileCodec>,
    pub(crate) queue: SaveQueue,
}

impl Database {
    /// Opens the database file at `path`, creating it when absent.
    ///
    /// A missing file is initialized with an empty encrypted image before
    /// this returns, so a crash right after creation still leaves a valid
    /// database behind.
    ///
    /// # Errors
    ///
    /// * [`VaultError::Config`]: empty passphrase.
    /// * [`VaultError::Format`] / [`VaultError::Integrity`] /
    ///   [`VaultError::Crypto`]: the file is foreign, tampered with, or the
    ///   passphrase is wrong.
    /// * [`VaultError::Storage`]: underlying I/O failure.
    pub async fn open(path: impl AsRef<Path>, passphrase: &str) -> Result<Self> {
        Self::open_with_config(path, passphrase, CodecConfig::default()).await
    }

    /// [`Database::open`] with explicit codec tuning.
    pub async fn open_with_config(
        path: impl AsRef<Path>,
        passphrase: &str,
        config: CodecConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        trace!("Opening database at {:?}", path);
        if passphrase.is_empty() {
            return Err(VaultError::Config {
                message: "A passphrase is required".to_owned(),
            });
        }

        let (codec, outcome) = FileCodec::open(path, passphrase, config).await?;
        let codec = Arc::new(codec);
        let queue = SaveQueue::start(codec.clone());

        let db = match outcome {
            OpenOutcome::Existing(image) => {
                debug!(
                    "Database opened: {} collections, {} indexes",
                    image.collections.len(),
                    image.indexes.len()
                );
                Self {
                    state: RwLock::new(image),
                    codec,
                    queue,
                }
            },
            OpenOutcome::Created => {
                debug!("Creating new database at {:?}", path);
                let db = Self {
                    state: RwLock::new(DbImage::default()),
                    codec,
                    queue,
                };
                let mut state = db.state.write().await;
                db.persist(&mut state).await?;
                drop(state);
                db
            },
        };
        Ok(db)
    }

    /// The database file path.
    pub fn path(&self) -> PathBuf { self.codec.path().to_path_buf() }

    /// Stamps the header, trims the log, and writes the full image through
    /// the save queue. Callers hold the write lock across the await, so
    /// mutators resolve strictly in submission order.
    pub(crate) async fn persist(&self, state: &mut DbImage) -> Result<()> {
        state.header.modified = document::now_string();
        state.operation_log.trim();
        self.queue.save(state.clone()).await
    }
}
