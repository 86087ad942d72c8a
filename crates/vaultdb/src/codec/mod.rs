//! The file codec: serialization of the encrypted single-file container and
//! the atomic, serialized save protocol.
//!
//! The codec owns the key material. Nothing outside this module can read the
//! derived key; field encryption for the engine goes through the
//! [`FileCodec::encrypt_field`]/[`FileCodec::decrypt_field`] pass-throughs.

mod container;
mod image;
mod queue;

use std::path::{Path, PathBuf};

use async_compression::tokio::bufread::{GzipDecoder, GzipEncoder};
use async_compression::Level;
use serde_json::Value;
use tokio::fs as tokio_fs;
use tokio::io::AsyncReadExt as _;
use tokio::io::AsyncWriteExt as _;
use tracing::{debug, error, trace, warn};

use crate::error::{Result, VaultError};

pub use container::{Container, DIGEST_LEN, FORMAT_VERSION, MAGIC};
pub use image::{DbImage, ImageHeader};
pub use queue::SaveQueue;

/// Codec tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Gzip compression level for the JSON image (0-9).
    pub compression_level: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

/// The file codec bound to one database file and one derived key.
///
/// Created by [`FileCodec::open`]; the salt and key are fixed for the
/// lifetime of the instance. No long-lived file handle is held: each save
/// and backup opens the file for just that operation.
pub struct FileCodec {
    path:   PathBuf,
    salt:   Vec<u8>,
    key:    [u8; 32],
    config: CodecConfig,
}

impl std::fmt::Debug for FileCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCodec")
            .field("path", &self.path)
            .field("key", &"[REDACTED]")
            .field("config", &self.config)
            .finish()
    }
}

/// What [`FileCodec::open`] found on disk.
pub enum OpenOutcome {
    /// The file existed and decoded; the image is the persisted state.
    Existing(DbImage),
    /// No file yet; the caller must perform an initial save.
    Created,
}

impl FileCodec {
    /// Opens (or prepares to create) the database file at `path`.
    ///
    /// When the file exists: parses the container, re-derives the key from
    /// the stored salt, verifies the ciphertext digest, decrypts, gunzips,
    /// and parses the JSON image. When it does not: generates a fresh salt
    /// and derives a key; the caller is expected to save an initial image
    /// before exposing the database.
    ///
    /// # Errors
    ///
    /// * [`VaultError::Format`]: foreign magic or unsupported version.
    /// * [`VaultError::Integrity`]: stored digest does not match the
    ///   ciphertext.
    /// * [`VaultError::Crypto`]: wrong passphrase or corrupt payload.
    /// * [`VaultError::Storage`]: underlying I/O failure.
    pub async fn open(path: &Path, passphrase: &str, config: CodecConfig) -> Result<(Self, OpenOutcome)> {
        trace!("Opening database file at {:?}", path);
        let bytes = match tokio_fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No file at {:?}, preparing fresh database", path);
                let (salt, key) = vaultdb_crypto::derive_key(passphrase)?;
                let codec = Self {
                    path: path.to_path_buf(),
                    salt: salt.to_vec(),
                    key,
                    config,
                };
                return Ok((codec, OpenOutcome::Created));
            },
            Err(e) => {
                error!("Failed to read database file {:?}: {}", path, e);
                return Err(VaultError::storage(path, e));
            },
        };

        let container = Container::parse(&bytes)?;
        let key = vaultdb_crypto::derive_key_with_salt(passphrase, &container.salt)?;

        if !vaultdb_crypto::verify_digest(&container.ciphertext, &container.digest_hex) {
            error!("Ciphertext digest mismatch for {:?}", path);
            return Err(VaultError::Integrity);
        }

        let payload = vaultdb_crypto::EncryptedPayload {
            iv:         container.iv,
            ciphertext: container.ciphertext,
        };
        let compressed = vaultdb_crypto::decrypt(&payload, &key)?;

        // The digest already proved the file intact, so any failure past this
        // point means the key was wrong but the padding happened to validate.
        let json_bytes = decompress(&compressed)
            .await
            .map_err(|_| VaultError::Crypto {
                source: vaultdb_crypto::CryptoError::Decryption,
            })?;
        let image: DbImage = serde_json::from_slice(&json_bytes).map_err(|_| VaultError::Crypto {
            source: vaultdb_crypto::CryptoError::Decryption,
        })?;

        debug!(
            "Opened database at {:?}: {} collections",
            path,
            image.collections.len()
        );
        let codec = Self {
            path: path.to_path_buf(),
            salt: container.salt,
            key,
            config,
        };
        Ok((codec, OpenOutcome::Existing(image)))
    }

    /// The database file path.
    pub fn path(&self) -> &Path { &self.path }

    /// Serializes, compresses, encrypts, and atomically writes the image.
    ///
    /// The container is written to a sibling `<path>.tmp` file, fsynced,
    /// checked non-empty, and renamed over the destination. Any failure
    /// removes the temporary file and surfaces the original error.
    pub async fn save(&self, image: &DbImage) -> Result<()> {
        trace!("Saving database image to {:?}", self.path);
        let json_bytes = serde_json::to_vec(image)?;
        let compressed = compress(&json_bytes, self.config.compression_level)
            .await
            .map_err(|e| VaultError::storage(&self.path, e))?;
        let payload = vaultdb_crypto::encrypt(&compressed, &self.key)?;
        let digest_hex = vaultdb_crypto::digest(&payload.ciphertext);

        let container = Container {
            salt: self.salt.clone(),
            digest_hex,
            iv: payload.iv,
            ciphertext: payload.ciphertext,
        };
        let bytes = container.encode();

        let tmp_path = tmp_path_for(&self.path);
        let result = self.write_and_rename(&tmp_path, &bytes).await;
        if result.is_err() {
            // Best-effort cleanup; the original error is what matters.
            if tokio_fs::remove_file(&tmp_path).await.is_err() {
                warn!("Could not remove temporary file {:?}", tmp_path);
            }
        }
        result
    }

    async fn write_and_rename(&self, tmp_path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = tokio_fs::File::create(tmp_path)
            .await
            .map_err(|e| VaultError::storage(tmp_path, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| VaultError::storage(tmp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| VaultError::storage(tmp_path, e))?;
        drop(file);

        let written = tokio_fs::metadata(tmp_path)
            .await
            .map_err(|e| VaultError::storage(tmp_path, e))?;
        if written.len() == 0 {
            return Err(VaultError::storage(
                tmp_path,
                std::io::Error::new(std::io::ErrorKind::WriteZero, "temporary file is empty"),
            ));
        }

        tokio_fs::rename(tmp_path, &self.path)
            .await
            .map_err(|e| VaultError::storage(&self.path, e))?;
        debug!("Database image saved to {:?} ({} bytes)", self.path, bytes.len());
        Ok(())
    }

    /// Copies the current database file byte-for-byte to `dest`.
    ///
    /// This is a copy of the file, not a re-serialization of in-memory
    /// state, so the backup is exactly what the last save produced.
    pub async fn backup(&self, dest: &Path) -> Result<()> {
        trace!("Backing up {:?} to {:?}", self.path, dest);
        tokio_fs::copy(&self.path, dest)
            .await
            .map_err(|e| VaultError::storage(dest, e))?;
        Ok(())
    }

    /// Encrypts a field value with the database key.
    pub fn encrypt_field(&self, value: &Value) -> Result<String> {
        Ok(vaultdb_crypto::encrypt_field(value, &self.key)?)
    }

    /// Decrypts a field value with the database key.
    pub fn decrypt_field(&self, encoded: &str) -> Result<Value> {
        Ok(vaultdb_crypto::decrypt_field(encoded, &self.key)?)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

async fn compress(bytes: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzipEncoder::with_quality(
        std::io::Cursor::new(bytes),
        Level::Precise(level as i32),
    );
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed).await?;
    Ok(compressed)
}

async fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzipDecoder::new(std::io::Cursor::new(bytes));
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed).await?;
    Ok(decompressed)
}
