use std::path::PathBuf;

use thiserror::Error;

/// Vault-wide error type for the document database engine.
///
/// This error type encompasses all possible errors that can occur within
/// the engine, providing structured error handling and meaningful error
/// messages for different failure scenarios. Every public operation surfaces
/// one of these kinds; no error leaves partially applied in-memory state
/// behind.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Invalid open parameters (missing passphrase, unusable path)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },

    /// The file is not a VaultDB container of a supported version
    #[error("Format error: {message}")]
    Format {
        message: String,
    },

    /// The stored ciphertext digest does not match the file contents
    #[error("Integrity check failed: stored digest does not match ciphertext")]
    Integrity,

    /// Cryptographic operation failed (wrong passphrase, corrupt payload, field decryption)
    #[error("Cryptographic operation failed: {source}")]
    Crypto {
        #[from]
        source: vaultdb_crypto::CryptoError,
    },

    /// A document violates a schema rule
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// The schema definition itself is malformed
    #[error("Schema error: {message}")]
    Schema {
        message: String,
    },

    /// Operations on a missing collection, or duplicate collection creation
    #[error("Collection error: {message}")]
    Collection {
        message: String,
    },

    /// Duplicate index creation, duplicate values during a unique build, or
    /// dropping a missing index
    #[error("Index error: {message}")]
    Index {
        message: String,
    },

    /// An insert/update would collide with an existing unique value
    #[error("Unique constraint violation on field '{field}' in collection '{collection}'")]
    UniqueConstraint {
        collection: String,
        field:      String,
    },

    /// Underlying file system error during save/open
    #[error("Storage error at {path:?}: {source}")]
    Storage {
        path:   PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl VaultError {
    /// Shorthand for a [`VaultError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`VaultError::Schema`] with the given message.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Shorthand for a [`VaultError::Collection`] with the given message.
    pub fn collection(message: impl Into<String>) -> Self {
        Self::Collection {
            message: message.into(),
        }
    }

    /// Shorthand for a [`VaultError::Index`] with the given message.
    pub fn index(message: impl Into<String>) -> Self {
        Self::Index {
            message: message.into(),
        }
    }

    /// Wraps an I/O error with the path it occurred at.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, VaultError>;
