//! # VaultDB Crypto
//!
//! Cryptographic primitives for the VaultDB encrypted document database.
//! This crate provides passphrase key derivation, symmetric encryption,
//! integrity digests, and per-field encryption with a focus on a small,
//! hard-to-misuse surface.
//!
//! ## Design Principles
//!
//! - **RustCrypto Only**: All primitives come from audited rustcrypto crates
//!   (`pbkdf2`, `sha2`, `aes`, `cbc`, `argon2`).
//! - **Unified Error Handling**: A single [`CryptoError`] enum whose messages
//!   never leak key material or plaintext.
//! - **External Integrity**: Encryption is AES-256-CBC; integrity comes from
//!   the SHA-256 ciphertext digest stored in the file container and verified
//!   before any decryption is attempted.
//!
//! ## Usage
//!
//! ```rust
//! use vaultdb_crypto::{derive_key, derive_key_with_salt, encrypt, decrypt};
//!
//! let (salt, key) = derive_key("my passphrase").unwrap();
//! let payload = encrypt(b"plaintext", &key).unwrap();
//! let roundtrip = decrypt(&payload, &key).unwrap();
//! assert_eq!(roundtrip, b"plaintext");
//!
//! // The salt is persisted so the key can be re-derived on open.
//! let same_key = derive_key_with_salt("my passphrase", &salt).unwrap();
//! assert_eq!(key, same_key);
//! ```

pub mod digest;
pub mod encrypt;
pub mod error;
pub mod field;
pub mod key_derivation;
pub mod passphrase;

pub use digest::{digest, verify_digest};
pub use encrypt::{decrypt, encrypt, EncryptedPayload, IV_LEN};
pub use error::CryptoError;
pub use field::{decrypt_field, encrypt_field};
pub use key_derivation::{derive_key, derive_key_with_salt, KEY_LEN, PBKDF2_ITERATIONS, SALT_LEN};
pub use passphrase::{hash_passphrase, verify_passphrase};
