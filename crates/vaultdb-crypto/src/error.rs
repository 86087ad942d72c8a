/// Comprehensive error type for all vaultdb-crypto operations.
/// This enum wraps all possible errors that can occur during cryptographic operations,
/// providing a unified error handling interface. We use thiserror for ergonomic error
/// handling while ensuring all sensitive information is properly abstracted.
///
/// Security consideration: error messages are designed to not leak key material,
/// plaintext, or internal state. Decryption failures are deliberately opaque so a
/// wrong passphrase and a corrupt payload are indistinguishable to an attacker.
#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    /// Key derivation from a passphrase failed
    #[error("Key derivation error")]
    KeyDerivation,

    /// Errors related to encryption operations
    #[error("Encryption error")]
    Encryption,

    /// Errors related to decryption operations (wrong key, bad padding, corrupt payload)
    #[error("Decryption error")]
    Decryption,

    /// Encrypted field value is structurally malformed (bad base64, missing IV, bad UTF-8)
    #[error("Malformed encrypted field value")]
    MalformedField,

    /// Passphrase hashing or verification failed
    #[error("Passphrase hashing error")]
    PassphraseHash,

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hex decoding errors
    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}
