use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::trace;

use crate::error::CryptoError;

/// Hashes a passphrase with Argon2id into a PHC-format string.
///
/// This helper exists for external admin collaborators that authenticate
/// users against a stored hash; the engine itself never stores passphrases.
/// Argon2id is an adaptive hash, so the work factor is encoded in the output
/// and can be raised without invalidating existing hashes.
pub fn hash_passphrase(passphrase: &str) -> Result<String, CryptoError> {
    trace!("Hashing passphrase");
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|_| CryptoError::PassphraseHash)?;
    Ok(hash.to_string())
}

/// Verifies a passphrase against a PHC-format hash from [`hash_passphrase`].
///
/// A malformed hash string is an error; a well-formed hash that does not
/// match returns `Ok(false)`.
pub fn verify_passphrase(passphrase: &str, hash: &str) -> Result<bool, CryptoError> {
    trace!("Verifying passphrase");
    let parsed = PasswordHash::new(hash).map_err(|_| CryptoError::PassphraseHash)?;
    Ok(Argon2::default()
        .verify_password(passphrase.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_passphrase("correct horse").unwrap();
        assert!(verify_passphrase("correct horse", &hash).unwrap());
        assert!(!verify_passphrase("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_passphrase("pw").unwrap();
        let b = hash_passphrase("pw").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash() {
        assert!(verify_passphrase("pw", "not-a-phc-string").is_err());
    }
}
