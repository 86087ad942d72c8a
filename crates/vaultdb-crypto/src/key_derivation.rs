use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use tracing::{debug, trace};

use crate::error::CryptoError;

/// Length of the random salt in bytes.
pub const SALT_LEN: usize = 32;
/// Length of the derived key in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// PBKDF2 iteration count.
///
/// 100,000 iterations of HMAC-SHA256 provides good security in constrained
/// environments where Argon2's memory requirements might be too high, and it
/// is the parameter baked into the version-1 file format.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Derives a 32-byte key from a passphrase, generating a fresh random salt.
///
/// Returns the salt alongside the key so the caller can persist it; the same
/// passphrase and salt always reproduce the same key.
pub fn derive_key(passphrase: &str) -> Result<([u8; SALT_LEN], [u8; KEY_LEN]), CryptoError> {
    trace!("Deriving key from passphrase (generating salt)");
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let key = derive_key_with_salt(passphrase, &salt)?;
    debug!("Key derivation completed successfully");
    Ok((salt, key))
}

/// Derives a 32-byte key from a passphrase and an existing salt.
pub fn derive_key_with_salt(passphrase: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    if salt.is_empty() {
        return Err(CryptoError::KeyDerivation);
    }
    let mut output_key_material = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        &mut output_key_material,
    );
    Ok(output_key_material)
}
