use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use tracing::trace;

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of the AES-CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// Ciphertext together with the initialization vector it was produced under.
///
/// The IV is not secret; it is stored alongside the ciphertext in the file
/// container and in encrypted field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// The initialization vector used for this encryption.
    pub iv:         [u8; IV_LEN],
    /// The AES-256-CBC ciphertext, PKCS#7 padded.
    pub ciphertext: Vec<u8>,
}

/// Encrypts plaintext bytes with AES-256-CBC and PKCS#7 padding.
///
/// A fresh random 16-byte IV is generated per call, so encrypting the same
/// plaintext twice yields different payloads.
///
/// Design choice: CBC rather than an AEAD mode because the file container
/// stores an explicit SHA-256 digest of the ciphertext; integrity is checked
/// before decryption ever runs.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<EncryptedPayload, CryptoError> {
    trace!("Encrypting payload, plaintext length: {}", plaintext.len());
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let ciphertext = Aes256CbcEnc::new(key.into(), (&iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok(EncryptedPayload {
        iv,
        ciphertext,
    })
}

/// Decrypts an [`EncryptedPayload`] produced by [`encrypt`].
///
/// Fails with [`CryptoError::Decryption`] when the key is wrong or the
/// ciphertext is corrupt; the two cases are indistinguishable on purpose.
pub fn decrypt(payload: &EncryptedPayload, key: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    trace!(
        "Decrypting payload, ciphertext length: {}",
        payload.ciphertext.len()
    );
    Aes256CbcDec::new(key.into(), (&payload.iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&payload.ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = [7u8; 32];
        let data = b"Hello, world!";
        let payload = encrypt(data, &key).unwrap();
        assert_ne!(payload.ciphertext, data.to_vec());
        let decrypted = decrypt(&payload, &key).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let key = [7u8; 32];
        let a = encrypt(b"same input", &key).unwrap();
        let b = encrypt(b"same input", &key).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        // Padding validation under a wrong key can succeed by chance, but it
        // can never reproduce the plaintext.
        let payload = encrypt(b"secret", &[1u8; 32]).unwrap();
        match decrypt(&payload, &[2u8; 32]) {
            Err(CryptoError::Decryption) => {},
            Err(other) => panic!("unexpected error: {other}"),
            Ok(plaintext) => assert_ne!(plaintext, b"secret"),
        }
    }

    #[test]
    fn test_corrupt_ciphertext_fails() {
        let key = [9u8; 32];
        let mut payload = encrypt(b"some plaintext that spans blocks....", &key).unwrap();
        let last = payload.ciphertext.len() - 1;
        payload.ciphertext[last] ^= 0xFF;
        assert!(decrypt(&payload, &key).is_err());
    }
}
