use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use tracing::trace;

use crate::{
    encrypt::{decrypt, encrypt, EncryptedPayload, IV_LEN},
    error::CryptoError,
};

/// Encrypts a single JSON value for storage in an `encrypted` schema field.
///
/// The value is JSON-serialized, encrypted with AES-256-CBC under a fresh IV,
/// and rendered as `base64(iv || ciphertext)` so it fits in a JSON string.
pub fn encrypt_field(value: &Value, key: &[u8; 32]) -> Result<String, CryptoError> {
    trace!("Encrypting field value");
    let plaintext = serde_json::to_vec(value)?;
    let payload = encrypt(&plaintext, key)?;

    let mut combined = Vec::with_capacity(IV_LEN + payload.ciphertext.len());
    combined.extend_from_slice(&payload.iv);
    combined.extend_from_slice(&payload.ciphertext);
    Ok(BASE64.encode(combined))
}

/// Decrypts a field value produced by [`encrypt_field`] back into its JSON form.
///
/// Any structural mismatch (bad base64, payload shorter than an IV, bad UTF-8
/// or JSON after decryption) surfaces as a [`CryptoError`].
pub fn decrypt_field(encoded: &str, key: &[u8; 32]) -> Result<Value, CryptoError> {
    trace!("Decrypting field value");
    let combined = BASE64
        .decode(encoded)
        .map_err(|_| CryptoError::MalformedField)?;
    if combined.len() <= IV_LEN {
        return Err(CryptoError::MalformedField);
    }
    let (iv_bytes, ciphertext) = combined.split_at(IV_LEN);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(iv_bytes);

    let payload = EncryptedPayload {
        iv,
        ciphertext: ciphertext.to_vec(),
    };
    let plaintext = decrypt(&payload, key)?;
    serde_json::from_slice(&plaintext).map_err(|_| CryptoError::MalformedField)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_field_roundtrip() {
        let key = [3u8; 32];
        for value in [
            json!("123-45-6789"),
            json!(42.5),
            json!({"nested": ["a", "b"]}),
            json!(null),
        ] {
            let encoded = encrypt_field(&value, &key).unwrap();
            assert_ne!(encoded, value.to_string());
            let decoded = decrypt_field(&encoded, &key).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_field_plaintext_not_visible() {
        let key = [3u8; 32];
        let encoded = encrypt_field(&json!("123-45-6789"), &key).unwrap();
        assert!(!encoded.contains("123-45-6789"));
    }

    #[test]
    fn test_field_wrong_key() {
        let encoded = encrypt_field(&json!("secret"), &[1u8; 32]).unwrap();
        match decrypt_field(&encoded, &[2u8; 32]) {
            Err(_) => {},
            Ok(value) => assert_ne!(value, json!("secret")),
        }
    }

    #[test]
    fn test_field_malformed_inputs() {
        let key = [3u8; 32];
        // Not base64 at all
        assert!(matches!(
            decrypt_field("!!! not base64 !!!", &key),
            Err(CryptoError::MalformedField)
        ));
        // Too short to contain an IV
        let short = BASE64.encode([0u8; 8]);
        assert!(matches!(
            decrypt_field(&short, &key),
            Err(CryptoError::MalformedField)
        ));
    }
}
