use sha2::{Digest, Sha256};
use tracing::trace;

/// Computes the SHA-256 digest of the given bytes as 64 lowercase hex characters.
pub fn digest(bytes: &[u8]) -> String {
    trace!("Computing SHA-256 digest over {} bytes", bytes.len());
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Verifies that `bytes` hash to `expected_hex`.
///
/// The comparison runs in constant time over the full digest length so the
/// check does not leak how many leading characters matched.
pub fn verify_digest(bytes: &[u8], expected_hex: &str) -> bool {
    let actual = digest(bytes);
    let a = actual.as_bytes();
    let b = expected_hex.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
