//! The version-1 on-disk container layout.
//!
//! All integers are little-endian u32. The layout is:
//!
//! ```text
//! [magic "VDB1" (4)][version (4)]
//! [salt len (4)][salt]
//! [digest len (4)][SHA-256 of ciphertext as ASCII hex (64)]
//! [payload len (4)][iv (16)][ciphertext]
//! ```
//!
//! The digest is stored as hex characters, not raw bytes, for compatibility
//! with existing version-1 files.

use crate::error::{Result, VaultError};

/// Magic bytes identifying a VaultDB container.
pub const MAGIC: &[u8; 4] = b"VDB1";
/// Current container format version.
pub const FORMAT_VERSION: u32 = 1;
/// Length of the stored digest in bytes (64 hex characters).
pub const DIGEST_LEN: usize = 64;
/// Length of the AES-CBC initialization vector.
pub const IV_LEN: usize = vaultdb_crypto::IV_LEN;

/// A parsed (or to-be-encoded) container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Key-derivation salt.
    pub salt:       Vec<u8>,
    /// SHA-256 of the ciphertext, 64 lowercase hex characters.
    pub digest_hex: String,
    /// Initialization vector for the payload.
    pub iv:         [u8; IV_LEN],
    /// AES-256-CBC ciphertext of the gzipped JSON image.
    pub ciphertext: Vec<u8>,
}

impl Container {
    /// Serializes the container to its byte layout.
    pub fn encode(&self) -> Vec<u8> {
        let payload_len = IV_LEN + self.ciphertext.len();
        let mut buf = Vec::with_capacity(4 + 4 + 4 + self.salt.len() + 4 + DIGEST_LEN + 4 + payload_len);
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.salt.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.salt);
        buf.extend_from_slice(&(DIGEST_LEN as u32).to_le_bytes());
        buf.extend_from_slice(self.digest_hex.as_bytes());
        buf.extend_from_slice(&(payload_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.iv);
        buf.extend_from_slice(&self.ciphertext);
        buf
    }

    /// Parses a container from file bytes.
    ///
    /// Fails with [`VaultError::Format`] on a foreign magic, an unsupported
    /// version, or a truncated layout.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);

        let magic = reader.take(4)?;
        if magic != MAGIC {
            return Err(VaultError::Format {
                message: "Not a VaultDB file (bad magic)".to_owned(),
            });
        }
        let version = reader.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(VaultError::Format {
                message: format!("Unsupported format version {version}"),
            });
        }

        let salt_len = reader.read_u32()? as usize;
        let salt = reader.take(salt_len)?.to_vec();
        if salt.is_empty() {
            return Err(VaultError::Format {
                message: "Container carries an empty salt".to_owned(),
            });
        }

        let digest_len = reader.read_u32()? as usize;
        if digest_len != DIGEST_LEN {
            return Err(VaultError::Format {
                message: format!("Unexpected digest length {digest_len}"),
            });
        }
        let digest_bytes = reader.take(DIGEST_LEN)?;
        let digest_hex = std::str::from_utf8(digest_bytes)
            .map_err(|_| VaultError::Format {
                message: "Digest is not ASCII hex".to_owned(),
            })?
            .to_owned();

        let payload_len = reader.read_u32()? as usize;
        if payload_len < IV_LEN {
            return Err(VaultError::Format {
                message: "Payload too short to carry an IV".to_owned(),
            });
        }
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(reader.take(IV_LEN)?);
        let ciphertext = reader.take(payload_len - IV_LEN)?.to_vec();

        Ok(Self {
            salt,
            digest_hex,
            iv,
            ciphertext,
        })
    }
}

/// Sequential reader over the container bytes with truncation checks.
struct Reader<'a> {
    bytes:  &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.offset..end];
                self.offset = end;
                Ok(slice)
            },
            None => Err(VaultError::Format {
                message: "Truncated container".to_owned(),
            }),
        }
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        Container {
            salt:       vec![7u8; 32],
            digest_hex: "ab".repeat(32),
            iv:         [9u8; IV_LEN],
            ciphertext: vec![1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let container = sample();
        let bytes = container.encode();
        let parsed = Container::parse(&bytes).unwrap();
        assert_eq!(parsed, container);
    }

    #[test]
    fn test_layout_offsets() {
        let bytes = sample().encode();
        assert_eq!(&bytes[0..4], b"VDB1");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
        // Salt length then salt
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 32);
        assert_eq!(&bytes[12..44], &[7u8; 32]);
        // Digest length is always 64
        assert_eq!(u32::from_le_bytes(bytes[44..48].try_into().unwrap()), 64);
        // Payload length = 16 + ciphertext
        assert_eq!(u32::from_le_bytes(bytes[112..116].try_into().unwrap()), 21);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample().encode();
        bytes[0] = b'X';
        assert!(matches!(
            Container::parse(&bytes),
            Err(VaultError::Format { .. })
        ));
    }

    #[test]
    fn test_bad_version() {
        let mut bytes = sample().encode();
        bytes[4] = 2;
        assert!(matches!(
            Container::parse(&bytes),
            Err(VaultError::Format { .. })
        ));
    }

    #[test]
    fn test_truncated_inputs() {
        let bytes = sample().encode();
        for len in [0, 3, 7, 11, 20, 47, 100, bytes.len() - 1] {
            assert!(
                matches!(Container::parse(&bytes[..len]), Err(VaultError::Format { .. })),
                "length {len} should fail as truncated"
            );
        }
    }
}
