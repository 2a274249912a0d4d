//! [`SymmetricKey`]: validated raw AES key bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::KEY_LENS;

/// Errors produced while loading key material.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The configured value is not valid base64.
    #[error("key is not valid base64")]
    InvalidEncoding,

    /// The decoded key has an unsupported length.
    #[error("key has invalid length: expected 16, 24 or 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Raw AES key bytes of a supported length.
///
/// The buffer is zeroed on drop.
pub struct SymmetricKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidLength`] unless `bytes` is 16, 24 or 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if !KEY_LENS.contains(&bytes.len()) {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Decode a standard-alphabet base64 string into a key.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidEncoding`] for malformed base64 and
    /// [`KeyError::InvalidLength`] for an unsupported decoded length.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let decoded = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| KeyError::InvalidEncoding)?,
        );
        Self::from_bytes(&decoded)
    }

    /// Key size in bits (128, 192 or 256).
    pub fn bits(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Non-secret identifier: hex of the first 8 bytes of `SHA-256(key)`.
    ///
    /// Safe to log; used to correlate which key a process loaded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes.as_slice());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("SymmetricKey([REDACTED])")
    }
}
