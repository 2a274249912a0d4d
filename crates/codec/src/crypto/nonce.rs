//! Per-message nonce generation.

use thiserror::Error;

use super::NONCE_LEN;

/// Failure to obtain a nonce.
///
/// The two variants are classified where the entropy source is invoked,
/// not from error text.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EntropyError {
    /// The secure random source cannot supply entropy in this environment.
    #[error("secure random source unavailable")]
    Unavailable,

    /// The source answered, but its output fails the sanity check. This points
    /// at something interposed between the codec and the OS generator.
    #[error("secure random source returned implausible output")]
    Compromised,
}

/// A source of fresh 96-bit nonces.
pub trait NonceSource: Send + Sync {
    /// Fill `nonce` with fresh random bytes.
    fn fill(&self, nonce: &mut [u8; NONCE_LEN]) -> Result<(), EntropyError>;
}

/// Nonce source backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsNonceSource;

impl NonceSource for OsNonceSource {
    fn fill(&self, nonce: &mut [u8; NONCE_LEN]) -> Result<(), EntropyError> {
        getrandom::getrandom(nonce).map_err(|_| EntropyError::Unavailable)?;
        // 2^-96 for a healthy generator.
        if nonce.iter().all(|&b| b == 0) {
            return Err(EntropyError::Compromised);
        }
        Ok(())
    }
}
