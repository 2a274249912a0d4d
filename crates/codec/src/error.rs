//! Structured failures returned by the codec.
//!
//! Expected failure modes (no key, no entropy) are values, not panics, so
//! callers can decide what to show the user. Whatever the variant, a caller
//! that fails to encrypt must not submit the plaintext.

use thiserror::Error;

use crate::crypto::{CipherError, EntropyError};

/// Failure of [`crate::codec::EnvelopeCodec::encrypt`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EncryptError {
    /// No symmetric key is configured.
    #[error("no encryption key configured")]
    Configuration,

    /// The secure random source or cipher primitive is unavailable here.
    #[error("cryptographic primitives unavailable in this environment")]
    Environment,

    /// The plaintext could not be serialised to JSON.
    #[error("payload could not be serialised")]
    Serialization,

    /// The sensitive-field annotation is malformed or names a field the
    /// payload does not have.
    #[error("sensitive field annotation is invalid")]
    InvalidAnnotation,

    /// The primitive failed while encrypting.
    #[error("encryption failed")]
    Encryption {
        /// Set when the failure originates from something interposed between
        /// the codec and the platform primitive.
        interference_suspected: bool,
    },
}

impl EncryptError {
    /// Whether the failure points at third-party interference with the runtime.
    pub fn interference_suspected(&self) -> bool {
        matches!(
            self,
            Self::Encryption {
                interference_suspected: true
            }
        )
    }
}

impl From<EntropyError> for EncryptError {
    fn from(err: EntropyError) -> Self {
        match err {
            EntropyError::Unavailable => Self::Environment,
            EntropyError::Compromised => Self::Encryption {
                interference_suspected: true,
            },
        }
    }
}

impl From<CipherError> for EncryptError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::InvalidKeyLength(_) => Self::Environment,
            CipherError::AeadFailure => Self::Encryption {
                interference_suspected: false,
            },
        }
    }
}

/// Failure of [`crate::codec::EnvelopeCodec::decrypt`] and the delegating decryptor.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    /// No symmetric key is configured.
    #[error("no encryption key configured")]
    Configuration,

    /// The cipher primitive is unavailable here.
    #[error("cryptographic primitives unavailable in this environment")]
    Environment,

    /// The envelope did not authenticate. Covers malformed encoding, wrong
    /// nonce length, tag mismatch, wrong key and non-UTF-8 output alike.
    #[error("decryption failed")]
    Authentication,

    /// The remote decryptor refused the request or answered outside the protocol.
    #[error("remote decryption failed")]
    Remote {
        /// Set only when the answer did not come from a conforming decryptor.
        interference_suspected: bool,
    },
}

impl DecryptError {
    /// Whether the failure points at third-party interference with the runtime.
    pub fn interference_suspected(&self) -> bool {
        matches!(
            self,
            Self::Remote {
                interference_suspected: true
            }
        )
    }
}

impl From<CipherError> for DecryptError {
    fn from(err: CipherError) -> Self {
        match err {
            CipherError::InvalidKeyLength(_) => Self::Environment,
            CipherError::AeadFailure => Self::Authentication,
        }
    }
}
