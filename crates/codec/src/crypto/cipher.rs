//! AES-GCM encryption and decryption of raw byte payloads.
//!
//! **Algorithm:** AES-GCM with a 96-bit nonce, 128-bit tag and no associated
//! data. The key size (128, 192 or 256 bits) is selected by the key length.
//!
//! **Never reuse a nonce under the same key.** GCM nonce reuse is catastrophic:
//! it breaks both confidentiality and authentication. Callers obtain a fresh
//! nonce from a [`super::NonceSource`] for every seal.

use aes_gcm::{
    aead::{consts::U12, Aead, KeyInit},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use thiserror::Error;

/// Accepted raw key lengths in bytes (AES-128, AES-192, AES-256).
pub const KEY_LENS: [usize; 3] = [16, 24, 32];

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The key is not 16, 24 or 32 bytes long.
    #[error("invalid key length: {0} bytes")]
    InvalidKeyLength(usize),

    /// AES-GCM encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// A keyed AES-GCM instance of the size implied by the key.
enum Cipher {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl Cipher {
    fn new(key: &[u8]) -> Result<Self, CipherError> {
        let invalid = |_| CipherError::InvalidKeyLength(key.len());
        match key.len() {
            16 => Aes128Gcm::new_from_slice(key).map(Self::Aes128).map_err(invalid),
            24 => Aes192Gcm::new_from_slice(key).map(Self::Aes192).map_err(invalid),
            32 => Aes256Gcm::new_from_slice(key).map(Self::Aes256).map_err(invalid),
            n => Err(CipherError::InvalidKeyLength(n)),
        }
    }

    fn encrypt(&self, nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        let out = match self {
            Self::Aes128(c) => c.encrypt(nonce, plaintext),
            Self::Aes192(c) => c.encrypt(nonce, plaintext),
            Self::Aes256(c) => c.encrypt(nonce, plaintext),
        };
        out.map_err(|_| CipherError::AeadFailure)
    }

    fn decrypt(&self, nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Nonce::<U12>::from_slice(nonce);
        let out = match self {
            Self::Aes128(c) => c.decrypt(nonce, ciphertext),
            Self::Aes192(c) => c.decrypt(nonce, ciphertext),
            Self::Aes256(c) => c.decrypt(nonce, ciphertext),
        };
        out.map_err(|_| CipherError::AeadFailure)
    }
}

/// Encrypt `plaintext` under `key` and `nonce`.
///
/// Returns the ciphertext with the [`TAG_LEN`]-byte tag appended, so the
/// output is always `plaintext.len() + TAG_LEN` bytes.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not one of [`KEY_LENS`].
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(key: &[u8], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    Cipher::new(key)?.encrypt(nonce, plaintext)
}

/// Decrypt and authenticate `ciphertext` (with appended tag).
///
/// Decryption and tag verification are a single step: unauthenticated
/// plaintext is never returned.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not one of [`KEY_LENS`].
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key,
/// wrong nonce, tampered or truncated data).
pub fn open(key: &[u8], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    Cipher::new(key)?.decrypt(nonce, ciphertext)
}
