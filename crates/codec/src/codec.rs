//! [`EnvelopeCodec`]: JSON value to `{ data, iv }` envelope and back.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::{debug, warn};

use common::Envelope;

use crate::config::CodecConfig;
use crate::crypto::{cipher, NonceSource, OsNonceSource, NONCE_LEN};
use crate::error::{DecryptError, EncryptError};
use crate::key::SymmetricKey;

/// Render a plaintext value the way the codec encrypts it.
///
/// A JSON string is taken verbatim; any other value becomes compact JSON text.
///
/// # Errors
///
/// Returns [`EncryptError::Serialization`] if `plaintext` cannot be represented as JSON.
pub fn serialize_plaintext<T: Serialize + ?Sized>(plaintext: &T) -> Result<String, EncryptError> {
    match serde_json::to_value(plaintext).map_err(|_| EncryptError::Serialization)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// Stateless AES-GCM envelope codec.
///
/// Holds an optional, immutable key. Without a key every operation fails
/// closed with a configuration error and performs no cryptographic work.
/// Cloning is cheap; clones share the same key.
#[derive(Clone)]
pub struct EnvelopeCodec {
    key: Option<Arc<SymmetricKey>>,
    nonces: Arc<dyn NonceSource>,
}

impl EnvelopeCodec {
    /// Create a codec around `key`, drawing nonces from the OS CSPRNG.
    pub fn new(key: Option<SymmetricKey>) -> Self {
        Self {
            key: key.map(Arc::new),
            nonces: Arc::new(OsNonceSource),
        }
    }

    /// Create a codec from loaded configuration.
    ///
    /// An invalid key is logged and treated as absent, so the codec fails
    /// closed rather than aborting the process.
    pub fn from_config(cfg: &CodecConfig) -> Self {
        let key = match cfg.load_key() {
            Ok(key) => key,
            Err(e) => {
                warn!(error = %e, "ignoring invalid encryption key; codec will fail closed");
                None
            }
        };
        match &key {
            Some(k) => debug!(key_bits = k.bits(), key_fingerprint = %k.fingerprint(), "codec key loaded"),
            None => warn!("no encryption key configured; encrypt and decrypt will fail"),
        }
        Self::new(key)
    }

    /// Replace the nonce source.
    pub fn with_nonce_source(mut self, nonces: impl NonceSource + 'static) -> Self {
        self.nonces = Arc::new(nonces);
        self
    }

    /// Returns `true` if a key is configured.
    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// The loaded key, if any.
    pub fn key(&self) -> Option<&SymmetricKey> {
        self.key.as_deref()
    }

    /// Serialise `plaintext` and encrypt it into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// - [`EncryptError::Configuration`] if no key is configured.
    /// - [`EncryptError::Serialization`] if `plaintext` is not JSON-representable.
    /// - [`EncryptError::Environment`] if no secure randomness is available.
    /// - [`EncryptError::Encryption`] if the primitive fails.
    pub fn encrypt<T: Serialize + ?Sized>(&self, plaintext: &T) -> Result<Envelope, EncryptError> {
        let key = self.key.as_deref().ok_or(EncryptError::Configuration)?;
        let text = serialize_plaintext(plaintext)?;
        self.seal(key, &text)
    }

    /// Encrypt an already-serialised string without re-encoding it.
    ///
    /// # Errors
    ///
    /// As [`EnvelopeCodec::encrypt`], minus serialisation.
    pub fn encrypt_text(&self, text: &str) -> Result<Envelope, EncryptError> {
        let key = self.key.as_deref().ok_or(EncryptError::Configuration)?;
        self.seal(key, text)
    }

    /// Decrypt an [`Envelope`] back to its UTF-8 plaintext.
    ///
    /// # Errors
    ///
    /// - [`DecryptError::Configuration`] if no key is configured.
    /// - [`DecryptError::Authentication`] for any malformed, tampered or
    ///   wrong-key envelope.
    pub fn decrypt(&self, envelope: &Envelope) -> Result<String, DecryptError> {
        self.decrypt_parts(&envelope.data, &envelope.iv)
    }

    /// Decrypt from the two base64 envelope fields.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeCodec::decrypt`].
    pub fn decrypt_parts(&self, data: &str, iv: &str) -> Result<String, DecryptError> {
        let key = self.key.as_deref().ok_or(DecryptError::Configuration)?;
        let result = open(key, data, iv);
        match &result {
            Ok(_) => debug!("envelope decrypted"),
            Err(e) => warn!(error = %e, "envelope rejected"),
        }
        result
    }

    fn seal(&self, key: &SymmetricKey, text: &str) -> Result<Envelope, EncryptError> {
        let mut nonce = [0u8; NONCE_LEN];
        if let Err(e) = self.nonces.fill(&mut nonce) {
            warn!(error = %e, "nonce generation failed");
            return Err(e.into());
        }
        let sealed = cipher::seal(key.as_bytes(), &nonce, text.as_bytes()).map_err(|e| {
            warn!(error = %e, "encryption failed");
            EncryptError::from(e)
        })?;
        debug!(plaintext_len = text.len(), "envelope sealed");
        Ok(Envelope::new(STANDARD.encode(sealed), STANDARD.encode(nonce)))
    }
}

impl std::fmt::Debug for EnvelopeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeCodec")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Decode and authenticate. Every failure collapses into one error.
fn open(key: &SymmetricKey, data: &str, iv: &str) -> Result<String, DecryptError> {
    let nonce: [u8; NONCE_LEN] = STANDARD
        .decode(iv)
        .ok()
        .and_then(|n| n.try_into().ok())
        .ok_or(DecryptError::Authentication)?;
    let ciphertext = STANDARD
        .decode(data)
        .map_err(|_| DecryptError::Authentication)?;
    let plaintext = cipher::open(key.as_bytes(), &nonce, &ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| DecryptError::Authentication)
}
