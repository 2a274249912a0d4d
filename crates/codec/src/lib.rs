//! Payload envelope codec.
//!
//! Turns any JSON-serialisable value into a transport-safe
//! `{ "encryptedData": base64(ciphertext || tag), "iv": base64(nonce) }`
//! envelope with AES-GCM, and back again given the same key.
//!
//! ```no_run
//! use envelope_codec::{CodecConfig, EnvelopeCodec};
//! use serde_json::json;
//!
//! let codec = EnvelopeCodec::from_config(&CodecConfig::from_env()?);
//! let envelope = codec.encrypt(&json!({"email": "a@b.com", "password": "secret123"}))?;
//! let plaintext = codec.decrypt(&envelope)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Invariants
//!
//! - Every encryption draws a fresh 96-bit nonce from the OS CSPRNG.
//! - Decryption never returns unauthenticated plaintext, and all decryption
//!   failures look the same to the caller.
//! - Without a key, every operation fails closed.
//! - Plaintext and key bytes never appear in logs or error messages.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fields;
pub mod key;
pub mod remote;

pub use codec::{serialize_plaintext, EnvelopeCodec};
pub use common::Envelope;
pub use config::CodecConfig;
pub use error::{DecryptError, EncryptError};
pub use fields::{encrypt_marked_fields, mark_fields_for_remote_encryption, SENSITIVE_FIELDS_KEY};
pub use key::{KeyError, SymmetricKey};
pub use remote::{DecryptPath, Decrypted, DelegatingDecryptor, HttpRemoteDecryptor, RemoteDecryptor, RemoteError};
