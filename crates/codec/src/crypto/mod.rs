//! AES-GCM primitives and nonce generation.
//!
//! This module is free of HTTP and configuration concerns. It provides the
//! low-level seal/open operations used by [`crate::codec::EnvelopeCodec`].
//!
//! # Ciphertext layout
//!
//! ```text
//! ciphertext || tag(16)
//! ```
//!
//! The 12-byte nonce travels separately in the envelope's `iv` field.

pub mod cipher;
pub mod nonce;

pub use cipher::{CipherError, KEY_LENS, NONCE_LEN, TAG_LEN};
pub use nonce::{EntropyError, NonceSource, OsNonceSource};
