//! Symmetric key material for the envelope codec.
//!
//! # Lifecycle
//!
//! 1. At startup the base64 key is read from configuration
//!    ([`crate::config::CodecConfig::load_key`]).
//! 2. The decoded bytes are validated and wrapped in a [`SymmetricKey`].
//! 3. The key is handed to [`crate::codec::EnvelopeCodec`], which shares it
//!    read-only behind an `Arc` for the lifetime of the process.
//!
//! # Security invariants
//!
//! - Key bytes are **never** logged, formatted, or included in error messages.
//! - Key bytes are zeroed when the last owner drops them.

pub mod material;

pub use material::{KeyError, SymmetricKey};
