//! Shared application state injected into every Axum handler.

use envelope_codec::EnvelopeCodec;

/// Application state shared across all request handlers.
///
/// The codec holds its key behind an `Arc`, so cloning the state per request
/// copies no key material.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Codec holding the process-wide key.
    pub codec: EnvelopeCodec,
}

impl AppState {
    /// Create a new [`AppState`] around `codec`.
    pub fn new(codec: EnvelopeCodec) -> Self {
        Self { codec }
    }
}

impl Default for AppState {
    /// Creates an [`AppState`] without a key, suitable for tests.
    fn default() -> Self {
        Self::new(EnvelopeCodec::new(None))
    }
}
