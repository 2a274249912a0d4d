//! Wire types exchanged between callers, the codec, and the decryption gateway.
//!
//! Everything here is serialised as JSON over HTTP.

use serde::{Deserialize, Serialize};

/// Error code the gateway uses when an envelope fails authentication.
pub const AUTHENTICATION_FAILED: &str = "authentication_failed";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Encrypted payload envelope.
///
/// `data` is `base64(ciphertext || tag)` and `iv` is `base64(nonce)`, both
/// using the standard padded alphabet. On the wire the ciphertext field is
/// named `encryptedData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Base64 ciphertext with the 16-byte authentication tag appended.
    #[serde(rename = "encryptedData")]
    pub data: String,
    /// Base64 12-byte nonce.
    pub iv: String,
}

impl Envelope {
    /// Construct an [`Envelope`] from its two base64 parts.
    pub fn new(data: impl Into<String>, iv: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            iv: iv.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Encrypt endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt`.
///
/// `payload` carries an `_encryptFields` annotation naming the fields the
/// gateway must replace with envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Annotated JSON object.
    pub payload: serde_json::Value,
}

/// Successful response body for `POST /encrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    /// The payload with annotated fields replaced by envelopes and the
    /// annotation removed.
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Decrypt endpoint
// ---------------------------------------------------------------------------

/// Successful response body for `POST /decrypt`. The request body is an [`Envelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    /// UTF-8 plaintext; callers re-parse JSON themselves.
    pub plaintext: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether a symmetric key is loaded.
    pub key_ready: bool,
}
