//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::AuthenticationFailed`] → 422
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed: invalid JSON or a missing field.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An envelope failed authentication. Deliberately carries no detail.
    #[error("decryption failed")]
    AuthenticationFailed,

    /// Encryption failed; the payload must not be forwarded.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The key is not configured or the service is otherwise not ready.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::AuthenticationFailed => 422,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code placed in the `code` field of error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::AuthenticationFailed => crate::protocol::AUTHENTICATION_FAILED,
            ServiceError::EncryptionFailure(_) => "encryption_failed",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::AuthenticationFailed.http_status(), 422);
        assert_eq!(
            ServiceError::EncryptionFailure("x".into()).http_status(),
            500
        );
        assert_eq!(ServiceError::Unavailable("x".into()).http_status(), 503);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::AuthenticationFailed.code(), "authentication_failed");
        assert_eq!(ServiceError::Unavailable("x".into()).code(), "service_unavailable");
        assert_eq!(ServiceError::EncryptionFailure("x".into()).code(), "encryption_failed");
    }

    #[test]
    fn authentication_failure_reveals_nothing() {
        assert_eq!(ServiceError::AuthenticationFailed.to_string(), "decryption failed");
    }
}
