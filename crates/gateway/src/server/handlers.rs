//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{DecryptResponse, EncryptRequest, EncryptResponse, ErrorResponse, HealthResponse};
use common::{Envelope, ServiceError};
use envelope_codec::{encrypt_marked_fields, DecryptError, EncryptError};
use tracing::{debug, warn};

use super::state::AppState;

/// Render a [`ServiceError`] as its status code and JSON body.
fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}

fn bad_json(rejection: JsonRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return rejection.into_response();
    }
    error_response(ServiceError::BadRequest(rejection.body_text()))
}

/// `POST /encrypt` — replace the annotated fields of a payload with envelopes.
///
/// The payload names its sensitive fields under `_encryptFields`. A malformed
/// annotation is a `400`. On any failure the response carries an error only,
/// never the payload.
pub async fn encrypt(
    State(state): State<AppState>,
    body: Result<Json<EncryptRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_json(rejection),
    };
    if !state.codec.is_configured() {
        return error_response(ServiceError::Unavailable("no encryption key configured".into()));
    }

    let mut payload = req.payload;
    match encrypt_marked_fields(&mut payload, &state.codec) {
        Ok(fields) => {
            debug!(fields, "payload fields encrypted");
            (StatusCode::OK, Json(EncryptResponse { payload })).into_response()
        }
        Err(EncryptError::InvalidAnnotation) => error_response(ServiceError::BadRequest(
            "payload must be an object whose `_encryptFields` lists existing fields".into(),
        )),
        Err(e) => {
            warn!(
                error = %e,
                interference_suspected = e.interference_suspected(),
                "encryption failed"
            );
            error_response(ServiceError::EncryptionFailure("encryption failed".into()))
        }
    }
}

/// `POST /decrypt` — decrypt a wire envelope to its UTF-8 plaintext.
///
/// Every authentication failure yields the same `422 authentication_failed`.
pub async fn decrypt(
    State(state): State<AppState>,
    body: Result<Json<Envelope>, JsonRejection>,
) -> Response {
    let Json(envelope) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_json(rejection),
    };

    match state.codec.decrypt(&envelope) {
        Ok(plaintext) => (StatusCode::OK, Json(DecryptResponse { plaintext })).into_response(),
        Err(DecryptError::Authentication) => error_response(ServiceError::AuthenticationFailed),
        Err(DecryptError::Configuration) => {
            error_response(ServiceError::Unavailable("no encryption key configured".into()))
        }
        Err(e) => {
            warn!(error = %e, "decryption failed");
            error_response(ServiceError::Internal("decryption unavailable".into()))
        }
    }
}

/// `GET /health` — liveness and readiness check.
///
/// Returns `200 OK` when a key is loaded, `503 Service Unavailable` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let key_ready = state.codec.is_configured();

    let (status_code, status_str) = if key_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        key_ready,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::Router;
    use axum_test::TestServer;
    use envelope_codec::{mark_fields_for_remote_encryption, EnvelopeCodec, SymmetricKey};
    use serde_json::json;

    fn keyed_state() -> AppState {
        AppState::new(EnvelopeCodec::new(Some(
            SymmetricKey::from_bytes(&[0x42u8; 32]).unwrap(),
        )))
    }

    fn server(state: AppState) -> TestServer {
        let app = Router::new()
            .route("/encrypt", post(encrypt))
            .route("/decrypt", post(decrypt))
            .route("/health", get(health))
            .with_state(state);
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn health_reports_key_readiness() {
        let resp = server(AppState::default()).get("/health").await;
        assert_eq!(resp.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!resp.json::<HealthResponse>().key_ready);

        let resp = server(keyed_state()).get("/health").await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.json::<HealthResponse>().status, "ok");
    }

    #[tokio::test]
    async fn decrypt_returns_plaintext() {
        let state = keyed_state();
        let envelope = state.codec.encrypt(&json!({"otp": "123456"})).unwrap();
        let resp = server(state).post("/decrypt").json(&envelope).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.json::<DecryptResponse>().plaintext, r#"{"otp":"123456"}"#);
    }

    #[tokio::test]
    async fn decrypt_tampered_is_422() {
        let state = keyed_state();
        let mut envelope = state.codec.encrypt("secret").unwrap();
        envelope.iv = "AAAAAAAAAAAAAAAA".into();
        let resp = server(state).post("/decrypt").json(&envelope).await;
        assert_eq!(resp.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = resp.json::<ErrorResponse>();
        assert_eq!(body.code, "authentication_failed");
        assert_eq!(body.message, "decryption failed");
    }

    #[tokio::test]
    async fn decrypt_without_key_is_503() {
        let resp = server(AppState::default())
            .post("/decrypt")
            .json(&Envelope::new("AAAA", "AAAA"))
            .await;
        assert_eq!(resp.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn decrypt_malformed_body_is_400() {
        let resp = server(keyed_state())
            .post("/decrypt")
            .json(&json!({"data": "x"}))
            .await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<ErrorResponse>().code, "bad_request");
    }

    #[tokio::test]
    async fn encrypt_replaces_marked_fields() {
        let state = keyed_state();
        let codec = state.codec.clone();
        let payload = mark_fields_for_remote_encryption(
            &json!({"email": "a@b.com", "password": "secret123"}),
            &["password"],
        );
        let resp = server(state)
            .post("/encrypt")
            .json(&EncryptRequest { payload })
            .await;
        assert_eq!(resp.status_code(), StatusCode::OK);

        let out = resp.json::<EncryptResponse>().payload;
        assert_eq!(out["email"], "a@b.com");
        assert!(out.get("_encryptFields").is_none());
        let envelope: Envelope = serde_json::from_value(out["password"].clone()).unwrap();
        assert_eq!(codec.decrypt(&envelope).unwrap(), "secret123");
    }

    async fn assert_rejected_without_echo(payload: serde_json::Value) {
        let resp = server(keyed_state())
            .post("/encrypt")
            .json(&EncryptRequest { payload })
            .await;
        assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.json::<ErrorResponse>().code, "bad_request");
        assert!(!resp.text().contains("secret123"));
    }

    #[tokio::test]
    async fn encrypt_rejects_string_annotation() {
        assert_rejected_without_echo(json!({"password": "secret123", "_encryptFields": "password"}))
            .await;
    }

    #[tokio::test]
    async fn encrypt_rejects_misspelled_field() {
        assert_rejected_without_echo(json!({"password": "secret123", "_encryptFields": ["passwrod"]}))
            .await;
    }

    #[tokio::test]
    async fn encrypt_rejects_non_string_entries() {
        assert_rejected_without_echo(json!({"password": "secret123", "_encryptFields": [1, true]}))
            .await;
    }

    #[tokio::test]
    async fn encrypt_rejects_non_object_payload() {
        assert_rejected_without_echo(json!(["secret123"])).await;
    }

    #[tokio::test]
    async fn encrypt_without_key_never_echoes_payload() {
        let payload = json!({"password": "secret123", "_encryptFields": ["password"]});
        let resp = server(AppState::default())
            .post("/encrypt")
            .json(&EncryptRequest { payload })
            .await;
        assert_eq!(resp.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!resp.text().contains("secret123"));
    }
}
