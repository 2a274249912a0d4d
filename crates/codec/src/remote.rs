//! Remote decryption delegation.
//!
//! When the key should not live in the caller's process, decryption is
//! delegated to the trusted gateway. [`DelegatingDecryptor`] runs the two-step
//! strategy: try the remote decryptor, and only if it is unreachable fall back
//! to the local codec. A remote authentication failure is final.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use common::protocol::{DecryptResponse, ErrorResponse, AUTHENTICATION_FAILED};
use common::Envelope;

use crate::codec::EnvelopeCodec;
use crate::config::CodecConfig;
use crate::error::DecryptError;

/// Errors produced by a remote decryptor.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The decryptor could not be reached or was temporarily unable to answer.
    #[error("remote decryptor unreachable: {0}")]
    Transport(String),

    /// The decryptor rejected the envelope as unauthentic.
    #[error("remote decryptor rejected the envelope")]
    Rejected,

    /// The request was refused with a client-error status (wrong URL, auth
    /// proxy, body too large). Points at misconfiguration, not interference.
    #[error("remote decryptor refused the request: status {0}")]
    Refused(u16),

    /// The answer did not follow the decryption protocol.
    #[error("unexpected answer from remote decryptor: {0}")]
    Protocol(String),
}

/// A service able to decrypt envelopes on the caller's behalf.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteDecryptor: Send + Sync {
    /// Decrypt `envelope`, returning its UTF-8 plaintext.
    async fn decrypt(&self, envelope: &Envelope) -> Result<String, RemoteError>;
}

/// [`RemoteDecryptor`] speaking JSON over HTTP to the decryption gateway.
#[derive(Debug, Clone)]
pub struct HttpRemoteDecryptor {
    client: Client,
    endpoint: String,
}

impl HttpRemoteDecryptor {
    /// Create a decryptor targeting `{base_url}/decrypt`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/decrypt", base_url.trim_end_matches('/')),
        })
    }

    /// Build from configuration. Returns `Ok(None)` if no remote URL is set.
    ///
    /// # Errors
    ///
    /// See [`HttpRemoteDecryptor::new`].
    pub fn from_config(cfg: &CodecConfig) -> Result<Option<Self>, RemoteError> {
        cfg.remote_decrypt_url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_millis(cfg.remote_timeout_ms)))
            .transpose()
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteDecryptor for HttpRemoteDecryptor {
    async fn decrypt(&self, envelope: &Envelope) -> Result<String, RemoteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<DecryptResponse>()
                .await
                .map(|body| body.plaintext)
                .map_err(|e| RemoteError::Protocol(e.to_string()));
        }
        if status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            return Err(RemoteError::Transport(format!("status {status}")));
        }
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return match response.json::<ErrorResponse>().await {
                Ok(err) if err.code == AUTHENTICATION_FAILED => Err(RemoteError::Rejected),
                Ok(err) => Err(RemoteError::Protocol(format!("status {status}, code {}", err.code))),
                Err(_) => Err(RemoteError::Protocol(format!("status {status}"))),
            };
        }
        if status.is_client_error() {
            return Err(RemoteError::Refused(status.as_u16()));
        }
        Err(RemoteError::Protocol(format!("status {status}")))
    }
}

/// Which step of the strategy produced the plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptPath {
    /// The remote decryptor answered.
    Remote,
    /// The remote decryptor was unreachable and the local codec answered.
    LocalFallback,
}

/// Plaintext together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    /// UTF-8 plaintext.
    pub plaintext: String,
    /// Step that produced `plaintext`.
    pub path: DecryptPath,
}

/// Try-remote-then-local decryption strategy.
pub struct DelegatingDecryptor<R> {
    remote: R,
    local: EnvelopeCodec,
}

impl<R: RemoteDecryptor> DelegatingDecryptor<R> {
    /// Combine a remote decryptor with a local fallback codec.
    pub fn new(remote: R, local: EnvelopeCodec) -> Self {
        Self { remote, local }
    }

    /// Decrypt `envelope`, preferring the remote decryptor.
    ///
    /// Falls back to the local codec only on [`RemoteError::Transport`].
    ///
    /// # Errors
    ///
    /// - [`DecryptError::Authentication`] if the remote rejects the envelope,
    ///   or if the local fallback does.
    /// - [`DecryptError::Remote`] if the remote refuses the request, with
    ///   interference suspected only if it answers outside the protocol.
    /// - [`DecryptError::Configuration`] if the fallback runs without a key.
    pub async fn decrypt(&self, envelope: &Envelope) -> Result<Decrypted, DecryptError> {
        match self.remote.decrypt(envelope).await {
            Ok(plaintext) => {
                debug!(path = "remote", "envelope decrypted");
                Ok(Decrypted {
                    plaintext,
                    path: DecryptPath::Remote,
                })
            }
            Err(RemoteError::Rejected) => {
                warn!(path = "remote", "remote decryptor rejected envelope");
                Err(DecryptError::Authentication)
            }
            Err(RemoteError::Refused(status)) => {
                warn!(path = "remote", status, "remote decryptor refused request");
                Err(DecryptError::Remote {
                    interference_suspected: false,
                })
            }
            Err(RemoteError::Protocol(detail)) => {
                warn!(path = "remote", %detail, "remote decryptor answered outside protocol");
                Err(DecryptError::Remote {
                    interference_suspected: true,
                })
            }
            Err(RemoteError::Transport(detail)) => {
                info!(%detail, "remote decryptor unreachable; falling back to local decryption");
                let plaintext = self.local.decrypt(envelope)?;
                debug!(path = "local_fallback", "envelope decrypted");
                Ok(Decrypted {
                    plaintext,
                    path: DecryptPath::LocalFallback,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SymmetricKey;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use serde_json::json;

    fn codec() -> EnvelopeCodec {
        EnvelopeCodec::new(Some(SymmetricKey::from_bytes(&[5u8; 32]).unwrap()))
    }

    #[tokio::test]
    async fn remote_success_uses_remote_path() {
        let mut remote = MockRemoteDecryptor::new();
        remote
            .expect_decrypt()
            .times(1)
            .returning(|_| Ok("from-remote".into()));
        let decryptor = DelegatingDecryptor::new(remote, codec());
        let out = decryptor
            .decrypt(&Envelope::new("AAAA", "AAAA"))
            .await
            .unwrap();
        assert_eq!(out.plaintext, "from-remote");
        assert_eq!(out.path, DecryptPath::Remote);
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_local() {
        let local = codec();
        let envelope = local.encrypt(&json!({"otp": "424242"})).unwrap();
        let mut remote = MockRemoteDecryptor::new();
        remote
            .expect_decrypt()
            .returning(|_| Err(RemoteError::Transport("connection refused".into())));
        let decryptor = DelegatingDecryptor::new(remote, local);
        let out = decryptor.decrypt(&envelope).await.unwrap();
        assert_eq!(out.plaintext, r#"{"otp":"424242"}"#);
        assert_eq!(out.path, DecryptPath::LocalFallback);
    }

    #[tokio::test]
    async fn remote_rejection_never_falls_back() {
        let local = codec();
        // Locally valid, so any fallback would succeed.
        let envelope = local.encrypt("secret").unwrap();
        let mut remote = MockRemoteDecryptor::new();
        remote.expect_decrypt().returning(|_| Err(RemoteError::Rejected));
        let decryptor = DelegatingDecryptor::new(remote, local);
        assert_eq!(
            decryptor.decrypt(&envelope).await,
            Err(DecryptError::Authentication)
        );
    }

    #[tokio::test]
    async fn protocol_violation_flags_interference() {
        let local = codec();
        let envelope = local.encrypt("secret").unwrap();
        let mut remote = MockRemoteDecryptor::new();
        remote
            .expect_decrypt()
            .returning(|_| Err(RemoteError::Protocol("text/html".into())));
        let decryptor = DelegatingDecryptor::new(remote, local);
        let err = decryptor.decrypt(&envelope).await.unwrap_err();
        assert!(err.interference_suspected());
    }

    #[tokio::test]
    async fn refusal_is_not_interference_and_never_falls_back() {
        let local = codec();
        let envelope = local.encrypt("secret").unwrap();
        let mut remote = MockRemoteDecryptor::new();
        remote
            .expect_decrypt()
            .times(1)
            .returning(|_| Err(RemoteError::Refused(404)));
        let decryptor = DelegatingDecryptor::new(remote, local);
        assert_eq!(
            decryptor.decrypt(&envelope).await,
            Err(DecryptError::Remote {
                interference_suspected: false
            })
        );
    }

    #[derive(Clone, Default)]
    struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// Run `decryptor` under a debug-level subscriber and return what it logged.
    async fn logged_decrypt<R: RemoteDecryptor>(
        decryptor: &DelegatingDecryptor<R>,
        envelope: &Envelope,
    ) -> String {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        // `#[tokio::test]` runs on a current-thread runtime, so a thread-local
        // default sees every event of the awaited call.
        let _guard = tracing::subscriber::set_default(subscriber);
        decryptor.decrypt(envelope).await.unwrap();
        capture.text()
    }

    #[tokio::test]
    async fn each_path_logs_its_own_event() {
        let local = codec();
        let envelope = local.encrypt("secret").unwrap();

        let mut remote = MockRemoteDecryptor::new();
        remote.expect_decrypt().returning(|_| Ok("secret".into()));
        let logs = logged_decrypt(&DelegatingDecryptor::new(remote, local.clone()), &envelope).await;
        assert!(logs.contains("path=\"remote\""));
        assert!(!logs.contains("falling back"));

        let mut remote = MockRemoteDecryptor::new();
        remote
            .expect_decrypt()
            .returning(|_| Err(RemoteError::Transport("connection refused".into())));
        let logs = logged_decrypt(&DelegatingDecryptor::new(remote, local), &envelope).await;
        assert!(logs.contains("falling back to local decryption"));
        assert!(logs.contains("path=\"local_fallback\""));
        assert!(!logs.contains("secret"));
    }

    #[tokio::test]
    async fn fallback_without_key_fails_closed() {
        let mut remote = MockRemoteDecryptor::new();
        remote
            .expect_decrypt()
            .returning(|_| Err(RemoteError::Transport("timeout".into())));
        let decryptor = DelegatingDecryptor::new(remote, EnvelopeCodec::new(None));
        assert_eq!(
            decryptor.decrypt(&Envelope::new("AAAA", "AAAA")).await,
            Err(DecryptError::Configuration)
        );
    }

    // -----------------------------------------------------------------------
    // HttpRemoteDecryptor against a local axum server
    // -----------------------------------------------------------------------

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn timeout() -> Duration {
        Duration::from_secs(2)
    }

    #[tokio::test]
    async fn http_success_returns_plaintext() {
        let router = Router::new().route(
            "/decrypt",
            post(|Json(env): Json<Envelope>| async move {
                Json(DecryptResponse {
                    plaintext: format!("iv={}", env.iv),
                })
            }),
        );
        let base = serve(router).await;
        let remote = HttpRemoteDecryptor::new(&format!("{base}/"), timeout()).unwrap();
        assert_eq!(remote.endpoint(), format!("{base}/decrypt"));
        let out = remote.decrypt(&Envelope::new("ZGF0YQ==", "aXY=")).await.unwrap();
        assert_eq!(out, "iv=aXY=");
    }

    #[tokio::test]
    async fn http_422_authentication_failed_is_rejected() {
        let router = Router::new().route(
            "/decrypt",
            post(|| async {
                (
                    AxumStatus::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse::new(AUTHENTICATION_FAILED, "decryption failed")),
                )
            }),
        );
        let remote = HttpRemoteDecryptor::new(&serve(router).await, timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected));
    }

    #[tokio::test]
    async fn http_503_is_transport() {
        let router = Router::new().route(
            "/decrypt",
            post(|| async {
                (
                    AxumStatus::SERVICE_UNAVAILABLE,
                    Json(ErrorResponse::new("service_unavailable", "no key")),
                )
            }),
        );
        let remote = HttpRemoteDecryptor::new(&serve(router).await, timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn http_404_is_refused() {
        // No /decrypt route: a misconfigured base URL.
        let router = Router::new().route("/other", post(|| async { "ok" }));
        let remote = HttpRemoteDecryptor::new(&serve(router).await, timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Refused(404)));
    }

    #[tokio::test]
    async fn http_413_is_refused() {
        let router = Router::new().route(
            "/decrypt",
            post(|| async { (AxumStatus::PAYLOAD_TOO_LARGE, "length limit exceeded") }),
        );
        let remote = HttpRemoteDecryptor::new(&serve(router).await, timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Refused(413)));
    }

    #[tokio::test]
    async fn http_422_with_other_code_is_protocol_error() {
        let router = Router::new().route(
            "/decrypt",
            post(|| async {
                (
                    AxumStatus::UNPROCESSABLE_ENTITY,
                    Json(ErrorResponse::new("something_else", "?")),
                )
            }),
        );
        let remote = HttpRemoteDecryptor::new(&serve(router).await, timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }

    #[tokio::test]
    async fn http_non_protocol_body_is_protocol_error() {
        let router = Router::new().route("/decrypt", post(|| async { "<html>hello</html>" }));
        let remote = HttpRemoteDecryptor::new(&serve(router).await, timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Protocol(_)));
    }

    #[tokio::test]
    async fn http_unreachable_is_transport() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let remote = HttpRemoteDecryptor::new(&format!("http://{addr}"), timeout()).unwrap();
        let err = remote.decrypt(&Envelope::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[test]
    fn from_config_without_url_is_none() {
        assert!(HttpRemoteDecryptor::from_config(&CodecConfig::default())
            .unwrap()
            .is_none());
    }
}
