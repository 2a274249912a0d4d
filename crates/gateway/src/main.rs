//! `envelope-gateway` — trusted decryption gateway entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise tracing (JSON logs, optional OTLP export).
//! 3. Decode the key and build the [`EnvelopeCodec`].
//! 4. Build the Axum router and serve it, over TLS when configured.

mod config;
mod server;
mod telemetry;

use anyhow::Result;
use tracing::{info, warn};

use config::Config;
use envelope_codec::EnvelopeCodec;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 3. Key + codec
    // -----------------------------------------------------------------------
    let key = cfg.load_key()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        key_bits = key.bits(),
        key_fingerprint = %key.fingerprint(),
        tls = cfg.tls_paths().is_some(),
        "envelope-gateway starting"
    );
    let state = AppState::new(EnvelopeCodec::new(Some(key)));

    // -----------------------------------------------------------------------
    // 4. HTTP(S) server
    // -----------------------------------------------------------------------
    let router = server::router::build(state, cfg.max_body_bytes);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    match cfg.tls_paths() {
        Some((cert_path, key_path)) => {
            let tls = server::tls::load_server_config(cert_path, key_path)?;
            info!(addr = %addr, "listening (https)");
            server::tls::serve(listener, router, tls).await?;
        }
        None => {
            warn!(addr = %addr, "TLS not configured; listening (plain http)");
            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
