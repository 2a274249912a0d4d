//! Codec configuration loaded from the process environment.
//!
//! The key is optional: its absence is a valid state in which every
//! encrypt/decrypt fails closed.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::key::{KeyError, SymmetricKey};

/// Codec configuration.
#[derive(Clone, Deserialize)]
pub struct CodecConfig {
    /// Base64 (standard alphabet) raw AES key of 16, 24 or 32 bytes.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Base URL of the trusted decryption gateway, e.g. `"https://gateway:8443"`.
    #[serde(default)]
    pub remote_decrypt_url: Option<String>,

    /// Timeout (milliseconds) for a remote decryption round-trip.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

fn default_remote_timeout_ms() -> u64 {
    5000
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            remote_decrypt_url: None,
            remote_timeout_ms: default_remote_timeout_ms(),
        }
    }
}

impl CodecConfig {
    /// Load and validate configuration from environment variables
    /// (`ENCRYPTION_KEY`, `REMOTE_DECRYPT_URL`, `REMOTE_TIMEOUT_MS`).
    ///
    /// # Errors
    ///
    /// Returns an error if a present variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    /// Load from any `config` source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or deserialised, or if
    /// validation fails.
    pub fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build codec configuration")?;

        let c: CodecConfig = cfg
            .try_deserialize()
            .context("failed to deserialise codec configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Decode the configured key.
    ///
    /// Returns `Ok(None)` when no key (or an empty value) is configured.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if the configured value is not a valid key.
    pub fn load_key(&self) -> Result<Option<SymmetricKey>, KeyError> {
        match self.encryption_key.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(encoded) => SymmetricKey::from_base64(encoded).map(Some),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.remote_timeout_ms == 0 {
            anyhow::bail!("REMOTE_TIMEOUT_MS must be > 0");
        }
        if let Some(url) = &self.remote_decrypt_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("REMOTE_DECRYPT_URL must be an http(s) URL");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CodecConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecConfig")
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("remote_decrypt_url", &self.remote_decrypt_url)
            .field("remote_timeout_ms", &self.remote_timeout_ms)
            .finish()
    }
}
