//! Immutable client configuration: credentials, endpoint, optional timeout.

use crate::error::MeshError;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;

/// Service root used when no base URL is supplied.
pub const DEFAULT_BASE_URL: &str = "https://api.example.com";

pub const ENV_API_KEY: &str = "MEMORY_MESH_API_KEY";
pub const ENV_BASE_URL: &str = "MEMORY_MESH_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "MEMORY_MESH_TIMEOUT_MS";

/// Key and base URL are stored verbatim; neither is validated here.
pub struct MeshConfig {
    api_key: SecretString,
    base_url: String,
    timeout: Option<Duration>,
}

impl MeshConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request timeout applied by the transport. Unset means transport default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `MEMORY_MESH_API_KEY` (required), `MEMORY_MESH_BASE_URL` and
    /// `MEMORY_MESH_TIMEOUT_MS` from the process environment.
    pub fn from_env() -> Result<Self, MeshError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, MeshError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY)
            .filter(|k| !k.is_empty())
            .ok_or(MeshError::MissingApiKey)?;

        let mut cfg = Self::new(api_key);
        if let Some(url) = lookup(ENV_BASE_URL).filter(|u| !u.trim().is_empty()) {
            cfg = cfg.with_base_url(url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS).filter(|t| !t.trim().is_empty()) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| MeshError::Config(format!("{ENV_TIMEOUT_MS} must be milliseconds, got {raw:?}")))?;
            cfg = cfg.with_timeout(Duration::from_millis(ms));
        }
        Ok(cfg)
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Clone for MeshConfig {
    fn clone(&self) -> Self {
        Self {
            api_key: SecretString::from(self.api_key.expose_secret().to_owned()),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for MeshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
