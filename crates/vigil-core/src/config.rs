//! Client configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default server origin.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default REST prefix.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key holding the dark-mode preference.
pub const THEME_KEY: &str = "darkMode";

/// Where the server lives and which durable slots the stores use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:8080`.
    pub base_url: String,

    /// Path prepended to every endpoint.
    pub api_prefix: String,

    /// Storage key for the bearer token.
    pub token_key: String,

    /// Storage key for the theme preference.
    pub theme_key: String,

    /// Transport timeout. `None` leaves the HTTP client default.
    pub timeout_secs: Option<u64>,

    /// Location of the durable storage document. `None` picks the platform
    /// data directory.
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            token_key: TOKEN_KEY.to_string(),
            theme_key: THEME_KEY.to_string(),
            timeout_secs: None,
            storage_path: None,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `base_url` with every other field default.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overlaid with `VIGIL_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values produced by `lookup` for the `VIGIL_*` keys.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("VIGIL_BASE_URL") {
            self.base_url = url;
        }
        if let Some(prefix) = lookup("VIGIL_API_PREFIX") {
            self.api_prefix = prefix;
        }
        if let Some(raw) = lookup("VIGIL_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.timeout_secs = Some(secs),
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring VIGIL_TIMEOUT_SECS"),
            }
        }
        if let Some(path) = lookup("VIGIL_STORAGE_PATH") {
            self.storage_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Absolute URL for an endpoint path such as `/auth/login`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/'),
            path
        )
    }
}
