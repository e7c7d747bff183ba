//! Client configuration.
//!
//! The base URL is resolved once by the process entry point and handed to
//! `ApiClient::new`; nothing in the library reads the environment on its own.

use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

/// Base URL used when `API_BASE_URL` is unset or empty.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
    default_headers: Vec<(String, String)>,
}

impl ApiConfig {
    /// Validates `base_url` as an absolute http(s) URL and trims any
    /// trailing `/`.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(parsed.scheme().to_string()));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers: Vec::new(),
        })
    }

    /// Reads `API_BASE_URL`, falling back to [`DEFAULT_BASE_URL`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        match lookup(BASE_URL_ENV).filter(|value| !value.trim().is_empty()) {
            Some(value) => Self::new(value.trim()),
            None => Self::new(DEFAULT_BASE_URL),
        }
    }

    /// Headers sent with every request unless a caller overrides them.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_headers: Vec::new(),
        }
    }
}
