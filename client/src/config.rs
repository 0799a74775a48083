//! Client configuration.

use crate::error::{ConfigError, ConfigResult};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Default bounded wait for the login request.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(15);

/// Default page size for post listings.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Environment variable names read by [`ClientConfig::from_env`].
pub mod vars {
    /// API base URL
    pub const BASE_URL: &str = "QUILL_API_BASE_URL";
    /// Login timeout in whole seconds
    pub const LOGIN_TIMEOUT_SECS: &str = "QUILL_LOGIN_TIMEOUT_SECS";
    /// Page size
    pub const PER_PAGE: &str = "QUILL_PER_PAGE";
    /// Session file location
    pub const SESSION_FILE: &str = "QUILL_SESSION_FILE";
}

/// Client configuration.
///
/// # Example
///
/// ```
/// use quill_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_base_url("https://blog.example.com/api/")
///     .with_per_page(20)
///     .with_login_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.url("/posts/"), "https://blog.example.com/api/posts/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API base URL, without a trailing slash
    pub base_url: String,
    /// Bounded wait for the login request
    pub login_timeout: Duration,
    /// Page size for post listings
    pub per_page: u32,
    /// Where the session is persisted
    pub storage_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_timeout: DEFAULT_LOGIN_TIMEOUT,
            per_page: DEFAULT_PER_PAGE,
            storage_path: default_storage_path(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the result
    /// fails [`ClientConfig::validate`].
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(url) = read(vars::BASE_URL) {
            config = config.with_base_url(url);
        }
        if let Some(raw) = read(vars::LOGIN_TIMEOUT_SECS) {
            let secs = parse_number(vars::LOGIN_TIMEOUT_SECS, &raw)?;
            config = config.with_login_timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = read(vars::PER_PAGE) {
            let per_page = parse_number(vars::PER_PAGE, &raw)?;
            config = config.with_per_page(per_page);
        }
        if let Some(path) = read(vars::SESSION_FILE) {
            config = config.with_storage_path(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the base URL; trailing slashes are dropped.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the login timeout.
    #[must_use]
    pub const fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Set the session file location.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidBaseUrl`] if the URL does not parse
    /// - [`ConfigError::UnsupportedScheme`] for schemes other than http(s)
    /// - [`ConfigError::ZeroPerPage`] / [`ConfigError::ZeroLoginTimeout`]
    pub fn validate(&self) -> ConfigResult<()> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if self.per_page == 0 {
            return Err(ConfigError::ZeroPerPage);
        }
        if self.login_timeout.is_zero() {
            return Err(ConfigError::ZeroLoginTimeout);
        }
        Ok(())
    }

    /// Join an endpoint path onto the base URL.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> ConfigResult<T> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(".quill-session.json"),
        |dir| dir.join("quill").join("session.json"),
    )
}
