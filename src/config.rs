//! Runtime configuration read from the environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8001/api";
pub const DEFAULT_SESSION_FILE: &str = ".visa-portal/session.json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{0} is set but empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// Backend REST base URL without a trailing slash.
    pub api_base_url: String,
    /// File backing durable session storage.
    pub session_file: PathBuf,
    /// Enables the Firebase REST identity provider when present.
    pub firebase_api_key: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            firebase_api_key: None,
        }
    }
}

impl PortalConfig {
    /// Build config from environment variables.
    ///
    /// - `VISA_API_BASE_URL`: backend base URL (default `http://127.0.0.1:8001/api`)
    /// - `VISA_SESSION_FILE`: session storage file (default `.visa-portal/session.json`)
    /// - `FIREBASE_API_KEY`: optional identity provider key
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not http(s) or a path variable is
    /// set but empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = match std::env::var("VISA_API_BASE_URL") {
            Ok(raw) => normalize_base_url("VISA_API_BASE_URL", &raw)?,
            Err(_) => DEFAULT_API_BASE_URL.to_owned(),
        };

        let session_file = match std::env::var("VISA_SESSION_FILE") {
            Ok(raw) if raw.trim().is_empty() => return Err(ConfigError::Empty("VISA_SESSION_FILE")),
            Ok(raw) => PathBuf::from(raw.trim()),
            Err(_) => PathBuf::from(DEFAULT_SESSION_FILE),
        };

        let firebase_api_key = std::env::var("FIREBASE_API_KEY")
            .ok()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());

        Ok(Self { api_base_url, session_file, firebase_api_key })
    }

    /// Replace the base URL, applying the same validation as the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not http(s).
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url("--api-url", url)?;
        Ok(self)
    }
}

fn normalize_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = raw.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_owned())
    } else {
        Err(ConfigError::InvalidUrl { var, value: raw.to_owned() })
    }
}

// =============================================================================
// .env
// =============================================================================

/// Outcome of loading a `.env` file at startup.
#[derive(Debug, PartialEq, Eq)]
pub enum DotenvStatus {
    Loaded(PathBuf),
    Missing,
    /// The file exists but could not be read or parsed.
    Unreadable(String),
}

impl From<Result<PathBuf, dotenvy::Error>> for DotenvStatus {
    fn from(result: Result<PathBuf, dotenvy::Error>) -> Self {
        match result {
            Ok(path) => Self::Loaded(path),
            Err(e) if e.not_found() => Self::Missing,
            Err(e) => Self::Unreadable(e.to_string()),
        }
    }
}

impl DotenvStatus {
    /// Log the outcome. Call after the subscriber is installed.
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Self::Missing => tracing::debug!("no .env file"),
            Self::Unreadable(error) => tracing::warn!(%error, "ignoring unreadable .env file"),
        }
    }
}
