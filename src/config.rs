//! Configuration for annex.
//!
//! All settings come from environment variables: the catalog requires a
//! pre-obtained secret key for its download API, a directory to write files
//! into, and optionally a mirror host to use instead of the default.

use std::path::{Path, PathBuf};

use tracing::error;

use crate::error::ConfigError;

/// Environment variable holding the fast-download API secret key.
pub const SECRET_KEY_VAR: &str = "ANNEX_SECRET_KEY";

/// Environment variable holding the absolute download directory.
pub const DOWNLOAD_DIR_VAR: &str = "ANNEX_DOWNLOAD_DIR";

/// Environment variable overriding the catalog host.
pub const BASE_URL_VAR: &str = "ANNEX_BASE_URL";

/// Default catalog host used when no override is set.
pub const DEFAULT_BASE_URL: &str = "annas-archive.li";

/// Runtime configuration, validated once and passed into the core as values.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret key for the fast-download API. Never logged.
    pub secret_key: String,

    /// Absolute directory downloads are written into.
    pub download_dir: PathBuf,

    /// Catalog host, either a bare hostname (https assumed) or a full URL.
    pub base_url: String,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through a lookup function.
    ///
    /// The indirection keeps validation testable without touching the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup(SECRET_KEY_VAR).unwrap_or_default();
        let download_dir = lookup(DOWNLOAD_DIR_VAR).unwrap_or_default();
        let base_url = lookup(BASE_URL_VAR).unwrap_or_default();

        if secret_key.is_empty() || download_dir.is_empty() {
            // Never log the secret itself, only whether it is set.
            error!(
                secret_key_set = !secret_key.is_empty(),
                download_dir = %download_dir,
                "required environment variables not set"
            );
            return Err(ConfigError::MissingValue(format!(
                "{SECRET_KEY_VAR} and {DOWNLOAD_DIR_VAR} environment variables must be set"
            )));
        }

        let download_dir = PathBuf::from(download_dir);
        if !download_dir.is_absolute() {
            return Err(ConfigError::InvalidValue {
                key: DOWNLOAD_DIR_VAR.to_string(),
                message: format!("must be an absolute path, got: {}", download_dir.display()),
            });
        }

        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url
        };

        Ok(Self {
            secret_key,
            download_dir,
            base_url,
        })
    }

    /// The directory downloads are written into.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_missing_secret_key() {
        let result = Config::from_lookup(lookup_from(&[(DOWNLOAD_DIR_VAR, "/tmp/books")]));
        assert!(matches!(result, Err(ConfigError::MissingValue(_))));
    }

    #[test]
    fn test_missing_download_dir() {
        let result = Config::from_lookup(lookup_from(&[(SECRET_KEY_VAR, "key")]));
        assert!(matches!(result, Err(ConfigError::MissingValue(_))));
    }

    #[test]
    fn test_relative_download_dir_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            (SECRET_KEY_VAR, "key"),
            (DOWNLOAD_DIR_VAR, "books"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_default_base_url() {
        let config = Config::from_lookup(lookup_from(&[
            (SECRET_KEY_VAR, "key"),
            (DOWNLOAD_DIR_VAR, "/tmp/books"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_override() {
        let config = Config::from_lookup(lookup_from(&[
            (SECRET_KEY_VAR, "key"),
            (DOWNLOAD_DIR_VAR, "/tmp/books"),
            (BASE_URL_VAR, "http://127.0.0.1:8080"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
    }
}
