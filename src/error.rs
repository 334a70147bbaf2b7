//! Error types for the annex library.
//!
//! Uses `thiserror` for structured error definitions that provide
//! clear context about what went wrong.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for catalog operations (search, DOI lookup, download).
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request could not be issued or transport failed.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The fast-download API responded with a non-success status.
    #[error("API request failed with status {status}: {body}")]
    ApiStatus { status: u16, body: String },

    /// The fast-download API returned an explicit error payload.
    #[error("API error: {0}")]
    Api(String),

    /// The fast-download API returned neither a URL nor an error.
    #[error("API returned an empty download URL")]
    EmptyResponse,

    /// A DOI lookup yielded no usable match.
    #[error("no paper found for DOI: {0}")]
    NotFound(String),

    /// The paper record carries no resolved download reference.
    #[error("no download URL available for this paper")]
    NoDownloadUrl,

    /// A file transfer responded with a non-success status.
    #[error("download failed with status {status}: {body}")]
    Download { status: u16, body: String },

    /// File creation, streaming copy, or durable sync failed.
    ///
    /// Any partial file has already been removed by the time this is returned.
    #[error("failed to write {}: {reason} ({written} bytes written)", path.display())]
    Write {
        path: PathBuf,
        written: u64,
        reason: String,
    },

    /// URL construction or validation failed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Error type for configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("missing required config value: {0}")]
    MissingValue(String),

    /// Invalid configuration value.
    #[error("invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
