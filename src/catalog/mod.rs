//! Catalog client and record types.
//!
//! The catalog is only reachable through server-rendered HTML pages plus one
//! secret-keyed JSON endpoint, so every operation here is a fetch followed by
//! structural extraction: `search` walks a result listing, `lookup_doi` runs a
//! two-phase hash-then-detail lookup, and the download methods exchange a
//! record for a file on disk.

mod doi;
mod download;
pub mod meta;
mod search;

pub use search::SkipReason;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::Config;
use crate::error::CatalogError;

/// Path prefix identifying per-document pages; the trailing segment is the
/// content hash used as the canonical download key.
pub const MD5_PATH_PREFIX: &str = "/md5/";

/// Content filter applied when the caller supplies none.
pub const DEFAULT_CONTENT_FILTER: &str = "book_any";

/// Timeout for standard catalog fetches.
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for paper transfers, which can be large.
pub(crate) const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Realistic User-Agent; the catalog's DDoS protection blocks obvious bots
/// and some download paths gate on a browser identity.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Upper bound on response body excerpts carried in errors.
const ERROR_BODY_LIMIT: usize = 512;

/// A book record extracted from a search result listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub language: Option<String>,
    pub format: Option<String>,
    pub size: Option<String>,
    pub title: String,
    pub publisher: Option<String>,
    pub authors: Option<String>,
    /// Absolute URL of the book's catalog page.
    pub url: String,
    /// Content hash, the catalog's per-document identifier.
    pub hash: String,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Title: {}\nAuthors: {}\nPublisher: {}\nLanguage: {}\nFormat: {}\nSize: {}\nURL: {}\nHash: {}",
            self.title,
            self.authors.as_deref().unwrap_or(""),
            self.publisher.as_deref().unwrap_or(""),
            self.language.as_deref().unwrap_or(""),
            self.format.as_deref().unwrap_or(""),
            self.size.as_deref().unwrap_or(""),
            self.url,
            self.hash,
        )
    }
}

/// A journal paper record resolved from a DOI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub doi: String,
    /// Only known after the detail phase succeeds.
    pub title: Option<String>,
    pub authors: Option<String>,
    pub journal: Option<String>,
    pub size: Option<String>,
    /// Content hash discovered in the search phase.
    pub hash: Option<String>,
    /// Redirect-style download reference, possibly relative to the base URL.
    pub download_url: Option<String>,
    /// The catalog page this record was resolved from.
    pub page_url: String,
}

impl fmt::Display for Paper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DOI: {}\nTitle: {}\nAuthors: {}\nJournal: {}\nSize: {}\nDownload URL: {}\nPage: {}",
            self.doi,
            self.title.as_deref().unwrap_or(""),
            self.authors.as_deref().unwrap_or(""),
            self.journal.as_deref().unwrap_or(""),
            self.size.as_deref().unwrap_or(""),
            self.download_url.as_deref().unwrap_or(""),
            self.page_url,
        )
    }
}

/// Wire envelope returned by the fast-download API.
#[derive(Debug, Deserialize)]
pub(crate) struct FastDownloadResponse {
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub error: String,
}

/// Client for one catalog host.
///
/// Holds the shared HTTP client and the resolved base URL; all record values
/// it produces are handed to the caller, nothing is cached.
pub struct Catalog {
    client: reqwest::Client,
    base: Url,
}

impl Catalog {
    /// Creates a catalog client from validated configuration.
    pub fn new(config: &Config) -> Result<Self, CatalogError> {
        Self::with_base_url(&config.base_url)
    }

    /// Creates a catalog client for the given host or URL.
    ///
    /// A value without a scheme is treated as an https host.
    pub fn with_base_url(base: &str) -> Result<Self, CatalogError> {
        let raw = if base.contains("://") {
            base.to_string()
        } else {
            format!("https://{base}")
        };
        let base = Url::parse(&raw).map_err(|e| CatalogError::InvalidUrl(format!("{raw}: {e}")))?;
        if base.host_str().is_none() {
            return Err(CatalogError::InvalidUrl(format!("{base} has no host")));
        }

        let client = create_http_client()?;
        Ok(Self { client, base })
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn base(&self) -> &Url {
        &self.base
    }

    /// Builds an absolute URL for a catalog path.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.base
            .join(path)
            .map_err(|e| CatalogError::InvalidUrl(format!("{path}: {e}")))
    }
}

/// Common HTTP client configuration for catalog fetches.
pub(crate) fn create_http_client() -> Result<reqwest::Client, CatalogError> {
    let client = reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .cookie_store(true)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Reads a bounded excerpt of a response body for error diagnostics.
pub(crate) async fn error_body_snippet(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    text.chars().take(ERROR_BODY_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_https_scheme() {
        let catalog = Catalog::with_base_url("annas-archive.li").unwrap();
        assert_eq!(catalog.base().as_str(), "https://annas-archive.li/");
    }

    #[test]
    fn test_full_url_kept_verbatim() {
        let catalog = Catalog::with_base_url("http://127.0.0.1:9090").unwrap();
        assert_eq!(catalog.base().scheme(), "http");
        assert_eq!(catalog.base().port(), Some(9090));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(Catalog::with_base_url("http://").is_err());
    }

    #[test]
    fn test_fast_download_response_decodes_partial_payload() {
        let resp: FastDownloadResponse = serde_json::from_str(r#"{"error": "quota"}"#).unwrap();
        assert_eq!(resp.download_url, "");
        assert_eq!(resp.error, "quota");
    }

    #[test]
    fn test_book_display_blanks_missing_fields() {
        let book = Book {
            language: None,
            format: Some("EPUB".to_string()),
            size: None,
            title: "A Title".to_string(),
            publisher: None,
            authors: None,
            url: "https://example.com/md5/abc".to_string(),
            hash: "abc".to_string(),
        };
        let text = book.to_string();
        assert!(text.contains("Title: A Title"));
        assert!(text.contains("Format: EPUB"));
        assert!(text.contains("Language: \n"));
    }
}
