//! Download engine for book and paper records.
//!
//! Books go through the secret-keyed fast-download API, which exchanges a
//! content hash for a time-limited direct URL. Papers already carry a
//! redirect-style reference from DOI resolution and are fetched directly.
//! Both flows share one write path: stream to disk, sync, and remove the
//! partial file if anything fails after creation.

use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap, USER_AGENT};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};
use url::Url;

use super::{
    BROWSER_USER_AGENT, Book, Catalog, DOWNLOAD_TIMEOUT, FastDownloadResponse, Paper,
    error_body_snippet,
};
use crate::error::CatalogError;
use crate::utils::{extension_for_content_type, extension_of, filename_from_content_disposition, sanitize_filename};

/// Fallback extension when nothing better can be inferred.
const DEFAULT_PAPER_EXTENSION: &str = ".pdf";

impl Catalog {
    /// Downloads a book into `dir`, returning the written path.
    ///
    /// The hash, title, and format are trusted as the caller echoes them from
    /// a prior search result; a malformed hash is simply rejected by the
    /// catalog. The file is named from the sanitized title (`untitled` when
    /// that sanitizes to nothing) and the lowercased format (`bin` when
    /// unknown).
    pub async fn download_book(
        &self,
        book: &Book,
        secret_key: &str,
        dir: &Path,
    ) -> Result<PathBuf, CatalogError> {
        let api_url = self.endpoint("/dyn/api/fast_download.json")?;
        // The key rides in the query string and must never reach the logs.
        info!(hash = %book.hash, "fetching download URL");

        let response = self
            .client()
            .get(api_url)
            .query(&[("md5", book.hash.as_str()), ("key", secret_key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body_snippet(response).await;
            return Err(CatalogError::ApiStatus {
                status: status.as_u16(),
                body,
            });
        }

        let api: FastDownloadResponse = response.json().await?;
        if api.download_url.is_empty() {
            if !api.error.is_empty() {
                return Err(CatalogError::Api(api.error));
            }
            return Err(CatalogError::EmptyResponse);
        }

        info!(url = %api.download_url, "downloading file");
        let response = self.client().get(&api.download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body_snippet(response).await;
            return Err(CatalogError::Download {
                status: status.as_u16(),
                body,
            });
        }

        let mut name = sanitize_filename(&book.title);
        if name.is_empty() {
            name = "untitled".to_string();
        }
        let format = book
            .format
            .as_deref()
            .map(str::to_lowercase)
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| "bin".to_string());

        let path = dir.join(format!("{name}.{format}"));
        info!(path = %path.display(), "creating file");

        let written = save_to_file(response.bytes_stream(), &path).await?;
        info!(path = %path.display(), bytes = written, "download completed");
        Ok(path)
    }

    /// Downloads a resolved paper into `dir`, returning the written path.
    ///
    /// Requires the record to carry a download reference; a relative
    /// reference is qualified against the catalog base URL. Paper transfers
    /// can be large, so the request runs with a doubled timeout and an
    /// explicit browser User-Agent (some download paths gate on it).
    pub async fn download_paper(&self, paper: &Paper, dir: &Path) -> Result<PathBuf, CatalogError> {
        let reference = paper
            .download_url
            .as_deref()
            .filter(|r| !r.is_empty())
            .ok_or(CatalogError::NoDownloadUrl)?;

        let url = if reference.starts_with("http") {
            Url::parse(reference)
                .map_err(|e| CatalogError::InvalidUrl(format!("{reference}: {e}")))?
        } else {
            self.endpoint(reference)?
        };

        info!(url = %url, "downloading paper");
        let response = self
            .client()
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body_snippet(response).await;
            return Err(CatalogError::Download {
                status: status.as_u16(),
                body,
            });
        }

        let ext = infer_extension(response.headers());

        let base_name = paper.title.as_deref().unwrap_or(&paper.doi);
        let mut name = sanitize_filename(base_name);
        if name.is_empty() {
            name = "paper".to_string();
        }

        let path = dir.join(format!("{name}{ext}"));
        info!(path = %path.display(), "creating file");

        let written = save_to_file(response.bytes_stream(), &path).await?;
        info!(path = %path.display(), bytes = written, "paper download completed");
        Ok(path)
    }
}

/// Picks a file extension for a paper transfer from the response headers.
///
/// Preference order: `Content-Disposition` filename, `Content-Type` mapping,
/// then `.pdf`.
fn infer_extension(headers: &HeaderMap) -> String {
    if let Some(disposition) = headers.get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok())
        && let Some(filename) = filename_from_content_disposition(disposition)
        && let Some(ext) = extension_of(&filename)
    {
        return ext;
    }

    if let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
        && let Some(ext) = extension_for_content_type(content_type)
    {
        return ext.to_string();
    }

    DEFAULT_PAPER_EXTENSION.to_string()
}

/// Streams a response body to `path`, returning the bytes written.
///
/// All-or-nothing from the caller's perspective: any failure after the file
/// is created (chunk error, write error, flush, or sync) removes the partial
/// file before the error is returned. The error carries the byte count that
/// had been written for diagnostics.
pub(crate) async fn save_to_file<S, B, E>(stream: S, path: &Path) -> Result<u64, CatalogError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let file = File::create(path).await.map_err(|e| CatalogError::Write {
        path: path.to_path_buf(),
        written: 0,
        reason: e.to_string(),
    })?;
    let mut writer = BufWriter::new(file);
    let mut written: u64 = 0;

    match copy_and_sync(stream, &mut writer, &mut written).await {
        Ok(()) => Ok(written),
        Err(reason) => {
            drop(writer);
            if let Err(error) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), %error, "failed to remove partial file");
            }
            Err(CatalogError::Write {
                path: path.to_path_buf(),
                written,
                reason,
            })
        }
    }
}

async fn copy_and_sync<S, B, E>(
    stream: S,
    writer: &mut BufWriter<File>,
    written: &mut u64,
) -> Result<(), String>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| e.to_string())?;
        writer
            .write_all(chunk.as_ref())
            .await
            .map_err(|e| e.to_string())?;
        *written += chunk.as_ref().len() as u64;
    }

    writer.flush().await.map_err(|e| e.to_string())?;
    // Data must reach durable storage before success is reported.
    writer.get_ref().sync_all().await.map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    fn ok_chunks(chunks: &[&[u8]]) -> Vec<Result<Vec<u8>, String>> {
        chunks.iter().map(|c| Ok(c.to_vec())).collect()
    }

    #[tokio::test]
    async fn test_save_writes_all_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.epub");

        let written = save_to_file(stream::iter(ok_chunks(&[b"hello ", b"world"])), &path)
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_interrupted_stream_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.pdf");

        let chunks: Vec<Result<Vec<u8>, String>> =
            vec![Ok(b"abc".to_vec()), Err("connection reset".to_string())];
        let result = save_to_file(stream::iter(chunks), &path).await;

        match result {
            Err(CatalogError::Write { written, reason, .. }) => {
                assert_eq!(written, 3);
                assert!(reason.contains("connection reset"));
            }
            other => panic!("expected write error, got {other:?}"),
        }
        assert!(!path.exists(), "partial file must be removed");
    }

    #[tokio::test]
    async fn test_create_failure_reports_zero_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("file.pdf");

        let result = save_to_file(stream::iter(ok_chunks(&[b"data"])), &path).await;
        match result {
            Err(CatalogError::Write { written, .. }) => assert_eq!(written, 0),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[test]
    fn test_infer_extension_prefers_content_disposition() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            r#"attachment; filename="paper.epub""#.parse().unwrap(),
        );
        headers.insert(CONTENT_TYPE, "application/pdf".parse().unwrap());
        assert_eq!(infer_extension(&headers), ".epub");
    }

    #[test]
    fn test_infer_extension_from_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/pdf".parse().unwrap());
        assert_eq!(infer_extension(&headers), ".pdf");
    }

    #[test]
    fn test_infer_extension_default() {
        assert_eq!(infer_extension(&HeaderMap::new()), ".pdf");
    }
}
