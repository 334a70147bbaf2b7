//! Search query execution and result-row extraction.
//!
//! A search is one GET against the catalog's `/search` endpoint followed by a
//! walk over the returned listing. Extraction is deliberately a pure function
//! over the parsed document so it can be exercised against fixture HTML
//! without a live traversal engine.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::{Book, Catalog, DEFAULT_CONTENT_FILTER, MD5_PATH_PREFIX, meta};
use crate::error::CatalogError;

/// Exact class of the cover-image anchor. Result rows render the same
/// `/md5/` link twice (cover and title); matching one decorative class keeps
/// each row counted once.
const PRIMARY_LINK_CLASS: &str = "custom-a block mr-2 sm:mr-4 hover:opacity-80";

/// Class token marking an author link inside a result row.
const AUTHOR_ICON_CLASS: &str = "icon-[mdi--user-edit]";

/// Class token marking a publisher link inside a result row.
const PUBLISHER_ICON_CLASS: &str = "icon-[mdi--company]";

/// CSS selectors used for result-row parsing.
struct Selectors {
    /// Any per-document link.
    document_anchor: Selector,
    /// The info block that is a sibling of the cover anchor.
    info_container: Selector,
    /// Links under the `/search` path (author and publisher entries).
    search_link: Selector,
    /// Icon spans inside those links.
    icon_span: Selector,
    /// The composite metadata text block.
    meta_block: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            document_anchor: Selector::parse(r#"a[href^="/md5/"]"#).unwrap(),
            info_container: Selector::parse("div.max-w-full").unwrap(),
            search_link: Selector::parse(r#"a[href^="/search"]"#).unwrap(),
            icon_span: Selector::parse("span").unwrap(),
            meta_block: Selector::parse("div.text-gray-800").unwrap(),
        }
    }
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::new);

/// Why one matched result element was excluded from the batch.
///
/// Skips are non-fatal diagnostics: the catalog's markup changing out from
/// under the selectors shows up as skipped rows, never as a failed search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("book info container not found")]
    NoContainer,

    #[error("title is empty")]
    EmptyTitle,

    #[error("no link found for {title:?}")]
    NoLink { title: String },

    #[error("no hash found for {title:?}")]
    NoHash { title: String },
}

impl Catalog {
    /// Searches the catalog and returns every valid book record on the
    /// first result page.
    ///
    /// An empty `content` filter defaults to books only. A transport failure
    /// or a non-success status on the search request is fatal; individual
    /// rows that fail structural expectations are skipped with a logged
    /// reason. Zero matches is an empty list, not an error. Record order
    /// follows document traversal order and is not part of the contract.
    pub async fn search(&self, query: &str, content: &str) -> Result<Vec<Book>, CatalogError> {
        let content = if content.is_empty() {
            DEFAULT_CONTENT_FILTER
        } else {
            content
        };

        let url = self.endpoint("/search")?;
        info!(url = %url, query, content, "visiting search page");

        let response = self
            .client()
            .get(url)
            .query(&[("q", query), ("content", content)])
            .send()
            .await?
            .error_for_status()?;

        let page_url = response.url().clone();
        let body = response.text().await?;

        let (matched, books) = parse_search_page(&body, &page_url);
        info!(matched, valid = books.len(), "search completed");

        Ok(books)
    }
}

/// Extracts all valid book records from a search result page.
///
/// Returns the number of matched primary anchors alongside the records that
/// survived extraction.
pub(crate) fn parse_search_page(html: &str, page_url: &Url) -> (usize, Vec<Book>) {
    let document = Html::parse_document(html);

    let anchors: Vec<ElementRef> = document
        .select(&SELECTORS.document_anchor)
        .filter(|anchor| anchor.value().attr("class") == Some(PRIMARY_LINK_CLASS))
        .collect();

    let mut books = Vec::new();
    for anchor in &anchors {
        match extract_book(*anchor, page_url) {
            Ok(book) => books.push(book),
            Err(reason) => warn!(%reason, "skipping book"),
        }
    }

    debug!(matched = anchors.len(), "search page walked");
    (anchors.len(), books)
}

/// Extracts one book record from a matched cover anchor.
///
/// Each step short-circuits to a skip on failure; authors, publisher, and
/// metadata are optional and never cause a skip.
pub(crate) fn extract_book(anchor: ElementRef<'_>, page_url: &Url) -> Result<Book, SkipReason> {
    let parent = anchor
        .parent()
        .and_then(ElementRef::wrap)
        .ok_or(SkipReason::NoContainer)?;

    let container = parent
        .select(&SELECTORS.info_container)
        .next()
        .ok_or(SkipReason::NoContainer)?;

    let title = container
        .select(&SELECTORS.document_anchor)
        .next()
        .map(element_text)
        .unwrap_or_default();
    if title.is_empty() {
        return Err(SkipReason::EmptyTitle);
    }

    let authors = icon_link_text(container, AUTHOR_ICON_CLASS);
    let publisher = icon_link_text(container, PUBLISHER_ICON_CLASS);

    let meta_text: String = container
        .select(&SELECTORS.meta_block)
        .next()
        .map(|block| block.text().collect())
        .unwrap_or_default();
    let meta = meta::parse_meta(&meta_text);

    let link = anchor.value().attr("href").unwrap_or_default();
    if link.is_empty() {
        return Err(SkipReason::NoLink { title });
    }
    let hash = link.strip_prefix(MD5_PATH_PREFIX).unwrap_or(link);
    if hash.is_empty() {
        return Err(SkipReason::NoHash { title });
    }

    let url = match page_url.join(link) {
        Ok(absolute) => absolute.to_string(),
        Err(_) => link.to_string(),
    };

    Ok(Book {
        language: meta.language,
        format: meta.format,
        size: meta.size,
        title,
        publisher,
        authors,
        url,
        hash: hash.to_string(),
    })
}

/// Collapsed, trimmed text content of an element.
fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Text of the first `/search` link in `container` marked with the given
/// icon class, if any.
fn icon_link_text(container: ElementRef<'_>, icon_class: &str) -> Option<String> {
    for link in container.select(&SELECTORS.search_link) {
        let has_icon = link
            .select(&SELECTORS.icon_span)
            .any(|span| span.value().classes().any(|class| class == icon_class));
        if has_icon {
            let text = element_text(link);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://catalog.example/search?q=rust").unwrap()
    }

    fn result_row(hash: &str, title: &str) -> String {
        format!(
            r##"<div class="row">
              <a class="custom-a block mr-2 sm:mr-4 hover:opacity-80" href="/md5/{hash}"><img></a>
              <div class="max-w-full">
                <a href="/md5/{hash}">{title}</a>
                <a href="/search?q=a"><span class="icon-[mdi--user-edit]"></span> Jane Writer</a>
                <a href="/search?q=p"><span class="icon-[mdi--company]"></span> Acme Press</a>
                <div class="text-gray-800">✅ English [en] · EPUB · 0.7MB · 2015</div>
              </div>
            </div>"##
        )
    }

    #[test]
    fn test_extracts_full_record() {
        let html = format!("<html><body>{}</body></html>", result_row("abc123", "Rust in Practice"));
        let (matched, books) = parse_search_page(&html, &page_url());

        assert_eq!(matched, 1);
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.title, "Rust in Practice");
        assert_eq!(book.hash, "abc123");
        assert_eq!(book.authors.as_deref(), Some("Jane Writer"));
        assert_eq!(book.publisher.as_deref(), Some("Acme Press"));
        assert_eq!(book.language.as_deref(), Some("English"));
        assert_eq!(book.format.as_deref(), Some("EPUB"));
        assert_eq!(book.size.as_deref(), Some("0.7MB"));
        assert_eq!(book.url, "https://catalog.example/md5/abc123");
    }

    #[test]
    fn test_duplicate_title_anchor_not_double_counted() {
        // The title link inside the info block points at the same /md5/ path
        // but lacks the cover-anchor class, so the row yields one record.
        let html = format!("<html><body>{}</body></html>", result_row("abc123", "Once"));
        let (matched, books) = parse_search_page(&html, &page_url());
        assert_eq!(matched, 1);
        assert_eq!(books.len(), 1);
    }

    #[test]
    fn test_missing_container_skips_row_but_not_batch() {
        let broken = r##"<a class="custom-a block mr-2 sm:mr-4 hover:opacity-80" href="/md5/dead"></a>"##;
        let html = format!(
            "<html><body><div>{broken}</div>{}</body></html>",
            result_row("beef99", "Survivor")
        );
        let (matched, books) = parse_search_page(&html, &page_url());

        assert_eq!(matched, 2);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].hash, "beef99");
    }

    #[test]
    fn test_empty_title_skipped() {
        let html = format!("<html><body>{}</body></html>", result_row("abc123", "  "));
        let (_, books) = parse_search_page(&html, &page_url());
        assert!(books.is_empty());
    }

    #[test]
    fn test_empty_hash_skipped() {
        let html = format!("<html><body>{}</body></html>", result_row("", "No Hash Here"));
        let (matched, books) = parse_search_page(&html, &page_url());
        assert_eq!(matched, 1);
        assert!(books.is_empty());
    }

    #[test]
    fn test_missing_optional_fields_kept() {
        let html = r##"<html><body><div>
          <a class="custom-a block mr-2 sm:mr-4 hover:opacity-80" href="/md5/f00"></a>
          <div class="max-w-full"><a href="/md5/f00">Bare Record</a></div>
        </div></body></html>"##;
        let (_, books) = parse_search_page(html, &page_url());

        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.title, "Bare Record");
        assert_eq!(book.authors, None);
        assert_eq!(book.publisher, None);
        assert_eq!(book.language, None);
        assert_eq!(book.format, None);
        assert_eq!(book.size, None);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let (matched, books) = parse_search_page("<html><body><p>nothing</p></body></html>", &page_url());
        assert_eq!(matched, 0);
        assert!(books.is_empty());
    }
}
