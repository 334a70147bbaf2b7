//! Two-phase DOI resolution.
//!
//! Phase 1 visits the catalog's `/scidb/<doi>` endpoint, which lands on a
//! result page, and takes the first content hash it can find. Phase 2 visits
//! the document's own `/md5/<hash>` page to enrich the record with title,
//! journal, authors, and size. Only phase 1 is load-bearing: the hash is all
//! a later download needs, so phase 2 failures degrade the record instead of
//! failing the lookup.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::{info, warn};

use super::{Catalog, MD5_PATH_PREFIX, Paper};
use crate::error::CatalogError;

/// Marker beginning the site-name suffix on document page titles.
const TITLE_SITE_SUFFIX: &str = " - Anna";

struct Selectors {
    document_anchor: Selector,
    page_title: Selector,
    description_meta: Selector,
    search_link: Selector,
    icon_span: Selector,
    size_block: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            document_anchor: Selector::parse(r#"a[href^="/md5/"]"#).unwrap(),
            page_title: Selector::parse("title").unwrap(),
            description_meta: Selector::parse(r#"meta[name="description"]"#).unwrap(),
            search_link: Selector::parse(r#"a[href^="/search"]"#).unwrap(),
            icon_span: Selector::parse(r#"span"#).unwrap(),
            size_block: Selector::parse("div.text-gray-500").unwrap(),
        }
    }
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(Selectors::new);

/// Fields recovered from a document detail page.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct PaperDetails {
    pub title: Option<String>,
    pub journal: Option<String>,
    pub authors: Option<String>,
    pub size: Option<String>,
}

impl Catalog {
    /// Resolves a DOI to an enriched paper record.
    ///
    /// Fails with [`CatalogError::NotFound`] when the search phase yields no
    /// content hash, and with [`CatalogError::Network`] when the search-phase
    /// request itself cannot be completed. Detail-phase failures are
    /// non-fatal: the record comes back with the hash, page URL, and download
    /// reference only.
    pub async fn lookup_doi(&self, doi: &str) -> Result<Paper, CatalogError> {
        let page_url = self.endpoint(&format!("/scidb/{doi}"))?;
        info!(url = %page_url, "looking up DOI");

        let response = self
            .client()
            .get(page_url.clone())
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;

        let hash = find_first_hash(&body).ok_or_else(|| CatalogError::NotFound(doi.to_string()))?;

        let mut paper = Paper {
            doi: doi.to_string(),
            title: None,
            authors: None,
            journal: None,
            size: None,
            hash: Some(hash.clone()),
            // Redirect-style reference; whether it resolves is the download
            // engine's problem.
            download_url: Some(format!("/scidb?doi={doi}")),
            page_url: page_url.to_string(),
        };

        match self.fetch_paper_details(&hash).await {
            Ok(details) => {
                paper.title = details.title;
                paper.journal = details.journal;
                paper.authors = details.authors;
                paper.size = details.size;
            }
            Err(error) => {
                warn!(hash = %hash, %error, "failed to fetch paper details");
            }
        }

        Ok(paper)
    }

    async fn fetch_paper_details(&self, hash: &str) -> Result<PaperDetails, CatalogError> {
        let url = self.endpoint(&format!("{MD5_PATH_PREFIX}{hash}"))?;
        info!(url = %url, "fetching paper details");

        let response = self.client().get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        Ok(parse_paper_details(&body))
    }
}

/// First content hash linked from a page, if any.
pub(crate) fn find_first_hash(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&SELECTORS.document_anchor)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| href.strip_prefix(MD5_PATH_PREFIX))
        .find(|hash| !hash.is_empty())
        .map(str::to_string)
}

/// Extracts enrichment fields from a document detail page.
pub(crate) fn parse_paper_details(html: &str) -> PaperDetails {
    let document = Html::parse_document(html);
    let mut details = PaperDetails::default();

    // Page titles read "<document title> - <site name>".
    if let Some(title) = document.select(&SELECTORS.page_title).next() {
        let text: String = title.text().collect();
        if let Some(idx) = text.find(TITLE_SITE_SUFFIX)
            && idx > 0
        {
            details.title = Some(text[..idx].trim().to_string());
        }
    }

    // The description meta tag packs "authors\n\npublisher\n\njournal line".
    if let Some(meta) = document.select(&SELECTORS.description_meta).next()
        && let Some(content) = meta.value().attr("content")
    {
        let parts: Vec<&str> = content.split("\n\n").collect();
        let journal = if parts.len() >= 3 {
            parts[2].trim()
        } else if parts.len() == 2 {
            parts[1].trim()
        } else {
            content.trim()
        };
        if !journal.is_empty() {
            details.journal = Some(journal.to_string());
        }
    }

    for link in document.select(&SELECTORS.search_link) {
        let has_icon = link
            .select(&SELECTORS.icon_span)
            .any(|span| span.value().classes().any(|c| c == "icon-[mdi--user-edit]"));
        if has_icon {
            let text = link.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                details.authors = Some(text);
                break;
            }
        }
    }

    for block in document.select(&SELECTORS.size_block) {
        let text = block.text().collect::<String>();
        if text.contains("MB") || text.contains("KB") {
            details.size = Some(text.trim().to_string());
            break;
        }
    }

    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_first_hash_wins() {
        let html = r#"<html><body>
          <a href="/md5/first111">one</a>
          <a href="/md5/second222">two</a>
        </body></html>"#;
        assert_eq!(find_first_hash(html).as_deref(), Some("first111"));
    }

    #[test]
    fn test_find_first_hash_skips_empty() {
        let html = r#"<html><body>
          <a href="/md5/">empty</a>
          <a href="/md5/real333">real</a>
        </body></html>"#;
        assert_eq!(find_first_hash(html).as_deref(), Some("real333"));
    }

    #[test]
    fn test_find_first_hash_none() {
        assert_eq!(find_first_hash("<html><body></body></html>"), None);
    }

    #[test]
    fn test_detail_page_full_extraction() {
        let html = r#"<html>
          <head>
            <title>Attention Is All You Need - Anna's Archive</title>
            <meta name="description" content="A. Vaswani et al.&#10;&#10;NeurIPS (1049-5258)&#10;&#10;Advances in Neural Information Processing Systems, 30, 2017">
          </head>
          <body>
            <a href="/search?q=vaswani"><span class="icon-[mdi--user-edit]"></span> A. Vaswani et al.</a>
            <div class="text-gray-500">English [en], pdf, 2.1MB</div>
          </body>
        </html>"#;

        let details = parse_paper_details(html);
        assert_eq!(details.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(
            details.journal.as_deref(),
            Some("Advances in Neural Information Processing Systems, 30, 2017")
        );
        assert_eq!(details.authors.as_deref(), Some("A. Vaswani et al."));
        assert_eq!(details.size.as_deref(), Some("English [en], pdf, 2.1MB"));
    }

    #[test]
    fn test_description_with_two_segments_uses_second() {
        let html = r#"<html><head>
          <meta name="description" content="Authors Here&#10;&#10;Journal of Things, 12, 2020">
        </head><body></body></html>"#;
        let details = parse_paper_details(html);
        assert_eq!(details.journal.as_deref(), Some("Journal of Things, 12, 2020"));
    }

    #[test]
    fn test_description_single_segment_used_raw() {
        let html = r#"<html><head>
          <meta name="description" content="  just one line  ">
        </head><body></body></html>"#;
        let details = parse_paper_details(html);
        assert_eq!(details.journal.as_deref(), Some("just one line"));
    }

    #[test]
    fn test_title_without_site_suffix_left_unset() {
        let html = "<html><head><title>Untagged Title</title></head><body></body></html>";
        let details = parse_paper_details(html);
        assert_eq!(details.title, None);
    }

    #[test]
    fn test_size_block_without_units_ignored() {
        let html = r#"<html><body>
          <div class="text-gray-500">no size info here</div>
          <div class="text-gray-500">pdf, 3.4MB</div>
        </body></html>"#;
        let details = parse_paper_details(html);
        assert_eq!(details.size.as_deref(), Some("pdf, 3.4MB"));
    }
}
