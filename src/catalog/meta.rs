//! Parser for the composite metadata line on search results.
//!
//! The catalog renders language, format, size, year and more as one
//! middle-dot-separated text blob, e.g.
//! `"✅ English [en] · EPUB · 0.7MB · 2015"`. Layouts vary: a second
//! translation can add extra language segments before the format, and the
//! format and size can appear in either order.

use std::sync::LazyLock;

use regex::Regex;

/// Known ebook format tokens, matched case-insensitively.
static FORMAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(EPUB|PDF|MOBI|AZW3|AZW|DJVU|CBZ|CBR|FB2|DOCX?|TXT)\b").unwrap()
});

/// Size pattern like `0.7MB` or `12 KB`; the unit suffix is case-sensitive.
static SIZE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*\s*(MB|KB|GB|TB)").unwrap());

/// Fields recovered from a composite metadata line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaInfo {
    pub language: Option<String>,
    /// Normalized to upper case on match.
    pub format: Option<String>,
    /// Human-readable size, e.g. `"0.7MB"`.
    pub size: Option<String>,
}

/// Parses a composite metadata line into language, format, and size.
///
/// Fewer than 3 segments means the layout is not the expected one and all
/// fields come back empty. The language is taken from the first segment only;
/// later language segments (a second translation) are intentionally ignored.
/// The remaining segments are scanned left to right for the first size match
/// and the first format match, stopping once both are found. There is no
/// fallback heuristic: a field that never matches stays empty.
pub fn parse_meta(meta: &str) -> MetaInfo {
    let parts: Vec<&str> = meta.split(" · ").collect();
    if parts.len() < 3 {
        return MetaInfo::default();
    }

    let mut info = MetaInfo::default();

    // Language reads up to the "[en]" code; a leading checkmark marks
    // verified records and is not part of the name.
    let language_part = parts[0].trim();
    if let Some(idx) = language_part.find('[')
        && idx > 0
    {
        let language = language_part[..idx]
            .trim()
            .trim_start_matches('✅')
            .trim()
            .to_string();
        if !language.is_empty() {
            info.language = Some(language);
        }
    }

    for part in &parts[1..] {
        let part = part.trim();

        if info.size.is_none() && SIZE_REGEX.is_match(part) {
            info.size = Some(part.to_string());
        }

        if info.format.is_none()
            && let Some(caps) = FORMAT_REGEX.captures(part)
        {
            info.format = Some(caps[1].to_uppercase());
        }

        if info.format.is_some() && info.size.is_some() {
            break;
        }
    }

    info
}
