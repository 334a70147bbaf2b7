//! Filename helpers shared by the download flows.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Characters illegal or dangerous in file paths, replaced with `_`.
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());

/// Maximum sanitized name length, leaving room for an extension.
const MAX_FILENAME_CHARS: usize = 200;

/// Makes a string safe to use as a single filename component.
///
/// Replaces control characters and `< > : " / \ | ? *` with `_`, collapses
/// `..` sequences, keeps only the final path component, and truncates to 200
/// characters. Empty input yields empty output; callers supply a fallback
/// base name.
pub fn sanitize_filename(filename: &str) -> String {
    let safe = UNSAFE_FILENAME_CHARS.replace_all(filename, "_");
    let safe = safe.replace("..", "_");

    // Path separators were replaced above; this guards against any component
    // structure surviving the earlier steps.
    let safe = safe
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string();

    if safe.chars().count() > MAX_FILENAME_CHARS {
        safe.chars().take(MAX_FILENAME_CHARS).collect()
    } else {
        safe
    }
}

/// Extracts the `filename` parameter from a `Content-Disposition` header.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim().trim_matches('"').trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Maps a `Content-Type` header value to a file extension.
///
/// Only the document types the catalog actually serves are mapped; anything
/// else falls through to the caller's default.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "application/pdf" => Some(".pdf"),
        "application/epub+zip" => Some(".epub"),
        "application/x-mobipocket-ebook" => Some(".mobi"),
        "image/vnd.djvu" | "image/x-djvu" => Some(".djvu"),
        "application/zip" => Some(".zip"),
        "text/plain" => Some(".txt"),
        _ => None,
    }
}

/// Returns the extension of a filename including the leading dot.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
}
