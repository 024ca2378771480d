// src/checker/extract.rs
// =============================================================================
// This module pulls absolute URLs out of arbitrary text.
//
// A field may hold a bare link ("https://example.com"), or free text with
// links embedded in it ("see https://a.example and 'https://b.example'").
// We match every run of:
//
//   http:// or https://  followed by one or more characters that are not
//                        whitespace, a double quote or a single quote
//
// Matches are greedy, non-overlapping and returned left to right. Nothing
// here validates URL syntax: odd-looking URLs are still returned and left
// for the validity checker to judge.
// =============================================================================

use regex::Regex;
use std::sync::OnceLock;

// Compiled once and shared by every call
static URL_PATTERN: OnceLock<Regex> = OnceLock::new();

fn url_pattern() -> &'static Regex {
    // The pattern is a constant, so compiling it cannot fail at runtime
    URL_PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s"']+"#).expect("valid URL pattern"))
}

/// Returns true if `text` starts with an http or https scheme prefix.
pub fn has_scheme_prefix(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Returns true if `text` contains an http or https scheme prefix anywhere.
///
/// This is the coarse test the field sniffer uses.
pub fn contains_link(text: &str) -> bool {
    text.contains("http://") || text.contains("https://")
}

/// Extracts every URL in `text`, in the order they appear.
///
/// Example:
///   "a https://x.example b 'http://y.example'"
///   -> ["https://x.example", "http://y.example"]
pub fn extract_urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Extracts the URLs to check from one text value.
///
/// Same as `extract_urls`, except that when the pattern finds nothing but
/// the whole value starts with a scheme prefix, the whole value is treated
/// as one URL. A value that looks like a bare link is never dropped.
pub fn urls_in_value(text: &str) -> Vec<String> {
    let urls = extract_urls(text);
    if urls.is_empty() && has_scheme_prefix(text) {
        return vec![text.to_string()];
    }
    urls
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. What is OnceLock?
//    - A cell that is written exactly once, then read many times
//    - Compiling a regex is slow compared to matching with it
//    - get_or_init() compiles on first use and reuses it afterwards
//
// 2. Why r#"..."# ?
//    - A raw string: backslashes and quotes are taken literally
//    - Our pattern contains a double quote, so the # delimiters are needed
//
// 3. When does the fallback in urls_in_value() kick in?
//    - "http://" alone: the pattern needs at least one character after
//      the scheme, so it finds nothing, but the value starts with a scheme
// -----------------------------------------------------------------------------
