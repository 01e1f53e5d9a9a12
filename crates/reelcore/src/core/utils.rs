use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::core::config::upload::BYTES_PER_MB;

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(https?://[^\s]+)").expect("url regex"));

/// Extracts the first http(s) URL from free text.
///
/// The pasted text may carry surrounding words ("look at this: https://..."),
/// so the first match is taken and then validated by `url::Url`. Site
/// support is not checked here; unsupported sites fail inside the fetch.
///
/// # Example
///
/// ```
/// use reelcore::core::utils::extract_url;
///
/// let url = extract_url("watch https://example.com/v/1 now").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/v/1");
/// assert!(extract_url("no link here").is_none());
/// ```
pub fn extract_url(text: &str) -> Option<Url> {
    let candidate = URL_REGEX.find(text.trim())?.as_str();
    let url = Url::parse(candidate).ok()?;
    url.host_str()?;
    Some(url)
}

/// Escapes characters that cannot appear in an attachment file name.
///
/// Replaces path separators, characters reserved on Windows and control
/// characters with `_`, collapses surrounding whitespace and falls back to
/// `fallback` when nothing printable is left.
///
/// # Example
///
/// ```
/// use reelcore::core::utils::escape_filename;
///
/// assert_eq!(escape_filename("cats/dogs: round 2", "video"), "cats_dogs_ round 2");
/// assert_eq!(escape_filename("  \t ", "video"), "video");
/// ```
pub fn escape_filename(name: &str, fallback: &str) -> String {
    let escaped: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '<' | '>' | '|' => '_',
            '"' => '\'',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = escaped.trim().trim_matches('.').trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Formats a byte count as megabytes with one decimal, e.g. `12.5`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / BYTES_PER_MB as f64)
}
