//! Cookie material for sites that need a logged-in session
//!
//! This module provides functionality to:
//! - Pick the configured cookie source (link > base64 blob > raw text)
//! - Fetch/decode the material
//! - Normalize Netscape, `Cookie:` header and JSON exports into one
//!   Netscape cookie-jar text that yt-dlp accepts via `--cookies`

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::error::DownloadError;

/// First line of every Netscape cookie jar
pub const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";

/// Domain assigned to cookies that arrive without one (header-style input)
pub const DEFAULT_COOKIE_DOMAIN: &str = ".instagram.com";

/// Prefix browsers put in front of HttpOnly cookie lines in Netscape jars
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Lifetime given to header-style cookies, which carry no expiry
const SYNTHESIZED_COOKIE_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Which configured source provides the cookie material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSourceKind {
    /// COOKIES_URL
    Link,
    /// COOKIES_B64
    Base64,
    /// COOKIES_TXT
    Raw,
}

impl fmt::Display for CookieSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieSourceKind::Link => write!(f, "COOKIES_URL"),
            CookieSourceKind::Base64 => write!(f, "COOKIES_B64"),
            CookieSourceKind::Raw => write!(f, "COOKIES_TXT"),
        }
    }
}

/// Configured cookie sources, consulted in priority order
#[derive(Debug, Clone, Default)]
pub struct CookieSources {
    /// Link to fetch the material from
    pub url: Option<String>,
    /// Base64-encoded material
    pub base64: Option<String>,
    /// Material as plain text
    pub raw: Option<String>,
}

impl CookieSources {
    /// Whether no source is configured at all
    pub fn is_empty(&self) -> bool {
        self.active_source().is_none()
    }

    /// Number of configured sources (only the first one is used)
    pub fn configured_count(&self) -> usize {
        [&self.url, &self.base64, &self.raw].iter().filter(|s| s.is_some()).count()
    }

    /// The source that wins the priority order
    pub fn active_source(&self) -> Option<CookieSourceKind> {
        if self.url.is_some() {
            Some(CookieSourceKind::Link)
        } else if self.base64.is_some() {
            Some(CookieSourceKind::Base64)
        } else if self.raw.is_some() {
            Some(CookieSourceKind::Raw)
        } else {
            None
        }
    }

    /// Resolves the winning source into normalized Netscape text.
    ///
    /// Returns `Ok(None)` when nothing is configured or the material is empty.
    pub async fn resolve(&self, http: &reqwest::Client) -> AppResult<Option<String>> {
        let raw = match self.active_source() {
            None => return Ok(None),
            Some(CookieSourceKind::Link) => {
                let url = self.url.as_deref().unwrap_or_default();
                fetch_cookie_text(http, url).await?
            }
            Some(CookieSourceKind::Base64) => decode_base64_cookies(self.base64.as_deref().unwrap_or_default())?,
            Some(CookieSourceKind::Raw) => unescape_env_text(self.raw.as_deref().unwrap_or_default()),
        };

        normalize_cookies(&raw, chrono::Utc::now().timestamp()).map_err(AppError::from)
    }
}

/// HTTP client for the cookie link.
///
/// `timeout` bounds the whole request so a link that never answers cannot
/// stall the request holding a queue permit.
pub fn cookie_http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    let connect = timeout.min(Duration::from_secs(config::download::COOKIES_CONNECT_TIMEOUT_SECS));
    reqwest::Client::builder()
        .connect_timeout(connect)
        .timeout(timeout)
        .build()
        .map_err(AppError::from)
}

async fn fetch_cookie_text(http: &reqwest::Client, url: &str) -> AppResult<String> {
    let response = http.get(url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::HttpStatus(response.status()));
    }
    Ok(response.text().await?)
}

/// Decodes base64 cookie material (standard or URL-safe alphabet)
pub fn decode_base64_cookies(encoded: &str) -> Result<String, DownloadError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = general_purpose::STANDARD
        .decode(&compact)
        .or_else(|_| general_purpose::URL_SAFE.decode(&compact))
        .map_err(|e| DownloadError::Cookies(format!("Invalid base64: {}", e)))?;

    String::from_utf8(decoded).map_err(|e| DownloadError::Cookies(format!("Invalid UTF-8 in cookies: {}", e)))
}

/// Single-line environment values often carry escaped tabs and newlines
fn unescape_env_text(raw: &str) -> String {
    if raw.contains('\n') || !raw.contains("\\n") {
        return raw.to_string();
    }
    raw.replace("\\n", "\n").replace("\\t", "\t")
}

/// Normalizes cookie material into Netscape cookie-jar text.
///
/// Accepted inputs:
/// - Netscape text: returned unchanged
/// - JSON array/object of cookie records (browser extension exports)
/// - `Cookie: a=b; c=d` header or a bare `a=b; c=d` list
///
/// `now` is the current unix time, used for the expiry of header-style cookies.
pub fn normalize_cookies(raw: &str, now: i64) -> Result<Option<String>, DownloadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        return json_to_netscape(trimmed).map(Some);
    }

    if looks_like_netscape(trimmed) {
        return Ok(Some(raw.to_string()));
    }

    header_to_netscape(trimmed, now).map(Some)
}

fn looks_like_netscape(text: &str) -> bool {
    text.starts_with("# Netscape HTTP Cookie File")
        || text.starts_with("# HTTP Cookie File")
        || text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && (!l.starts_with('#') || l.starts_with(HTTP_ONLY_PREFIX)))
            .any(|l| l.split('\t').count() >= 7)
}

/// One Netscape cookie-jar line
#[derive(Debug, Clone, PartialEq)]
pub struct NetscapeCookie {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub expires: i64,
    pub name: String,
    pub value: String,
}

impl NetscapeCookie {
    /// Formats the tab-separated line; the subdomain flag follows the leading dot
    pub fn to_line(&self) -> String {
        let include_subdomains = if self.domain.starts_with('.') { "TRUE" } else { "FALSE" };
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.domain,
            include_subdomains,
            self.path,
            if self.secure { "TRUE" } else { "FALSE" },
            self.expires,
            self.name,
            self.value
        )
    }
}

fn render_jar(cookies: &[NetscapeCookie]) -> String {
    let mut out = String::from(NETSCAPE_HEADER);
    out.push('\n');
    for cookie in cookies {
        out.push_str(&cookie.to_line());
        out.push('\n');
    }
    out
}

/// Cookie record as exported by browser extensions
#[derive(Debug, Deserialize)]
struct JsonCookie {
    name: String,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    expiry: Option<f64>,
    #[serde(default, rename = "expirationDate")]
    expiration_date: Option<f64>,
}

impl JsonCookie {
    fn into_netscape(self) -> NetscapeCookie {
        let domain = match self.domain.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) {
            Some(d) if d.starts_with('.') => d,
            Some(d) => format!(".{}", d),
            None => DEFAULT_COOKIE_DOMAIN.to_string(),
        };
        let value = match self.value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };

        NetscapeCookie {
            domain,
            path: self.path.filter(|p| !p.is_empty()).unwrap_or_else(|| "/".to_string()),
            secure: self.secure,
            expires: self.expiry.or(self.expiration_date).map(|e| e as i64).unwrap_or(0),
            name: self.name,
            value,
        }
    }
}

fn json_to_netscape(text: &str) -> Result<String, DownloadError> {
    let parsed: Value =
        serde_json::from_str(text).map_err(|e| DownloadError::Cookies(format!("Invalid cookie JSON: {}", e)))?;

    let records = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("cookies") {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(map)],
        },
        _ => return Err(DownloadError::Cookies("Cookie JSON must be an array or object".to_string())),
    };

    let mut cookies = Vec::with_capacity(records.len());
    for record in records {
        match serde_json::from_value::<JsonCookie>(record) {
            Ok(cookie) => cookies.push(cookie.into_netscape()),
            Err(e) => log::warn!("Skipping malformed cookie record: {}", e),
        }
    }

    if cookies.is_empty() {
        return Err(DownloadError::Cookies("Cookie JSON contains no usable records".to_string()));
    }
    Ok(render_jar(&cookies))
}

fn header_to_netscape(text: &str, now: i64) -> Result<String, DownloadError> {
    let body = match text.split_once(':') {
        Some((prefix, rest)) if prefix.trim().eq_ignore_ascii_case("cookie") => rest,
        _ => text,
    };

    let cookies: Vec<NetscapeCookie> = body
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(NetscapeCookie {
                domain: DEFAULT_COOKIE_DOMAIN.to_string(),
                path: "/".to_string(),
                secure: false,
                expires: now + SYNTHESIZED_COOKIE_LIFETIME_SECS,
                name: name.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect();

    if cookies.is_empty() {
        return Err(DownloadError::Cookies(
            "Unrecognized cookie format. Expected Netscape, JSON or `name=value; ...`".to_string(),
        ));
    }
    Ok(render_jar(&cookies))
}
