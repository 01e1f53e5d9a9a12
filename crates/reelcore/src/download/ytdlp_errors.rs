//! Classification of yt-dlp failures.
//!
//! yt-dlp reports everything through stderr text. This module maps that text
//! to a small set of categories so the requester gets a useful message instead
//! of a raw extractor traceback.

/// yt-dlp error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YtDlpErrorType {
    /// No extractor matched the URL
    UnsupportedUrl,
    /// Site requires a logged-in session (missing or stale cookies)
    LoginRequired,
    /// Private, deleted or otherwise unavailable post
    VideoUnavailable,
    /// Blocked in the server's region
    GeoRestricted,
    /// Post contains no video
    NoVideo,
    /// Timeouts, resets, DNS
    NetworkError,
    /// Anything else
    Unknown,
}

/// Analyzes yt-dlp stderr and determines the error type
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    if stderr_lower.contains("unsupported url") || stderr_lower.contains("is not a valid url") {
        return YtDlpErrorType::UnsupportedUrl;
    }

    if stderr_lower.contains("login")
        || stderr_lower.contains("log in")
        || stderr_lower.contains("please sign in")
        || stderr_lower.contains("use --cookies")
        || stderr_lower.contains("cookies are no longer valid")
        || stderr_lower.contains("rate-limit reached")
    {
        return YtDlpErrorType::LoginRequired;
    }

    if stderr_lower.contains("available in your country")
        || stderr_lower.contains("geo restricted")
        || stderr_lower.contains("geo-restricted")
        || stderr_lower.contains("in your region")
    {
        return YtDlpErrorType::GeoRestricted;
    }

    if stderr_lower.contains("private video")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video is private")
        || stderr_lower.contains("has been removed")
        || stderr_lower.contains("does not exist")
        || stderr_lower.contains("http error 404")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if stderr_lower.contains("no video formats found")
        || stderr_lower.contains("no video could be found")
        || stderr_lower.contains("there is no video in this")
    {
        return YtDlpErrorType::NoVideo;
    }

    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network")
        || stderr_lower.contains("name or service not known")
        || stderr_lower.contains("temporary failure in name resolution")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Returns the user-facing message for an error type
pub fn get_error_message(error_type: YtDlpErrorType) -> &'static str {
    match error_type {
        YtDlpErrorType::UnsupportedUrl => "This link is not supported. Send a link to a single video post.",
        YtDlpErrorType::LoginRequired => "This site requires a logged-in session to download the video.",
        YtDlpErrorType::VideoUnavailable => "The video is unavailable. It may be private or deleted.",
        YtDlpErrorType::GeoRestricted => "The video is not available in the server's region.",
        YtDlpErrorType::NoVideo => "No video was found in this post.",
        YtDlpErrorType::NetworkError => "Network problem while downloading. Try again in a minute.",
        YtDlpErrorType::Unknown => "Could not download the video. Check that the link is correct.",
    }
}

/// Whether the operator should look at this failure (cookies or tool breakage)
pub fn needs_operator_attention(error_type: YtDlpErrorType) -> bool {
    matches!(error_type, YtDlpErrorType::LoginRequired | YtDlpErrorType::Unknown)
}
